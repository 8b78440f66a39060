//! Keepsake CLI - command-line interface for the social archive.

mod commands;
mod config;
mod progress;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use console::Term;
use keepsake::PlatformType;
use keepsake::sync::FetchMode;
use tracing_subscriber::EnvFilter;

use crate::commands::account::OutputFormat;

#[derive(Parser)]
#[command(name = "keepsake")]
#[command(version)]
#[command(about = "Incremental archive of your social platform content")]
#[command(
    long_about = "Keepsake pulls your posts, favorites and profile from Twitter and Flickr \
into a local database. Every run is incremental: only content newer than the previous \
run is fetched, and re-running a sync never duplicates anything."
)]
#[command(after_long_help = r#"EXAMPLES
    Register an account:
        $ keepsake account add --platform twitter --username alice \
            --consumer-key ... --consumer-secret ... --token ... --token-secret ...

    Fetch everything new since the last run:
        $ keepsake sync-recent --platform twitter

    Fetch the 50 most recent favorites of one account:
        $ keepsake sync-favorites --platform twitter --account alice --count 50

    Import a downloaded Twitter archive:
        $ keepsake import-archive --path ~/Downloads/twitter-2026 --account alice

CONFIGURATION
    Keepsake reads configuration from:
      1. ~/.config/keepsake/config.toml (or $XDG_CONFIG_HOME/keepsake/config.toml)
      2. ./keepsake.toml
      3. Environment variables (KEEPSAKE_* prefix, e.g., KEEPSAKE_DATABASE__URL)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    KEEPSAKE_DATABASE__URL    Database connection string (default: ~/.local/state/keepsake/keepsake.db)
    KEEPSAKE_MEDIA__ROOT      Directory media files are downloaded into
    KEEPSAKE_MEDIA__DOWNLOAD  Set to false to skip media downloads
    RUST_LOG                  Log filter (default: keepsake=info,keepsake_cli=info)
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Manage archived accounts
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },
    /// Sync each account's own recent posts
    SyncRecent(FeedArgs),
    /// Sync each account's favorites
    SyncFavorites(FeedArgs),
    /// Fetch and link each account's own profile
    SyncAccountIdentity(AccountArgs),
    /// Import a downloaded Twitter archive
    #[cfg(feature = "twitter")]
    ImportArchive {
        /// Root directory of the unpacked archive
        #[arg(long)]
        path: PathBuf,
        /// Twitter account (username) to import into
        #[arg(long)]
        account: String,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
    /// Generate man page(s)
    Man {
        /// Output directory for man pages (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Rollback the last migration
    Down,
    /// Show migration status
    Status,
    /// Fresh install - drop all tables and reapply migrations
    Fresh,
}

#[derive(Subcommand)]
enum AccountAction {
    /// Register an account
    Add {
        /// Platform the account lives on
        #[arg(short, long)]
        platform: PlatformType,
        /// Username on the platform
        #[arg(short, long)]
        username: String,
        #[command(flatten)]
        credentials: CredentialArgs,
        /// Register the account as inactive
        #[arg(long)]
        inactive: bool,
    },
    /// List registered accounts
    List {
        /// Only list accounts of this platform
        #[arg(short, long)]
        platform: Option<PlatformType>,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Include an account in syncs again
    Enable {
        #[arg(short, long)]
        platform: PlatformType,
        username: String,
    },
    /// Skip an account in every sync
    Disable {
        #[arg(short, long)]
        platform: PlatformType,
        username: String,
    },
}

/// OAuth 1.0a credentials for a new account. All four are required to sync.
#[derive(Debug, Clone, Args)]
struct CredentialArgs {
    #[arg(long, env = "KEEPSAKE_CONSUMER_KEY", hide_env_values = true)]
    consumer_key: Option<String>,
    #[arg(long, env = "KEEPSAKE_CONSUMER_SECRET", hide_env_values = true)]
    consumer_secret: Option<String>,
    #[arg(long, env = "KEEPSAKE_ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,
    #[arg(long, env = "KEEPSAKE_ACCESS_TOKEN_SECRET", hide_env_values = true)]
    token_secret: Option<String>,
}

/// Which accounts a sync targets.
#[derive(Debug, Clone, Args)]
struct AccountArgs {
    /// Platform to sync
    #[arg(short, long)]
    platform: PlatformType,
    /// A single account (username); every active account when omitted
    #[arg(short, long)]
    account: Option<String>,
}

#[derive(Debug, Clone, Args)]
struct FeedArgs {
    #[command(flatten)]
    accounts: AccountArgs,
    /// Number of most recent items, or "new" for everything since the last run
    #[arg(short, long, default_value = "new")]
    count: FetchMode,
}

fn init_tracing() {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("keepsake=info,keepsake_cli=info"),
    };

    // Interactive spinners own stderr on a TTY; only warnings get through there.
    let env_filter = if Term::stderr().is_term() && std::env::var_os("RUST_LOG").is_none() {
        EnvFilter::new("keepsake=warn,keepsake_cli=warn")
    } else {
        env_filter
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e}", console::style("✗").red().bold());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    // Handle commands that don't require database access first
    match &cli.command {
        Commands::Completions { shell } => {
            commands::meta::handle_completions(*shell)?;
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Man { output } => {
            commands::meta::handle_man(output.clone())?;
            return Ok(ExitCode::SUCCESS);
        }
        _ => {}
    }

    // Load configuration (config file -> env vars -> defaults)
    let config = config::Config::load();
    let database_url = config
        .database_url()
        .ok_or("could not determine a database URL; set KEEPSAKE_DATABASE__URL")?;
    commands::shared::ensure_sqlite_dir(&database_url)?;

    let all_succeeded = match cli.command {
        Commands::Migrate { action } => {
            commands::migrate::handle_migrate(action, &database_url).await?;
            true
        }
        Commands::Account { action } => {
            commands::account::handle_account(action, &database_url).await?;
            true
        }
        Commands::SyncRecent(args) => {
            commands::sync::handle_recent(args, &config, &database_url).await?
        }
        Commands::SyncFavorites(args) => {
            commands::sync::handle_favorites(args, &config, &database_url).await?
        }
        Commands::SyncAccountIdentity(args) => {
            commands::sync::handle_account_identity(args, &config, &database_url).await?
        }
        #[cfg(feature = "twitter")]
        Commands::ImportArchive { path, account } => {
            commands::archive::handle_import(&path, &account, &config, &database_url).await?
        }
        Commands::Completions { .. } | Commands::Man { .. } => true,
    };

    Ok(if all_succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_sync_recent_count() {
        let cli = Cli::try_parse_from([
            "keepsake",
            "sync-recent",
            "--platform",
            "twitter",
            "--account",
            "alice",
            "--count",
            "50",
        ])
        .unwrap();
        let Commands::SyncRecent(args) = cli.command else {
            panic!("wrong command");
        };
        assert_eq!(args.accounts.platform, PlatformType::Twitter);
        assert_eq!(args.accounts.account.as_deref(), Some("alice"));
        assert_eq!(args.count, FetchMode::Count(50));
    }

    #[test]
    fn sync_count_defaults_to_new() {
        let cli = Cli::try_parse_from(["keepsake", "sync-favorites", "-p", "flickr"]).unwrap();
        let Commands::SyncFavorites(args) = cli.command else {
            panic!("wrong command");
        };
        assert_eq!(args.count, FetchMode::New);
        assert!(args.accounts.account.is_none());
    }

    #[test]
    fn rejects_zero_count_and_unknown_platform() {
        assert!(
            Cli::try_parse_from(["keepsake", "sync-recent", "-p", "twitter", "--count", "0"])
                .is_err()
        );
        assert!(Cli::try_parse_from(["keepsake", "sync-recent", "-p", "myspace"]).is_err());
    }
}
