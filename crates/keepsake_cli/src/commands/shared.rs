//! Setup shared by the sync and import commands.

use std::path::Path;
use std::sync::Arc;

use console::style;
use keepsake::http::{HttpTransport, ReqwestTransport};
use keepsake::media::HttpMediaFetcher;
use keepsake::sync::{EngineConfig, SyncOutcome, any_failed};
use sea_orm::DatabaseConnection;

use crate::config::Config;
use crate::progress::ProgressReporter;

/// Create the parent directory of a file-backed SQLite database.
pub(crate) fn ensure_sqlite_dir(database_url: &str) -> std::io::Result<()> {
    let Some(db_path) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    // Strip query parameters (e.g., ?mode=rwc) before path operations
    let db_path = db_path.split('?').next().unwrap_or(db_path);
    let db_path = Path::new(db_path);

    if db_path.is_relative() && !db_path.as_os_str().is_empty() {
        tracing::warn!(
            "Database path '{}' is relative - behavior depends on current directory. \
             Consider using an absolute path.",
            db_path.display()
        );
    }

    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Everything one sync command needs, owned for the command's lifetime.
pub(crate) struct Session {
    pub(crate) db: DatabaseConnection,
    pub(crate) engine: EngineConfig,
    pub(crate) transport: Arc<dyn HttpTransport>,
    pub(crate) media: Option<HttpMediaFetcher>,
    pub(crate) reporter: Arc<ProgressReporter>,
}

impl Session {
    pub(crate) async fn open(
        config: &Config,
        database_url: &str,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let db = keepsake::connect_and_migrate(database_url).await?;
        let engine = config.sync.engine_config();
        let transport: Arc<dyn HttpTransport> =
            Arc::new(ReqwestTransport::with_timeout(engine.request_timeout)?);
        let media = config.media_root().map(|root| {
            tracing::debug!(root = %root.display(), "media downloads enabled");
            HttpMediaFetcher::new(Arc::clone(&transport), root)
        });

        Ok(Self {
            db,
            engine,
            transport,
            media,
            reporter: Arc::new(ProgressReporter::new()),
        })
    }
}

/// Print one line per account and report whether every account succeeded.
///
/// Successes go to stdout, failures to stderr.
pub(crate) fn report_outcomes(outcomes: &[SyncOutcome]) -> bool {
    for outcome in outcomes {
        if outcome.success {
            println!("{}", outcome_line(outcome));
        } else {
            eprintln!("{}", outcome_line(outcome));
        }
    }
    !any_failed(outcomes)
}

fn outcome_line(outcome: &SyncOutcome) -> String {
    if outcome.success {
        let skipped = match outcome.errors.len() {
            0 => String::new(),
            n => format!(" ({n} skipped)"),
        };
        format!(
            "{} {}: fetched {}{skipped}",
            style("✓").green().bold(),
            outcome.account,
            outcome.items_fetched
        )
    } else {
        format!(
            "{} {}: {}",
            style("✗").red().bold(),
            outcome.account,
            outcome.first_error().unwrap_or("unknown error")
        )
    }
}
