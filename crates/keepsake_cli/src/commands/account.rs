use console::style;
use keepsake::db;
use keepsake::entity::account::Model as AccountModel;
use keepsake::oauth1::Credentials;
use keepsake::repository::account::{self, NewAccount};
use keepsake::{PlatformType, RepositoryError};

use crate::{AccountAction, CredentialArgs};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    /// Display as a formatted table (default)
    #[default]
    Table,
    /// Display as JSON
    Json,
}

#[derive(Debug, Clone, serde::Serialize, tabled::Tabled)]
pub(crate) struct AccountDisplay {
    #[tabled(rename = "Account")]
    pub account: String,
    #[tabled(rename = "Active")]
    pub active: bool,
    #[tabled(rename = "Credentials")]
    pub credentials: bool,
    #[tabled(rename = "Last Recent")]
    pub last_recent_id: String,
    #[tabled(rename = "Last Favorite")]
    pub last_favorite_id: String,
}

impl From<&AccountModel> for AccountDisplay {
    fn from(model: &AccountModel) -> Self {
        let cursor = |value: Option<i64>| value.map_or_else(|| "-".to_string(), |v| v.to_string());
        Self {
            account: model.label(),
            active: model.is_active,
            credentials: model.credentials().is_some(),
            last_recent_id: cursor(model.last_recent_id),
            last_favorite_id: cursor(model.last_favorite_id),
        }
    }
}

impl AccountDisplay {
    pub(crate) fn render(items: Vec<Self>, format: OutputFormat) -> Result<String, serde_json::Error> {
        match format {
            OutputFormat::Table => {
                let mut table = tabled::Table::new(items);
                table.with(tabled::settings::Style::rounded());
                Ok(table.to_string())
            }
            OutputFormat::Json => serde_json::to_string_pretty(&items),
        }
    }
}

/// All four values, or none at all.
fn credentials(args: CredentialArgs) -> Result<Option<Credentials>, String> {
    match (
        args.consumer_key,
        args.consumer_secret,
        args.token,
        args.token_secret,
    ) {
        (Some(consumer_key), Some(consumer_secret), Some(token), Some(token_secret)) => {
            Ok(Some(Credentials {
                consumer_key,
                consumer_secret,
                token,
                token_secret,
            }))
        }
        (None, None, None, None) => Ok(None),
        _ => Err(
            "credentials need all of --consumer-key, --consumer-secret, --token and --token-secret"
                .to_string(),
        ),
    }
}

async fn find(
    db: &sea_orm::DatabaseConnection,
    platform: PlatformType,
    username: &str,
) -> Result<AccountModel, RepositoryError> {
    account::find_by_username(db, platform, username)
        .await?
        .ok_or_else(|| RepositoryError::NotFound {
            context: format!("account {username}@{platform}"),
        })
}

pub(crate) async fn handle_account(
    action: AccountAction,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = db::connect_and_migrate(database_url).await?;

    match action {
        AccountAction::Add {
            platform,
            username,
            credentials: credential_args,
            inactive,
        } => {
            let credentials = credentials(credential_args)?;
            if credentials.is_none() {
                tracing::warn!("no credentials given; only archive import will work for this account");
            }
            let created = account::create(
                &db,
                NewAccount {
                    platform,
                    username,
                    credentials,
                    is_active: !inactive,
                },
            )
            .await?;
            println!("{} Added {}", style("✓").green().bold(), created.label());
        }
        AccountAction::List { platform, output } => {
            let accounts = account::list(&db, platform).await?;
            if accounts.is_empty() && output == OutputFormat::Table {
                println!("No accounts registered. Add one with `keepsake account add`.");
                return Ok(());
            }
            let rows = accounts.iter().map(AccountDisplay::from).collect();
            println!("{}", AccountDisplay::render(rows, output)?);
        }
        AccountAction::Enable { platform, username } => {
            let found = find(&db, platform, &username).await?;
            account::set_active(&db, found.id, true).await?;
            println!("{} Enabled {}", style("✓").green().bold(), found.label());
        }
        AccountAction::Disable { platform, username } => {
            let found = find(&db, platform, &username).await?;
            account::set_active(&db, found.id, false).await?;
            println!("{} Disabled {}", style("✓").yellow().bold(), found.label());
        }
    }

    Ok(())
}
