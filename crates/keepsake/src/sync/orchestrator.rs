//! Multi-account orchestration.
//!
//! Accounts run strictly one after another on the calling task. An error
//! that aborts one account becomes that account's failed outcome and the
//! next account still runs. At most one sync per account at a time is a
//! precondition the caller enforces; nothing here takes a lock.

use tracing::{error, info, instrument, warn};

use crate::entity::account::Model as AccountModel;
use crate::entity::platform_type::PlatformType;
use crate::platform::{PlatformError, short_error_message};
use crate::repository::account;

use super::binding::{BindingFactory, PlatformBinding};
use super::cursor::{self, Walk};
use super::error::{ItemFailure, SyncError};
use super::progress::{SyncProgress, emit};
use super::run::{SyncContext, SyncRun};
use super::types::{FeedKind, FetchMode, SyncOperation, SyncOutcome};

/// Which accounts an operation targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSelection {
    pub platform: PlatformType,
    /// A single account by username, or every active account of the platform.
    pub username: Option<String>,
}

impl AccountSelection {
    pub fn all(platform: PlatformType) -> Self {
        Self {
            platform,
            username: None,
        }
    }

    pub fn named(platform: PlatformType, username: impl Into<String>) -> Self {
        Self {
            platform,
            username: Some(username.into()),
        }
    }
}

/// Load the active accounts of a selection, failing when there are none.
pub async fn select_accounts(
    ctx: SyncContext<'_>,
    selection: &AccountSelection,
) -> Result<Vec<AccountModel>, SyncError> {
    let accounts =
        account::find_active(ctx.db, selection.platform, selection.username.as_deref()).await?;
    if accounts.is_empty() {
        return Err(SyncError::NoActiveAccounts {
            platform: selection.platform,
            account: selection.username.clone(),
        });
    }
    Ok(accounts)
}

/// Sync each selected account's own recent items.
pub async fn sync_recent(
    ctx: SyncContext<'_>,
    factory: &dyn BindingFactory,
    selection: &AccountSelection,
    mode: FetchMode,
) -> Result<Vec<SyncOutcome>, SyncError> {
    let accounts = select_accounts(ctx, selection).await?;
    run(ctx, factory, &accounts, SyncOperation::Recent(mode)).await
}

/// Sync each selected account's favorites.
pub async fn sync_favorites(
    ctx: SyncContext<'_>,
    factory: &dyn BindingFactory,
    selection: &AccountSelection,
    mode: FetchMode,
) -> Result<Vec<SyncOutcome>, SyncError> {
    let accounts = select_accounts(ctx, selection).await?;
    run(ctx, factory, &accounts, SyncOperation::Favorites(mode)).await
}

/// Fetch and link each selected account's own identity.
pub async fn sync_account_identity(
    ctx: SyncContext<'_>,
    factory: &dyn BindingFactory,
    selection: &AccountSelection,
) -> Result<Vec<SyncOutcome>, SyncError> {
    let accounts = select_accounts(ctx, selection).await?;
    run(ctx, factory, &accounts, SyncOperation::AccountIdentity).await
}

/// Run `operation` once per active account in `accounts`.
///
/// Fails before any network I/O when no account is active. Otherwise
/// always returns one outcome per active account.
pub async fn run(
    ctx: SyncContext<'_>,
    factory: &dyn BindingFactory,
    accounts: &[AccountModel],
    operation: SyncOperation,
) -> Result<Vec<SyncOutcome>, SyncError> {
    let active: Vec<&AccountModel> = accounts.iter().filter(|a| a.is_active).collect();
    if active.is_empty() {
        let platform = accounts
            .first()
            .map_or(PlatformType::Twitter, |a| a.platform);
        return Err(SyncError::NoActiveAccounts {
            platform,
            account: None,
        });
    }

    emit(
        ctx.on_progress,
        SyncProgress::SyncStarted {
            operation: operation.to_string(),
            accounts: active.len(),
        },
    );

    let mut outcomes = Vec::with_capacity(active.len());
    for account in active {
        outcomes.push(run_account(ctx, factory, account, operation).await);
    }

    let failed = outcomes.iter().filter(|o| !o.success).count();
    emit(
        ctx.on_progress,
        SyncProgress::SyncComplete {
            succeeded: outcomes.len() - failed,
            failed,
        },
    );
    Ok(outcomes)
}

#[instrument(skip_all, fields(account = %account.label(), operation = %operation))]
async fn run_account(
    ctx: SyncContext<'_>,
    factory: &dyn BindingFactory,
    account: &AccountModel,
    operation: SyncOperation,
) -> SyncOutcome {
    let label = account.label();
    emit(
        ctx.on_progress,
        SyncProgress::AccountStarted {
            account: label.clone(),
            operation: operation.to_string(),
        },
    );

    let result = match factory.binding(account) {
        Ok(binding) => match operation {
            SyncOperation::Recent(mode) => {
                sync_feed(ctx, binding.as_ref(), account, FeedKind::Recent, mode).await
            }
            SyncOperation::Favorites(mode) => {
                sync_feed(ctx, binding.as_ref(), account, FeedKind::Favorites, mode).await
            }
            SyncOperation::AccountIdentity => {
                link_account_identity(ctx, binding.as_ref(), account)
                    .await
                    .map(|_| (1, Vec::new()))
            }
        },
        Err(e) => Err(e),
    };

    match result {
        Ok((items_fetched, errors)) => {
            info!(items = items_fetched, errors = errors.len(), "account finished");
            emit(
                ctx.on_progress,
                SyncProgress::AccountFinished {
                    account: label.clone(),
                    items: items_fetched,
                    errors: errors.len(),
                },
            );
            SyncOutcome {
                account_id: account.id,
                account: label,
                success: true,
                items_fetched,
                errors,
            }
        }
        Err(e) => {
            let message = short_error_message(&e);
            error!("account failed: {message}");
            emit(
                ctx.on_progress,
                SyncProgress::AccountFailed {
                    account: label.clone(),
                    error: message.clone(),
                },
            );
            SyncOutcome {
                account_id: account.id,
                account: label,
                success: false,
                items_fetched: 0,
                errors: vec![message],
            }
        }
    }
}

/// Walk one feed of one account and commit its cursor.
async fn sync_feed(
    ctx: SyncContext<'_>,
    binding: &dyn PlatformBinding,
    account: &AccountModel,
    feed: FeedKind,
    mode: FetchMode,
) -> Result<(usize, Vec<String>), SyncError> {
    if !binding.supports(feed) {
        return Err(SyncError::Unsupported {
            platform: account.platform,
            operation: format!("{feed} feed"),
        });
    }

    let label = account.label();
    let mut run = SyncRun::online(ctx, binding, account);

    if feed == FeedKind::Favorites {
        let identity_id = match account.identity_id {
            Some(id) => id,
            None => link_account_identity(ctx, binding, account).await?,
        };
        run.record_favorites_for(identity_id);
    }

    let report = cursor::walk(
        binding,
        Walk {
            feed,
            mode,
            since: account.cursor(feed),
            config: ctx.config,
            account: &label,
        },
        &mut run,
        ctx.on_progress,
    )
    .await?;

    // A capped walk stopped short of the stored cursor; moving it would
    // leave the unvisited span behind it.
    let target = if report.capped {
        info!(feed = %feed, "page cap reached, cursor held");
        None
    } else {
        run.committable(report.high_water)
    };
    if let Some(high_water) = target
        && account::advance_cursor(ctx.db, account.id, feed, high_water).await?
    {
        info!(feed = %feed, high_water, "cursor advanced");
        emit(
            ctx.on_progress,
            SyncProgress::CursorAdvanced {
                account: label,
                feed: feed.to_string(),
                high_water,
            },
        );
    }

    let failures = run.into_failures();
    if !failures.is_empty() {
        warn!(count = failures.len(), "items skipped during sync");
    }
    Ok((report.records, failures))
}

/// Fetch the account's own identity, upsert it and link it to the account.
///
/// The upsert cascades the identity's privacy flag to everything it owns.
async fn link_account_identity(
    ctx: SyncContext<'_>,
    binding: &dyn PlatformBinding,
    account: &AccountModel,
) -> Result<uuid::Uuid, SyncError> {
    let raw = binding.fetch_account_identity().await?;
    let canonical = binding
        .normalize_identity(&raw)
        .map_err(|e| PlatformError::protocol(format!("account identity: {e}")))?;

    let mut run = SyncRun::online(ctx, binding, account);
    let identity = match run.save_identity(canonical).await {
        Ok(identity) => identity,
        Err(ItemFailure::Fatal(e)) => return Err(e),
        Err(ItemFailure::Item(e)) => {
            return Err(PlatformError::protocol(format!("account identity: {e}")).into());
        }
    };

    account::set_identity(ctx.db, account.id, identity.id).await?;
    emit(
        ctx.on_progress,
        SyncProgress::IdentityFetched {
            external_id: identity.external_id.clone(),
            username: identity.username.clone(),
        },
    );
    Ok(identity.id)
}
