//! Error types distinguishing account-fatal from item-local failures.
//!
//! A [`SyncError`] aborts the current account's run and becomes a failed
//! outcome. An [`ItemError`] only aborts the current item; it is collected
//! into the account's message list and the page continues.

use thiserror::Error;

use crate::entity::platform_type::PlatformType;
use crate::platform::PlatformError;
use crate::repository::RepositoryError;

/// Account-fatal failure.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Account has no credentials configured.
    #[error("Account {account} has no credentials")]
    MissingCredentials { account: String },

    /// No active account matched the selection; nothing was attempted.
    #[error("No active {platform} accounts{}", .account.as_ref().map(|a| format!(" named {a}")).unwrap_or_default())]
    NoActiveAccounts {
        platform: PlatformType,
        account: Option<String>,
    },

    #[error("{operation} is not supported on {platform}")]
    Unsupported {
        platform: PlatformType,
        operation: String,
    },

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Archive(#[from] crate::archive::ArchiveError),
}

impl From<sea_orm::DbErr> for SyncError {
    fn from(err: sea_orm::DbErr) -> Self {
        SyncError::Repository(err.into())
    }
}

/// Item-local failure.
#[derive(Debug, Error)]
pub enum ItemError {
    /// A label's authoring identity is not stored locally.
    #[error("Unknown author {author} for association {association} on item {item}")]
    UnknownAuthor {
        item: String,
        association: String,
        author: String,
    },

    /// An owner could not be fetched or found.
    #[error("Unknown identity {external_id}")]
    UnknownIdentity { external_id: String },

    /// An item refers back to one already being saved on this path.
    #[error("Reference cycle at item {external_id}")]
    Cycle { external_id: String },

    #[error("Item {external_id} nested deeper than {max_depth}")]
    DepthExceeded {
        external_id: String,
        max_depth: usize,
    },

    /// A raw record lacked something every record must have.
    #[error("Malformed record: {message}")]
    Malformed { message: String },
}

impl ItemError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Whether the same payload may succeed on a later run.
    ///
    /// Missing identities can appear later; cycles, depth and malformed
    /// payloads fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ItemError::UnknownAuthor { .. } | ItemError::UnknownIdentity { .. }
        )
    }
}

/// Result of attempting one item: either scoped to the item or fatal for the account.
#[derive(Debug, Error)]
pub enum ItemFailure {
    #[error(transparent)]
    Item(#[from] ItemError),

    #[error(transparent)]
    Fatal(#[from] SyncError),
}

impl From<PlatformError> for ItemFailure {
    fn from(err: PlatformError) -> Self {
        ItemFailure::Fatal(err.into())
    }
}

impl From<RepositoryError> for ItemFailure {
    fn from(err: RepositoryError) -> Self {
        ItemFailure::Fatal(err.into())
    }
}

impl From<sea_orm::DbErr> for ItemFailure {
    fn from(err: sea_orm::DbErr) -> Self {
        ItemFailure::Fatal(err.into())
    }
}
