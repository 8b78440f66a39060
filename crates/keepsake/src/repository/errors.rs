use sea_orm::{DbErr, SqlErr};
use thiserror::Error;
use uuid::Uuid;

use crate::entity::platform_type::PlatformType;

/// Errors that can occur during persistence operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Record not found: {context}")]
    NotFound { context: String },

    /// Two stored rows share one natural key, or an insert collided with one.
    #[error("Duplicate {entity} for {platform} external id {external_id}")]
    Duplicate {
        entity: &'static str,
        platform: PlatformType,
        external_id: String,
    },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
}

impl RepositoryError {
    pub fn not_found_by_id(entity: &str, id: Uuid) -> Self {
        Self::NotFound {
            context: format!("{entity} id={id}"),
        }
    }

    pub fn duplicate(
        entity: &'static str,
        platform: PlatformType,
        external_id: impl Into<String>,
    ) -> Self {
        Self::Duplicate {
            entity,
            platform,
            external_id: external_id.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

/// Whether a database error is a unique-key violation.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

pub type Result<T> = std::result::Result<T, RepositoryError>;
