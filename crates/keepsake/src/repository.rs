//! Persistence operations for the archive store.
//!
//! Every write to items, identities and media goes through an `upsert`
//! keyed by the platform's external id: the existing row is looked up by its
//! natural key and updated in place (only fields that are `Set` in the active
//! model are written), or a new row is inserted. Each upsert runs in its own
//! transaction.

pub mod account;
pub mod association;
mod errors;
pub mod favorite;
pub mod identity;
pub mod item;
pub mod label;
pub mod media;
pub mod query;

use sea_orm::ActiveValue;

pub use errors::{RepositoryError, Result};
pub use query::{PaginatedResult, Pagination};

/// A stored record together with whether this write created it.
#[derive(Debug, Clone)]
pub struct Upserted<M> {
    pub model: M,
    pub created: bool,
}

fn required_active_value<T: Clone + Into<sea_orm::Value>>(
    field: &str,
    value: &ActiveValue<T>,
) -> Result<T> {
    match value {
        ActiveValue::Set(value) | ActiveValue::Unchanged(value) => Ok(value.clone()),
        ActiveValue::NotSet => Err(RepositoryError::invalid_input(format!(
            "Missing required field: {field}"
        ))),
    }
}
