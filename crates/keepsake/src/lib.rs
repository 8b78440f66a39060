//! Keepsake - incremental archiving of social platform content.
//!
//! This library pulls a user's posts, favorites and profile from Twitter and
//! Flickr into a local relational store. Runs are incremental: each account
//! keeps a per-feed cursor, so a run fetches only what is newer than the
//! previous one, and every write is an idempotent upsert.
//!
//! # Features
//!
//! - `twitter`, `flickr` - platform bindings.
//! - `migrate` - Enables database migration support. When enabled, you can use
//!   [`connect_and_migrate`] to automatically run migrations on connection.
//! - `sqlite`, `postgres` - database drivers.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use keepsake::{connect_and_migrate, http::ReqwestTransport, sync, PlatformType};
//!
//! let db = connect_and_migrate("sqlite://keepsake.db?mode=rwc").await?;
//! let config = sync::EngineConfig::default();
//! let transport = Arc::new(ReqwestTransport::with_timeout(config.request_timeout)?);
//! let factory = sync::HttpBindingFactory::new(transport, &config);
//!
//! let outcomes = sync::sync_recent(
//!     sync::SyncContext::new(&db, &config),
//!     &factory,
//!     &sync::AccountSelection::all(PlatformType::Twitter),
//!     sync::FetchMode::New,
//! )
//! .await?;
//! ```

pub mod archive;
pub mod db;
pub mod entity;
pub mod http;
pub mod media;
pub mod oauth1;
pub mod platform;
pub mod repository;
pub mod retry;
pub mod sync;

#[cfg(feature = "twitter")]
pub mod twitter;

#[cfg(feature = "flickr")]
pub mod flickr;

#[cfg(feature = "migrate")]
pub mod migration;

pub use db::connect;
#[cfg(feature = "migrate")]
pub use db::connect_and_migrate;
pub use entity::prelude::*;
pub use media::{HttpMediaFetcher, MediaFetcher, SizeVariant};
pub use platform::{
    ApiClient, ApiRateLimiter, PlatformError, RateLimitedClient, strip_null_values,
};
pub use repository::RepositoryError;
pub use sync::{SyncError, SyncOutcome, SyncProgress};
