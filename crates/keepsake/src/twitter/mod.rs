//! Twitter support: REST v1.1 client, payload normalizer, id-window
//! binding and archive import.
//!
//! # Module Structure
//!
//! - `client` - OAuth1-signed REST client (`TwitterClient`)
//! - `convert` - tweet and user payloads to canonical shapes
//! - `binding` - `TwitterBinding`, the [`PlatformBinding`](crate::sync::PlatformBinding) impl
//! - [`archive`] - offline import of a downloaded archive

pub mod archive;
mod binding;
mod client;
mod convert;

pub use archive::import_archive;
pub use binding::{FAVORITES_LIST, TwitterBinding, USER_TIMELINE, USERS_SHOW, VERIFY_CREDENTIALS};
pub use client::{TWITTER_API_BASE, TwitterClient};
pub use convert::{TwitterNormalizer, full_size_avatar, parse_date, source_name};
