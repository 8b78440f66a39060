//! Platform-agnostic API client abstraction.
//!
//! Every platform binding talks to its service through the [`ApiClient`]
//! trait: one authenticated call, one JSON payload or one typed
//! [`PlatformError`].
//!
//! ```ignore
//! use keepsake::platform::{ApiClient, params};
//!
//! async fn newest<C: ApiClient>(client: &C) -> keepsake::platform::Result<serde_json::Value> {
//!     client
//!         .execute("statuses/user_timeline", &params([("count", 200)]))
//!         .await
//! }
//! ```

pub mod convert;
mod errors;
mod rate_limit;
mod types;

pub use convert::strip_null_values;
pub use errors::{PlatformError, Result, short_error_message};
pub use rate_limit::{ApiRateLimiter, RateLimitedClient};
pub use types::{ApiClient, Params, params};
