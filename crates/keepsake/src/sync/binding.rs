//! The seam between the generic engine and one platform.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::entity::account::Model as AccountModel;
use crate::entity::platform_type::PlatformType;
use crate::http::HttpTransport;
use crate::platform::{ApiRateLimiter, PlatformError};

use super::canonical::{CanonicalIdentity, CanonicalItem};
use super::error::{ItemError, SyncError};
use super::types::{EngineConfig, FeedKind};

/// Pure JSON to canonical conversion for one platform.
///
/// Normalizers never perform I/O. Nested entities they cannot resolve from
/// the payload are returned as references ([`super::OwnerRef::ById`]) for
/// the run to fetch.
pub trait Normalizer: Send + Sync {
    fn platform(&self) -> PlatformType;

    fn normalize_identity(&self, raw: &Value) -> Result<CanonicalIdentity, ItemError>;

    fn normalize_item(&self, raw: &Value) -> Result<CanonicalItem, ItemError>;
}

/// Pagination discipline a platform uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationMode {
    /// `page`/`per_page`, with the response declaring the page count.
    Offset,
    /// Newest-first batches bounded by `max_id`/`since_id`.
    IdWindow,
}

/// Address of one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    Offset {
        page: u32,
        per_page: u32,
    },
    Window {
        count: u32,
        max_id: Option<i64>,
        since_id: Option<i64>,
    },
}

/// One page of raw records.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub records: Vec<Value>,
    /// Total page count, for offset pagination.
    pub total_pages: Option<u32>,
}

/// Per-account access to a platform: paging, nested fetches and normalization.
#[async_trait]
pub trait PlatformBinding: Normalizer {
    fn pagination(&self) -> PaginationMode;

    /// Whether the platform has this feed at all.
    fn supports(&self, feed: FeedKind) -> bool;

    /// Fetch one page of raw records, enriched so that they normalize on their own.
    async fn fetch_page(&self, feed: FeedKind, request: &PageRequest) -> Result<Page, PlatformError>;

    /// Numeric id of a raw record, used as the cursor value.
    fn record_id(&self, raw: &Value) -> Option<i64>;

    /// Raw identity payload for a nested fetch.
    async fn fetch_identity(&self, external_id: &str) -> Result<Value, PlatformError>;

    /// Raw identity payload of the account the binding authenticates as.
    async fn fetch_account_identity(&self) -> Result<Value, PlatformError>;
}

/// Builds a binding for an account.
pub trait BindingFactory: Send + Sync {
    fn binding(&self, account: &AccountModel) -> Result<Box<dyn PlatformBinding>, SyncError>;
}

/// Production factory: signed HTTP clients sharing one rate limiter per platform.
pub struct HttpBindingFactory {
    transport: Arc<dyn HttpTransport>,
    twitter_limiter: ApiRateLimiter,
    flickr_limiter: ApiRateLimiter,
}

impl HttpBindingFactory {
    pub fn new(transport: Arc<dyn HttpTransport>, config: &EngineConfig) -> Self {
        Self {
            transport,
            twitter_limiter: ApiRateLimiter::new(config.requests_per_second),
            flickr_limiter: ApiRateLimiter::new(config.requests_per_second),
        }
    }

    fn limiter(&self, platform: PlatformType) -> ApiRateLimiter {
        match platform {
            PlatformType::Twitter => self.twitter_limiter.clone(),
            PlatformType::Flickr => self.flickr_limiter.clone(),
        }
    }
}

impl BindingFactory for HttpBindingFactory {
    fn binding(&self, account: &AccountModel) -> Result<Box<dyn PlatformBinding>, SyncError> {
        let credentials = account
            .credentials()
            .ok_or_else(|| SyncError::MissingCredentials {
                account: account.label(),
            })?;
        let limiter = self.limiter(account.platform);

        match account.platform {
            #[cfg(feature = "twitter")]
            PlatformType::Twitter => {
                use crate::platform::RateLimitedClient;
                use crate::twitter::{TwitterBinding, TwitterClient};

                let client = TwitterClient::new(credentials, Arc::clone(&self.transport));
                Ok(Box::new(TwitterBinding::new(
                    RateLimitedClient::new(client, limiter),
                    account.username.clone(),
                )))
            }
            #[cfg(feature = "flickr")]
            PlatformType::Flickr => {
                use crate::flickr::{FlickrBinding, FlickrClient};
                use crate::platform::RateLimitedClient;

                let client = FlickrClient::new(credentials, Arc::clone(&self.transport));
                Ok(Box::new(FlickrBinding::new(
                    RateLimitedClient::new(client, limiter),
                    account.username.clone(),
                )))
            }
            #[allow(unreachable_patterns)]
            other => {
                let _ = (credentials, limiter);
                Err(SyncError::Unsupported {
                    platform: other,
                    operation: "sync (binding not compiled in)".to_string(),
                })
            }
        }
    }
}
