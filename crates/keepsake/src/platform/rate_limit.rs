use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use serde_json::Value;

use crate::entity::platform_type::PlatformType;

use super::errors::Result;
use super::types::{ApiClient, Params};

type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

fn quota(requests_per_second: u32) -> Quota {
    Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN))
}

/// A standalone request limiter, shareable between clients so that every
/// account of one platform draws from the same budget.
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
}

impl ApiRateLimiter {
    /// `requests_per_second` of zero is treated as one.
    pub fn new(requests_per_second: u32) -> Self {
        Self {
            inner: Arc::new(RateLimiter::direct(quota(requests_per_second))),
        }
    }

    /// Wait until a request is allowed.
    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }
}

/// An [`ApiClient`] decorator that waits for a shared limiter before every call.
///
/// ```ignore
/// let limiter = ApiRateLimiter::new(config.requests_per_second);
/// let client = RateLimitedClient::new(TwitterClient::new(credentials, transport), limiter.clone());
/// let page = client.execute("statuses/user_timeline", &params).await?;
/// ```
#[derive(Clone)]
pub struct RateLimitedClient<C> {
    inner: C,
    limiter: ApiRateLimiter,
}

impl<C> RateLimitedClient<C> {
    pub fn new(inner: C, limiter: ApiRateLimiter) -> Self {
        Self { inner, limiter }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: ApiClient> ApiClient for RateLimitedClient<C> {
    fn platform(&self) -> PlatformType {
        self.inner.platform()
    }

    async fn execute(&self, endpoint: &str, params: &Params) -> Result<Value> {
        self.limiter.wait().await;
        self.inner.execute(endpoint, params).await
    }
}
