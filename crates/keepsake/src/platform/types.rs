use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::entity::platform_type::PlatformType;

use super::errors::Result;

/// Query parameters for one API call. Ordered, so that signing and request
/// logging are deterministic.
pub type Params = BTreeMap<String, String>;

/// Build a [`Params`] map from key/value pairs.
pub fn params<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Params
where
    K: Into<String>,
    V: ToString,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.to_string()))
        .collect()
}

/// One authenticated request against one platform endpoint.
///
/// Implementations perform exactly one network round trip per call and never
/// retry; pagination and retry policy belong to the caller.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Platform this client talks to.
    fn platform(&self) -> PlatformType;

    /// Call `endpoint` with `params` and return the decoded JSON payload.
    async fn execute(&self, endpoint: &str, params: &Params) -> Result<Value>;
}

#[async_trait]
impl<C: ApiClient + ?Sized> ApiClient for std::sync::Arc<C> {
    fn platform(&self) -> PlatformType {
        (**self).platform()
    }

    async fn execute(&self, endpoint: &str, params: &Params) -> Result<Value> {
        (**self).execute(endpoint, params).await
    }
}
