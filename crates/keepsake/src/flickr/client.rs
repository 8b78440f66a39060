//! Flickr REST client.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::entity::platform_type::PlatformType;
use crate::http::{HttpMethod, HttpRequest, HttpTransport, url_with_params};
use crate::oauth1::{self, Credentials, Nonce};
use crate::platform::convert::{i64_at, str_at};
use crate::platform::{ApiClient, Params, PlatformError, Result};

/// Default REST endpoint. Every method shares it; the method name is a parameter.
pub const FLICKR_API_BASE: &str = "https://api.flickr.com/services/rest";

/// One OAuth1-signed GET per [`ApiClient::execute`].
///
/// `endpoint` is the method name, e.g. `flickr.people.getPhotos`.
#[derive(Clone)]
pub struct FlickrClient {
    credentials: Credentials,
    transport: Arc<dyn HttpTransport>,
    base_url: String,
}

impl FlickrClient {
    pub fn new(credentials: Credentials, transport: Arc<dyn HttpTransport>) -> Self {
        Self::with_base_url(credentials, transport, FLICKR_API_BASE)
    }

    pub fn with_base_url(
        credentials: Credentials,
        transport: Arc<dyn HttpTransport>,
        base_url: &str,
    ) -> Self {
        Self {
            credentials,
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

/// Map an in-body `{"stat": "fail"}` response.
fn stat_failure(method: &str, body: &Value) -> PlatformError {
    let code = i64_at(body, "code").unwrap_or(0);
    let message = str_at(body, "message").unwrap_or("unknown error");
    match code {
        98..=100 => PlatformError::unauthorized(format!("{method}: {message}")),
        1 | 2 => PlatformError::not_found(format!("{method}: {message}")),
        105 => PlatformError::transient(format!("{method}: {message}")),
        _ => PlatformError::protocol(format!("{method} failed with code {code}: {message}")),
    }
}

#[async_trait]
impl ApiClient for FlickrClient {
    fn platform(&self) -> PlatformType {
        PlatformType::Flickr
    }

    async fn execute(&self, endpoint: &str, params: &Params) -> Result<Value> {
        let mut params = params.clone();
        params.insert("method".into(), endpoint.to_string());
        params.insert("format".into(), "json".into());
        params.insert("nojsoncallback".into(), "1".into());

        let authorization = oauth1::authorization_header(
            &self.credentials,
            HttpMethod::Get,
            &self.base_url,
            &params,
            &Nonce::generate(),
        );
        let request = HttpRequest::get(url_with_params(&self.base_url, &params)?)
            .header("Accept", "application/json")
            .header("Authorization", authorization);

        debug!(method = endpoint, "flickr request");
        let response = self.transport.send(request).await?;

        if !response.is_success() {
            return Err(PlatformError::from_status(response.status, endpoint, None));
        }

        let body: Value = serde_json::from_slice(&response.body)
            .map_err(|e| PlatformError::protocol(format!("invalid JSON from {endpoint}: {e}")))?;
        match str_at(&body, "stat") {
            Some("ok") => Ok(body),
            Some("fail") => Err(stat_failure(endpoint, &body)),
            _ => Err(PlatformError::protocol(format!("{endpoint} response without stat"))),
        }
    }
}
