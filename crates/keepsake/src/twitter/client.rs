//! Twitter REST v1.1 client.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::entity::platform_type::PlatformType;
use crate::http::{HttpMethod, HttpRequest, HttpTransport, url_with_params};
use crate::oauth1::{self, Credentials, Nonce};
use crate::platform::{ApiClient, Params, PlatformError, Result};

/// Default API root.
pub const TWITTER_API_BASE: &str = "https://api.twitter.com/1.1";

/// Header carrying the unix time at which the rate-limit window resets.
const RATE_LIMIT_RESET_HEADER: &str = "x-rate-limit-reset";

/// One OAuth1-signed GET per [`ApiClient::execute`].
///
/// Endpoints are given without the `.json` suffix, e.g. `statuses/user_timeline`.
#[derive(Clone)]
pub struct TwitterClient {
    credentials: Credentials,
    transport: Arc<dyn HttpTransport>,
    base_url: String,
}

impl TwitterClient {
    pub fn new(credentials: Credentials, transport: Arc<dyn HttpTransport>) -> Self {
        Self::with_base_url(credentials, transport, TWITTER_API_BASE)
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

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}.json", self.base_url, endpoint.trim_matches('/'))
    }
}

#[async_trait]
impl ApiClient for TwitterClient {
    fn platform(&self) -> PlatformType {
        PlatformType::Twitter
    }

    async fn execute(&self, endpoint: &str, params: &Params) -> Result<Value> {
        let base = self.endpoint_url(endpoint);
        let authorization = oauth1::authorization_header(
            &self.credentials,
            HttpMethod::Get,
            &base,
            params,
            &Nonce::generate(),
        );
        let request = HttpRequest::get(url_with_params(&base, params)?)
            .header("Accept", "application/json")
            .header("Authorization", authorization);

        debug!(endpoint, "twitter request");
        let response = self.transport.send(request).await?;

        if !response.is_success() {
            return Err(PlatformError::from_status(
                response.status,
                endpoint,
                response.header(RATE_LIMIT_RESET_HEADER),
            ));
        }

        serde_json::from_slice(&response.body)
            .map_err(|e| PlatformError::protocol(format!("invalid JSON from {endpoint}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpResponse, MockTransport};
    use crate::platform::params;
    use serde_json::json;

    fn credentials() -> Credentials {
        Credentials {
            consumer_key: "ck".to_string(),
            consumer_secret: "cs".to_string(),
            token: "at".to_string(),
            token_secret: "ats".to_string(),
        }
    }

    fn client(transport: &MockTransport) -> TwitterClient {
        TwitterClient::new(credentials(), Arc::new(transport.clone()))
    }

    const TIMELINE: &str = "https://api.twitter.com/1.1/statuses/user_timeline.json";

    #[tokio::test]
    async fn signs_request_and_parses_body() {
        let transport = MockTransport::new();
        transport.push_json(TIMELINE, 200, json!([{"id_str": "1"}]));

        let body = client(&transport)
            .execute(
                "statuses/user_timeline",
                &params([("screen_name", "alice"), ("count", "200")]),
            )
            .await
            .unwrap();
        assert_eq!(body, json!([{"id_str": "1"}]));

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].url.starts_with(TIMELINE));
        assert!(requests[0].url.contains("screen_name=alice"));
        let auth = crate::http::header_get(&requests[0].headers, "authorization").unwrap();
        assert!(auth.starts_with("OAuth "));
        assert!(auth.contains("oauth_consumer_key=\"ck\""));
        assert!(auth.contains("oauth_signature="));
    }

    #[tokio::test]
    async fn maps_rate_limit_with_reset() {
        let transport = MockTransport::new();
        transport.push_response(
            HttpMethod::Get,
            TIMELINE,
            HttpResponse {
                status: 429,
                headers: vec![("x-rate-limit-reset".to_string(), "1700000000".to_string())],
                body: Vec::new(),
            },
        );

        let err = client(&transport)
            .execute("statuses/user_timeline", &Params::new())
            .await
            .unwrap_err();
        match err {
            PlatformError::RateLimited { reset_at } => {
                assert_eq!(reset_at.map(|t| t.timestamp()), Some(1_700_000_000));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn maps_auth_and_not_found() {
        let transport = MockTransport::new();
        transport.push_json(TIMELINE, 401, json!({"errors": []}));
        transport.push_json(TIMELINE, 404, json!({"errors": []}));
        let client = client(&transport);

        assert!(matches!(
            client.execute("statuses/user_timeline", &Params::new()).await,
            Err(PlatformError::Unauthorized { .. })
        ));
        assert!(matches!(
            client.execute("statuses/user_timeline", &Params::new()).await,
            Err(PlatformError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn undecodable_body_is_protocol_error() {
        let transport = MockTransport::new();
        transport.push_response(
            HttpMethod::Get,
            TIMELINE,
            HttpResponse {
                status: 200,
                headers: vec![],
                body: b"<html>".to_vec(),
            },
        );
        assert!(matches!(
            client(&transport)
                .execute("statuses/user_timeline", &Params::new())
                .await,
            Err(PlatformError::Protocol { .. })
        ));
    }

    #[tokio::test]
    async fn transport_failure_is_transient() {
        let transport = MockTransport::new();
        assert!(matches!(
            client(&transport)
                .execute("statuses/user_timeline", &Params::new())
                .await,
            Err(PlatformError::Transient { .. })
        ));
    }
}
