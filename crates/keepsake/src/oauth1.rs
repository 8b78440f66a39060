//! OAuth 1.0a request signing (HMAC-SHA1).
//!
//! Both supported platforms accept OAuth 1.0a signed requests. The signature
//! covers the request method, the URL without its query, and every query and
//! `oauth_*` parameter, percent-encoded per RFC 3986 and sorted.

use base64::{Engine, engine::general_purpose::STANDARD};
use ring::hmac;

use crate::http::HttpMethod;
use crate::platform::Params;

/// Consumer key/secret plus access token/secret for one account.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub token: String,
    pub token_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

/// Per-request values that must differ between requests.
#[derive(Debug, Clone)]
pub struct Nonce {
    pub nonce: String,
    pub timestamp: i64,
}

impl Nonce {
    pub fn generate() -> Self {
        Self {
            nonce: uuid::Uuid::new_v4().simple().to_string(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

fn encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

fn oauth_params(credentials: &Credentials, nonce: &Nonce) -> Params {
    let mut p = Params::new();
    p.insert("oauth_consumer_key".into(), credentials.consumer_key.clone());
    p.insert("oauth_nonce".into(), nonce.nonce.clone());
    p.insert("oauth_signature_method".into(), "HMAC-SHA1".into());
    p.insert("oauth_timestamp".into(), nonce.timestamp.to_string());
    p.insert("oauth_token".into(), credentials.token.clone());
    p.insert("oauth_version".into(), "1.0".into());
    p
}

/// Compute the base64 HMAC-SHA1 signature for a request.
pub fn signature(
    credentials: &Credentials,
    method: HttpMethod,
    base_url: &str,
    params: &Params,
    nonce: &Nonce,
) -> String {
    let mut pairs: Vec<(String, String)> = params
        .iter()
        .chain(oauth_params(credentials, nonce).iter())
        .map(|(k, v)| (encode(k), encode(v)))
        .collect();
    pairs.sort();

    let param_string = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let base_string = format!(
        "{}&{}&{}",
        method.as_str(),
        encode(base_url),
        encode(&param_string)
    );
    let signing_key = format!(
        "{}&{}",
        encode(&credentials.consumer_secret),
        encode(&credentials.token_secret)
    );

    let key = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, signing_key.as_bytes());
    STANDARD.encode(hmac::sign(&key, base_string.as_bytes()).as_ref())
}

/// Build the `Authorization: OAuth ...` header value for a request.
pub fn authorization_header(
    credentials: &Credentials,
    method: HttpMethod,
    base_url: &str,
    params: &Params,
    nonce: &Nonce,
) -> String {
    let mut header = oauth_params(credentials, nonce);
    header.insert(
        "oauth_signature".into(),
        signature(credentials, method, base_url, params, nonce),
    );

    let fields = header
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("OAuth {fields}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::params;

    fn reference_credentials() -> Credentials {
        Credentials {
            consumer_key: "xvz1evFS4wEEPTGEFPHBog".to_string(),
            consumer_secret: "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw".to_string(),
            token: "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb".to_string(),
            token_secret: "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE".to_string(),
        }
    }

    fn reference_nonce() -> Nonce {
        Nonce {
            nonce: "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg".to_string(),
            timestamp: 1_318_622_958,
        }
    }

    #[test]
    fn signature_matches_published_reference() {
        let sig = signature(
            &reference_credentials(),
            HttpMethod::Post,
            "https://api.twitter.com/1.1/statuses/update.json",
            &params([
                ("include_entities", "true"),
                ("status", "Hello Ladies + Gentlemen, a signed OAuth request!"),
            ]),
            &reference_nonce(),
        );
        assert_eq!(sig, "hCtSmYh+iHYCEqBWrE7C7hYmtUk=");
    }

    #[test]
    fn authorization_header_has_every_oauth_field() {
        let header = authorization_header(
            &reference_credentials(),
            HttpMethod::Get,
            "https://api.example.com/x.json",
            &Params::new(),
            &reference_nonce(),
        );
        assert!(header.starts_with("OAuth "));
        for field in [
            "oauth_consumer_key=\"xvz1evFS4wEEPTGEFPHBog\"",
            "oauth_nonce=",
            "oauth_signature=",
            "oauth_signature_method=\"HMAC-SHA1\"",
            "oauth_timestamp=\"1318622958\"",
            "oauth_token=",
            "oauth_version=\"1.0\"",
        ] {
            assert!(header.contains(field), "missing {field} in {header}");
        }
    }

    #[test]
    fn generated_nonces_differ() {
        assert_ne!(Nonce::generate().nonce, Nonce::generate().nonce);
    }

    #[test]
    fn debug_redacts_secrets() {
        let rendered = format!("{:?}", reference_credentials());
        assert!(!rendered.contains("kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw"));
        assert!(!rendered.contains("LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE"));
    }
}
