//! Twitter as a [`PlatformBinding`].

use async_trait::async_trait;
use serde_json::Value;

use crate::entity::platform_type::PlatformType;
use crate::platform::convert::i64_at;
use crate::platform::{ApiClient, Params, PlatformError};
use crate::sync::{
    CanonicalIdentity, CanonicalItem, FeedKind, ItemError, Normalizer, Page, PageRequest,
    PaginationMode, PlatformBinding,
};

use super::convert::TwitterNormalizer;

pub const USER_TIMELINE: &str = "statuses/user_timeline";
pub const FAVORITES_LIST: &str = "favorites/list";
pub const USERS_SHOW: &str = "users/show";
pub const VERIFY_CREDENTIALS: &str = "account/verify_credentials";

/// Id-window binding over any Twitter [`ApiClient`].
pub struct TwitterBinding<C> {
    client: C,
    screen_name: String,
}

impl<C: ApiClient> TwitterBinding<C> {
    pub fn new(client: C, screen_name: impl Into<String>) -> Self {
        Self {
            client,
            screen_name: screen_name.into(),
        }
    }

    fn feed_params(&self, request: &PageRequest) -> Result<Params, PlatformError> {
        let PageRequest::Window {
            count,
            max_id,
            since_id,
        } = *request
        else {
            return Err(PlatformError::protocol("twitter feeds are id-window paginated"));
        };

        let mut params = Params::new();
        params.insert("screen_name".into(), self.screen_name.clone());
        params.insert("count".into(), count.to_string());
        params.insert("tweet_mode".into(), "extended".into());
        params.insert("include_entities".into(), "true".into());
        if let Some(max_id) = max_id {
            params.insert("max_id".into(), max_id.to_string());
        }
        if let Some(since_id) = since_id {
            params.insert("since_id".into(), since_id.to_string());
        }
        Ok(params)
    }
}

impl<C: ApiClient> Normalizer for TwitterBinding<C> {
    fn platform(&self) -> PlatformType {
        PlatformType::Twitter
    }

    fn normalize_identity(&self, raw: &Value) -> Result<CanonicalIdentity, ItemError> {
        TwitterNormalizer.normalize_identity(raw)
    }

    fn normalize_item(&self, raw: &Value) -> Result<CanonicalItem, ItemError> {
        TwitterNormalizer.normalize_item(raw)
    }
}

#[async_trait]
impl<C: ApiClient> PlatformBinding for TwitterBinding<C> {
    fn pagination(&self) -> PaginationMode {
        PaginationMode::IdWindow
    }

    fn supports(&self, _feed: FeedKind) -> bool {
        true
    }

    async fn fetch_page(&self, feed: FeedKind, request: &PageRequest) -> Result<Page, PlatformError> {
        let mut params = self.feed_params(request)?;
        let endpoint = match feed {
            FeedKind::Recent => {
                params.insert("include_rts".into(), "true".into());
                USER_TIMELINE
            }
            FeedKind::Favorites => FAVORITES_LIST,
        };

        match self.client.execute(endpoint, &params).await? {
            Value::Array(records) => Ok(Page {
                records,
                total_pages: None,
            }),
            other => Err(PlatformError::protocol(format!(
                "{endpoint} returned {} instead of an array",
                json_kind(&other)
            ))),
        }
    }

    fn record_id(&self, raw: &Value) -> Option<i64> {
        i64_at(raw, "id_str").or_else(|| i64_at(raw, "id"))
    }

    async fn fetch_identity(&self, external_id: &str) -> Result<Value, PlatformError> {
        let params = crate::platform::params([
            ("user_id", external_id),
            ("include_entities", "true"),
        ]);
        self.client.execute(USERS_SHOW, &params).await
    }

    async fn fetch_account_identity(&self) -> Result<Value, PlatformError> {
        let params = crate::platform::params([("skip_status", "true")]);
        self.client.execute(VERIFY_CREDENTIALS, &params).await
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
