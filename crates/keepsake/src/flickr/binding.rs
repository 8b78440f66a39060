//! Flickr as a [`PlatformBinding`].

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::entity::platform_type::PlatformType;
use crate::platform::convert::{i64_at, path, str_at};
use crate::platform::{ApiClient, Params, PlatformError, params};
use crate::sync::{
    CanonicalIdentity, CanonicalItem, FeedKind, ItemError, Normalizer, Page, PageRequest,
    PaginationMode, PlatformBinding,
};

use super::convert::FlickrNormalizer;

pub const PEOPLE_GET_PHOTOS: &str = "flickr.people.getPhotos";
pub const PHOTOS_GET_INFO: &str = "flickr.photos.getInfo";
pub const PHOTOS_GET_SIZES: &str = "flickr.photos.getSizes";
pub const PEOPLE_GET_INFO: &str = "flickr.people.getInfo";
pub const TEST_LOGIN: &str = "flickr.test.login";

/// Extra fields requested on list pages, so a bare entry is still usable.
const LIST_EXTRAS: &str = "date_upload,date_taken,media,views,original_format";

/// Offset-paginated binding over any Flickr [`ApiClient`].
///
/// Each listed photo costs one `getInfo` call (plus `getSizes` for videos),
/// so a page of `per_page` photos makes up to `2 * per_page + 1` requests.
pub struct FlickrBinding<C> {
    client: C,
    username: String,
}

impl<C: ApiClient> FlickrBinding<C> {
    pub fn new(client: C, username: impl Into<String>) -> Self {
        Self {
            client,
            username: username.into(),
        }
    }

    /// Full photo record for one list entry.
    ///
    /// A photo deleted between the list call and this one keeps its list entry.
    async fn enrich(&self, entry: Value) -> Result<Value, PlatformError> {
        let Some(id) = str_at(&entry, "id").map(str::to_string) else {
            return Ok(entry);
        };
        let mut info_params = params([("photo_id", id.as_str())]);
        if let Some(secret) = str_at(&entry, "secret") {
            info_params.insert("secret".into(), secret.to_string());
        }

        let mut photo = match self.client.execute(PHOTOS_GET_INFO, &info_params).await {
            Ok(mut body) => body
                .get_mut("photo")
                .map(Value::take)
                .ok_or_else(|| PlatformError::protocol(format!("{PHOTOS_GET_INFO} without photo")))?,
            Err(PlatformError::NotFound { .. }) => {
                debug!(photo_id = %id, "photo vanished before enrichment");
                return Ok(entry);
            }
            Err(e) => return Err(e),
        };

        if str_at(&photo, "media") == Some("video") {
            let sizes = self
                .client
                .execute(PHOTOS_GET_SIZES, &params([("photo_id", id.as_str())]))
                .await?;
            if let (Some(sizes), Value::Object(map)) = (sizes.get("sizes"), &mut photo) {
                map.insert("sizes".to_string(), sizes.clone());
            }
        }
        Ok(photo)
    }
}

impl<C: ApiClient> Normalizer for FlickrBinding<C> {
    fn platform(&self) -> PlatformType {
        PlatformType::Flickr
    }

    fn normalize_identity(&self, raw: &Value) -> Result<CanonicalIdentity, ItemError> {
        FlickrNormalizer.normalize_identity(raw)
    }

    fn normalize_item(&self, raw: &Value) -> Result<CanonicalItem, ItemError> {
        FlickrNormalizer.normalize_item(raw)
    }
}

#[async_trait]
impl<C: ApiClient> PlatformBinding for FlickrBinding<C> {
    fn pagination(&self) -> PaginationMode {
        PaginationMode::Offset
    }

    fn supports(&self, feed: FeedKind) -> bool {
        feed == FeedKind::Recent
    }

    async fn fetch_page(&self, feed: FeedKind, request: &PageRequest) -> Result<Page, PlatformError> {
        if feed != FeedKind::Recent {
            return Err(PlatformError::protocol(format!(
                "flickr has no {feed} feed for {}",
                self.username
            )));
        }
        let PageRequest::Offset { page, per_page } = *request else {
            return Err(PlatformError::protocol("flickr feeds are offset paginated"));
        };

        let body = self
            .client
            .execute(
                PEOPLE_GET_PHOTOS,
                &params([
                    ("user_id", "me".to_string()),
                    ("page", page.to_string()),
                    ("per_page", per_page.to_string()),
                    ("extras", LIST_EXTRAS.to_string()),
                ]),
            )
            .await?;

        let photos = body
            .get("photos")
            .ok_or_else(|| PlatformError::protocol(format!("{PEOPLE_GET_PHOTOS} without photos")))?;
        let total_pages = i64_at(photos, "pages").and_then(|p| u32::try_from(p).ok());
        let entries = path(photos, &["photo"])
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut records = Vec::with_capacity(entries.len());
        for entry in entries {
            records.push(self.enrich(entry).await?);
        }
        Ok(Page {
            records,
            total_pages,
        })
    }

    fn record_id(&self, raw: &Value) -> Option<i64> {
        i64_at(raw, "id")
    }

    async fn fetch_identity(&self, external_id: &str) -> Result<Value, PlatformError> {
        self.client
            .execute(PEOPLE_GET_INFO, &params([("user_id", external_id)]))
            .await
    }

    async fn fetch_account_identity(&self) -> Result<Value, PlatformError> {
        let login = self.client.execute(TEST_LOGIN, &Params::new()).await?;
        let nsid = path(&login, &["user", "id"])
            .and_then(Value::as_str)
            .ok_or_else(|| PlatformError::protocol(format!("{TEST_LOGIN} without user id")))?
            .to_string();
        self.fetch_identity(&nsid).await
    }
}
