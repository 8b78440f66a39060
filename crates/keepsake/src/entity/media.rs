//! Media entity - a photo or video attached to one or more items.
//!
//! Media are deduplicated by external id within a platform. URLs for the
//! different size variants are derived from `url_parts`; local copies made
//! by a media fetcher are recorded in `local_path`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::media_kind::MediaKind;
use crate::entity::platform_type::PlatformType;
use crate::media::{SizeVariant, sizes};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "media")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub platform: PlatformType,
    pub kind: MediaKind,
    /// Platform-assigned identifier. Unique per platform.
    pub external_id: String,

    /// Best-quality URL known at sync time.
    #[sea_orm(column_type = "Text")]
    pub url: String,
    /// Components used to build size-variant URLs (server, secret, base url).
    #[sea_orm(column_type = "Json")]
    pub url_parts: Json,
    /// Video renditions as `[{"url", "content_type", "bitrate"}]`.
    #[sea_orm(column_type = "Json", nullable)]
    pub video_variants: Option<Json>,

    pub width: Option<i32>,
    pub height: Option<i32>,
    pub duration_ms: Option<i64>,
    pub alt_text: Option<String>,

    /// Where the media fetcher stored the file, if it did.
    #[sea_orm(column_type = "Text", nullable)]
    pub local_path: Option<String>,

    #[sea_orm(column_type = "Json", nullable)]
    pub raw: Option<Json>,
    pub fetch_time: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::item_media::Entity")]
    ItemMedia,
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        super::item_media::Relation::Item.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::item_media::Relation::Media.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// URL for the requested size variant, if the platform offers it.
    pub fn url_for(&self, size: SizeVariant) -> Option<String> {
        sizes::variant_url(self.platform, &self.url_parts, size)
    }

    /// Highest-bitrate MP4 rendition, for videos.
    pub fn best_video_url(&self) -> Option<String> {
        let variants = self.video_variants.as_ref()?.as_array()?;
        variants
            .iter()
            .filter(|v| v.get("content_type").and_then(|c| c.as_str()) == Some("video/mp4"))
            .max_by_key(|v| v.get("bitrate").and_then(|b| b.as_i64()).unwrap_or(0))
            .and_then(|v| v.get("url").and_then(|u| u.as_str()))
            .map(str::to_string)
    }
}
