//! Item entity - a canonical piece of archived content (a post or a photo).
//!
//! An item is owned by exactly one identity. Its privacy always mirrors the
//! owner's. Items may reference other items (a quote or a reshare), which are
//! stored as rows of their own.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::item_kind::ItemKind;
use crate::entity::platform_type::PlatformType;

/// Item model. Holds floating-point coordinates, so it is `PartialEq` only.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    // ─── Identity ────────────────────────────────────────────────────────────
    pub platform: PlatformType,
    pub kind: ItemKind,
    /// Platform-assigned identifier. Unique per (platform, kind).
    pub external_id: String,
    /// Numeric form of `external_id`, used for cursor comparisons.
    pub sort_id: i64,
    pub owner_id: Uuid,

    // ─── Content ─────────────────────────────────────────────────────────────
    pub title: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub text: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub permalink: Option<String>,
    /// Posting client, with any markup stripped.
    pub source: Option<String>,
    pub language: Option<String>,
    /// Original media type for photo-host items (`photo` or `video`).
    pub media_type: Option<String>,

    // ─── Place ───────────────────────────────────────────────────────────────
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub place_name: Option<String>,

    // ─── Threading ───────────────────────────────────────────────────────────
    pub in_reply_to_external_id: Option<String>,
    pub in_reply_to_username: Option<String>,
    pub quoted_item_id: Option<Uuid>,
    pub reshared_item_id: Option<Uuid>,

    // ─── Counts ──────────────────────────────────────────────────────────────
    pub favorite_count: Option<i32>,
    pub reshare_count: Option<i32>,
    pub comment_count: Option<i32>,
    pub view_count: Option<i32>,

    /// Mirrors the owner's privacy.
    #[sea_orm(default_value = false)]
    pub is_private: bool,

    /// When the item was posted (or uploaded) on the platform.
    pub post_time: Option<DateTimeWithTimeZone>,
    /// When a photo was taken, per its metadata.
    pub taken_time: Option<DateTimeWithTimeZone>,
    /// When this copy was last retrieved from the platform.
    pub fetch_time: DateTimeWithTimeZone,

    /// Verbatim platform payload, kept for reprocessing.
    #[sea_orm(column_type = "Json", nullable)]
    pub raw: Option<Json>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::identity::Entity",
        from = "Column::OwnerId",
        to = "super::identity::Column::Id",
        on_delete = "Cascade"
    )]
    Owner,
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::QuotedItemId",
        to = "Column::Id",
        on_delete = "SetNull"
    )]
    QuotedItem,
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ResharedItemId",
        to = "Column::Id",
        on_delete = "SetNull"
    )]
    ResharedItem,
    #[sea_orm(has_many = "super::association::Entity")]
    Associations,
    #[sea_orm(has_many = "super::item_media::Entity")]
    ItemMedia,
}

impl Related<super::identity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::association::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Associations.def()
    }
}

impl Related<super::media::Entity> for Entity {
    fn to() -> RelationDef {
        super::item_media::Relation::Media.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::item_media::Relation::Item.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether this item was posted in reply to another.
    pub fn is_reply(&self) -> bool {
        self.in_reply_to_external_id.is_some()
    }
}
