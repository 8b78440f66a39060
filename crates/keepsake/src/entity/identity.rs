//! Identity entity - a remote person or account on a platform.
//!
//! Identities are created on demand while items are synchronized: every item
//! owner and every association author is an identity. `external_id` is
//! unique within a platform.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::platform_type::PlatformType;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "identities")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub platform: PlatformType,
    /// Platform-assigned identifier (numeric id or NSID).
    pub external_id: String,

    // ─── Profile ─────────────────────────────────────────────────────────────
    pub username: String,
    pub display_name: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub location: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub url: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub avatar_url: Option<String>,
    /// Local copy of the avatar, once downloaded.
    #[sea_orm(column_type = "Text", nullable)]
    pub avatar_path: Option<String>,

    /// Whether the identity's content is private. Cascades to every item it owns.
    #[sea_orm(default_value = false)]
    pub is_private: bool,
    #[sea_orm(default_value = false)]
    pub is_verified: bool,

    // ─── Counts ──────────────────────────────────────────────────────────────
    pub followers_count: Option<i32>,
    pub following_count: Option<i32>,
    pub items_count: Option<i32>,

    /// When the identity joined the platform.
    pub post_time: Option<DateTimeWithTimeZone>,

    /// Raw platform payload, kept for fields not mapped above.
    #[sea_orm(column_type = "Json", nullable)]
    pub raw: Option<Json>,

    /// When this copy was last retrieved from the platform.
    pub fetch_time: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::item::Entity")]
    Items,
    #[sea_orm(has_many = "super::account::Entity")]
    Accounts,
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Display name if set, otherwise the username.
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}
