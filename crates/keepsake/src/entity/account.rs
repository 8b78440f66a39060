//! Account entity - a locally configured identity whose content is archived.
//!
//! An account references the identity it represents on the platform, holds
//! the OAuth credentials used to talk to that platform, and owns the
//! per-feed cursors that make synchronization incremental.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::platform_type::PlatformType;
use crate::oauth1::Credentials;
use crate::sync::FeedKind;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub platform: PlatformType,
    /// Screen name as configured locally. Unique per platform.
    pub username: String,
    /// Identity this account represents, once known.
    pub identity_id: Option<Uuid>,

    // ─── Credentials ─────────────────────────────────────────────────────────
    #[serde(skip_serializing)]
    pub consumer_key: Option<String>,
    #[serde(skip_serializing)]
    pub consumer_secret: Option<String>,
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    #[serde(skip_serializing)]
    pub access_token_secret: Option<String>,

    /// Inactive accounts are skipped by every sync operation.
    #[sea_orm(default_value = true)]
    pub is_active: bool,

    // ─── Cursors ─────────────────────────────────────────────────────────────
    /// Highest external id ingested from the recent-items feed.
    pub last_recent_id: Option<i64>,
    /// Highest external id ingested from the favorites feed.
    pub last_favorite_id: Option<i64>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::identity::Entity",
        from = "Column::IdentityId",
        to = "super::identity::Column::Id",
        on_delete = "SetNull"
    )]
    Identity,
}

impl Related<super::identity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Identity.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// OAuth credentials, if all four parts are configured.
    pub fn credentials(&self) -> Option<Credentials> {
        Some(Credentials {
            consumer_key: self.consumer_key.clone()?,
            consumer_secret: self.consumer_secret.clone()?,
            token: self.access_token.clone()?,
            token_secret: self.access_token_secret.clone()?,
        })
    }

    /// Stored cursor for the given feed.
    pub fn cursor(&self, feed: FeedKind) -> Option<i64> {
        match feed {
            FeedKind::Recent => self.last_recent_id,
            FeedKind::Favorites => self.last_favorite_id,
        }
    }

    /// Human-readable label used in logs and CLI output.
    pub fn label(&self) -> String {
        format!("{}@{}", self.username, self.platform)
    }
}
