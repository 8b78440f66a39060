//! Kinds of archived content.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The kind of a canonical item. Together with the platform it forms the
/// namespace in which an item's `external_id` is unique.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum ItemKind {
    /// A microblog post.
    #[sea_orm(string_value = "tweet")]
    Tweet,
    /// A photo or video on a photo host.
    #[sea_orm(string_value = "photo")]
    Photo,
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemKind::Tweet => write!(f, "tweet"),
            ItemKind::Photo => write!(f, "photo"),
        }
    }
}
