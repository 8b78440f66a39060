//! Media attachment kinds.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// What a media attachment contains.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum MediaKind {
    #[sea_orm(string_value = "photo")]
    Photo,
    #[sea_orm(string_value = "video")]
    Video,
    /// Looping silent video (served as MP4 by the microblogging service).
    #[sea_orm(string_value = "animated_gif")]
    AnimatedGif,
}

impl MediaKind {
    /// Content types a downloaded file of this kind may have.
    pub fn acceptable_content_types(self) -> &'static [&'static str] {
        match self {
            MediaKind::Photo => &["image/jpeg", "image/png", "image/gif", "image/webp"],
            MediaKind::Video | MediaKind::AnimatedGif => &["video/mp4", "video/quicktime"],
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Photo => write!(f, "photo"),
            MediaKind::Video => write!(f, "video"),
            MediaKind::AnimatedGif => write!(f, "animated_gif"),
        }
    }
}
