//! Platform type enum for type-safe platform handling.
//!
//! Every stored row carries the platform it was synchronized from. External
//! identifiers are only unique within a platform namespace.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Supported third-party platforms.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum PlatformType {
    /// Microblogging service (id-window pagination).
    #[sea_orm(string_value = "twitter")]
    Twitter,
    /// Photo host (offset/page-count pagination).
    #[sea_orm(string_value = "flickr")]
    Flickr,
}

impl std::fmt::Display for PlatformType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformType::Twitter => write!(f, "twitter"),
            PlatformType::Flickr => write!(f, "flickr"),
        }
    }
}

impl std::str::FromStr for PlatformType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "twitter" | "x" => Ok(PlatformType::Twitter),
            "flickr" => Ok(PlatformType::Flickr),
            _ => Err(format!("Unknown platform type: {}", s)),
        }
    }
}
