//! SeaORM entity definitions for the archive schema.

pub mod account;
pub mod association;
pub mod favorite;
pub mod identity;
pub mod item;
pub mod item_kind;
pub mod item_media;
pub mod label;
pub mod media;
pub mod media_kind;
pub mod platform_type;
pub mod prelude;
