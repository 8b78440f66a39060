//! Common re-exports for convenient entity usage.

pub use super::account::{
    ActiveModel as AccountActiveModel, Column as AccountColumn, Entity as Account,
    Model as AccountModel,
};
pub use super::association::{
    ActiveModel as AssociationActiveModel, Column as AssociationColumn, Entity as Association,
    Model as AssociationModel,
};
pub use super::favorite::{
    ActiveModel as FavoriteActiveModel, Column as FavoriteColumn, Entity as Favorite,
    Model as FavoriteModel,
};
pub use super::identity::{
    ActiveModel as IdentityActiveModel, Column as IdentityColumn, Entity as Identity,
    Model as IdentityModel,
};
pub use super::item::{
    ActiveModel as ItemActiveModel, Column as ItemColumn, Entity as Item, Model as ItemModel,
};
pub use super::item_kind::ItemKind;
pub use super::item_media::{
    ActiveModel as ItemMediaActiveModel, Column as ItemMediaColumn, Entity as ItemMedia,
    Model as ItemMediaModel,
};
pub use super::label::{
    ActiveModel as LabelActiveModel, Column as LabelColumn, Entity as Label, Model as LabelModel,
};
pub use super::media::{
    ActiveModel as MediaActiveModel, Column as MediaColumn, Entity as Media, Model as MediaModel,
};
pub use super::media_kind::MediaKind;
pub use super::platform_type::PlatformType;
