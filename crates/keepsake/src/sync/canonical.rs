//! Platform-independent shapes produced by normalizers.
//!
//! Field sets are carried as sparse SeaORM active models: a field left
//! `NotSet` by the normalizer is not written on update, so a payload that
//! omits an optional field never erases a previously stored value.

use sea_orm::ActiveValue;

use crate::entity::identity::ActiveModel as IdentityActiveModel;
use crate::entity::item::ActiveModel as ItemActiveModel;
use crate::entity::item_kind::ItemKind;
use crate::entity::media::ActiveModel as MediaActiveModel;
use crate::entity::media_kind::MediaKind;

/// A normalized identity payload.
#[derive(Debug, Clone)]
pub struct CanonicalIdentity {
    pub external_id: String,
    pub fields: IdentityActiveModel,
}

impl CanonicalIdentity {
    /// Avatar URL carried by the payload, if any.
    pub fn avatar_url(&self) -> Option<&str> {
        match &self.fields.avatar_url {
            ActiveValue::Set(Some(url)) | ActiveValue::Unchanged(Some(url)) => Some(url),
            _ => None,
        }
    }
}

/// How a record names its owner.
#[derive(Debug, Clone)]
pub enum OwnerRef {
    /// Full identity payload embedded in the record.
    Inline(CanonicalIdentity),
    /// Only the external id; the identity must be fetched or already stored.
    ById(String),
}

impl OwnerRef {
    pub fn external_id(&self) -> &str {
        match self {
            OwnerRef::Inline(identity) => &identity.external_id,
            OwnerRef::ById(id) => id,
        }
    }
}

/// A normalized media attachment.
#[derive(Debug, Clone)]
pub struct CanonicalMedia {
    pub external_id: String,
    pub kind: MediaKind,
    pub fields: MediaActiveModel,
}

/// One remote relationship (a tag) attached to an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAssociation {
    /// Platform id of the relationship itself.
    pub external_id: String,
    /// Identity that applied the tag.
    pub author_external_id: String,
    /// Tag text as the author typed it.
    pub raw_value: String,
    pub is_machine_tag: bool,
}

/// A normalized item with its nested sub-entities.
///
/// `media` and `tags` are `None` when the payload says nothing about them,
/// in which case stored attachments and associations are left alone.
#[derive(Debug, Clone)]
pub struct CanonicalItem {
    pub external_id: String,
    pub kind: ItemKind,
    pub owner: OwnerRef,
    pub fields: ItemActiveModel,
    pub media: Option<Vec<CanonicalMedia>>,
    pub tags: Option<Vec<RemoteAssociation>>,
    pub quoted: Option<Box<CanonicalItem>>,
    pub reshared: Option<Box<CanonicalItem>>,
}

impl CanonicalItem {
    /// Key used by per-run memos.
    pub fn key(&self) -> (ItemKind, String) {
        (self.kind, self.external_id.clone())
    }
}
