//! Read-only queries for consumers of the archive (viewers, exporters).

use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, JoinType, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait,
};
use uuid::Uuid;

use crate::entity::association::{Column as AssociationColumn, Entity as Association};
use crate::entity::favorite::{Column as FavoriteColumn, Relation as FavoriteRelation};
use crate::entity::item::{Column as ItemColumn, Entity as Item, Model as ItemModel};
use crate::entity::item_kind::ItemKind;
use crate::entity::item_media::Column as ItemMediaColumn;
use crate::entity::label::{Entity as Label, Model as LabelModel};
use crate::entity::media::{Entity as Media, Model as MediaModel};
use crate::entity::platform_type::PlatformType;

use super::errors::Result;

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    /// Page number (0-indexed).
    pub page: u64,
    pub per_page: u64,
}

const MIN_PER_PAGE: u64 = 1;

impl Pagination {
    pub fn new(page: u64, per_page: u64) -> Self {
        Self {
            page,
            per_page: per_page.max(MIN_PER_PAGE),
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(0, 50)
    }
}

#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

// ─── Items ───────────────────────────────────────────────────────────────────

/// Items owned by an identity, newest first.
pub async fn items_by_owner(
    db: &DatabaseConnection,
    owner_id: Uuid,
    pagination: Pagination,
) -> Result<PaginatedResult<ItemModel>> {
    let paginator = Item::find()
        .filter(ItemColumn::OwnerId.eq(owner_id))
        .order_by_desc(ItemColumn::SortId)
        .paginate(db, pagination.per_page);

    let total = paginator.num_items().await?;
    let total_pages = paginator.num_pages().await?;
    let items = paginator.fetch_page(pagination.page).await?;

    Ok(PaginatedResult {
        items,
        total,
        page: pagination.page,
        per_page: pagination.per_page,
        total_pages,
    })
}

pub async fn item_by_external_id(
    db: &DatabaseConnection,
    platform: PlatformType,
    kind: ItemKind,
    external_id: &str,
) -> Result<Option<ItemModel>> {
    super::item::find_by_external_id(db, platform, kind, external_id).await
}

/// Number of stored items for a platform.
pub async fn count_items_by_platform(
    db: &DatabaseConnection,
    platform: PlatformType,
) -> Result<u64> {
    Ok(Item::find()
        .filter(ItemColumn::Platform.eq(platform))
        .count(db)
        .await?)
}

/// Items favorited by an identity, newest item first.
pub async fn favorites_of(
    db: &DatabaseConnection,
    identity_id: Uuid,
    pagination: Pagination,
) -> Result<PaginatedResult<ItemModel>> {
    let paginator = Item::find()
        .join_rev(JoinType::InnerJoin, FavoriteRelation::Item.def())
        .filter(FavoriteColumn::IdentityId.eq(identity_id))
        .order_by_desc(ItemColumn::SortId)
        .paginate(db, pagination.per_page);

    let total = paginator.num_items().await?;
    let total_pages = paginator.num_pages().await?;
    let items = paginator.fetch_page(pagination.page).await?;

    Ok(PaginatedResult {
        items,
        total,
        page: pagination.page,
        per_page: pagination.per_page,
        total_pages,
    })
}

// ─── Item details ────────────────────────────────────────────────────────────

/// Media attached to an item, in attachment order.
pub async fn media_for_item(db: &DatabaseConnection, item: &ItemModel) -> Result<Vec<MediaModel>> {
    Ok(item
        .find_related(Media)
        .order_by_asc(ItemMediaColumn::Position)
        .all(db)
        .await?)
}

/// Labels applied to an item, ordered by slug.
pub async fn labels_for_item(db: &DatabaseConnection, item_id: Uuid) -> Result<Vec<LabelModel>> {
    let rows = Association::find()
        .filter(AssociationColumn::ItemId.eq(item_id))
        .find_also_related(Label)
        .all(db)
        .await?;
    let mut labels: Vec<LabelModel> = rows.into_iter().filter_map(|(_, label)| label).collect();
    labels.sort_by(|a, b| a.slug.cmp(&b.slug));
    labels.dedup_by(|a, b| a.id == b.id);
    Ok(labels)
}
