use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entity::item::{ActiveModel, Column, Entity as Item, Model};
use crate::entity::item_kind::ItemKind;
use crate::entity::platform_type::PlatformType;

use super::errors::{RepositoryError, Result, is_unique_violation};
use super::{Upserted, identity, required_active_value};

pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Model>> {
    Ok(Item::find_by_id(id).one(db).await?)
}

/// Look up an item by its natural key. More than one match is a
/// [`RepositoryError::Duplicate`], never a silent pick.
pub async fn find_by_external_id<C: ConnectionTrait>(
    db: &C,
    platform: PlatformType,
    kind: ItemKind,
    external_id: &str,
) -> Result<Option<Model>> {
    let mut rows = Item::find()
        .filter(Column::Platform.eq(platform))
        .filter(Column::Kind.eq(kind))
        .filter(Column::ExternalId.eq(external_id))
        .all(db)
        .await?;
    match rows.len() {
        0 | 1 => Ok(rows.pop()),
        _ => Err(RepositoryError::duplicate("item", platform, external_id)),
    }
}

/// Insert or update an item by (platform, kind, external_id).
///
/// Only fields that are `Set` are written on update. `is_private` is always
/// taken from the owning identity, whatever the caller passed.
pub async fn upsert(db: &DatabaseConnection, model: ActiveModel) -> Result<Upserted<Model>> {
    let platform = required_active_value("platform", &model.platform)?;
    let kind = required_active_value("kind", &model.kind)?;
    let external_id = required_active_value("external_id", &model.external_id)?;
    let owner_id = required_active_value("owner_id", &model.owner_id)?;

    let txn = db.begin().await?;

    let owner = identity::find_by_id(&txn, owner_id)
        .await?
        .ok_or_else(|| RepositoryError::not_found_by_id("identity", owner_id))?;

    let mut model = model;
    model.is_private = Set(owner.is_private);

    let upserted = match find_by_external_id(&txn, platform, kind, &external_id).await? {
        Some(existing) => {
            model.id = Set(existing.id);
            Upserted {
                model: model.update(&txn).await?,
                created: false,
            }
        }
        None => {
            if model.id.is_not_set() {
                model.id = Set(Uuid::new_v4());
            }
            let stored = model.insert(&txn).await.map_err(|e| {
                if is_unique_violation(&e) {
                    RepositoryError::duplicate("item", platform, external_id.clone())
                } else {
                    e.into()
                }
            })?;
            Upserted {
                model: stored,
                created: true,
            }
        }
    };

    txn.commit().await?;
    Ok(upserted)
}
