use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, Set, TransactionTrait,
};
use tracing::debug;
use uuid::Uuid;

use crate::entity::identity::{ActiveModel, Column, Entity as Identity, Model};
use crate::entity::item::{Column as ItemColumn, Entity as Item};
use crate::entity::platform_type::PlatformType;

use super::errors::{RepositoryError, Result, is_unique_violation};
use super::{Upserted, required_active_value};

pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Model>> {
    Ok(Identity::find_by_id(id).one(db).await?)
}

pub async fn find_by_external_id<C: ConnectionTrait>(
    db: &C,
    platform: PlatformType,
    external_id: &str,
) -> Result<Option<Model>> {
    let mut rows = Identity::find()
        .filter(Column::Platform.eq(platform))
        .filter(Column::ExternalId.eq(external_id))
        .all(db)
        .await?;
    match rows.len() {
        0 | 1 => Ok(rows.pop()),
        _ => Err(RepositoryError::duplicate("identity", platform, external_id)),
    }
}

/// Insert or update an identity by (platform, external_id).
///
/// When `is_private` is set, the flag is copied onto every item the identity
/// owns whose flag differs, in the same transaction.
pub async fn upsert(db: &DatabaseConnection, model: ActiveModel) -> Result<Upserted<Model>> {
    let platform = required_active_value("platform", &model.platform)?;
    let external_id = required_active_value("external_id", &model.external_id)?;
    let privacy = match &model.is_private {
        ActiveValue::Set(flag) => Some(*flag),
        _ => None,
    };

    let txn = db.begin().await?;
    let existing = find_by_external_id(&txn, platform, &external_id).await?;

    let upserted = match existing {
        Some(existing) => {
            let mut update_model = model;
            update_model.id = Set(existing.id);
            let stored = update_model.update(&txn).await?;
            Upserted {
                model: stored,
                created: false,
            }
        }
        None => {
            let mut insert_model = model;
            if insert_model.id.is_not_set() {
                insert_model.id = Set(Uuid::new_v4());
            }
            let stored = insert_model.insert(&txn).await.map_err(|e| {
                if is_unique_violation(&e) {
                    RepositoryError::duplicate("identity", platform, external_id.clone())
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

    if let Some(is_private) = privacy {
        let cascaded = cascade_privacy(&txn, upserted.model.id, is_private).await?;
        if cascaded > 0 {
            debug!(
                identity = %upserted.model.username,
                is_private,
                items = cascaded,
                "Cascaded identity privacy to owned items"
            );
        }
    }

    txn.commit().await?;
    Ok(upserted)
}

/// Set `is_private` on every item owned by `identity_id` that disagrees with it.
async fn cascade_privacy<C: ConnectionTrait>(
    db: &C,
    identity_id: Uuid,
    is_private: bool,
) -> Result<u64> {
    let result = Item::update_many()
        .col_expr(ItemColumn::IsPrivate, Expr::value(is_private))
        .filter(ItemColumn::OwnerId.eq(identity_id))
        .filter(ItemColumn::IsPrivate.ne(is_private))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

pub async fn set_avatar_path(db: &DatabaseConnection, id: Uuid, path: &str) -> Result<()> {
    Identity::update_many()
        .col_expr(Column::AvatarPath, Expr::value(path))
        .filter(Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(())
}
