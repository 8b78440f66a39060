use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entity::item_media::{
    ActiveModel as ItemMediaActiveModel, Column as ItemMediaColumn, Entity as ItemMedia,
};
use crate::entity::media::{ActiveModel, Column, Entity as Media, Model};
use crate::entity::platform_type::PlatformType;

use super::errors::{RepositoryError, Result, is_unique_violation};
use super::{Upserted, required_active_value};

pub async fn find_by_external_id<C: ConnectionTrait>(
    db: &C,
    platform: PlatformType,
    external_id: &str,
) -> Result<Option<Model>> {
    let mut rows = Media::find()
        .filter(Column::Platform.eq(platform))
        .filter(Column::ExternalId.eq(external_id))
        .all(db)
        .await?;
    match rows.len() {
        0 | 1 => Ok(rows.pop()),
        _ => Err(RepositoryError::duplicate("media", platform, external_id)),
    }
}

/// Insert or update a media row by (platform, external_id).
pub async fn upsert(db: &DatabaseConnection, model: ActiveModel) -> Result<Upserted<Model>> {
    let platform = required_active_value("platform", &model.platform)?;
    let external_id = required_active_value("external_id", &model.external_id)?;

    let txn = db.begin().await?;
    let mut model = model;
    let upserted = match find_by_external_id(&txn, platform, &external_id).await? {
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
                    RepositoryError::duplicate("media", platform, external_id.clone())
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

/// Replace the ordered set of media attached to an item.
pub async fn attach(db: &DatabaseConnection, item_id: Uuid, media_ids: &[Uuid]) -> Result<()> {
    let txn = db.begin().await?;
    ItemMedia::delete_many()
        .filter(ItemMediaColumn::ItemId.eq(item_id))
        .exec(&txn)
        .await?;

    let rows: Vec<ItemMediaActiveModel> = media_ids
        .iter()
        .enumerate()
        .map(|(position, media_id)| ItemMediaActiveModel {
            item_id: Set(item_id),
            media_id: Set(*media_id),
            position: Set(i32::try_from(position).unwrap_or(i32::MAX)),
        })
        .collect();
    if !rows.is_empty() {
        ItemMedia::insert_many(rows)
            .exec_without_returning(&txn)
            .await?;
    }
    txn.commit().await?;
    Ok(())
}

pub async fn set_local_path(db: &DatabaseConnection, id: Uuid, path: &str) -> Result<()> {
    Media::update_many()
        .col_expr(Column::LocalPath, Expr::value(path))
        .filter(Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(())
}

#[cfg(all(test, feature = "sqlite", feature = "migrate"))]
mod tests {
    use chrono::Utc;
    use sea_orm::QueryOrder;
    use serde_json::json;

    use super::*;
    use crate::connect_and_migrate;
    use crate::entity::media_kind::MediaKind;

    fn photo(external_id: &str) -> ActiveModel {
        ActiveModel {
            platform: Set(PlatformType::Twitter),
            kind: Set(MediaKind::Photo),
            external_id: Set(external_id.to_string()),
            url: Set(format!("https://pbs.example/{external_id}.jpg")),
            url_parts: Set(json!({"base": format!("https://pbs.example/{external_id}.jpg")})),
            fetch_time: Set(Utc::now().fixed_offset()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn upsert_dedupes_by_external_id() {
        let db = connect_and_migrate("sqlite::memory:").await.unwrap();
        let first = upsert(&db, photo("m1")).await.unwrap();
        let mut again = photo("m1");
        again.width = Set(Some(640));
        let second = upsert(&db, again).await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.model.id, second.model.id);
        assert_eq!(second.model.width, Some(640));
    }

    #[tokio::test]
    async fn set_local_path_updates_row() {
        let db = connect_and_migrate("sqlite::memory:").await.unwrap();
        let stored = upsert(&db, photo("m1")).await.unwrap().model;
        set_local_path(&db, stored.id, "/tmp/m1.jpg").await.unwrap();

        let reloaded = find_by_external_id(&db, PlatformType::Twitter, "m1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.local_path.as_deref(), Some("/tmp/m1.jpg"));

        let links = ItemMedia::find()
            .order_by_asc(ItemMediaColumn::Position)
            .all(&db)
            .await
            .unwrap();
        assert!(links.is_empty());
    }
}
