use std::collections::BTreeSet;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect,
};
use uuid::Uuid;

use crate::entity::association::{ActiveModel, Column, Entity as Association, Model};

use super::errors::Result;

/// External ids of the associations currently stored for an item.
pub async fn external_ids(db: &DatabaseConnection, item_id: Uuid) -> Result<BTreeSet<String>> {
    let ids: Vec<String> = Association::find()
        .select_only()
        .column(Column::ExternalId)
        .filter(Column::ItemId.eq(item_id))
        .into_tuple()
        .all(db)
        .await?;
    Ok(ids.into_iter().collect())
}

pub async fn insert(db: &DatabaseConnection, model: ActiveModel) -> Result<Model> {
    Ok(model.insert(db).await?)
}

/// Delete the listed associations of an item. Returns rows deleted.
pub async fn delete_by_external_ids(
    db: &DatabaseConnection,
    item_id: Uuid,
    external_ids: &BTreeSet<String>,
) -> Result<u64> {
    if external_ids.is_empty() {
        return Ok(0);
    }
    let result = Association::delete_many()
        .filter(Column::ItemId.eq(item_id))
        .filter(Column::ExternalId.is_in(external_ids.iter().cloned()))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}
