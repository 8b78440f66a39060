use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, Set};
use uuid::Uuid;

use crate::entity::favorite::{ActiveModel, Column, Entity as Favorite};

use super::errors::Result;

/// Record that `identity_id` favorited `item_id`. Returns whether a new row
/// was written; an existing favorite is left untouched.
pub async fn add(db: &DatabaseConnection, identity_id: Uuid, item_id: Uuid) -> Result<bool> {
    let model = ActiveModel {
        identity_id: Set(identity_id),
        item_id: Set(item_id),
        created_at: Set(Utc::now().fixed_offset()),
    };
    let rows = Favorite::insert(model)
        .on_conflict(
            OnConflict::columns([Column::IdentityId, Column::ItemId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(rows > 0)
}
