//! Association entity - a label applied to an item by a specific author.
//!
//! Associations are reconciled against the platform: local rows that no
//! longer appear remotely are deleted.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "associations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub item_id: Uuid,
    pub label_id: Uuid,
    /// Identity that applied the label.
    pub author_id: Uuid,
    /// Platform-assigned identifier. Unique per item.
    pub external_id: String,
    /// Label exactly as the author wrote it.
    pub raw_value: String,
    #[sea_orm(default_value = false)]
    pub is_machine_tag: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::ItemId",
        to = "super::item::Column::Id",
        on_delete = "Cascade"
    )]
    Item,
    #[sea_orm(
        belongs_to = "super::label::Entity",
        from = "Column::LabelId",
        to = "super::label::Column::Id",
        on_delete = "Cascade"
    )]
    Label,
    #[sea_orm(
        belongs_to = "super::identity::Entity",
        from = "Column::AuthorId",
        to = "super::identity::Column::Id",
        on_delete = "Cascade"
    )]
    Author,
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl Related<super::label::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Label.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
