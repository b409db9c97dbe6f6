//! Product history entity - The append-only journal of product mutations.
//!
//! Rows are inserted in the same transaction as the mutation they describe and
//! are never updated or deleted.

use sea_orm::entity::prelude::*;
use sea_orm::sea_query::StringLen;
use serde::{Deserialize, Serialize};

/// Kind of product mutation recorded in the journal
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryOperation {
    /// Product created
    #[sea_orm(string_value = "CREATE")]
    Create,
    /// Catalog fields changed
    #[sea_orm(string_value = "UPDATE")]
    Update,
    /// Product soft deleted
    #[sea_orm(string_value = "DELETE")]
    Delete,
    /// Soft delete reverted
    #[sea_orm(string_value = "RESTORE")]
    Restore,
    /// Stock increased
    #[sea_orm(string_value = "INVENTORY_ADD")]
    InventoryAdd,
    /// Stock decreased
    #[sea_orm(string_value = "INVENTORY_REMOVE")]
    InventoryRemove,
}

/// Product history database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_history")]
pub struct Model {
    /// Unique identifier for the entry
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Product the entry describes
    pub product_id: i64,
    /// What happened
    pub operation: HistoryOperation,
    /// Stock delta for inventory operations
    pub quantity: Option<i32>,
    /// State before the mutation
    pub previous_data: Option<Json>,
    /// State after the mutation
    pub new_data: Option<Json>,
    /// Human-readable reason
    pub change_reason: Option<String>,
    /// Actor who caused the mutation, if any
    pub actor_id: Option<i64>,
    /// When the entry was written
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `ProductHistory` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each entry belongs to one product
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
