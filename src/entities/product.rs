//! Product entity - Represents a sellable catalog item and its stock counter.
//!
//! `remaining` is the stock ledger: the single mutable quantity the order and
//! inventory flows protect. It only changes through guarded conditional updates
//! so it never drops below zero. Products are soft deleted via `deleted_at`;
//! a deleted product keeps its history and order references.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name of the product
    pub name: String,
    /// Current selling price; copied into order items at order creation
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub price: Decimal,
    /// Purchase cost, if tracked
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub costprice: Option<Decimal>,
    /// Category reference owned by the catalog layer
    pub category_id: Option<i64>,
    /// Units in stock, never negative
    pub remaining: i32,
    /// Soft delete marker - set when the product is withdrawn from sale
    pub deleted_at: Option<DateTimeUtc>,
    /// When the product was created
    pub created_at: DateTimeUtc,
    /// When the product was last modified
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Whether the product has been soft deleted.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Defines relationships between Product and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One product appears in many order items
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
    /// One product has many history entries
    #[sea_orm(has_many = "super::product_history::Entity")]
    History,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::product_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::History.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
