//! Order entity - The order aggregate root.
//!
//! An order is owned by exactly one of a staff member or an end user. It is
//! created `NEW` and may move once, to `ACCEPTED` or `CANCELLED`; both are terminal.

use sea_orm::entity::prelude::*;
use sea_orm::sea_query::StringLen;
use serde::{Deserialize, Serialize};

/// Lifecycle state of an order
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Freshly placed, stock already decremented
    #[sea_orm(string_value = "NEW")]
    New,
    /// Accepted by staff
    #[sea_orm(string_value = "ACCEPTED")]
    Accepted,
    /// Cancelled by its owner, stock restored
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

/// How the order is paid
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    /// Paid in cash
    #[sea_orm(string_value = "CASH")]
    Cash,
    /// Paid by card
    #[sea_orm(string_value = "CREDIT_CARD")]
    CreditCard,
}

/// Order database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    /// Unique identifier for the order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Current lifecycle state
    pub status: OrderStatus,
    /// Owning staff member, mutually exclusive with `user_id`
    pub staff_id: Option<i64>,
    /// Owning end user, mutually exclusive with `staff_id`
    pub user_id: Option<i64>,
    /// Payment method chosen at checkout
    pub payment_type: PaymentType,
    /// Free-form data attached by the caller
    pub data: Option<Json>,
    /// When the order was placed
    pub created_at: DateTimeUtc,
    /// When the order last changed state
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Order and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One order has many line items
    #[sea_orm(has_many = "super::order_item::Entity")]
    Items,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
