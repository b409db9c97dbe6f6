//! Audit log entity - Entity-agnostic record of business actions.
//!
//! One row per business action, independent of the product history journal.
//! `entity_type` is a free string (`"order"`, `"product"`, `"staff"`) so any part
//! of the system can write here.

use sea_orm::entity::prelude::*;
use sea_orm::sea_query::StringLen;
use serde::{Deserialize, Serialize};

/// Kind of actor behind an audited action
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorType {
    /// Back-office staff member
    #[sea_orm(string_value = "STAFF")]
    Staff,
    /// End user
    #[sea_orm(string_value = "USER")]
    User,
    /// No authenticated actor
    #[sea_orm(string_value = "SYSTEM")]
    System,
}

/// Business-level action
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// Entity created
    #[sea_orm(string_value = "CREATE")]
    Create,
    /// Entity changed
    #[sea_orm(string_value = "UPDATE")]
    Update,
    /// Entity soft deleted
    #[sea_orm(string_value = "DELETE")]
    Delete,
    /// Soft delete reverted
    #[sea_orm(string_value = "RESTORE")]
    Restore,
    /// Manual stock correction
    #[sea_orm(string_value = "INVENTORY_ADJUST")]
    InventoryAdjust,
    /// Order moved between lifecycle states
    #[sea_orm(string_value = "ORDER_STATUS_CHANGE")]
    OrderStatusChange,
    /// Role or permission assignment changed
    #[sea_orm(string_value = "PERMISSION_CHANGE")]
    PermissionChange,
    /// Session opened
    #[sea_orm(string_value = "LOGIN")]
    Login,
    /// Session closed
    #[sea_orm(string_value = "LOGOUT")]
    Logout,
}

/// Audit log database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "audit_logs")]
pub struct Model {
    /// Unique identifier for the entry
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Request that caused the action
    pub request_id: String,
    /// Acting staff member or user; `None` for system actions
    pub actor_id: Option<i64>,
    /// Kind of actor
    pub actor_type: ActorType,
    /// Kind of entity acted upon (`"order"`, `"product"`, ...)
    pub entity_type: String,
    /// Identifier of the entity acted upon
    pub entity_id: Option<i64>,
    /// What was done
    pub action: AuditAction,
    /// Entity state before the action
    pub previous_data: Option<Json>,
    /// Entity state after the action
    pub new_data: Option<Json>,
    /// Caller IP address, if known
    pub ip_address: Option<String>,
    /// Caller user agent, if known
    pub user_agent: Option<String>,
    /// When the action was recorded
    pub created_at: DateTimeUtc,
}

/// `AuditLog` rows outlive the entities they describe and carry no foreign keys
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
