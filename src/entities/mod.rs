//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod audit_log;
pub mod order;
pub mod order_item;
pub mod product;
pub mod product_history;

// Re-export specific types to avoid conflicts
pub use audit_log::{
    ActorType, AuditAction, Column as AuditLogColumn, Entity as AuditLog, Model as AuditLogModel,
};
pub use order::{
    Column as OrderColumn, Entity as Order, Model as OrderModel, OrderStatus, PaymentType,
};
pub use order_item::{Column as OrderItemColumn, Entity as OrderItem, Model as OrderItemModel};
pub use product::{Column as ProductColumn, Entity as Product, Model as ProductModel};
pub use product_history::{
    Column as ProductHistoryColumn, Entity as ProductHistory, HistoryOperation,
    Model as ProductHistoryModel,
};
