//! Coordinator - The use case entry points the route layer calls.
//!
//! Holds only the connection and the audit policy. Each method delegates to its
//! module and logs failures at the level their [`ErrorKind`](crate::errors::ErrorKind)
//! calls for.

use crate::{
    core::{
        audit::{self, AuditEntry, AuditPolicy, STAFF_ENTITY, USER_ENTITY},
        catalog::{self, NewProduct, ProductChanges, ProductView},
        context::{ActorContext, ActorKind},
        inventory::{self, AdjustInventoryRequest, InventoryAdjustment},
        orders::{self, CreateOrderRequest, OrderView},
    },
    entities::{AuditAction, audit_log, product_history},
    errors::Result,
};
use sea_orm::DatabaseConnection;

/// Entry point for every order, inventory and catalog use case.
#[derive(Debug)]
pub struct Coordinator {
    db: DatabaseConnection,
    audit: AuditPolicy,
}

impl Coordinator {
    /// Builds a coordinator over an open connection.
    #[must_use]
    pub const fn new(db: DatabaseConnection, audit: AuditPolicy) -> Self {
        Self { db, audit }
    }

    /// The underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// See [`orders::create_order`].
    pub async fn create_order(
        &self,
        actor: &ActorContext,
        request: CreateOrderRequest,
    ) -> Result<OrderView> {
        orders::create_order(&self.db, self.audit, actor, request)
            .await
            .inspect_err(|e| e.trace("OrderService: create order failed"))
    }

    /// See [`orders::cancel_order`].
    pub async fn cancel_order(&self, actor: &ActorContext, order_id: i64) -> Result<OrderView> {
        orders::cancel_order(&self.db, self.audit, actor, order_id)
            .await
            .inspect_err(|e| e.trace("OrderService: cancel order failed"))
    }

    /// See [`orders::accept_order`].
    pub async fn accept_order(&self, actor: &ActorContext, order_id: i64) -> Result<OrderView> {
        orders::accept_order(&self.db, self.audit, actor, order_id)
            .await
            .inspect_err(|e| e.trace("OrderService: accept order failed"))
    }

    /// See [`orders::get_order`].
    pub async fn get_order(&self, order_id: i64) -> Result<OrderView> {
        orders::get_order(&self.db, order_id)
            .await
            .inspect_err(|e| e.trace("OrderService: get order failed"))
    }

    /// See [`inventory::adjust_inventory`].
    pub async fn adjust_inventory(
        &self,
        actor: &ActorContext,
        request: AdjustInventoryRequest,
    ) -> Result<InventoryAdjustment> {
        inventory::adjust_inventory(&self.db, self.audit, actor, request)
            .await
            .inspect_err(|e| e.trace("InventoryService: adjustment failed"))
    }

    /// See [`catalog::create_product`].
    pub async fn create_product(
        &self,
        actor: &ActorContext,
        new: NewProduct,
    ) -> Result<ProductView> {
        catalog::create_product(&self.db, self.audit, actor, new)
            .await
            .map(Into::into)
            .inspect_err(|e| e.trace("ProductService: create product failed"))
    }

    /// See [`catalog::update_product`].
    pub async fn update_product(
        &self,
        actor: &ActorContext,
        product_id: i64,
        changes: ProductChanges,
    ) -> Result<ProductView> {
        catalog::update_product(&self.db, self.audit, actor, product_id, changes)
            .await
            .map(Into::into)
            .inspect_err(|e| e.trace("ProductService: update product failed"))
    }

    /// See [`catalog::delete_product`].
    pub async fn delete_product(&self, actor: &ActorContext, product_id: i64) -> Result<ProductView> {
        catalog::delete_product(&self.db, self.audit, actor, product_id)
            .await
            .map(Into::into)
            .inspect_err(|e| e.trace("ProductService: delete product failed"))
    }

    /// See [`catalog::restore_product`].
    pub async fn restore_product(
        &self,
        actor: &ActorContext,
        product_id: i64,
    ) -> Result<ProductView> {
        catalog::restore_product(&self.db, self.audit, actor, product_id)
            .await
            .map(Into::into)
            .inspect_err(|e| e.trace("ProductService: restore product failed"))
    }

    /// See [`catalog::get_product_by_id`].
    pub async fn get_product(&self, product_id: i64) -> Result<ProductView> {
        catalog::get_product_by_id(&self.db, product_id)
            .await
            .map(Into::into)
            .inspect_err(|e| e.trace("ProductService: get product failed"))
    }

    /// See [`catalog::get_all_active_products`].
    pub async fn list_active_products(&self) -> Result<Vec<ProductView>> {
        catalog::get_all_active_products(&self.db)
            .await
            .map(|products| products.into_iter().map(Into::into).collect())
            .inspect_err(|e| e.trace("ProductService: list products failed"))
    }

    /// See [`catalog::get_product_history`].
    pub async fn product_history(&self, product_id: i64) -> Result<Vec<product_history::Model>> {
        catalog::get_product_history(&self.db, product_id)
            .await
            .inspect_err(|e| e.trace("ProductService: product history failed"))
    }

    /// Records a successful login for `actor`.
    pub async fn record_login(&self, actor: &ActorContext) -> Result<Option<audit_log::Model>> {
        self.record_session(actor, AuditAction::Login).await
    }

    /// Records a logout for `actor`.
    pub async fn record_logout(&self, actor: &ActorContext) -> Result<Option<audit_log::Model>> {
        self.record_session(actor, AuditAction::Logout).await
    }

    async fn record_session(
        &self,
        actor: &ActorContext,
        action: AuditAction,
    ) -> Result<Option<audit_log::Model>> {
        let entity_type = match actor.kind {
            ActorKind::Staff => STAFF_ENTITY,
            ActorKind::User => USER_ENTITY,
        };
        audit::audit(
            &self.db,
            self.audit,
            AuditEntry::by(actor, action, entity_type, actor.id),
        )
        .await
    }
}
