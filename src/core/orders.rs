//! Order lifecycle - Creating, cancelling and accepting orders.
//!
//! Creation validates stock up front (no transaction is opened for a request that
//! cannot be served), then writes the order, decrements stock, journals each
//! decrement and audits the order inside one [`UnitOfWork`]. Cancellation reverses
//! the stock effect for every line whose product is still in the catalog.

use crate::{
    core::{
        audit::{AuditEntry, AuditPolicy, ORDER_ENTITY},
        context::{ActorContext, ActorKind},
        history::HistoryEntry,
        order_store::{NewOrderLine, OrderStore},
        snapshot::Snapshot,
        unit_of_work::UnitOfWork,
        validator::{self, StockRequest, ValidatedProducts},
    },
    entities::{AuditAction, HistoryOperation, OrderStatus, PaymentType, order, order_item},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use sea_orm::{DatabaseConnection, prelude::Json};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// A line as submitted by the caller.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    /// Product being ordered.
    pub product_id: i64,
    /// Units ordered. Must be positive.
    pub quantity: i32,
    /// Price the client saw. Informational only; the catalog price is charged.
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    /// Opaque line data stored as given.
    #[serde(default)]
    pub data: Option<Json>,
}

/// Order placement request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    /// How the order is paid.
    pub payment_type: PaymentType,
    /// Lines in submission order. Must not be empty.
    pub items: Vec<OrderLineRequest>,
    /// Opaque order data stored as given.
    #[serde(default)]
    pub data: Option<Json>,
}

/// Order line as returned to callers, with the price as a plain number.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemView {
    /// Line id.
    pub id: i64,
    /// Product the line refers to.
    pub product_id: i64,
    /// Units on the line.
    pub quantity: i32,
    /// Catalog unit price captured when the order was placed.
    pub price: f64,
    /// Line data as submitted.
    pub data: Option<Json>,
}

impl From<order_item::Model> for OrderItemView {
    fn from(item: order_item::Model) -> Self {
        Self {
            id: item.id,
            product_id: item.product_id,
            quantity: item.quantity,
            price: item.price.to_f64().unwrap_or_default(),
            data: item.data,
        }
    }
}

/// Order with its lines as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    /// Order id.
    pub id: i64,
    /// Current lifecycle status.
    pub status: OrderStatus,
    /// Owning staff member, when placed by staff.
    pub staff_id: Option<i64>,
    /// Owning user, when placed by an end user.
    pub user_id: Option<i64>,
    /// How the order is paid.
    pub payment_type: PaymentType,
    /// Order data as submitted.
    pub data: Option<Json>,
    /// When the order was placed.
    pub created_at: DateTime<Utc>,
    /// When the order last changed status.
    pub updated_at: DateTime<Utc>,
    /// Lines in insertion order.
    pub items: Vec<OrderItemView>,
}

impl OrderView {
    fn new(order: order::Model, items: Vec<order_item::Model>) -> Self {
        Self {
            id: order.id,
            status: order.status,
            staff_id: order.staff_id,
            user_id: order.user_id,
            payment_type: order.payment_type,
            data: order.data,
            created_at: order.created_at,
            updated_at: order.updated_at,
            items: items.into_iter().map(Into::into).collect(),
        }
    }
}

/// Places an order owned by `actor`.
///
/// # Errors
/// - `ProductsNotFound` listing every unknown or deleted product
/// - `InsufficientStock` listing every product that cannot cover its quantity
/// - `EmptyOrder` / `InvalidQuantity` for malformed requests
/// - `Database` when any write fails; nothing is committed in that case
#[instrument(skip(db, actor, request), fields(request_id = %actor.request_id))]
pub async fn create_order(
    db: &DatabaseConnection,
    audit_policy: AuditPolicy,
    actor: &ActorContext,
    request: CreateOrderRequest,
) -> Result<OrderView> {
    let demand: Vec<StockRequest> = request
        .items
        .iter()
        .map(|line| StockRequest {
            product_id: line.product_id,
            quantity: line.quantity,
        })
        .collect();
    let products = validator::validate_stock(db, &demand).await?;

    let uow = UnitOfWork::begin(db, audit_policy).await?;
    let outcome = place_order(&uow, actor, request, &products).await;
    let view = uow.finish(outcome).await?;

    info!(
        order_id = view.id,
        lines = view.items.len(),
        "OrderService: order created"
    );
    Ok(view)
}

async fn place_order(
    uow: &UnitOfWork,
    actor: &ActorContext,
    request: CreateOrderRequest,
    products: &ValidatedProducts,
) -> Result<OrderView> {
    let lines = request
        .items
        .into_iter()
        .map(|line| snapshot_price(line, products))
        .collect::<Result<Vec<_>>>()?;

    let (order, items) = uow
        .orders()
        .insert(actor.owner(), request.payment_type, request.data, lines)
        .await?;

    let reason = format!("Order #{} created", order.id);
    for item in &items {
        let Some(movement) = uow.products().decrement(item.product_id, item.quantity).await? else {
            let shortage = uow
                .products()
                .shortfall(item.product_id, item.quantity)
                .await?;
            return Err(Error::InsufficientStock {
                details: vec![shortage],
            });
        };
        uow.history()
            .append(HistoryEntry::inventory(
                HistoryOperation::InventoryRemove,
                item.quantity,
                &movement,
                Some(reason.clone()),
                Some(actor.id),
            ))
            .await?;
    }

    uow.audit()
        .record(
            AuditEntry::by(actor, AuditAction::Create, ORDER_ENTITY, order.id)
                .new_data(Snapshot::from(&order)),
        )
        .await?;

    Ok(OrderView::new(order, items))
}

fn snapshot_price(line: OrderLineRequest, products: &ValidatedProducts) -> Result<NewOrderLine> {
    let product = products
        .get(&line.product_id)
        .ok_or_else(|| Error::ProductsNotFound {
            missing_ids: vec![line.product_id],
        })?;
    if let Some(quoted) = line.price
        && quoted != product.price
    {
        debug!(
            product_id = product.id,
            %quoted,
            charged = %product.price,
            "OrderService: client price ignored"
        );
    }
    Ok(NewOrderLine {
        product_id: line.product_id,
        quantity: line.quantity,
        price: product.price,
        data: line.data,
    })
}

/// Cancels a `NEW` order on behalf of its owner and restores its stock.
///
/// Lines whose product has since been soft deleted are left alone: no stock is
/// restored and no history is written for them.
///
/// # Errors
/// - `OrderNotFound`
/// - `Forbidden` when `actor` does not own the order
/// - `InvalidTransition` when the order is not `NEW`, including when a concurrent
///   transition wins the race
/// - `StockLimitExceeded` when restoring a line would push its stock past `i32::MAX`
#[instrument(skip(db, actor), fields(request_id = %actor.request_id))]
pub async fn cancel_order(
    db: &DatabaseConnection,
    audit_policy: AuditPolicy,
    actor: &ActorContext,
    order_id: i64,
) -> Result<OrderView> {
    let order = OrderStore::new(db)
        .find(order_id)
        .await?
        .ok_or(Error::OrderNotFound { order_id })?;

    if !actor.owns(&order) {
        return Err(Error::Forbidden {
            reason: format!("Order {order_id} belongs to another owner"),
        });
    }
    if order.status != OrderStatus::New {
        return Err(Error::invalid_transition("Only NEW orders can be cancelled"));
    }

    let uow = UnitOfWork::begin(db, audit_policy).await?;
    let outcome = revert_order(&uow, actor, &order).await;
    let view = uow.finish(outcome).await?;

    info!(order_id, "OrderService: order cancelled");
    Ok(view)
}

async fn revert_order(
    uow: &UnitOfWork,
    actor: &ActorContext,
    order: &order::Model,
) -> Result<OrderView> {
    let cancelled = uow
        .orders()
        .transition(order.id, OrderStatus::New, OrderStatus::Cancelled)
        .await?
        .ok_or_else(|| Error::invalid_transition("Only NEW orders can be cancelled"))?;

    let items = uow.orders().items(order.id).await?;
    let reason = format!("Order #{} cancelled", order.id);
    for item in &items {
        match uow.products().increment(item.product_id, item.quantity).await? {
            Some(movement) => {
                uow.history()
                    .append(HistoryEntry::inventory(
                        HistoryOperation::InventoryAdd,
                        item.quantity,
                        &movement,
                        Some(reason.clone()),
                        Some(actor.id),
                    ))
                    .await?;
            }
            None => match uow.products().find(item.product_id).await? {
                Some(current) if !current.is_deleted() => {
                    return Err(Error::StockLimitExceeded {
                        product_id: item.product_id,
                        requested: item.quantity,
                        remaining: current.remaining,
                    });
                }
                _ => debug!(
                    order_id = order.id,
                    product_id = item.product_id,
                    "OrderService: stock not restored for deleted product"
                ),
            },
        }
    }

    uow.audit()
        .record(
            AuditEntry::by(actor, AuditAction::OrderStatusChange, ORDER_ENTITY, order.id)
                .previous(Snapshot::from(order))
                .new_data(Snapshot::from(&cancelled)),
        )
        .await?;

    Ok(OrderView::new(cancelled, items))
}

/// Accepts a `NEW` order. Only staff may accept; stock is untouched.
///
/// # Errors
/// - `OrderNotFound`
/// - `Forbidden` when `actor` is not staff
/// - `InvalidTransition` when the order is not `NEW`
#[instrument(skip(db, actor), fields(request_id = %actor.request_id))]
pub async fn accept_order(
    db: &DatabaseConnection,
    audit_policy: AuditPolicy,
    actor: &ActorContext,
    order_id: i64,
) -> Result<OrderView> {
    let order = OrderStore::new(db)
        .find(order_id)
        .await?
        .ok_or(Error::OrderNotFound { order_id })?;

    if actor.kind != ActorKind::Staff {
        return Err(Error::Forbidden {
            reason: "Only staff can accept orders".to_string(),
        });
    }
    if order.status != OrderStatus::New {
        return Err(Error::invalid_transition("Only NEW orders can be accepted"));
    }

    let uow = UnitOfWork::begin(db, audit_policy).await?;
    let outcome = approve_order(&uow, actor, &order).await;
    let view = uow.finish(outcome).await?;

    info!(order_id, "OrderService: order accepted");
    Ok(view)
}

async fn approve_order(
    uow: &UnitOfWork,
    actor: &ActorContext,
    order: &order::Model,
) -> Result<OrderView> {
    let accepted = uow
        .orders()
        .transition(order.id, OrderStatus::New, OrderStatus::Accepted)
        .await?
        .ok_or_else(|| Error::invalid_transition("Only NEW orders can be accepted"))?;

    uow.audit()
        .record(
            AuditEntry::by(actor, AuditAction::OrderStatusChange, ORDER_ENTITY, order.id)
                .previous(Snapshot::from(order))
                .new_data(Snapshot::from(&accepted)),
        )
        .await?;

    let items = uow.orders().items(order.id).await?;
    Ok(OrderView::new(accepted, items))
}

/// Reads an order with its lines.
///
/// # Errors
/// Returns `OrderNotFound` when no such order exists.
pub async fn get_order(db: &DatabaseConnection, order_id: i64) -> Result<OrderView> {
    let store = OrderStore::new(db);
    let order = store
        .find(order_id)
        .await?
        .ok_or(Error::OrderNotFound { order_id })?;
    let items = store.items(order_id).await?;
    Ok(OrderView::new(order, items))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    #![allow(clippy::panic)]
    use super::*;
    use crate::core::ledger::StockLedger;
    use crate::entities::{AuditLog, OrderItem, ProductHistory, audit_log, product_history};
    use crate::test_utils::*;
    use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
    use serde_json::json;

    fn line(product_id: i64, quantity: i32) -> OrderLineRequest {
        OrderLineRequest {
            product_id,
            quantity,
            price: None,
            data: None,
        }
    }

    fn cash_order(items: Vec<OrderLineRequest>) -> CreateOrderRequest {
        CreateOrderRequest {
            payment_type: PaymentType::Cash,
            items,
            data: None,
        }
    }

    async fn history_rows(
        db: &DatabaseConnection,
        operation: HistoryOperation,
    ) -> Result<Vec<product_history::Model>> {
        Ok(ProductHistory::find()
            .filter(product_history::Column::Operation.eq(operation))
            .all(db)
            .await?)
    }

    async fn audit_rows(
        db: &DatabaseConnection,
        action: AuditAction,
    ) -> Result<Vec<audit_log::Model>> {
        Ok(AuditLog::find()
            .filter(audit_log::Column::Action.eq(action))
            .all(db)
            .await?)
    }

    #[tokio::test]
    async fn test_create_order_consumes_stock() -> Result<()> {
        let db = setup_test_db().await?;
        let product = seed_custom_product(&db, "Kettle", Decimal::new(100, 0), 10).await?;
        let actor = user_actor(42);

        let mut request = cash_order(vec![line(product.id, 10)]);
        request.items[0].price = Some(Decimal::new(100, 0));
        let order = create_order(&db, AuditPolicy::default(), &actor, request).await?;

        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(order.user_id, Some(42));
        assert_eq!(order.staff_id, None);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].price, 100.0);
        assert_eq!(remaining_of(&db, product.id).await?, 0);

        let removed = history_rows(&db, HistoryOperation::InventoryRemove).await?;
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].quantity, Some(10));
        assert_eq!(removed[0].previous_data, Some(json!({ "remaining": 10 })));
        assert_eq!(removed[0].new_data, Some(json!({ "remaining": 0 })));
        assert_eq!(
            removed[0].change_reason,
            Some(format!("Order #{} created", order.id))
        );

        let created = audit_rows(&db, AuditAction::Create).await?;
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].entity_type, "order");
        assert_eq!(created[0].entity_id, Some(order.id));
        assert_eq!(created[0].request_id, actor.request_id);
        let snapshot = created[0].new_data.clone().unwrap();
        assert_eq!(snapshot["status"], json!("NEW"));
        assert_eq!(snapshot["paymentType"], json!("CASH"));
        assert!(snapshot.get("items").is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_price_is_taken_from_catalog() -> Result<()> {
        let db = setup_test_db().await?;
        let product = seed_custom_product(&db, "Kettle", Decimal::new(2500, 2), 3).await?;

        let mut request = cash_order(vec![line(product.id, 1)]);
        request.items[0].price = Some(Decimal::new(1, 0));
        let order = create_order(&db, AuditPolicy::default(), &user_actor(1), request).await?;

        assert_eq!(order.items[0].price, 25.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_insufficient_stock_writes_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        let product = seed_product(&db, "Kettle", 1).await?;

        let result = create_order(
            &db,
            AuditPolicy::default(),
            &user_actor(1),
            cash_order(vec![line(product.id, 10)]),
        )
        .await;

        let Err(Error::InsufficientStock { details }) = result else {
            panic!("expected InsufficientStock");
        };
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].product_id, product.id);
        assert_eq!(details[0].requested, 10);
        assert_eq!(details[0].available, 1);

        assert_eq!(remaining_of(&db, product.id).await?, 1);
        assert_eq!(crate::entities::Order::find().count(&db).await?, 0);
        assert_eq!(ProductHistory::find().count(&db).await?, 0);
        assert_eq!(AuditLog::find().count(&db).await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_every_short_product_is_reported() -> Result<()> {
        let db = setup_test_db().await?;
        let p1 = seed_product(&db, "P1", 1).await?;
        let p2 = seed_product(&db, "P2", 1).await?;

        let result = create_order(
            &db,
            AuditPolicy::default(),
            &user_actor(1),
            cash_order(vec![line(p1.id, 5), line(p2.id, 5)]),
        )
        .await;

        let Err(Error::InsufficientStock { details }) = result else {
            panic!("expected InsufficientStock");
        };
        let ids: Vec<i64> = details.iter().map(|d| d.product_id).collect();
        assert_eq!(ids, vec![p1.id, p2.id]);

        Ok(())
    }

    #[tokio::test]
    async fn test_exact_stock_succeeds_one_more_fails() -> Result<()> {
        let db = setup_test_db().await?;
        let a = seed_product(&db, "A", 4).await?;
        let b = seed_product(&db, "B", 4).await?;

        create_order(
            &db,
            AuditPolicy::default(),
            &user_actor(1),
            cash_order(vec![line(a.id, 4)]),
        )
        .await?;
        assert_eq!(remaining_of(&db, a.id).await?, 0);

        let result = create_order(
            &db,
            AuditPolicy::default(),
            &user_actor(1),
            cash_order(vec![line(b.id, 5)]),
        )
        .await;
        assert!(matches!(result, Err(Error::InsufficientStock { .. })));
        assert_eq!(remaining_of(&db, b.id).await?, 4);

        Ok(())
    }

    #[tokio::test]
    async fn test_deleted_product_cannot_be_ordered() -> Result<()> {
        let db = setup_test_db().await?;
        let product = seed_product(&db, "Old", 5).await?;
        soft_delete(&db, product.id).await?;

        let result = create_order(
            &db,
            AuditPolicy::default(),
            &user_actor(1),
            cash_order(vec![line(product.id, 1)]),
        )
        .await;

        let Err(Error::ProductsNotFound { missing_ids }) = result else {
            panic!("expected ProductsNotFound");
        };
        assert_eq!(missing_ids, vec![product.id]);
        Ok(())
    }

    #[tokio::test]
    async fn test_mid_transaction_failure_rolls_everything_back() -> Result<()> {
        let db = setup_test_db().await?;
        let first = seed_product(&db, "First", 5).await?;
        let second = seed_product(&db, "Second", 5).await?;
        fail_history_for(&db, second.id).await?;

        let result = create_order(
            &db,
            AuditPolicy::default(),
            &user_actor(1),
            cash_order(vec![line(first.id, 2), line(second.id, 2)]),
        )
        .await;
        assert!(matches!(result, Err(Error::Database(_))));

        assert_eq!(remaining_of(&db, first.id).await?, 5);
        assert_eq!(remaining_of(&db, second.id).await?, 5);
        assert_eq!(crate::entities::Order::find().count(&db).await?, 0);
        assert_eq!(crate::entities::OrderItem::find().count(&db).await?, 0);
        assert_eq!(ProductHistory::find().count(&db).await?, 0);
        assert_eq!(AuditLog::find().count(&db).await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_audit_failure_does_not_block_order() -> Result<()> {
        let db = setup_test_db().await?;
        let product = seed_product(&db, "Kettle", 3).await?;
        fail_inserts_into(&db, "audit_logs").await?;

        let order = create_order(
            &db,
            AuditPolicy::default(),
            &user_actor(1),
            cash_order(vec![line(product.id, 1)]),
        )
        .await?;

        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(remaining_of(&db, product.id).await?, 2);
        assert_eq!(AuditLog::find().count(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_strict_audit_failure_rolls_back_order() -> Result<()> {
        let db = setup_test_db().await?;
        let product = seed_product(&db, "Kettle", 3).await?;
        fail_inserts_into(&db, "audit_logs").await?;

        let result = create_order(
            &db,
            AuditPolicy { strict: true },
            &user_actor(1),
            cash_order(vec![line(product.id, 1)]),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(remaining_of(&db, product.id).await?, 3);
        assert_eq!(crate::entities::Order::find().count(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_restores_stock() -> Result<()> {
        let db = setup_test_db().await?;
        let product = seed_custom_product(&db, "Kettle", Decimal::new(100, 0), 10).await?;
        let actor = user_actor(42);
        let order = create_order(
            &db,
            AuditPolicy::default(),
            &actor,
            cash_order(vec![line(product.id, 10)]),
        )
        .await?;

        let cancelled = cancel_order(&db, AuditPolicy::default(), &actor, order.id).await?;

        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(remaining_of(&db, product.id).await?, 10);

        let added = history_rows(&db, HistoryOperation::InventoryAdd).await?;
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].quantity, Some(10));
        assert_eq!(added[0].previous_data, Some(json!({ "remaining": 0 })));
        assert_eq!(added[0].new_data, Some(json!({ "remaining": 10 })));

        let changes = audit_rows(&db, AuditAction::OrderStatusChange).await?;
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].previous_data.clone().unwrap()["status"], json!("NEW"));
        assert_eq!(
            changes[0].new_data.clone().unwrap()["status"],
            json!("CANCELLED")
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_succeeds_exactly_once() -> Result<()> {
        let db = setup_test_db().await?;
        let product = seed_product(&db, "Kettle", 5).await?;
        let actor = staff_actor();
        let order = create_order(
            &db,
            AuditPolicy::default(),
            &actor,
            cash_order(vec![line(product.id, 2)]),
        )
        .await?;

        cancel_order(&db, AuditPolicy::default(), &actor, order.id).await?;
        let again = cancel_order(&db, AuditPolicy::default(), &actor, order.id).await;

        let Err(Error::InvalidTransition { message }) = again else {
            panic!("expected InvalidTransition");
        };
        assert_eq!(message, "Only NEW orders can be cancelled");
        assert_eq!(remaining_of(&db, product.id).await?, 5);
        assert_eq!(history_rows(&db, HistoryOperation::InventoryAdd).await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_by_other_user_is_forbidden() -> Result<()> {
        let db = setup_test_db().await?;
        let product = seed_product(&db, "Kettle", 5).await?;
        let order = create_order(
            &db,
            AuditPolicy::default(),
            &user_actor(1),
            cash_order(vec![line(product.id, 2)]),
        )
        .await?;

        let result = cancel_order(&db, AuditPolicy::default(), &user_actor(2), order.id).await;
        assert!(matches!(result, Err(Error::Forbidden { .. })));

        assert_eq!(get_order(&db, order.id).await?.status, OrderStatus::New);
        assert_eq!(remaining_of(&db, product.id).await?, 3);
        assert!(audit_rows(&db, AuditAction::OrderStatusChange).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_missing_order() -> Result<()> {
        let db = setup_test_db().await?;
        let result = cancel_order(&db, AuditPolicy::default(), &user_actor(1), 404).await;
        assert!(matches!(result, Err(Error::OrderNotFound { order_id: 404 })));
        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_skips_deleted_products() -> Result<()> {
        let db = setup_test_db().await?;
        let kept = seed_product(&db, "Kept", 5).await?;
        let retired = seed_product(&db, "Retired", 5).await?;
        let actor = user_actor(8);
        let order = create_order(
            &db,
            AuditPolicy::default(),
            &actor,
            cash_order(vec![line(kept.id, 2), line(retired.id, 3)]),
        )
        .await?;
        soft_delete(&db, retired.id).await?;

        cancel_order(&db, AuditPolicy::default(), &actor, order.id).await?;

        assert_eq!(remaining_of(&db, kept.id).await?, 5);
        assert_eq!(remaining_of(&db, retired.id).await?, 2);
        let added = history_rows(&db, HistoryOperation::InventoryAdd).await?;
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].product_id, kept.id);

        Ok(())
    }

    #[tokio::test]
    async fn test_accept_requires_staff_and_new_status() -> Result<()> {
        let db = setup_test_db().await?;
        let product = seed_product(&db, "Kettle", 5).await?;
        let owner = user_actor(3);
        let order = create_order(
            &db,
            AuditPolicy::default(),
            &owner,
            cash_order(vec![line(product.id, 1)]),
        )
        .await?;

        let by_user = accept_order(&db, AuditPolicy::default(), &owner, order.id).await;
        assert!(matches!(by_user, Err(Error::Forbidden { .. })));

        let accepted = accept_order(&db, AuditPolicy::default(), &staff_actor(), order.id).await?;
        assert_eq!(accepted.status, OrderStatus::Accepted);
        assert_eq!(accepted.items.len(), 1);
        assert_eq!(remaining_of(&db, product.id).await?, 4);

        let cancel = cancel_order(&db, AuditPolicy::default(), &owner, order.id).await;
        assert!(matches!(cancel, Err(Error::InvalidTransition { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_stock_sold_after_validation_rolls_back_order() -> Result<()> {
        let db = setup_test_db().await?;
        let product = seed_product(&db, "Kettle", 3).await?;
        let demand = [StockRequest {
            product_id: product.id,
            quantity: 3,
        }];
        let products = validator::validate_stock(&db, &demand).await?;

        // A concurrent sale lands between validation and the transaction.
        StockLedger::new(&db).decrement(product.id, 2).await?;

        let uow = UnitOfWork::begin(&db, AuditPolicy::default()).await?;
        let outcome = place_order(
            &uow,
            &user_actor(1),
            cash_order(vec![line(product.id, 3)]),
            &products,
        )
        .await;
        let Err(Error::InsufficientStock { details }) = uow.finish(outcome).await else {
            panic!("expected InsufficientStock");
        };
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].product_id, product.id);
        assert_eq!(details[0].requested, 3);
        assert_eq!(details[0].available, 1);

        assert_eq!(remaining_of(&db, product.id).await?, 1);
        assert_eq!(crate::entities::Order::find().count(&db).await?, 0);
        assert_eq!(OrderItem::find().count(&db).await?, 0);
        assert_eq!(ProductHistory::find().count(&db).await?, 0);
        assert_eq!(AuditLog::find().count(&db).await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_losing_status_race_is_invalid_transition() -> Result<()> {
        let db = setup_test_db().await?;
        let product = seed_product(&db, "Kettle", 5).await?;
        let actor = user_actor(4);
        let created = create_order(
            &db,
            AuditPolicy::default(),
            &actor,
            cash_order(vec![line(product.id, 2)]),
        )
        .await?;
        let order = OrderStore::new(&db).find(created.id).await?.unwrap();

        // Staff accepts the order after the owner's read.
        OrderStore::new(&db)
            .transition(order.id, OrderStatus::New, OrderStatus::Accepted)
            .await?
            .unwrap();

        let uow = UnitOfWork::begin(&db, AuditPolicy::default()).await?;
        let outcome = revert_order(&uow, &actor, &order).await;
        let result = uow.finish(outcome).await;
        assert!(matches!(result, Err(Error::InvalidTransition { .. })));

        assert_eq!(remaining_of(&db, product.id).await?, 3);
        assert!(history_rows(&db, HistoryOperation::InventoryAdd).await?.is_empty());
        assert!(audit_rows(&db, AuditAction::OrderStatusChange).await?.is_empty());
        let stored = OrderStore::new(&db).find(order.id).await?.unwrap();
        assert_eq!(stored.status, OrderStatus::Accepted);

        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_past_stock_limit_keeps_order_new() -> Result<()> {
        let db = setup_test_db().await?;
        let product = seed_product(&db, "Salt", 1).await?;
        let actor = user_actor(6);
        let order = create_order(
            &db,
            AuditPolicy::default(),
            &actor,
            cash_order(vec![line(product.id, 1)]),
        )
        .await?;
        StockLedger::new(&db).increment(product.id, i32::MAX).await?;

        let result = cancel_order(&db, AuditPolicy::default(), &actor, order.id).await;

        assert!(matches!(
            result,
            Err(Error::StockLimitExceeded { requested: 1, .. })
        ));
        assert_eq!(remaining_of(&db, product.id).await?, i32::MAX);
        let stored = OrderStore::new(&db).find(order.id).await?.unwrap();
        assert_eq!(stored.status, OrderStatus::New);

        Ok(())
    }
}
