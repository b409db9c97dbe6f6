//! Manual inventory adjustment - Staff-driven stock corrections.

use crate::{
    core::{
        audit::{AuditEntry, AuditPolicy, PRODUCT_ENTITY},
        catalog::ProductView,
        context::ActorContext,
        history::HistoryEntry,
        ledger::StockLedger,
        snapshot::Snapshot,
        unit_of_work::UnitOfWork,
    },
    entities::{AuditAction, HistoryOperation, product_history},
    errors::{Error, Result},
};
use sea_orm::{ActiveEnum, DatabaseConnection};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Stock correction requested by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustInventoryRequest {
    /// Product whose stock changes.
    pub product_id: i64,
    /// `INVENTORY_ADD` or `INVENTORY_REMOVE`
    pub operation: HistoryOperation,
    /// Units to add or remove. Must be positive.
    pub quantity: i32,
    /// Free-text reason stored on the history row.
    #[serde(default)]
    pub change_reason: Option<String>,
}

/// Outcome of an adjustment: the product after the change and the journal row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryAdjustment {
    /// The product after the change.
    pub product: ProductView,
    /// Journal row recording the change.
    pub history_entry: product_history::Model,
}

/// Adds or removes stock for one product.
///
/// # Errors
/// - `InvalidOperation` unless the operation is `INVENTORY_ADD` or `INVENTORY_REMOVE`
/// - `InvalidQuantity` for a non-positive quantity
/// - `ProductNotFound`, `CannotAdjustDeletedProduct`
/// - `InsufficientStockForProduct` when a removal exceeds the stock on hand
/// - `StockLimitExceeded` when an addition would push the stock past `i32::MAX`
#[instrument(skip(db, actor, request), fields(request_id = %actor.request_id))]
pub async fn adjust_inventory(
    db: &DatabaseConnection,
    audit_policy: AuditPolicy,
    actor: &ActorContext,
    request: AdjustInventoryRequest,
) -> Result<InventoryAdjustment> {
    let AdjustInventoryRequest {
        product_id,
        operation,
        quantity,
        change_reason,
    } = request;

    if !matches!(
        operation,
        HistoryOperation::InventoryAdd | HistoryOperation::InventoryRemove
    ) {
        return Err(Error::InvalidOperation {
            operation: operation.to_value(),
        });
    }
    if quantity <= 0 {
        return Err(Error::InvalidQuantity { quantity });
    }

    let product = StockLedger::new(db)
        .find(product_id)
        .await?
        .ok_or(Error::ProductNotFound { product_id })?;
    if product.is_deleted() {
        return Err(Error::CannotAdjustDeletedProduct { product_id });
    }
    if operation == HistoryOperation::InventoryAdd
        && product.remaining.checked_add(quantity).is_none()
    {
        return Err(Error::StockLimitExceeded {
            product_id,
            requested: quantity,
            remaining: product.remaining,
        });
    }
    if operation == HistoryOperation::InventoryRemove && product.remaining < quantity {
        return Err(Error::InsufficientStockForProduct {
            product_id,
            requested: quantity,
            available: product.remaining,
        });
    }

    let uow = UnitOfWork::begin(db, audit_policy).await?;
    let outcome = apply(&uow, actor, product_id, operation, quantity, change_reason).await;
    let adjustment = uow.finish(outcome).await?;

    info!(
        product_id,
        ?operation,
        quantity,
        remaining = adjustment.product.remaining,
        "InventoryService: stock adjusted"
    );
    Ok(adjustment)
}

async fn apply(
    uow: &UnitOfWork,
    actor: &ActorContext,
    product_id: i64,
    operation: HistoryOperation,
    quantity: i32,
    change_reason: Option<String>,
) -> Result<InventoryAdjustment> {
    let ledger = uow.products();
    let movement = if operation == HistoryOperation::InventoryAdd {
        ledger.increment(product_id, quantity).await?
    } else {
        ledger.decrement(product_id, quantity).await?
    };

    let Some(movement) = movement else {
        // Lost a race since the precheck: re-read inside the transaction.
        let current = ledger
            .find(product_id)
            .await?
            .ok_or(Error::ProductNotFound { product_id })?;
        if current.is_deleted() {
            return Err(Error::CannotAdjustDeletedProduct { product_id });
        }
        if operation == HistoryOperation::InventoryAdd {
            return Err(Error::StockLimitExceeded {
                product_id,
                requested: quantity,
                remaining: current.remaining,
            });
        }
        return Err(Error::InsufficientStockForProduct {
            product_id,
            requested: quantity,
            available: current.remaining,
        });
    };

    let history_entry = uow
        .history()
        .append(HistoryEntry::inventory(
            operation,
            quantity,
            &movement,
            change_reason,
            Some(actor.id),
        ))
        .await?;

    let mut before = movement.product.clone();
    before.remaining = movement.before;
    uow.audit()
        .record(
            AuditEntry::by(actor, AuditAction::InventoryAdjust, PRODUCT_ENTITY, product_id)
                .previous(Snapshot::from(&before))
                .new_data(Snapshot::from(&movement.product)),
        )
        .await?;

    Ok(InventoryAdjustment {
        product: movement.product.into(),
        history_entry,
    })
}
