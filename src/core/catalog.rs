//! Product catalog - Creating, editing, retiring and reading products.
//!
//! Every catalog mutation runs in a [`UnitOfWork`] that also journals the change in
//! the product history and records it in the audit trail. Stock is never edited
//! here; `remaining` only moves through orders and inventory adjustments.

use crate::{
    core::{
        audit::{AuditEntry, AuditPolicy, PRODUCT_ENTITY},
        context::ActorContext,
        history::{HistoryEntry, HistoryJournal},
        snapshot::Snapshot,
        unit_of_work::UnitOfWork,
    },
    entities::{AuditAction, HistoryOperation, Product, product, product_history},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Product as returned to callers, with prices as plain numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    /// Product id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Selling price.
    pub price: f64,
    /// Purchase price, when known.
    pub costprice: Option<f64>,
    /// Catalog category, when assigned.
    pub category_id: Option<i64>,
    /// Units in stock.
    pub remaining: i32,
    /// Set while the product is soft deleted.
    pub deleted_at: Option<DateTime<Utc>>,
    /// When the product was created.
    pub created_at: DateTime<Utc>,
    /// When the product last changed.
    pub updated_at: DateTime<Utc>,
}

impl From<product::Model> for ProductView {
    fn from(product: product::Model) -> Self {
        Self {
            id: product.id,
            name: product.name,
            price: product.price.to_f64().unwrap_or_default(),
            costprice: product.costprice.as_ref().and_then(ToPrimitive::to_f64),
            category_id: product.category_id,
            remaining: product.remaining,
            deleted_at: product.deleted_at,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

/// Fields of a new product.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    /// Display name. Must not be blank.
    pub name: String,
    /// Selling price. Must not be negative.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Purchase price, when known.
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub costprice: Option<Decimal>,
    /// Catalog category, when assigned.
    #[serde(default)]
    pub category_id: Option<i64>,
    /// Opening stock. Must not be negative.
    #[serde(default)]
    pub remaining: i32,
}

/// Partial update of a product. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductChanges {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// New selling price.
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    /// New purchase price.
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub costprice: Option<Decimal>,
    /// New catalog category.
    #[serde(default)]
    pub category_id: Option<i64>,
}

fn check_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidProduct {
            message: "Product name cannot be empty".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

fn check_price(field: &str, value: Decimal) -> Result<()> {
    if value < Decimal::ZERO {
        return Err(Error::InvalidProduct {
            message: format!("Product {field} cannot be negative"),
        });
    }
    Ok(())
}

/// Retrieves all products that are not soft deleted, ordered alphabetically by name.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_all_active_products(db: &DatabaseConnection) -> Result<Vec<product::Model>> {
    Product::find()
        .filter(product::Column::DeletedAt.is_null())
        .order_by_asc(product::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a product by id, including soft deleted ones.
///
/// # Errors
/// Returns `ProductNotFound` when no such product exists.
pub async fn get_product_by_id(db: &DatabaseConnection, product_id: i64) -> Result<product::Model> {
    Product::find_by_id(product_id)
        .one(db)
        .await?
        .ok_or(Error::ProductNotFound { product_id })
}

/// History of a product, newest first.
///
/// # Errors
/// Returns `ProductNotFound` when no such product exists.
pub async fn get_product_history(
    db: &DatabaseConnection,
    product_id: i64,
) -> Result<Vec<product_history::Model>> {
    get_product_by_id(db, product_id).await?;
    HistoryJournal::new(db).for_product(product_id).await
}

/// Adds a product to the catalog.
///
/// # Errors
/// Returns `InvalidProduct` for an empty name, a negative price or cost, or a
/// negative initial stock. Database failures roll back every write.
#[instrument(skip(db, actor, new), fields(request_id = %actor.request_id))]
pub async fn create_product(
    db: &DatabaseConnection,
    audit_policy: AuditPolicy,
    actor: &ActorContext,
    new: NewProduct,
) -> Result<product::Model> {
    let name = check_name(&new.name)?;
    check_price("price", new.price)?;
    if let Some(costprice) = new.costprice {
        check_price("costprice", costprice)?;
    }
    if new.remaining < 0 {
        return Err(Error::InvalidProduct {
            message: "Initial stock cannot be negative".to_string(),
        });
    }

    let uow = UnitOfWork::begin(db, audit_policy).await?;
    let outcome = async {
        let now = Utc::now();
        let created = product::ActiveModel {
            name: Set(name),
            price: Set(new.price),
            costprice: Set(new.costprice),
            category_id: Set(new.category_id),
            remaining: Set(new.remaining),
            deleted_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(uow.connection())
        .await?;

        record_change(
            &uow,
            actor,
            &created,
            HistoryChange {
                operation: HistoryOperation::Create,
                action: AuditAction::Create,
                quantity: Some(created.remaining),
                previous: None,
            },
        )
        .await?;
        Ok::<_, Error>(created)
    }
    .await;
    let created = uow.finish(outcome).await?;

    info!(product_id = created.id, "ProductService: product created");
    Ok(created)
}

/// Edits catalog fields of an active product. Stock is not editable here.
///
/// # Errors
/// - `ProductNotFound` when the product is missing or soft deleted
/// - `InvalidProduct` for an empty name or a negative price or cost
#[instrument(skip(db, actor, changes), fields(request_id = %actor.request_id))]
pub async fn update_product(
    db: &DatabaseConnection,
    audit_policy: AuditPolicy,
    actor: &ActorContext,
    product_id: i64,
    changes: ProductChanges,
) -> Result<product::Model> {
    let name = changes.name.as_deref().map(check_name).transpose()?;
    if let Some(price) = changes.price {
        check_price("price", price)?;
    }
    if let Some(costprice) = changes.costprice {
        check_price("costprice", costprice)?;
    }

    let uow = UnitOfWork::begin(db, audit_policy).await?;
    let outcome = async {
        let before = find_active(&uow, product_id).await?;

        let mut active: product::ActiveModel = before.clone().into();
        if let Some(name) = name {
            active.name = Set(name);
        }
        if let Some(price) = changes.price {
            active.price = Set(price);
        }
        if let Some(costprice) = changes.costprice {
            active.costprice = Set(Some(costprice));
        }
        if let Some(category_id) = changes.category_id {
            active.category_id = Set(Some(category_id));
        }
        active.updated_at = Set(Utc::now());
        let after = active.update(uow.connection()).await?;

        record_change(
            &uow,
            actor,
            &after,
            HistoryChange {
                operation: HistoryOperation::Update,
                action: AuditAction::Update,
                quantity: None,
                previous: Some(&before),
            },
        )
        .await?;
        Ok::<_, Error>(after)
    }
    .await;
    let updated = uow.finish(outcome).await?;

    info!(product_id, "ProductService: product updated");
    Ok(updated)
}

/// Soft deletes a product. Its history and order lines are kept.
///
/// # Errors
/// Returns `ProductNotFound` when the product is missing or already deleted.
#[instrument(skip(db, actor), fields(request_id = %actor.request_id))]
pub async fn delete_product(
    db: &DatabaseConnection,
    audit_policy: AuditPolicy,
    actor: &ActorContext,
    product_id: i64,
) -> Result<product::Model> {
    let uow = UnitOfWork::begin(db, audit_policy).await?;
    let outcome = async {
        let before = find_active(&uow, product_id).await?;
        let now = Utc::now();

        let mut active: product::ActiveModel = before.clone().into();
        active.deleted_at = Set(Some(now));
        active.updated_at = Set(now);
        let after = active.update(uow.connection()).await?;

        record_change(
            &uow,
            actor,
            &after,
            HistoryChange {
                operation: HistoryOperation::Delete,
                action: AuditAction::Delete,
                quantity: None,
                previous: Some(&before),
            },
        )
        .await?;
        Ok::<_, Error>(after)
    }
    .await;
    let deleted = uow.finish(outcome).await?;

    info!(product_id, "ProductService: product deleted");
    Ok(deleted)
}

/// Brings a soft deleted product back into the catalog.
///
/// # Errors
/// - `ProductNotFound` when no such product exists
/// - `InvalidProduct` when the product is not deleted
#[instrument(skip(db, actor), fields(request_id = %actor.request_id))]
pub async fn restore_product(
    db: &DatabaseConnection,
    audit_policy: AuditPolicy,
    actor: &ActorContext,
    product_id: i64,
) -> Result<product::Model> {
    let uow = UnitOfWork::begin(db, audit_policy).await?;
    let outcome = async {
        let before = uow
            .products()
            .find(product_id)
            .await?
            .ok_or(Error::ProductNotFound { product_id })?;
        if !before.is_deleted() {
            return Err(Error::InvalidProduct {
                message: format!("Product {product_id} is not deleted"),
            });
        }

        let mut active: product::ActiveModel = before.clone().into();
        active.deleted_at = Set(None);
        active.updated_at = Set(Utc::now());
        let after = active.update(uow.connection()).await?;

        record_change(
            &uow,
            actor,
            &after,
            HistoryChange {
                operation: HistoryOperation::Restore,
                action: AuditAction::Restore,
                quantity: None,
                previous: Some(&before),
            },
        )
        .await?;
        Ok::<_, Error>(after)
    }
    .await;
    let restored = uow.finish(outcome).await?;

    info!(product_id, "ProductService: product restored");
    Ok(restored)
}

async fn find_active(uow: &UnitOfWork, product_id: i64) -> Result<product::Model> {
    uow.products()
        .find(product_id)
        .await?
        .filter(|p| !p.is_deleted())
        .ok_or(Error::ProductNotFound { product_id })
}

struct HistoryChange<'a> {
    operation: HistoryOperation,
    action: AuditAction,
    quantity: Option<i32>,
    previous: Option<&'a product::Model>,
}

async fn record_change(
    uow: &UnitOfWork,
    actor: &ActorContext,
    after: &product::Model,
    change: HistoryChange<'_>,
) -> Result<()> {
    let previous = change.previous.map(Snapshot::from);
    let new = Snapshot::from(after);

    uow.history()
        .append(HistoryEntry {
            product_id: after.id,
            operation: change.operation,
            quantity: change.quantity,
            previous: previous.clone(),
            new: Some(new.clone()),
            change_reason: None,
            actor_id: Some(actor.id),
        })
        .await?;

    let mut entry = AuditEntry::by(actor, change.action, PRODUCT_ENTITY, after.id).new_data(new);
    if let Some(previous) = previous {
        entry = entry.previous(previous);
    }
    uow.audit().record(entry).await?;
    Ok(())
}
