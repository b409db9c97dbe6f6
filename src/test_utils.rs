//! Shared test utilities for `stockroom`.
//!
//! Helpers for setting up an in-memory database, seeding products with sensible
//! defaults, building actors, and forcing writes to fail.

use crate::{
    core::{context::ActorContext, ledger::StockLedger},
    entities::{Product, product},
    errors::{Error, Result},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, Set};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Inserts a product directly, without history or audit rows.
///
/// # Defaults
/// * price: 10
pub async fn seed_product(
    db: &DatabaseConnection,
    name: &str,
    remaining: i32,
) -> Result<product::Model> {
    seed_custom_product(db, name, Decimal::new(10, 0), remaining).await
}

/// Inserts a product with a custom price.
pub async fn seed_custom_product(
    db: &DatabaseConnection,
    name: &str,
    price: Decimal,
    remaining: i32,
) -> Result<product::Model> {
    let now = Utc::now();
    product::ActiveModel {
        name: Set(name.to_string()),
        price: Set(price),
        costprice: Set(None),
        category_id: Set(None),
        remaining: Set(remaining),
        deleted_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Marks a product deleted without history or audit rows.
pub async fn soft_delete(db: &DatabaseConnection, product_id: i64) -> Result<()> {
    let product = Product::find_by_id(product_id)
        .one(db)
        .await?
        .ok_or(Error::ProductNotFound { product_id })?;
    let mut active: product::ActiveModel = product.into();
    active.deleted_at = Set(Some(Utc::now()));
    active.update(db).await?;
    Ok(())
}

/// Current stock of a product.
pub async fn remaining_of(db: &DatabaseConnection, product_id: i64) -> Result<i32> {
    StockLedger::new(db)
        .find(product_id)
        .await?
        .map(|p| p.remaining)
        .ok_or(Error::ProductNotFound { product_id })
}

/// Staff actor with id 1.
pub fn staff_actor() -> ActorContext {
    ActorContext::staff(1, "req-staff")
}

/// End-user actor with the given id.
pub fn user_actor(id: i64) -> ActorContext {
    ActorContext::user(id, format!("req-user-{id}"))
}

/// Makes every insert into `table` abort.
pub async fn fail_inserts_into(db: &DatabaseConnection, table: &str) -> Result<()> {
    db.execute_unprepared(&format!(
        "CREATE TRIGGER fail_{table}_insert BEFORE INSERT ON {table} \
         BEGIN SELECT RAISE(ABORT, 'forced failure'); END;"
    ))
    .await?;
    Ok(())
}

/// Makes history inserts for one product abort, failing the unit of work
/// after earlier writes have already gone through.
pub async fn fail_history_for(db: &DatabaseConnection, product_id: i64) -> Result<()> {
    db.execute_unprepared(&format!(
        "CREATE TRIGGER fail_history_{product_id} BEFORE INSERT ON product_history \
         WHEN NEW.product_id = {product_id} \
         BEGIN SELECT RAISE(ABORT, 'forced failure'); END;"
    ))
    .await?;
    Ok(())
}
