//! Stock ledger - Reads and guarded writes of `products.remaining`.
//!
//! Every write is a single conditional `UPDATE` so concurrent units of work cannot
//! lose updates or drive stock negative: a decrement only matches rows with enough
//! stock, and neither direction touches soft-deleted products. A refused write
//! reports `None` and the caller decides which error that is.

use crate::{
    entities::{Product, product},
    errors::{Result, StockShortage},
};
use chrono::Utc;
use sea_orm::{QueryOrder, prelude::*, sea_query::Expr};

/// Stock counter before and after a successful write.
#[derive(Debug, Clone, PartialEq)]
pub struct StockMovement {
    /// Product as re-read after the write
    pub product: product::Model,
    /// `remaining` before the write
    pub before: i32,
    /// `remaining` after the write
    pub after: i32,
}

/// Product access bound to one connection or transaction.
#[derive(Debug, Clone, Copy)]
pub struct StockLedger<'a, C> {
    conn: &'a C,
}

impl<'a, C> StockLedger<'a, C>
where
    C: ConnectionTrait,
{
    /// Binds the ledger to `conn`.
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Looks a product up by id, deleted or not.
    pub async fn find(&self, product_id: i64) -> Result<Option<product::Model>> {
        Product::find_by_id(product_id)
            .one(self.conn)
            .await
            .map_err(Into::into)
    }

    /// Fetches every non-deleted product among `product_ids` in one query.
    pub async fn find_active(&self, product_ids: &[i64]) -> Result<Vec<product::Model>> {
        Product::find()
            .filter(product::Column::Id.is_in(product_ids.iter().copied()))
            .filter(product::Column::DeletedAt.is_null())
            .order_by_asc(product::Column::Id)
            .all(self.conn)
            .await
            .map_err(Into::into)
    }

    /// Removes `quantity` units if at least that many are in stock and the product
    /// is not deleted. Returns `None` when the guard refuses the write.
    pub async fn decrement(&self, product_id: i64, quantity: i32) -> Result<Option<StockMovement>> {
        let result = Product::update_many()
            .col_expr(
                product::Column::Remaining,
                Expr::col(product::Column::Remaining).sub(quantity),
            )
            .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(product::Column::Id.eq(product_id))
            .filter(product::Column::DeletedAt.is_null())
            .filter(product::Column::Remaining.gte(quantity))
            .exec(self.conn)
            .await?;

        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.movement(product_id, -quantity).await
    }

    /// Adds `quantity` units unless the product is deleted or the counter would
    /// pass `i32::MAX`. Returns `None` when the guard refuses the write.
    pub async fn increment(&self, product_id: i64, quantity: i32) -> Result<Option<StockMovement>> {
        let result = Product::update_many()
            .col_expr(
                product::Column::Remaining,
                Expr::col(product::Column::Remaining).add(quantity),
            )
            .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(product::Column::Id.eq(product_id))
            .filter(product::Column::DeletedAt.is_null())
            .filter(product::Column::Remaining.lte(i32::MAX.saturating_sub(quantity)))
            .exec(self.conn)
            .await?;

        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.movement(product_id, quantity).await
    }

    /// Describes why a decrement of `requested` units was refused, as seen from
    /// inside the same transaction. A deleted or missing product counts as having
    /// nothing available.
    pub async fn shortfall(&self, product_id: i64, requested: i32) -> Result<StockShortage> {
        let product = self.find(product_id).await?;
        let (product_name, available) = match product {
            Some(p) if !p.is_deleted() => (p.name, p.remaining),
            Some(p) => (p.name, 0),
            None => (String::new(), 0),
        };
        Ok(StockShortage {
            product_id,
            product_name,
            requested,
            available,
        })
    }

    async fn movement(&self, product_id: i64, delta: i32) -> Result<Option<StockMovement>> {
        Ok(self.find(product_id).await?.map(|product| StockMovement {
            before: product.remaining - delta,
            after: product.remaining,
            product,
        }))
    }
}
