//! History journal - Append-only record of product mutations.

use crate::{
    core::{
        ledger::StockMovement,
        snapshot::{self, Snapshot},
    },
    entities::{HistoryOperation, ProductHistory, product_history},
    errors::Result,
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};

/// A history row waiting to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    /// Product the entry describes
    pub product_id: i64,
    /// What happened
    pub operation: HistoryOperation,
    /// Stock delta, for inventory operations
    pub quantity: Option<i32>,
    /// State before the mutation
    pub previous: Option<Snapshot>,
    /// State after the mutation
    pub new: Option<Snapshot>,
    /// Human-readable reason
    pub change_reason: Option<String>,
    /// Actor behind the mutation
    pub actor_id: Option<i64>,
}

impl HistoryEntry {
    /// Entry for a stock movement, with `{remaining}` snapshots on both sides.
    #[must_use]
    pub fn inventory(
        operation: HistoryOperation,
        quantity: i32,
        movement: &StockMovement,
        change_reason: Option<String>,
        actor_id: Option<i64>,
    ) -> Self {
        Self {
            product_id: movement.product.id,
            operation,
            quantity: Some(quantity),
            previous: Some(Snapshot::stock(movement.before)),
            new: Some(Snapshot::stock(movement.after)),
            change_reason,
            actor_id,
        }
    }
}

/// Journal writer bound to one connection or transaction.
#[derive(Debug, Clone, Copy)]
pub struct HistoryJournal<'a, C> {
    conn: &'a C,
}

impl<'a, C> HistoryJournal<'a, C>
where
    C: ConnectionTrait,
{
    /// Binds the journal to `conn`.
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Appends `entry` and returns the stored row.
    pub async fn append(&self, entry: HistoryEntry) -> Result<product_history::Model> {
        let row = product_history::ActiveModel {
            product_id: Set(entry.product_id),
            operation: Set(entry.operation),
            quantity: Set(entry.quantity),
            previous_data: Set(snapshot::to_json(entry.previous.as_ref())?),
            new_data: Set(snapshot::to_json(entry.new.as_ref())?),
            change_reason: Set(entry.change_reason),
            actor_id: Set(entry.actor_id),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        row.insert(self.conn).await.map_err(Into::into)
    }

    /// All entries for a product, newest first.
    pub async fn for_product(&self, product_id: i64) -> Result<Vec<product_history::Model>> {
        ProductHistory::find()
            .filter(product_history::Column::ProductId.eq(product_id))
            .order_by_desc(product_history::Column::Id)
            .all(self.conn)
            .await
            .map_err(Into::into)
    }
}
