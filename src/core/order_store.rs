//! Order store - Persistence of the order aggregate.
//!
//! Status changes are conditional updates on the expected current status, so two
//! racing transitions on the same order cannot both succeed.

use crate::{
    core::context::Owner,
    entities::{Order, OrderItem, OrderStatus, PaymentType, order, order_item},
    errors::Result,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, prelude::*};

/// One line of an order about to be written, price already snapshotted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderLine {
    /// Product being ordered.
    pub product_id: i64,
    /// Units ordered.
    pub quantity: i32,
    /// Catalog unit price at placement time.
    pub price: Decimal,
    /// Line data as submitted.
    pub data: Option<Json>,
}

/// Order access bound to one connection or transaction.
#[derive(Debug, Clone, Copy)]
pub struct OrderStore<'a, C> {
    conn: &'a C,
}

impl<'a, C> OrderStore<'a, C>
where
    C: ConnectionTrait,
{
    /// Binds the store to `conn`.
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Looks an order up by id.
    pub async fn find(&self, order_id: i64) -> Result<Option<order::Model>> {
        Order::find_by_id(order_id)
            .one(self.conn)
            .await
            .map_err(Into::into)
    }

    /// Lines of an order in insertion order.
    pub async fn items(&self, order_id: i64) -> Result<Vec<order_item::Model>> {
        OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::Id)
            .all(self.conn)
            .await
            .map_err(Into::into)
    }

    /// Writes a `NEW` order and all of its lines.
    pub async fn insert(
        &self,
        owner: Owner,
        payment_type: PaymentType,
        data: Option<Json>,
        lines: Vec<NewOrderLine>,
    ) -> Result<(order::Model, Vec<order_item::Model>)> {
        let now = Utc::now();
        let (staff_id, user_id) = owner.columns();

        let order = order::ActiveModel {
            status: Set(OrderStatus::New),
            staff_id: Set(staff_id),
            user_id: Set(user_id),
            payment_type: Set(payment_type),
            data: Set(data),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.conn)
        .await?;

        let rows = lines.into_iter().map(|line| order_item::ActiveModel {
            order_id: Set(order.id),
            product_id: Set(line.product_id),
            quantity: Set(line.quantity),
            price: Set(line.price),
            data: Set(line.data),
            ..Default::default()
        });
        OrderItem::insert_many(rows).exec(self.conn).await?;

        let items = self.items(order.id).await?;
        Ok((order, items))
    }

    /// Moves the order from `from` to `to` if it is still in `from`.
    ///
    /// Returns the updated order, or `None` when the order was not in `from`.
    pub async fn transition(
        &self,
        order_id: i64,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Option<order::Model>> {
        let result = Order::update_many()
            .set(order::ActiveModel {
                status: Set(to),
                updated_at: Set(Utc::now()),
                ..Default::default()
            })
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::Status.eq(from))
            .exec(self.conn)
            .await?;

        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.find(order_id).await
    }
}
