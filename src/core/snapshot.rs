//! Typed before/after snapshots written to history and audit rows.
//!
//! Snapshots are built from models and only turned into JSON at the storage
//! boundary, so every stored `previous_data`/`new_data` has one of these shapes.

use crate::{
    core::context::Owner,
    entities::{OrderModel, OrderStatus, PaymentType, ProductModel},
    errors::Result,
};
use rust_decimal::Decimal;
use sea_orm::prelude::Json;
use serde::{Deserialize, Serialize};

/// Stock counter state, used by inventory history entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSnapshot {
    /// Units in stock
    pub remaining: i32,
}

/// Catalog view of a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    /// Display name.
    pub name: String,
    /// Selling price.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Purchase price, when known.
    #[serde(with = "rust_decimal::serde::float_option")]
    pub costprice: Option<Decimal>,
    /// Catalog category, when assigned.
    pub category_id: Option<i64>,
    /// Units in stock.
    pub remaining: i32,
}

impl From<&ProductModel> for ProductSnapshot {
    fn from(product: &ProductModel) -> Self {
        Self {
            name: product.name.clone(),
            price: product.price,
            costprice: product.costprice,
            category_id: product.category_id,
            remaining: product.remaining,
        }
    }
}

/// Order header without its items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSnapshot {
    /// Staff member or user owning the order, if exactly one is set.
    pub owner: Option<Owner>,
    /// How the order is paid.
    pub payment_type: PaymentType,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Order data as submitted.
    pub data: Option<Json>,
}

impl From<&OrderModel> for OrderSnapshot {
    fn from(order: &OrderModel) -> Self {
        Self {
            owner: Owner::of(order),
            payment_type: order.payment_type,
            status: order.status,
            data: order.data.clone(),
        }
    }
}

/// Closed set of snapshot shapes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Snapshot {
    /// Stock counter only.
    Stock(StockSnapshot),
    /// Full catalog view of a product.
    Product(ProductSnapshot),
    /// Order header.
    Order(OrderSnapshot),
}

impl Snapshot {
    /// Serializes the snapshot into the JSON column format.
    pub fn to_json(&self) -> Result<Json> {
        serde_json::to_value(self).map_err(Into::into)
    }

    /// Stock snapshot holding just `remaining`.
    #[must_use]
    pub const fn stock(remaining: i32) -> Self {
        Self::Stock(StockSnapshot { remaining })
    }
}

impl From<&ProductModel> for Snapshot {
    fn from(product: &ProductModel) -> Self {
        Self::Product(product.into())
    }
}

impl From<&OrderModel> for Snapshot {
    fn from(order: &OrderModel) -> Self {
        Self::Order(order.into())
    }
}

pub(crate) fn to_json(snapshot: Option<&Snapshot>) -> Result<Option<Json>> {
    snapshot.map(Snapshot::to_json).transpose()
}
