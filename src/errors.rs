//! Unified error types for the order and inventory engine.
//!
//! Every failure a use case can report is a variant here. Variants fall into four
//! classes (see [`ErrorKind`]) which drive the log level and the status code the
//! HTTP layer renders.

use serde::Serialize;
use thiserror::Error;

/// One product that cannot cover the requested quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockShortage {
    /// Product that is short
    pub product_id: i64,
    /// Its display name
    pub product_name: String,
    /// Units requested
    pub requested: i32,
    /// Units in stock at validation time
    pub available: i32,
}

/// Broad failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A referenced product or order does not exist
    NotFound,
    /// The caller may not act on the entity
    Forbidden,
    /// The request breaks a business rule
    Validation,
    /// Persistence or serialization failed
    Internal,
}

#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum Error {
    #[error("Products not found: {missing_ids:?}")]
    ProductsNotFound { missing_ids: Vec<i64> },

    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: i64 },

    #[error("Order not found: {order_id}")]
    OrderNotFound { order_id: i64 },

    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("Insufficient stock for {} product(s)", .details.len())]
    InsufficientStock { details: Vec<StockShortage> },

    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStockForProduct {
        product_id: i64,
        requested: i32,
        available: i32,
    },

    #[error("{message}")]
    InvalidTransition { message: String },

    #[error(
        "Adding {requested} units to product {product_id} would exceed the stock limit (remaining {remaining})"
    )]
    StockLimitExceeded {
        product_id: i64,
        requested: i32,
        remaining: i32,
    },

    #[error("Cannot adjust inventory of deleted product {product_id}")]
    CannotAdjustDeletedProduct { product_id: i64 },

    #[error("Invalid quantity: {quantity}")]
    InvalidQuantity { quantity: i32 },

    #[error("Order must contain at least one item")]
    EmptyOrder,

    #[error("Invalid inventory operation: {operation}")]
    InvalidOperation { operation: String },

    #[error("Invalid product: {message}")]
    InvalidProduct { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ProductsNotFound { .. }
            | Self::ProductNotFound { .. }
            | Self::OrderNotFound { .. } => ErrorKind::NotFound,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::InsufficientStock { .. }
            | Self::InsufficientStockForProduct { .. }
            | Self::StockLimitExceeded { .. }
            | Self::InvalidTransition { .. }
            | Self::CannotAdjustDeletedProduct { .. }
            | Self::InvalidQuantity { .. }
            | Self::EmptyOrder
            | Self::InvalidOperation { .. }
            | Self::InvalidProduct { .. } => ErrorKind::Validation,
            Self::Config { .. } | Self::Database(_) | Self::Serialization(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Stable machine-readable code for the response envelope.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ProductsNotFound { .. } => "PRODUCTS_NOT_FOUND",
            Self::ProductNotFound { .. } => "PRODUCT_NOT_FOUND",
            Self::OrderNotFound { .. } => "ORDER_NOT_FOUND",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::InsufficientStock { .. } | Self::InsufficientStockForProduct { .. } => {
                "INSUFFICIENT_STOCK"
            }
            Self::StockLimitExceeded { .. } => "STOCK_LIMIT_EXCEEDED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::CannotAdjustDeletedProduct { .. } => "CANNOT_ADJUST_DELETED_PRODUCT",
            Self::InvalidQuantity { .. } => "INVALID_QUANTITY",
            Self::EmptyOrder => "EMPTY_ORDER",
            Self::InvalidOperation { .. } => "INVALID_OPERATION",
            Self::InvalidProduct { .. } => "INVALID_PRODUCT",
            Self::Config { .. } | Self::Database(_) | Self::Serialization(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status class for the error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            ErrorKind::Forbidden => 403,
            ErrorKind::Validation => 400,
            ErrorKind::Internal => 500,
        }
    }

    /// Logs the failure at the level its class calls for. Caller faults go to
    /// `warn`, internal failures to `error`.
    pub fn trace(&self, event: &'static str) {
        match self.kind() {
            ErrorKind::Internal => {
                tracing::error!(code = self.code(), error = %self, "{event}");
            }
            _ => tracing::warn!(code = self.code(), error = %self, "{event}"),
        }
    }

    pub(crate) fn invalid_transition(message: impl Into<String>) -> Self {
        Self::InvalidTransition {
            message: message.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
