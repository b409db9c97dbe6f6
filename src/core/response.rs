//! Uniform result envelope handed to the route layer.
//!
//! `{ "success": true, "data": ... }` on success and
//! `{ "success": false, "error": { ... } }` on failure. Internal failures carry a
//! generic message unless the envelope is built for an internal audience.

use crate::errors::{Error, ErrorKind, StockShortage};
use serde::Serialize;

const GENERIC_MESSAGE: &str = "An internal error occurred";

/// Who will read an error envelope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Exposure {
    /// End users; internal error text is hidden
    #[default]
    Public,
    /// Operators and internal services; raw error text is kept
    Internal,
}

/// Error half of the envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Stable machine-readable code such as `INSUFFICIENT_STOCK`.
    pub code: &'static str,
    /// Human-readable message, generic for internal failures shown to the public.
    pub message: String,
    /// HTTP-style status.
    pub status: u16,
    /// Every shortage of a failed order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<StockShortage>>,
    /// Every unknown or deleted product id of a failed order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_ids: Option<Vec<i64>>,
    /// Product a single-product stock error refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<i64>,
    /// Units asked for by a single-product stock error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested: Option<i32>,
    /// Units on hand when a single-product removal was refused.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<i32>,
}

impl ErrorBody {
    /// Renders `error` for the given audience.
    #[must_use]
    pub fn new(error: &Error, exposure: Exposure) -> Self {
        let message = match (error.kind(), exposure) {
            (ErrorKind::Internal, Exposure::Public) => GENERIC_MESSAGE.to_string(),
            _ => error.to_string(),
        };
        let mut body = Self {
            code: error.code(),
            message,
            status: error.status_code(),
            details: None,
            missing_ids: None,
            product_id: None,
            requested: None,
            available: None,
        };
        match error {
            Error::InsufficientStock { details } => body.details = Some(details.clone()),
            Error::ProductsNotFound { missing_ids } => body.missing_ids = Some(missing_ids.clone()),
            Error::InsufficientStockForProduct {
                product_id,
                requested,
                available,
            } => {
                body.product_id = Some(*product_id);
                body.requested = Some(*requested);
                body.available = Some(*available);
            }
            _ => {}
        }
        body
    }
}

/// `{success, data?, error?}` envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response<T> {
    /// Whether the use case succeeded.
    pub success: bool,
    /// Payload of a successful call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Failure description of an unsuccessful call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl<T> Response<T> {
    /// Successful envelope.
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Failed envelope.
    #[must_use]
    pub fn fail(error: &Error, exposure: Exposure) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorBody::new(error, exposure)),
        }
    }

    /// Wraps a use case result.
    pub fn from_result(result: crate::errors::Result<T>, exposure: Exposure) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(error) => Self::fail(&error, exposure),
        }
    }
}
