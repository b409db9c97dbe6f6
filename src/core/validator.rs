//! Stock validator - Decides whether a set of order lines can be served.
//!
//! [`validate_stock`] reads every referenced product in one query and hands the
//! result to [`check_stock`], a pure function that reports *every* missing product
//! or *every* shortage rather than stopping at the first. On success the fetched
//! products are returned so the caller can snapshot prices from the same read.

use crate::{
    core::ledger::StockLedger,
    entities::ProductModel,
    errors::{Error, Result, StockShortage},
};
use sea_orm::ConnectionTrait;
use std::collections::HashMap;
use tracing::debug;

/// One requested `(product, quantity)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockRequest {
    /// Product requested
    pub product_id: i64,
    /// Units requested, must be positive
    pub quantity: i32,
}

/// Validated products keyed by id.
pub type ValidatedProducts = HashMap<i64, ProductModel>;

/// Fetches the requested products and checks them with [`check_stock`].
///
/// Input shape errors (no lines, non-positive quantities) are reported before
/// touching the database.
pub async fn validate_stock<C>(conn: &C, requests: &[StockRequest]) -> Result<ValidatedProducts>
where
    C: ConnectionTrait,
{
    check_shape(requests)?;

    let demand = aggregate(requests);
    let ids: Vec<i64> = demand.iter().map(|(id, _)| *id).collect();
    let products = StockLedger::new(conn).find_active(&ids).await?;
    debug!(
        requested = ids.len(),
        found = products.len(),
        "StockValidator: products fetched"
    );

    check_stock(requests, products)
}

/// Checks `requests` against already fetched, non-deleted `products`.
///
/// Quantities for a product listed on several lines are summed. Missing products
/// win over shortages: if any product is missing, only the missing ids are
/// reported.
pub fn check_stock(
    requests: &[StockRequest],
    products: Vec<ProductModel>,
) -> Result<ValidatedProducts> {
    check_shape(requests)?;

    let demand = aggregate(requests);
    let found: ValidatedProducts = products.into_iter().map(|p| (p.id, p)).collect();

    let missing_ids: Vec<i64> = demand
        .iter()
        .filter(|(id, _)| !found.contains_key(id))
        .map(|(id, _)| *id)
        .collect();
    if !missing_ids.is_empty() {
        return Err(Error::ProductsNotFound { missing_ids });
    }

    let details: Vec<StockShortage> = demand
        .iter()
        .filter_map(|(id, requested)| {
            let product = found.get(id)?;
            (*requested > product.remaining).then(|| StockShortage {
                product_id: *id,
                product_name: product.name.clone(),
                requested: *requested,
                available: product.remaining,
            })
        })
        .collect();
    if !details.is_empty() {
        return Err(Error::InsufficientStock { details });
    }

    Ok(found)
}

fn check_shape(requests: &[StockRequest]) -> Result<()> {
    if requests.is_empty() {
        return Err(Error::EmptyOrder);
    }
    if let Some(bad) = requests.iter().find(|r| r.quantity <= 0) {
        return Err(Error::InvalidQuantity {
            quantity: bad.quantity,
        });
    }
    Ok(())
}

/// Total quantity per product, in order of first appearance.
fn aggregate(requests: &[StockRequest]) -> Vec<(i64, i32)> {
    let mut demand: Vec<(i64, i32)> = Vec::new();
    for request in requests {
        match demand.iter_mut().find(|(id, _)| *id == request.product_id) {
            Some((_, total)) => *total = total.saturating_add(request.quantity),
            None => demand.push((request.product_id, request.quantity)),
        }
    }
    demand
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::panic)]
    use super::*;
    use crate::test_utils::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn product(id: i64, name: &str, remaining: i32) -> ProductModel {
        let now = Utc::now();
        ProductModel {
            id,
            name: name.to_string(),
            price: Decimal::new(100, 0),
            costprice: None,
            category_id: None,
            remaining,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    const fn request(product_id: i64, quantity: i32) -> StockRequest {
        StockRequest {
            product_id,
            quantity,
        }
    }

    #[test]
    fn test_every_shortage_is_reported() {
        let result = check_stock(
            &[request(1, 5), request(2, 5)],
            vec![product(1, "Tea", 1), product(2, "Milk", 1)],
        );

        let Err(Error::InsufficientStock { details }) = result else {
            panic!("expected InsufficientStock");
        };
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].product_id, 1);
        assert_eq!(details[0].product_name, "Tea");
        assert_eq!(details[0].requested, 5);
        assert_eq!(details[0].available, 1);
        assert_eq!(details[1].product_id, 2);
    }

    #[test]
    fn test_exact_stock_boundary() {
        assert!(check_stock(&[request(1, 10)], vec![product(1, "Tea", 10)]).is_ok());
        assert!(matches!(
            check_stock(&[request(1, 11)], vec![product(1, "Tea", 10)]),
            Err(Error::InsufficientStock { .. })
        ));
    }

    #[test]
    fn test_every_missing_id_is_reported_in_request_order() {
        let result = check_stock(
            &[request(9, 1), request(1, 1), request(7, 1), request(9, 1)],
            vec![product(1, "Tea", 10)],
        );

        let Err(Error::ProductsNotFound { missing_ids }) = result else {
            panic!("expected ProductsNotFound");
        };
        assert_eq!(missing_ids, vec![9, 7]);
    }

    #[test]
    fn test_repeated_lines_are_summed() {
        let result = check_stock(
            &[request(1, 3), request(1, 3)],
            vec![product(1, "Tea", 5)],
        );

        let Err(Error::InsufficientStock { details }) = result else {
            panic!("expected InsufficientStock");
        };
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].requested, 6);
        assert_eq!(details[0].available, 5);
    }

    #[test]
    fn test_success_returns_fetched_products() {
        let found = check_stock(&[request(1, 2)], vec![product(1, "Tea", 5)]).unwrap();
        assert_eq!(found[&1].name, "Tea");
        assert_eq!(found[&1].price, Decimal::new(100, 0));
    }

    #[tokio::test]
    async fn test_shape_errors_skip_the_database() -> Result<()> {
        // MockDatabase with no queued results fails any query that reaches it
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = validate_stock(&db, &[]).await;
        assert!(matches!(result.unwrap_err(), Error::EmptyOrder));

        let result = validate_stock(&db, &[request(1, 0)]).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidQuantity { quantity: 0 }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_deleted_products_are_not_found() -> Result<()> {
        let db = setup_test_db().await?;
        let kept = seed_product(&db, "Kept", 3).await?;
        let gone = seed_product(&db, "Gone", 3).await?;
        soft_delete(&db, gone.id).await?;

        let result = validate_stock(&db, &[request(kept.id, 1), request(gone.id, 1)]).await;
        let Err(Error::ProductsNotFound { missing_ids }) = result else {
            panic!("expected ProductsNotFound");
        };
        assert_eq!(missing_ids, vec![gone.id]);

        Ok(())
    }
}
