use std::collections::HashMap;

use tracing::instrument;
use uuid::Uuid;

use crate::entities::bouquet;
use crate::errors::ServiceError;
use crate::models::CartLine;
use crate::repositories::BouquetRepository;

/// A requested `(bouquet, quantity)` pair as submitted by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartRequestLine {
    pub bouquet_id: Uuid,
    pub quantity: i32,
}

/// Validates requested lines against the live catalog and prices them
#[derive(Debug, Clone)]
pub struct CartResolver {
    bouquets: BouquetRepository,
}

impl CartResolver {
    pub fn new(bouquets: BouquetRepository) -> Self {
        Self { bouquets }
    }

    /// One catalog lookup for all requested ids, then [`price_lines`].
    #[instrument(skip(self, requested), fields(lines = requested.len()))]
    pub async fn resolve(&self, requested: &[CartRequestLine]) -> Result<Vec<CartLine>, ServiceError> {
        let merged = merge_duplicates(requested)?;
        let ids = merged.iter().map(|line| line.bouquet_id).collect();
        let catalog: HashMap<Uuid, bouquet::Model> = self
            .bouquets
            .find_many(ids)
            .await?
            .into_iter()
            .map(|b| (b.id, b))
            .collect();

        price_lines(&merged, &catalog)
    }
}

/// Folds repeated bouquets into one line, keeping first-occurrence order
pub fn merge_duplicates(requested: &[CartRequestLine]) -> Result<Vec<CartRequestLine>, ServiceError> {
    if requested.is_empty() {
        return Err(ServiceError::ValidationError(
            "Order must contain at least one item".to_string(),
        ));
    }

    let mut merged: Vec<CartRequestLine> = Vec::with_capacity(requested.len());
    for line in requested {
        if line.quantity < 1 {
            return Err(ServiceError::ValidationError(format!(
                "Quantity for bouquet {} must be at least 1",
                line.bouquet_id
            )));
        }
        match merged.iter_mut().find(|m| m.bouquet_id == line.bouquet_id) {
            Some(existing) => {
                existing.quantity = existing.quantity.checked_add(line.quantity).ok_or_else(|| {
                    ServiceError::ValidationError(format!(
                        "Quantity for bouquet {} is too large",
                        line.bouquet_id
                    ))
                })?
            }
            None => merged.push(*line),
        }
    }
    Ok(merged)
}

/// Prices each line at the current catalog price. Output order follows input order.
pub fn price_lines(
    requested: &[CartRequestLine],
    catalog: &HashMap<Uuid, bouquet::Model>,
) -> Result<Vec<CartLine>, ServiceError> {
    requested
        .iter()
        .map(|line| {
            let bouquet = catalog.get(&line.bouquet_id).ok_or_else(|| {
                ServiceError::NotFound(format!("Bouquet with ID {} not found", line.bouquet_id))
            })?;

            if line.quantity > bouquet.quantity {
                return Err(ServiceError::InsufficientStock(format!(
                    "Requested {} of bouquet {}, only {} available",
                    line.quantity, bouquet.id, bouquet.quantity
                )));
            }

            Ok(CartLine {
                bouquet_id: bouquet.id,
                title: bouquet.name.clone(),
                description: bouquet.description.clone(),
                quantity: line.quantity,
                available: bouquet.quantity,
                unit_price: bouquet.price,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::cart::cart_total;
    use assert_matches::assert_matches;
    use chrono::Utc;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn bouquet(price: Decimal, quantity: i32) -> bouquet::Model {
        bouquet::Model {
            id: Uuid::new_v4(),
            name: "Roses".into(),
            description: None,
            price,
            quantity,
            purchase_count: 0,
            view_count: 0,
            is_active: true,
            bouquet_type_id: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn catalog_of(items: &[bouquet::Model]) -> HashMap<Uuid, bouquet::Model> {
        items.iter().map(|b| (b.id, b.clone())).collect()
    }

    #[test]
    fn prices_from_catalog() {
        let a = bouquet(dec!(1000), 5);
        let lines = price_lines(
            &[CartRequestLine {
                bouquet_id: a.id,
                quantity: 2,
            }],
            &catalog_of(&[a.clone()]),
        )
        .unwrap();

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].unit_price, dec!(1000));
        assert_eq!(lines[0].available, 5);
        assert_eq!(cart_total(&lines), dec!(2000));
    }

    #[test]
    fn unknown_bouquet_is_not_found() {
        let missing = Uuid::new_v4();
        let err = price_lines(
            &[CartRequestLine {
                bouquet_id: missing,
                quantity: 1,
            }],
            &HashMap::new(),
        )
        .unwrap_err();
        assert_matches!(err, ServiceError::NotFound(msg) if msg.contains(&missing.to_string()));
    }

    #[test]
    fn over_stock_is_rejected() {
        let a = bouquet(dec!(500), 1);
        let err = price_lines(
            &[CartRequestLine {
                bouquet_id: a.id,
                quantity: 2,
            }],
            &catalog_of(&[a.clone()]),
        )
        .unwrap_err();
        assert_matches!(err, ServiceError::InsufficientStock(_));
    }

    #[test]
    fn duplicates_are_merged_in_first_seen_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let merged = merge_duplicates(&[
            CartRequestLine { bouquet_id: a, quantity: 1 },
            CartRequestLine { bouquet_id: b, quantity: 2 },
            CartRequestLine { bouquet_id: a, quantity: 3 },
        ])
        .unwrap();
        assert_eq!(
            merged,
            vec![
                CartRequestLine { bouquet_id: a, quantity: 4 },
                CartRequestLine { bouquet_id: b, quantity: 2 },
            ]
        );
    }

    #[test]
    fn empty_cart_and_zero_quantity_are_invalid() {
        assert_matches!(merge_duplicates(&[]), Err(ServiceError::ValidationError(_)));
        assert_matches!(
            merge_duplicates(&[CartRequestLine {
                bouquet_id: Uuid::new_v4(),
                quantity: 0
            }]),
            Err(ServiceError::ValidationError(_))
        );
    }

    proptest! {
        #[test]
        fn total_matches_catalog_prices_and_order_is_kept(
            specs in proptest::collection::vec((1i64..100_000, 1i32..50, 0i32..50), 1..8)
        ) {
            let bouquets: Vec<_> = specs
                .iter()
                .map(|(cents, qty, extra)| bouquet(Decimal::new(*cents, 2), qty + extra))
                .collect();
            let requested: Vec<_> = bouquets
                .iter()
                .zip(&specs)
                .map(|(b, (_, qty, _))| CartRequestLine { bouquet_id: b.id, quantity: *qty })
                .collect();

            let lines = price_lines(&requested, &catalog_of(&bouquets)).unwrap();

            let expected: Decimal = bouquets
                .iter()
                .zip(&specs)
                .map(|(b, (_, qty, _))| b.price * Decimal::from(*qty))
                .sum();
            prop_assert_eq!(cart_total(&lines), expected);
            let ids: Vec<_> = lines.iter().map(|l| l.bouquet_id).collect();
            let requested_ids: Vec<_> = requested.iter().map(|r| r.bouquet_id).collect();
            prop_assert_eq!(ids, requested_ids);
        }

        #[test]
        fn any_line_above_stock_fails(stock in 0i32..20, over in 1i32..10) {
            let a = bouquet(dec!(100), stock);
            let result = price_lines(
                &[CartRequestLine { bouquet_id: a.id, quantity: stock + over }],
                &catalog_of(&[a.clone()]),
            );
            prop_assert!(matches!(result, Err(ServiceError::InsufficientStock(_))));
        }
    }
}
