//! Cart-to-order conversion validation against a fake catalog.

use std::collections::HashMap;

use async_trait::async_trait;
use ordercore::errors::CatalogError;
use ordercore::{
    CartConversionValidator, CartId, CartLineSnapshot, CartSnapshot, CatalogLookup, Money,
    Quantity, ValidatorConfig, VariantId, VariantQuote,
};
use rust_decimal_macros::dec;

struct FakeCatalog {
    quotes: HashMap<VariantId, VariantQuote>,
}

impl FakeCatalog {
    fn new(quotes: Vec<(&str, bool, Money)>) -> Self {
        Self {
            quotes: quotes
                .into_iter()
                .map(|(raw, sellable, price)| {
                    (VariantId::try_new(raw).unwrap(), VariantQuote { sellable, price })
                })
                .collect(),
        }
    }
}

#[async_trait]
impl CatalogLookup for FakeCatalog {
    async fn live_status_and_price(
        &self,
        variant_id: &VariantId,
    ) -> Result<VariantQuote, CatalogError> {
        self.quotes
            .get(variant_id)
            .copied()
            .ok_or_else(|| CatalogError::VariantNotFound(variant_id.clone()))
    }
}

fn line(variant: &str, quantity: u32, price: Money) -> CartLineSnapshot {
    CartLineSnapshot {
        variant_id: VariantId::try_new(variant).unwrap(),
        unit_id: None,
        quantity: Quantity::new(quantity).unwrap(),
        price_at_add_time: price,
    }
}

fn cart(lines: Vec<CartLineSnapshot>) -> CartSnapshot {
    CartSnapshot {
        cart_id: CartId::try_new("CRT-1").unwrap(),
        lines,
    }
}

fn money(amount: rust_decimal::Decimal) -> Money {
    Money::new(amount).unwrap()
}

#[tokio::test]
async fn clean_cart_validates_with_no_findings() {
    let catalog = FakeCatalog::new(vec![("VAR-A", true, money(dec!(1_000_000)))]);
    let validator = CartConversionValidator::new(catalog, ValidatorConfig::default());

    let snapshot = cart(vec![line("VAR-A", 2, money(dec!(1_000_000)))]);
    let result = validator
        .validate(&snapshot, Some(money(dec!(2_000_000))))
        .await
        .unwrap();

    assert!(result.is_valid());
    assert_eq!(result.recomputed_total, money(dec!(2_000_000)));
}

#[tokio::test]
async fn drifted_cart_reports_every_finding_at_once() {
    // VAR-A went up by 200,000; VAR-B went unsellable; VAR-C is unchanged.
    let catalog = FakeCatalog::new(vec![
        ("VAR-A", true, money(dec!(1_200_000))),
        ("VAR-B", false, money(dec!(500_000))),
        ("VAR-C", true, money(dec!(80_000))),
    ]);
    let validator = CartConversionValidator::new(catalog, ValidatorConfig::default());

    let snapshot = cart(vec![
        line("VAR-A", 1, money(dec!(1_000_000))),
        line("VAR-B", 1, money(dec!(500_000))),
        line("VAR-C", 3, money(dec!(80_000))),
    ]);
    let expected = money(dec!(1_740_000));
    let result = validator.validate(&snapshot, Some(expected)).await.unwrap();

    assert!(!result.is_valid());

    assert_eq!(result.unavailable_items.len(), 1);
    assert_eq!(
        result.unavailable_items[0].variant_id,
        VariantId::try_new("VAR-B").unwrap()
    );

    assert_eq!(result.price_changed_items.len(), 1);
    let change = &result.price_changed_items[0];
    assert_eq!(change.variant_id, VariantId::try_new("VAR-A").unwrap());
    assert_eq!(change.snapshot_price, money(dec!(1_000_000)));
    assert_eq!(change.live_price, money(dec!(1_200_000)));
    assert_eq!(change.delta, dec!(200_000));

    // The unsellable line is excluded from the live total.
    assert_eq!(result.recomputed_total, money(dec!(1_440_000)));
    assert!(result.total_mismatch);
}

#[tokio::test]
async fn price_drop_yields_a_negative_delta() {
    let catalog = FakeCatalog::new(vec![("VAR-A", true, money(dec!(900_000)))]);
    let validator = CartConversionValidator::new(catalog, ValidatorConfig::default());

    let snapshot = cart(vec![line("VAR-A", 1, money(dec!(1_000_000)))]);
    let result = validator.validate(&snapshot, None).await.unwrap();

    assert_eq!(result.price_changed_items[0].delta, dec!(-100_000));
    assert!(!result.total_mismatch, "no expected total, no mismatch");
}

#[tokio::test]
async fn total_comparison_tolerates_exactly_one_cent() {
    let catalog = FakeCatalog::new(vec![("VAR-A", true, money(dec!(100)))]);
    let validator = CartConversionValidator::new(catalog, ValidatorConfig::default());
    let snapshot = cart(vec![line("VAR-A", 1, money(dec!(100)))]);

    let within = validator
        .validate(&snapshot, Some(money(dec!(100.01))))
        .await
        .unwrap();
    assert!(!within.total_mismatch);

    let beyond = validator
        .validate(&snapshot, Some(money(dec!(100.02))))
        .await
        .unwrap();
    assert!(beyond.total_mismatch);
}

#[tokio::test]
async fn unknown_variant_is_an_infrastructure_error() {
    let catalog = FakeCatalog::new(vec![]);
    let validator = CartConversionValidator::new(catalog, ValidatorConfig::default());
    let snapshot = cart(vec![line("VAR-GHOST", 1, money(dec!(1)))]);

    let result = validator.validate(&snapshot, None).await;
    assert!(result.is_err());
}
