//! Cart-to-order conversion validation.
//!
//! Before an order is created from a cart, the snapshot the client is
//! holding must be reconciled against live catalog state: items may have
//! gone unsellable and prices may have drifted since they were added. The
//! validator is a pure comparison — no mutation, no locks — and it never
//! decides what to do about drift; it reports findings for the
//! order-creation flow to resolve.

use crate::errors::CartValidationError;
use crate::types::{CartId, Money, Quantity, UnitId, VariantId};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Live sellability and price of a variant, as reported by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantQuote {
    /// Whether the variant can currently be sold.
    pub sellable: bool,
    /// The current live price.
    pub price: Money,
}

/// Port to the catalog/pricing collaborator.
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    /// Fetches the live status and price of a variant.
    async fn live_status_and_price(
        &self,
        variant_id: &VariantId,
    ) -> Result<VariantQuote, crate::errors::CatalogError>;
}

/// One line of a cart snapshot: the price is the one captured when the
/// line was added, which is exactly what may have drifted since.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineSnapshot {
    /// The variant in the cart.
    pub variant_id: VariantId,
    /// A concrete unit, when the customer picked one (e.g. open-box).
    pub unit_id: Option<UnitId>,
    /// Quantity in the cart.
    pub quantity: Quantity,
    /// Unit price at the time the line was added.
    pub price_at_add_time: Money,
}

/// A read-only snapshot of a cart at validation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    /// The cart's identity.
    pub cart_id: CartId,
    /// The cart's lines.
    pub lines: Vec<CartLineSnapshot>,
}

/// A line whose live price differs from the snapshot price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceChange {
    /// The drifted variant.
    pub variant_id: VariantId,
    /// Price the customer saw.
    pub snapshot_price: Money,
    /// Current live price.
    pub live_price: Money,
    /// `live - snapshot`; positive means the price went up.
    pub delta: Decimal,
}

/// Findings of one validation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartValidationResult {
    /// The validated cart.
    pub cart_id: CartId,
    /// Lines whose variant is no longer sellable.
    pub unavailable_items: Vec<CartLineSnapshot>,
    /// Lines whose live price differs from the snapshot price.
    pub price_changed_items: Vec<PriceChange>,
    /// Total recomputed from live prices over the sellable lines.
    pub recomputed_total: Money,
    /// The caller-supplied expected total, when given.
    pub expected_total: Option<Money>,
    /// Whether the expected total differs from the recomputed one by more
    /// than the configured epsilon.
    pub total_mismatch: bool,
}

impl CartValidationResult {
    /// True only when nothing drifted: no unavailable items, no price
    /// changes, and no total mismatch.
    pub fn is_valid(&self) -> bool {
        self.unavailable_items.is_empty()
            && self.price_changed_items.is_empty()
            && !self.total_mismatch
    }
}

/// Immutable validator settings, injected at construction.
#[derive(Debug, Clone, Copy)]
pub struct ValidatorConfig {
    /// Deadline for each catalog lookup.
    pub lookup_timeout: Duration,
    /// Tolerance for the expected-vs-recomputed total comparison, in
    /// currency units.
    pub total_epsilon: Decimal,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            lookup_timeout: Duration::from_secs(2),
            // One cent/hundredth of the currency unit.
            total_epsilon: Decimal::new(1, 2),
        }
    }
}

/// Reconciles a cart snapshot against live catalog state.
#[derive(Clone)]
pub struct CartConversionValidator<C>
where
    C: CatalogLookup,
{
    catalog: C,
    config: ValidatorConfig,
}

impl<C> CartConversionValidator<C>
where
    C: CatalogLookup,
{
    /// Creates a validator over the given catalog port.
    pub const fn new(catalog: C, config: ValidatorConfig) -> Self {
        Self { catalog, config }
    }

    /// Validates a cart snapshot against the live catalog.
    ///
    /// Drift is reported in the result, not as an error; the `Err` path
    /// is reserved for catalog infrastructure failures (including lookup
    /// deadline expiry).
    #[instrument(skip(self, snapshot), fields(cart_id = %snapshot.cart_id))]
    pub async fn validate(
        &self,
        snapshot: &CartSnapshot,
        expected_total: Option<Money>,
    ) -> Result<CartValidationResult, CartValidationError> {
        let mut unavailable_items = Vec::new();
        let mut price_changed_items = Vec::new();
        let mut recomputed_total = Money::zero();

        for line in &snapshot.lines {
            let quote = self.lookup_with_deadline(&line.variant_id).await?;

            if !quote.sellable {
                debug!(variant_id = %line.variant_id, "line unavailable");
                unavailable_items.push(line.clone());
                continue;
            }

            if quote.price != line.price_at_add_time {
                price_changed_items.push(PriceChange {
                    variant_id: line.variant_id.clone(),
                    snapshot_price: line.price_at_add_time,
                    live_price: quote.price,
                    delta: quote.price.signed_delta(line.price_at_add_time),
                });
            }

            recomputed_total =
                recomputed_total.checked_add(quote.price.multiply_by_quantity(line.quantity)?)?;
        }

        let total_mismatch = expected_total.is_some_and(|expected| {
            expected.signed_delta(recomputed_total).abs() > self.config.total_epsilon
        });

        Ok(CartValidationResult {
            cart_id: snapshot.cart_id.clone(),
            unavailable_items,
            price_changed_items,
            recomputed_total,
            expected_total,
            total_mismatch,
        })
    }

    /// One catalog lookup bounded by the configured deadline.
    async fn lookup_with_deadline(
        &self,
        variant_id: &VariantId,
    ) -> Result<VariantQuote, CartValidationError> {
        match tokio::time::timeout(
            self.config.lookup_timeout,
            self.catalog.live_status_and_price(variant_id),
        )
        .await
        {
            Ok(result) => Ok(result?),
            Err(_) => Err(CartValidationError::CatalogTimeout {
                variant_id: variant_id.clone(),
                waited: self.config.lookup_timeout,
            }),
        }
    }
}

impl<C> std::fmt::Debug for CartConversionValidator<C>
where
    C: CatalogLookup,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartConversionValidator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
