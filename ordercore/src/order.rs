//! The `Order` aggregate and its lifecycle statuses.
//!
//! Orders are mutated only through `OrderStateMachine`; this module holds
//! the data shape plus the status enum with its terminal-state predicate.

use crate::types::{Money, MoneyError, OrderId, Quantity, Timestamp, UnitId, VariantId, Version};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Order is being assembled (POS flow) or awaiting payment capture.
    Processing,
    /// Awaiting confirmation by staff.
    PendingConfirmation,
    /// Confirmed and queued for fulfillment.
    Confirmed,
    /// Being packed.
    Packing,
    /// Handed to the carrier.
    Shipping,
    /// Delivered to the customer.
    Delivered,
    /// Completed; terminal except for post-sale return requests.
    Completed,
    /// Cancelled; terminal.
    Cancelled,
    /// Customer requested a return after delivery or completion.
    ReturnRequested,
    /// Returned; terminal.
    Returned,
}

impl OrderStatus {
    /// Whether this status is terminal. Terminal states reject every
    /// outgoing transition except edges explicitly present in the rule
    /// table (e.g. `Completed` → `ReturnRequested`).
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Returned)
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Processing => "Processing",
            Self::PendingConfirmation => "PendingConfirmation",
            Self::Confirmed => "Confirmed",
            Self::Packing => "Packing",
            Self::Shipping => "Shipping",
            Self::Delivered => "Delivered",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
            Self::ReturnRequested => "ReturnRequested",
            Self::Returned => "Returned",
        };
        write!(f, "{name}")
    }
}

/// One line of an order: a variant, optionally pinned to a concrete unit,
/// with the price captured at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineItem {
    /// The variant being purchased.
    pub variant_id: VariantId,
    /// The concrete unit allocated to this line, once reserved.
    pub unit_id: Option<UnitId>,
    /// Quantity purchased.
    pub quantity: Quantity,
    /// Unit price captured when the line was added.
    pub unit_price: Money,
}

impl OrderLineItem {
    /// Creates a new line item.
    pub const fn new(
        variant_id: VariantId,
        unit_id: Option<UnitId>,
        quantity: Quantity,
        unit_price: Money,
    ) -> Self {
        Self {
            variant_id,
            unit_id,
            quantity,
            unit_price,
        }
    }

    /// Line total at the captured price.
    pub fn line_total(&self) -> Result<Money, MoneyError> {
        self.unit_price.multiply_by_quantity(self.quantity)
    }
}

/// A customer purchase record with a lifecycle status and an optimistic
/// concurrency version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    status: OrderStatus,
    version: Version,
    line_items: Vec<OrderLineItem>,
    total: Money,
    created_at: Timestamp,
}

impl Order {
    /// Creates a new order at version 0 with a total computed from its
    /// line items.
    pub fn new(
        id: OrderId,
        status: OrderStatus,
        line_items: Vec<OrderLineItem>,
        created_at: Timestamp,
    ) -> Result<Self, MoneyError> {
        let mut total = Money::zero();
        for item in &line_items {
            total = total.checked_add(item.line_total()?)?;
        }
        Ok(Self {
            id,
            status,
            version: Version::initial(),
            line_items,
            total,
            created_at,
        })
    }

    /// The order's identity.
    pub const fn id(&self) -> &OrderId {
        &self.id
    }

    /// Current lifecycle status.
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// Current optimistic-concurrency version.
    pub const fn version(&self) -> Version {
        self.version
    }

    /// The order's line items.
    pub fn line_items(&self) -> &[OrderLineItem] {
        &self.line_items
    }

    /// Total amount at captured prices.
    pub const fn total(&self) -> Money {
        self.total
    }

    /// When the order was created.
    pub const fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Applies a committed status change, bumping the version.
    ///
    /// Only store adapters call this, after their compare-and-swap check
    /// has passed; the state machine never mutates an order directly.
    pub fn apply_status(&mut self, new_status: OrderStatus) {
        self.status = new_status;
        self.version = self.version.next();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(price: rust_decimal::Decimal, quantity: u32) -> OrderLineItem {
        OrderLineItem::new(
            VariantId::try_new("VAR-A").unwrap(),
            None,
            Quantity::new(quantity).unwrap(),
            Money::new(price).unwrap(),
        )
    }

    fn order(lines: Vec<OrderLineItem>) -> Order {
        Order::new(
            OrderId::try_new("ORD-1").unwrap(),
            OrderStatus::PendingConfirmation,
            lines,
            Timestamp::now(),
        )
        .unwrap()
    }

    #[test]
    fn total_is_sum_of_line_totals() {
        let o = order(vec![line(dec!(1_000_000), 2), line(dec!(250_000), 1)]);
        assert_eq!(o.total().amount(), dec!(2_250_000));
    }

    #[test]
    fn new_order_starts_at_version_zero() {
        let o = order(vec![line(dec!(10), 1)]);
        let v: u64 = o.version().into();
        assert_eq!(v, 0);
    }

    #[test]
    fn apply_status_bumps_version() {
        let mut o = order(vec![line(dec!(10), 1)]);
        o.apply_status(OrderStatus::Confirmed);
        assert_eq!(o.status(), OrderStatus::Confirmed);
        let v: u64 = o.version().into();
        assert_eq!(v, 1);
    }

    #[test]
    fn terminal_statuses() {
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Returned.is_terminal());
        assert!(!OrderStatus::ReturnRequested.is_terminal());
        assert!(!OrderStatus::Processing.is_terminal());
    }
}
