//! The transition rule table: which `(from, to)` order status edges are
//! allowed, and under what conditions.
//!
//! Rules are reference data. The table is built once (from the compiled-in
//! standard set or a custom iterator) into a map keyed by `(from, to)` for
//! O(1) lookup on the decision hot path, and is read-only afterwards.

use crate::order::OrderStatus;
use crate::types::ActorRole;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One edge of the order status graph with its gating metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRule {
    /// Source status.
    pub from: OrderStatus,
    /// Target status.
    pub to: OrderStatus,
    /// Whether the edge is allowed at all. A present-but-disallowed rule
    /// behaves like a missing one; it exists so administrators can turn
    /// edges off without deleting them.
    pub allowed: bool,
    /// Role required to take the edge. `Admin` always satisfies this.
    pub required_role: Option<ActorRole>,
    /// Whether a non-blank reason must accompany the request.
    pub reason_required: bool,
    /// Whether only the internal automation caller may take the edge.
    pub system_only: bool,
}

impl TransitionRule {
    /// An allowed edge with no gates.
    pub const fn allow(from: OrderStatus, to: OrderStatus) -> Self {
        Self {
            from,
            to,
            allowed: true,
            required_role: None,
            reason_required: false,
            system_only: false,
        }
    }

    /// A present-but-disallowed edge.
    pub const fn deny(from: OrderStatus, to: OrderStatus) -> Self {
        Self {
            from,
            to,
            allowed: false,
            required_role: None,
            reason_required: false,
            system_only: false,
        }
    }

    /// Requires the given role (Admin always passes).
    #[must_use]
    pub const fn requiring_role(mut self, role: ActorRole) -> Self {
        self.required_role = Some(role);
        self
    }

    /// Requires a non-blank reason.
    #[must_use]
    pub const fn with_reason_required(mut self) -> Self {
        self.reason_required = true;
        self
    }

    /// Restricts the edge to the internal automation caller.
    #[must_use]
    pub const fn for_system_only(mut self) -> Self {
        self.system_only = true;
        self
    }
}

/// In-memory map of transition rules keyed by `(from, to)`.
#[derive(Debug, Clone)]
pub struct TransitionRuleTable {
    rules: HashMap<(OrderStatus, OrderStatus), TransitionRule>,
}

impl TransitionRuleTable {
    /// Builds a table from an iterator of rules. Later rules replace
    /// earlier ones with the same `(from, to)` key.
    pub fn from_rules(rules: impl IntoIterator<Item = TransitionRule>) -> Self {
        Self {
            rules: rules
                .into_iter()
                .map(|rule| ((rule.from, rule.to), rule))
                .collect(),
        }
    }

    /// The standard rule set for the documented order flow.
    pub fn standard() -> Self {
        use ActorRole::{Admin, Staff};
        use OrderStatus::{
            Cancelled, Completed, Confirmed, Delivered, Packing, PendingConfirmation, Processing,
            ReturnRequested, Returned, Shipping,
        };

        Self::from_rules([
            // Payment capture moves a processing order forward; only the
            // automation caller may do so.
            TransitionRule::allow(Processing, PendingConfirmation).for_system_only(),
            TransitionRule::allow(Processing, Cancelled).with_reason_required(),
            TransitionRule::allow(PendingConfirmation, Confirmed).requiring_role(Staff),
            TransitionRule::allow(PendingConfirmation, Cancelled).with_reason_required(),
            TransitionRule::allow(Confirmed, Packing).requiring_role(Staff),
            TransitionRule::allow(Confirmed, Cancelled)
                .requiring_role(Staff)
                .with_reason_required(),
            TransitionRule::allow(Packing, Shipping).requiring_role(Staff),
            // Once packing has begun, cancellation needs an administrator.
            TransitionRule::allow(Packing, Cancelled)
                .requiring_role(Admin)
                .with_reason_required(),
            // Delivery confirmation comes from the carrier webhook.
            TransitionRule::allow(Shipping, Delivered).for_system_only(),
            TransitionRule::allow(Delivered, Completed),
            TransitionRule::allow(Delivered, ReturnRequested).with_reason_required(),
            // Post-sale returns out of the terminal Completed state.
            TransitionRule::allow(Completed, ReturnRequested).with_reason_required(),
            TransitionRule::allow(ReturnRequested, Returned)
                .requiring_role(Staff)
                .with_reason_required(),
            // Return request rejected: back to Completed.
            TransitionRule::allow(ReturnRequested, Completed)
                .requiring_role(Staff)
                .with_reason_required(),
        ])
    }

    /// Looks up the rule for a `(from, to)` edge.
    pub fn lookup(&self, from: OrderStatus, to: OrderStatus) -> Option<&TransitionRule> {
        self.rules.get(&(from, to))
    }

    /// Number of rules in the table.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for TransitionRuleTable {
    fn default() -> Self {
        Self::standard()
    }
}
