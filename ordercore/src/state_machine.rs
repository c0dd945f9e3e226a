//! Order status state machine.
//!
//! Validates a requested transition against the rule table, enforces the
//! role/reason/system gates, and commits through a compare-and-swap on the
//! order's version. Rule violations are expected outcomes returned to the
//! caller, not failures; they are never logged above debug level and they
//! leave the order untouched.

use crate::audit::{AggregateType, AuditAction, AuditEntry};
use crate::clock::Clock;
use crate::errors::{TransitionError, TransitionResult};
use crate::order::OrderStatus;
use crate::rules::TransitionRuleTable;
use crate::store::OrderStore;
use crate::types::{Actor, OrderId};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Drives order status transitions.
#[derive(Clone)]
pub struct OrderStateMachine<S>
where
    S: OrderStore,
{
    store: S,
    rules: Arc<TransitionRuleTable>,
    clock: Arc<dyn Clock>,
}

impl<S> OrderStateMachine<S>
where
    S: OrderStore,
{
    /// Creates a state machine over the given store, rule table, and clock.
    pub fn new(store: S, rules: Arc<TransitionRuleTable>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            rules,
            clock,
        }
    }

    /// Requests a status transition for an order.
    ///
    /// On success the new status is committed together with exactly one
    /// `StatusChange` audit entry, and the order's version is bumped. A
    /// concurrent commit since the read returns `OptimisticConflict`; the
    /// caller may retry once with a fresh read (or use
    /// [`Self::request_transition_with_retry`]).
    #[instrument(skip(self, actor), fields(order_id = %order_id, target = %target))]
    pub async fn request_transition(
        &self,
        order_id: &OrderId,
        target: OrderStatus,
        actor: &Actor,
        reason: Option<&str>,
    ) -> TransitionResult<OrderStatus> {
        let order = self.store.load(order_id).await?;
        let current = order.status();
        let expected_version = order.version();

        let rule = match self.rules.lookup(current, target) {
            Some(rule) if rule.allowed => rule,
            _ => {
                debug!(%current, "transition rejected: no rule allows the edge");
                return Err(TransitionError::InvalidTransition {
                    from: current,
                    to: target,
                });
            }
        };

        if let Some(required) = rule.required_role {
            if !actor.has_role(required) {
                debug!(%required, actual = %actor.role, "transition rejected: insufficient role");
                return Err(TransitionError::InsufficientRole {
                    required,
                    actual: actor.role,
                });
            }
        }

        let reason = reason.map(str::trim).filter(|reason| !reason.is_empty());
        if rule.reason_required && reason.is_none() {
            debug!(%current, "transition rejected: reason required but blank");
            return Err(TransitionError::ReasonRequired {
                from: current,
                to: target,
            });
        }

        if rule.system_only && !actor.is_automation() {
            debug!(%current, "transition rejected: system-only edge requested by human");
            return Err(TransitionError::SystemOnlyViolation {
                from: current,
                to: target,
            });
        }

        let audit = AuditEntry::new(
            AggregateType::Order,
            order_id.to_string(),
            AuditAction::StatusChange,
            actor.clone(),
            reason.map(ToOwned::to_owned),
            serde_json::json!({ "status": current.to_string() }),
            serde_json::json!({ "status": target.to_string() }),
            self.clock.now(),
        );

        let new_version = self
            .store
            .commit_transition(order_id, expected_version, target, audit)
            .await?;

        info!(%current, %new_version, "order status transition committed");
        Ok(target)
    }

    /// Like [`Self::request_transition`], but retries exactly once with a
    /// fresh read when the first attempt loses the version race. A second
    /// conflict is surfaced; retrying further would mask genuine
    /// contention.
    pub async fn request_transition_with_retry(
        &self,
        order_id: &OrderId,
        target: OrderStatus,
        actor: &Actor,
        reason: Option<&str>,
    ) -> TransitionResult<OrderStatus> {
        match self
            .request_transition(order_id, target, actor, reason)
            .await
        {
            Err(TransitionError::OptimisticConflict { .. }) => {
                debug!(%order_id, "optimistic conflict, retrying once with a fresh read");
                self.request_transition(order_id, target, actor, reason)
                    .await
            }
            other => other,
        }
    }
}

impl<S> std::fmt::Debug for OrderStateMachine<S>
where
    S: OrderStore + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderStateMachine")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
