//! Error types for `OrderCore`.
//!
//! Every operation returns a typed result; business-rule violations are
//! expected outcomes handed back to the caller, never ambient panics or
//! exceptions crossing component boundaries. Infrastructure failures
//! (store or lock service unreachable) propagate upward unchanged.

use crate::lock::LockKey;
use crate::order::OrderStatus;
use crate::types::{ActorRole, MoneyError, OrderId, UnitId, VariantId, Version};
use crate::unit::UnitStatus;
use std::time::Duration;
use thiserror::Error;

/// Errors from the storage ports (`OrderStore`, `UnitStore`, `AuditStore`).
///
/// `VersionConflict` is the storage-level signal behind optimistic
/// concurrency; higher layers convert it to their own conflict variant.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The requested order was not found.
    #[error("Order '{0}' not found")]
    OrderNotFound(OrderId),

    /// The requested unit was not found.
    #[error("Unit '{0}' not found")]
    UnitNotFound(UnitId),

    /// The compare-and-swap write lost against a concurrent commit.
    #[error("Version conflict on order '{order_id}': expected {expected}, but current is {current}")]
    VersionConflict {
        /// The order with the version conflict.
        order_id: OrderId,
        /// The version the writer read before attempting the commit.
        expected: Version,
        /// The actual current version.
        current: Version,
    },

    /// An aggregate with the same identity already exists.
    #[error("Duplicate aggregate id: {0}")]
    DuplicateId(String),

    /// The store is temporarily unavailable.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// An unexpected internal error occurred.
    #[error("Internal store error: {0}")]
    Internal(String),
}

/// Errors from the `LockManager` port.
#[derive(Debug, Clone, Error)]
pub enum LockError {
    /// The bounded wait for the lock expired.
    #[error("Timed out acquiring lock '{key}' after {waited:?}")]
    Timeout {
        /// The contended lock key.
        key: LockKey,
        /// How long the caller waited.
        waited: Duration,
    },

    /// The lock service is unreachable.
    #[error("Lock service unavailable: {0}")]
    Unavailable(String),
}

/// Errors returned by `OrderStateMachine::request_transition`.
#[derive(Debug, Clone, Error)]
pub enum TransitionError {
    /// No rule allows this `(from, to)` edge.
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        /// Current order status.
        from: OrderStatus,
        /// Requested target status.
        to: OrderStatus,
    },

    /// The rule requires a role the actor does not hold.
    #[error("Insufficient role: transition requires {required}, actor is {actual}")]
    InsufficientRole {
        /// The role the rule requires.
        required: ActorRole,
        /// The actor's actual role.
        actual: ActorRole,
    },

    /// The rule requires a non-blank reason and none was given.
    #[error("A reason is required for the transition from {from} to {to}")]
    ReasonRequired {
        /// Current order status.
        from: OrderStatus,
        /// Requested target status.
        to: OrderStatus,
    },

    /// The rule is reserved for the internal automation caller.
    #[error("Transition from {from} to {to} may only be performed by the system")]
    SystemOnlyViolation {
        /// Current order status.
        from: OrderStatus,
        /// Requested target status.
        to: OrderStatus,
    },

    /// A concurrent commit changed the order since it was read.
    ///
    /// The caller may retry exactly once with a fresh read.
    #[error("Optimistic conflict on order '{order_id}': expected version {expected}, current is {current}")]
    OptimisticConflict {
        /// The contended order.
        order_id: OrderId,
        /// The version the loser read.
        expected: Version,
        /// The version that won.
        current: Version,
    },

    /// The order does not exist.
    #[error("Order '{0}' not found")]
    OrderNotFound(OrderId),

    /// An infrastructure failure in the order store.
    #[error("Store error: {0}")]
    Store(StoreError),
}

/// Errors returned by the `InventoryReservationManager` operations.
#[derive(Debug, Clone, Error)]
pub enum ReservationError {
    /// The bounded wait for the per-unit lock expired.
    ///
    /// Never retried automatically; the caller decides.
    #[error("Timed out acquiring lock '{key}' after {waited:?}")]
    LockTimeout {
        /// The contended lock key.
        key: LockKey,
        /// How long the manager waited.
        waited: Duration,
    },

    /// The unit is reserved by another order.
    #[error("Unit '{unit_id}' is already reserved for order '{holder}'")]
    AlreadyReserved {
        /// The contested unit.
        unit_id: UnitId,
        /// The order currently holding the reservation.
        holder: OrderId,
    },

    /// The unit is in a non-sellable status, or the operation's required
    /// status does not hold (e.g. returning a unit that was never sold).
    #[error("Unit '{unit_id}' is unavailable (status: {status})")]
    ItemUnavailable {
        /// The unit that could not satisfy the request.
        unit_id: UnitId,
        /// The status it was observed in.
        status: UnitStatus,
    },

    /// No unit of the requested variant is free to reserve.
    #[error("No available unit for variant '{0}'")]
    VariantExhausted(VariantId),

    /// The named unit does not exist.
    #[error("No unit found with id '{0}'")]
    ReservationNotFound(UnitId),

    /// An infrastructure failure in the unit store.
    #[error("Store error: {0}")]
    Store(StoreError),

    /// An infrastructure failure in the lock service.
    #[error("Lock error: {0}")]
    Lock(LockError),
}

/// Errors from the `CatalogLookup` port.
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    /// The variant is unknown to the catalog.
    #[error("Variant '{0}' not found in catalog")]
    VariantNotFound(VariantId),

    /// The catalog service is unreachable.
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),
}

/// Errors returned by `CartConversionValidator::validate`.
///
/// Drift findings (unavailable items, price changes, total mismatch) are
/// *not* errors; they are reported in the validation result. This type
/// covers only infrastructure failures of the lookup itself.
#[derive(Debug, Clone, Error)]
pub enum CartValidationError {
    /// The catalog lookup for a variant exceeded its deadline.
    #[error("Catalog lookup for variant '{variant_id}' timed out after {waited:?}")]
    CatalogTimeout {
        /// The variant whose lookup timed out.
        variant_id: VariantId,
        /// The configured deadline.
        waited: Duration,
    },

    /// The catalog lookup failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Recomputing the cart total produced an invalid amount.
    #[error("Amount error: {0}")]
    Amount(#[from] MoneyError),
}

/// Type alias for transition results.
pub type TransitionResult<T> = Result<T, TransitionError>;

/// Type alias for reservation results.
pub type ReservationResult<T> = Result<T, ReservationError>;

/// Type alias for store results.
pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for TransitionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::VersionConflict {
                order_id,
                expected,
                current,
            } => Self::OptimisticConflict {
                order_id,
                expected,
                current,
            },
            StoreError::OrderNotFound(order_id) => Self::OrderNotFound(order_id),
            other => Self::Store(other),
        }
    }
}

impl From<StoreError> for ReservationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UnitNotFound(unit_id) => Self::ReservationNotFound(unit_id),
            other => Self::Store(other),
        }
    }
}

impl From<LockError> for ReservationError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Timeout { key, waited } => Self::LockTimeout { key, waited },
            other => Self::Lock(other),
        }
    }
}
