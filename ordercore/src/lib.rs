//! `OrderCore` - Order lifecycle and inventory reservation core
//!
//! This library implements the correctness-critical core of an e-commerce
//! backend: a rule-table-driven order status state machine with optimistic
//! concurrency, a per-unit (serial number) inventory reservation manager
//! under bounded mutual exclusion with lazy TTL expiry, a cart-to-order
//! conversion validator that detects drift between a stale cart snapshot
//! and live catalog state, and an append-only audit trail recorded
//! atomically with every state change.
//!
//! Storage, locking, catalog lookup, and time are ports (traits) so the
//! surrounding application chooses its adapters; `ordercore-memory`
//! provides thread-safe in-memory implementations for testing.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod audit;
pub mod cart;
pub mod clock;
pub mod errors;
pub mod lock;
pub mod order;
pub mod reservation;
pub mod rules;
pub mod state_machine;
pub mod store;
pub mod types;
pub mod unit;

pub use audit::{AggregateType, AuditAction, AuditEntry, AuditEntryId, AuditTrailRecorder};
pub use cart::{
    CartConversionValidator, CartLineSnapshot, CartSnapshot, CartValidationResult, CatalogLookup,
    PriceChange, ValidatorConfig, VariantQuote,
};
pub use clock::{Clock, SystemClock};
pub use errors::{
    CartValidationError, CatalogError, LockError, ReservationError, StoreError, TransitionError,
};
pub use lock::{LockGuard, LockKey, LockManager};
pub use order::{Order, OrderLineItem, OrderStatus};
pub use reservation::{InventoryReservationManager, ReservationConfig, ReservationTarget};
pub use rules::{TransitionRule, TransitionRuleTable};
pub use state_machine::OrderStateMachine;
pub use store::{AuditStore, OrderStore, Page, PageRequest, UnitStore};
pub use types::{
    Actor, ActorId, ActorOrigin, ActorRole, CartId, Channel, Money, MoneyError, OrderId, Quantity,
    Timestamp, UnitId, VariantId, Version,
};
pub use unit::{Reservation, Unit, UnitIntegrityError, UnitStatus};
