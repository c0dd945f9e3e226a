//! Append-only audit trail.
//!
//! Every state-changing operation in the core produces exactly one audit
//! entry, written atomically with the triggering change. Entries are
//! immutable after insert; the only permitted deletion path is the
//! retention sweep (`purge_before`).

use crate::clock::Clock;
use crate::errors::StoreResult;
use crate::store::{AuditStore, Page, PageRequest};
use crate::types::{Actor, Timestamp};
use nutype::nutype;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::Arc;
use uuid::Uuid;

/// Identifier of one audit entry, a UUIDv7 so ids sort by creation time.
#[nutype(
    validate(predicate = |id: &Uuid| id.get_version() == Some(uuid::Version::SortRand)),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct AuditEntryId(Uuid);

impl AuditEntryId {
    /// Creates a new id with the current timestamp.
    pub fn new() -> Self {
        Self::try_new(Uuid::now_v7()).expect("Uuid::now_v7() should always return a valid v7 UUID")
    }
}

impl Default for AuditEntryId {
    fn default() -> Self {
        Self::new()
    }
}

/// Which aggregate an audit entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateType {
    /// An order aggregate.
    Order,
    /// A unit (serial number) aggregate.
    Unit,
}

impl Display for AggregateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Order => write!(f, "Order"),
            Self::Unit => write!(f, "Unit"),
        }
    }
}

/// The kind of state change an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditAction {
    /// An order status transition.
    StatusChange,
    /// A unit was reserved.
    Reserve,
    /// A reservation was released (explicitly or by TTL reclaim).
    Release,
    /// A unit was sold.
    Sell,
    /// A sold unit was returned.
    Return,
}

impl Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::StatusChange => "StatusChange",
            Self::Reserve => "Reserve",
            Self::Release => "Release",
            Self::Sell => "Sell",
            Self::Return => "Return",
        };
        write!(f, "{name}")
    }
}

/// An immutable record of one state-changing action on an aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique, creation-time-ordered identifier.
    pub id: AuditEntryId,
    /// The kind of aggregate changed.
    pub aggregate_type: AggregateType,
    /// Identity of the changed aggregate.
    pub aggregate_id: String,
    /// What happened.
    pub action: AuditAction,
    /// Who did it.
    pub actor: Actor,
    /// Why, when the rule or operation demanded a reason.
    pub reason: Option<String>,
    /// Structured snapshot before the change.
    pub old_value: serde_json::Value,
    /// Structured snapshot after the change.
    pub new_value: serde_json::Value,
    /// When the change was recorded.
    pub recorded_at: Timestamp,
}

impl AuditEntry {
    /// Creates a new entry with a fresh id.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        aggregate_type: AggregateType,
        aggregate_id: String,
        action: AuditAction,
        actor: Actor,
        reason: Option<String>,
        old_value: serde_json::Value,
        new_value: serde_json::Value,
        recorded_at: Timestamp,
    ) -> Self {
        Self {
            id: AuditEntryId::new(),
            aggregate_type,
            aggregate_id,
            action,
            actor,
            reason,
            old_value,
            new_value,
            recorded_at,
        }
    }
}

/// Records and queries audit entries through an `AuditStore`.
///
/// State-changing components write their entries atomically with the state
/// write through the store ports; this recorder is the direct surface for
/// standalone records, history queries, and the retention sweep.
#[derive(Clone)]
pub struct AuditTrailRecorder<A>
where
    A: AuditStore,
{
    store: A,
    clock: Arc<dyn Clock>,
}

impl<A> AuditTrailRecorder<A>
where
    A: AuditStore,
{
    /// Creates a recorder over the given store and clock.
    pub fn new(store: A, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Appends one immutable entry, timestamped now.
    #[allow(clippy::too_many_arguments)]
    pub async fn record(
        &self,
        aggregate_type: AggregateType,
        aggregate_id: String,
        action: AuditAction,
        actor: Actor,
        reason: Option<String>,
        old_value: serde_json::Value,
        new_value: serde_json::Value,
    ) -> StoreResult<AuditEntryId> {
        let entry = AuditEntry::new(
            aggregate_type,
            aggregate_id,
            action,
            actor,
            reason,
            old_value,
            new_value,
            self.clock.now(),
        );
        let id = entry.id;
        self.store.append(entry).await?;
        Ok(id)
    }

    /// Returns the aggregate's entries, newest first.
    pub async fn history(
        &self,
        aggregate_type: AggregateType,
        aggregate_id: &str,
        page: PageRequest,
    ) -> StoreResult<Page<AuditEntry>> {
        self.store.query(aggregate_type, aggregate_id, page).await
    }

    /// Retention sweep: deletes entries recorded before `cutoff` and
    /// returns how many were removed. This is the only deletion path.
    pub async fn purge_before(&self, cutoff: Timestamp) -> StoreResult<u64> {
        self.store.purge_before(cutoff).await
    }
}

impl<A> std::fmt::Debug for AuditTrailRecorder<A>
where
    A: AuditStore + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditTrailRecorder")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
