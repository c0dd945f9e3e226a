//! Storage ports for the core.
//!
//! These traits are the seams between the core and whatever persistence
//! the application chooses; `ordercore-memory` provides in-memory
//! adapters. The commit methods take the audit entries produced by the
//! change so the adapter can apply the state write and the audit append
//! as one atomic unit: both commit or both roll back, never one without
//! the other.

use crate::audit::{AggregateType, AuditEntry};
use crate::errors::StoreResult;
use crate::order::{Order, OrderStatus};
use crate::types::{OrderId, Timestamp, UnitId, VariantId, Version};
use crate::unit::Unit;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A page request with 0-based page number and bounded page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// 0-based page number.
    pub page: usize,
    /// Entries per page, clamped to `Self::MAX_PAGE_SIZE`.
    pub size: usize,
}

impl PageRequest {
    /// Maximum entries per page.
    pub const MAX_PAGE_SIZE: usize = 200;

    /// Creates a page request, clamping the size into `1..=MAX_PAGE_SIZE`.
    pub fn new(page: usize, size: usize) -> Self {
        Self {
            page,
            size: size.clamp(1, Self::MAX_PAGE_SIZE),
        }
    }

    /// The first page with the default size of 50.
    pub fn first() -> Self {
        Self::new(0, 50)
    }

    /// Offset of the first entry on this page, saturating at
    /// `usize::MAX` for absurd page numbers.
    pub const fn offset(&self) -> usize {
        self.page.saturating_mul(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first()
    }
}

/// One page of results with the total count across all pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// The entries on this page.
    pub items: Vec<T>,
    /// The request that produced this page.
    pub request: PageRequest,
    /// Total matching entries across all pages.
    pub total: u64,
}

impl<T> Page<T> {
    /// Creates a page.
    pub const fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
        Self {
            items,
            request,
            total,
        }
    }

    /// Whether more pages follow this one.
    pub fn has_next(&self) -> bool {
        let seen = self
            .request
            .page
            .saturating_add(1)
            .saturating_mul(self.request.size);
        (seen as u64) < self.total
    }
}

/// Port for order persistence with compare-and-swap status commits.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Loads an order by id.
    async fn load(&self, order_id: &OrderId) -> StoreResult<Order>;

    /// Inserts a newly created order.
    async fn insert(&self, order: Order) -> StoreResult<()>;

    /// Commits a status transition if and only if the order's version
    /// still equals `expected_version`; otherwise fails with
    /// `StoreError::VersionConflict` without writing anything.
    ///
    /// The audit entry is appended atomically with the status write.
    /// Returns the order's new version.
    async fn commit_transition(
        &self,
        order_id: &OrderId,
        expected_version: Version,
        new_status: OrderStatus,
        audit: AuditEntry,
    ) -> StoreResult<Version>;
}

/// Port for unit persistence.
///
/// Callers mutate units only while holding the unit's (or variant's)
/// lock from the `LockManager`; the store itself does not serialize
/// concurrent access.
#[async_trait]
pub trait UnitStore: Send + Sync {
    /// Loads a unit by serial number.
    async fn load(&self, unit_id: &UnitId) -> StoreResult<Unit>;

    /// Lists all units of a variant, in stable id order.
    async fn list_by_variant(&self, variant_id: &VariantId) -> StoreResult<Vec<Unit>>;

    /// Inserts a unit on intake.
    async fn insert(&self, unit: Unit) -> StoreResult<()>;

    /// Writes the unit's new state and appends the given audit entries
    /// as one atomic unit. A TTL reclamation followed by a reservation
    /// arrives here as two entries in one commit.
    async fn commit_unit(&self, unit: Unit, audit: Vec<AuditEntry>) -> StoreResult<()>;
}

/// Port for the append-only audit store.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Appends one immutable entry.
    async fn append(&self, entry: AuditEntry) -> StoreResult<()>;

    /// Returns an aggregate's entries, newest first.
    async fn query(
        &self,
        aggregate_type: AggregateType,
        aggregate_id: &str,
        page: PageRequest,
    ) -> StoreResult<Page<AuditEntry>>;

    /// Deletes entries recorded strictly before `cutoff`, returning the
    /// number removed. Retention sweeps are the only deletion path.
    async fn purge_before(&self, cutoff: Timestamp) -> StoreResult<u64>;
}
