//! In-memory adapters for the `ordercore` ports.
//!
//! This crate provides thread-safe in-memory implementations of the
//! `OrderStore`, `UnitStore`, `AuditStore`, `LockManager`, and `Clock`
//! ports, useful for testing and development scenarios where persistence
//! is not required. The order and unit stores share one audit store so a
//! state write and its audit append happen under one critical section,
//! matching the atomicity the ports demand.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::significant_drop_tightening)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use ordercore::audit::{AggregateType, AuditEntry};
use ordercore::clock::Clock;
use ordercore::errors::{LockError, StoreError, StoreResult};
use ordercore::lock::{LockGuard, LockKey, LockManager};
use ordercore::order::{Order, OrderStatus};
use ordercore::store::{AuditStore, OrderStore, Page, PageRequest, UnitStore};
use ordercore::types::{OrderId, Timestamp, UnitId, VariantId, Version};
use ordercore::unit::Unit;

/// Thread-safe in-memory audit store.
///
/// Clones share storage, so the order and unit stores can append into the
/// same trail.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuditStore {
    entries: Arc<RwLock<Vec<AuditEntry>>>,
}

impl InMemoryAuditStore {
    /// Create a new empty audit store.
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, entry: AuditEntry) {
        self.entries.write().expect("RwLock poisoned").push(entry);
    }

    fn push_all(&self, entries: Vec<AuditEntry>) {
        self.entries
            .write()
            .expect("RwLock poisoned")
            .extend(entries);
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn append(&self, entry: AuditEntry) -> StoreResult<()> {
        self.push(entry);
        Ok(())
    }

    async fn query(
        &self,
        aggregate_type: AggregateType,
        aggregate_id: &str,
        page: PageRequest,
    ) -> StoreResult<Page<AuditEntry>> {
        let entries = self.entries.read().expect("RwLock poisoned");

        let mut matching: Vec<AuditEntry> = entries
            .iter()
            .filter(|entry| {
                entry.aggregate_type == aggregate_type && entry.aggregate_id == aggregate_id
            })
            .cloned()
            .collect();

        // Newest first; ids are v7 so they break timestamp ties in
        // creation order.
        matching.sort_by(|a, b| {
            b.recorded_at
                .cmp(&a.recorded_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(page.offset())
            .take(page.size)
            .collect();

        Ok(Page::new(items, page, total))
    }

    async fn purge_before(&self, cutoff: Timestamp) -> StoreResult<u64> {
        let mut entries = self.entries.write().expect("RwLock poisoned");
        let before = entries.len();
        entries.retain(|entry| entry.recorded_at >= cutoff);
        let removed = (before - entries.len()) as u64;
        tracing::debug!(removed, "audit retention sweep completed");
        Ok(removed)
    }
}

/// Thread-safe in-memory order store with compare-and-swap commits.
#[derive(Debug, Clone)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
    audit: InMemoryAuditStore,
}

impl InMemoryOrderStore {
    /// Create a store appending into the given audit store.
    pub fn new(audit: InMemoryAuditStore) -> Self {
        Self {
            orders: Arc::new(RwLock::new(HashMap::new())),
            audit,
        }
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn load(&self, order_id: &OrderId) -> StoreResult<Order> {
        let orders = self.orders.read().expect("RwLock poisoned");
        orders
            .get(order_id)
            .cloned()
            .ok_or_else(|| StoreError::OrderNotFound(order_id.clone()))
    }

    async fn insert(&self, order: Order) -> StoreResult<()> {
        let mut orders = self.orders.write().expect("RwLock poisoned");
        if orders.contains_key(order.id()) {
            return Err(StoreError::DuplicateId(order.id().to_string()));
        }
        orders.insert(order.id().clone(), order);
        Ok(())
    }

    async fn commit_transition(
        &self,
        order_id: &OrderId,
        expected_version: Version,
        new_status: OrderStatus,
        audit: AuditEntry,
    ) -> StoreResult<Version> {
        let mut orders = self.orders.write().expect("RwLock poisoned");
        let order = orders
            .get_mut(order_id)
            .ok_or_else(|| StoreError::OrderNotFound(order_id.clone()))?;

        if order.version() != expected_version {
            return Err(StoreError::VersionConflict {
                order_id: order_id.clone(),
                expected: expected_version,
                current: order.version(),
            });
        }

        // Status write and audit append land while the write lock is
        // held: one atomic unit, or neither.
        order.apply_status(new_status);
        self.audit.push(audit);
        Ok(order.version())
    }
}

/// Thread-safe in-memory unit store.
#[derive(Debug, Clone)]
pub struct InMemoryUnitStore {
    units: Arc<RwLock<HashMap<UnitId, Unit>>>,
    audit: InMemoryAuditStore,
}

impl InMemoryUnitStore {
    /// Create a store appending into the given audit store.
    pub fn new(audit: InMemoryAuditStore) -> Self {
        Self {
            units: Arc::new(RwLock::new(HashMap::new())),
            audit,
        }
    }
}

#[async_trait]
impl UnitStore for InMemoryUnitStore {
    async fn load(&self, unit_id: &UnitId) -> StoreResult<Unit> {
        let units = self.units.read().expect("RwLock poisoned");
        units
            .get(unit_id)
            .cloned()
            .ok_or_else(|| StoreError::UnitNotFound(unit_id.clone()))
    }

    async fn list_by_variant(&self, variant_id: &VariantId) -> StoreResult<Vec<Unit>> {
        let units = self.units.read().expect("RwLock poisoned");
        let mut matching: Vec<Unit> = units
            .values()
            .filter(|unit| unit.variant_id() == variant_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(matching)
    }

    async fn insert(&self, unit: Unit) -> StoreResult<()> {
        let mut units = self.units.write().expect("RwLock poisoned");
        if units.contains_key(unit.id()) {
            return Err(StoreError::DuplicateId(unit.id().to_string()));
        }
        units.insert(unit.id().clone(), unit);
        Ok(())
    }

    async fn commit_unit(&self, unit: Unit, audit: Vec<AuditEntry>) -> StoreResult<()> {
        let mut units = self.units.write().expect("RwLock poisoned");
        units.insert(unit.id().clone(), unit);
        self.audit.push_all(audit);
        Ok(())
    }
}

/// In-process lock manager: one tokio mutex per key, bounded acquisition.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLockManager {
    locks: Arc<Mutex<HashMap<LockKey, Arc<tokio::sync::Mutex<()>>>>>,
}

impl InMemoryLockManager {
    /// Create a new lock manager.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockManager for InMemoryLockManager {
    async fn acquire(&self, key: &LockKey, wait: Duration) -> Result<LockGuard, LockError> {
        let mutex = {
            let mut locks = self.locks.lock().expect("Mutex poisoned");
            Arc::clone(
                locks
                    .entry(key.clone())
                    .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
            )
        };

        match tokio::time::timeout(wait, mutex.lock_owned()).await {
            Ok(guard) => Ok(LockGuard::new(guard)),
            Err(_) => Err(LockError::Timeout {
                key: key.clone(),
                waited: wait,
            }),
        }
    }
}

/// Manually advanceable clock for TTL tests.
///
/// Clones share the same instant, so the component under test and the
/// test itself observe one timeline.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<RwLock<Timestamp>>,
}

impl ManualClock {
    /// Create a clock frozen at the given instant.
    pub fn starting_at(start: Timestamp) -> Self {
        Self {
            now: Arc::new(RwLock::new(start)),
        }
    }

    /// Create a clock frozen at the current wall time.
    pub fn starting_now() -> Self {
        Self::starting_at(Timestamp::now())
    }

    /// Advance the clock by the given duration.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write().expect("RwLock poisoned");
        *now = Timestamp::new(
            *now.as_datetime() + chrono::Duration::from_std(by).expect("duration in range"),
        );
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.read().expect("RwLock poisoned")
    }
}
