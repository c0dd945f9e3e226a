//! Per-unit inventory reservation manager.
//!
//! Every mutation of a unit serializes on a lock keyed by that unit's
//! identity, and releases it on every exit path via the RAII guard. When
//! allocating "any available unit" of a variant, a variant-level lock
//! serializes the pick, but the chosen unit is still re-read and mutated
//! only under its own lock — the same one the unit-target operations
//! take. Lock waits are bounded: on expiry the operation fails fast with
//! `LockTimeout` and is never retried internally, so a caller's retry is
//! an explicit decision rather than silent starvation of other waiters.
//!
//! Reservation TTLs are enforced lazily: an expired hold is reclaimed on
//! the next access to the unit, which suffices because no component
//! inspects availability without going through this manager.

use crate::audit::{AggregateType, AuditAction, AuditEntry};
use crate::clock::Clock;
use crate::errors::{ReservationError, ReservationResult};
use crate::lock::{LockKey, LockManager};
use crate::store::UnitStore;
use crate::types::{Actor, Channel, OrderId, UnitId, VariantId};
use crate::unit::{Reservation, Unit, UnitStatus};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// What to reserve: a concrete unit, or any available unit of a variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReservationTarget {
    /// Reserve this exact serial number.
    Unit(UnitId),
    /// Reserve any available unit of this variant.
    Variant(VariantId),
}

/// Immutable reservation settings, injected at construction.
#[derive(Debug, Clone, Copy)]
pub struct ReservationConfig {
    /// Bounded wait for lock acquisition.
    pub lock_wait: Duration,
    /// TTL applied when a reserve call does not specify one.
    pub default_ttl: Duration,
}

impl Default for ReservationConfig {
    fn default() -> Self {
        Self {
            lock_wait: Duration::from_secs(3),
            default_ttl: Duration::from_secs(900),
        }
    }
}

/// Manages the reserve/release/sell/return lifecycle of units.
#[derive(Clone)]
pub struct InventoryReservationManager<S, L>
where
    S: UnitStore,
    L: LockManager,
{
    store: S,
    locks: L,
    clock: Arc<dyn Clock>,
    config: ReservationConfig,
}

impl<S, L> InventoryReservationManager<S, L>
where
    S: UnitStore,
    L: LockManager,
{
    /// Creates a manager over the given store, lock manager, and clock.
    pub fn new(store: S, locks: L, clock: Arc<dyn Clock>, config: ReservationConfig) -> Self {
        Self {
            store,
            locks,
            clock,
            config,
        }
    }

    /// Reserves a unit for an order.
    ///
    /// Returns the concrete unit id actually reserved (which, for a
    /// variant target, the manager chose). Exactly one of N concurrent
    /// calls for the same unit wins; the rest observe `AlreadyReserved`
    /// or `ItemUnavailable`. An expired prior hold is reclaimed first,
    /// producing a `Release` audit entry followed by the `Reserve` entry
    /// in the same atomic commit.
    #[instrument(skip(self, actor), fields(order_id = %order_id, channel = %channel))]
    pub async fn reserve(
        &self,
        target: &ReservationTarget,
        channel: Channel,
        order_id: &OrderId,
        ttl: Option<Duration>,
        actor: &Actor,
    ) -> ReservationResult<UnitId> {
        // The variant lock only serializes the pick; the chosen unit is
        // re-read and mutated under its own lock below, so a concurrent
        // unit-target call contends on the same mutex.
        let (unit_id, _variant_guard) = match target {
            ReservationTarget::Unit(unit_id) => (unit_id.clone(), None),
            ReservationTarget::Variant(variant_id) => {
                let key = LockKey::variant(variant_id);
                let guard = self.locks.acquire(&key, self.config.lock_wait).await?;
                let unit_id = self.pick_unit_of_variant(variant_id).await?;
                (unit_id, Some(guard))
            }
        };

        let key = LockKey::unit(&unit_id);
        let _guard = self.locks.acquire(&key, self.config.lock_wait).await?;

        let mut entries = Vec::new();
        let mut unit = self.store.load(&unit_id).await?;
        self.reclaim_if_expired(&mut unit, &mut entries);

        match unit.status() {
            UnitStatus::Available => {}
            UnitStatus::Reserved => {
                let holder = unit
                    .reservation()
                    .map(|reservation| reservation.order_id.clone())
                    .ok_or_else(|| {
                        ReservationError::Store(crate::errors::StoreError::Internal(format!(
                            "unit '{}' reserved without metadata",
                            unit.id()
                        )))
                    })?;
                debug!(unit_id = %unit.id(), %holder, "reserve lost: unit already held");
                return Err(ReservationError::AlreadyReserved {
                    unit_id: unit.id().clone(),
                    holder,
                });
            }
            status => {
                debug!(unit_id = %unit.id(), %status, "reserve rejected: unit not sellable");
                return Err(ReservationError::ItemUnavailable {
                    unit_id: unit.id().clone(),
                    status,
                });
            }
        }

        let now = self.clock.now();
        let old_value = unit.snapshot();
        unit.reserve(Reservation {
            order_id: order_id.clone(),
            channel,
            reserved_at: now,
            ttl: ttl.unwrap_or(self.config.default_ttl),
        });
        entries.push(AuditEntry::new(
            AggregateType::Unit,
            unit.id().to_string(),
            AuditAction::Reserve,
            actor.clone(),
            None,
            old_value,
            unit.snapshot(),
            now,
        ));

        self.store.commit_unit(unit, entries).await?;
        info!(%unit_id, "unit reserved");
        Ok(unit_id)
    }

    /// Releases a reservation, returning the unit to `Available`.
    ///
    /// Releasing an already-available unit is an Ok no-op; any other
    /// status is `ItemUnavailable`.
    #[instrument(skip(self, actor), fields(unit_id = %unit_id))]
    pub async fn release(
        &self,
        unit_id: &UnitId,
        actor: &Actor,
        reason: Option<&str>,
    ) -> ReservationResult<()> {
        let key = LockKey::unit(unit_id);
        let _guard = self.locks.acquire(&key, self.config.lock_wait).await?;

        let mut unit = self.store.load(unit_id).await?;
        match unit.status() {
            UnitStatus::Available => {
                debug!("release no-op: unit already available");
                Ok(())
            }
            UnitStatus::Reserved => {
                let old_value = unit.snapshot();
                unit.clear_reservation();
                let entry = AuditEntry::new(
                    AggregateType::Unit,
                    unit_id.to_string(),
                    AuditAction::Release,
                    actor.clone(),
                    reason.map(ToOwned::to_owned),
                    old_value,
                    unit.snapshot(),
                    self.clock.now(),
                );
                self.store.commit_unit(unit, vec![entry]).await?;
                info!("reservation released");
                Ok(())
            }
            status => Err(ReservationError::ItemUnavailable {
                unit_id: unit_id.clone(),
                status,
            }),
        }
    }

    /// Confirms the sale of a unit to an order.
    ///
    /// Requires the unit to be reserved for the same order, or available
    /// (direct sale paths such as POS).
    #[instrument(skip(self, actor), fields(unit_id = %unit_id, order_id = %order_id))]
    pub async fn confirm_sale(
        &self,
        unit_id: &UnitId,
        order_id: &OrderId,
        actor: &Actor,
    ) -> ReservationResult<()> {
        let key = LockKey::unit(unit_id);
        let _guard = self.locks.acquire(&key, self.config.lock_wait).await?;

        let mut entries = Vec::new();
        let mut unit = self.store.load(unit_id).await?;
        self.reclaim_if_expired(&mut unit, &mut entries);

        match unit.status() {
            UnitStatus::Available => {}
            UnitStatus::Reserved => {
                let holder = unit
                    .reservation()
                    .map(|reservation| &reservation.order_id)
                    .filter(|holder| *holder != order_id);
                if let Some(holder) = holder {
                    debug!(%holder, "sale rejected: reserved for another order");
                    return Err(ReservationError::AlreadyReserved {
                        unit_id: unit_id.clone(),
                        holder: holder.clone(),
                    });
                }
            }
            status => {
                return Err(ReservationError::ItemUnavailable {
                    unit_id: unit_id.clone(),
                    status,
                });
            }
        }

        let old_value = unit.snapshot();
        unit.mark_sold();
        entries.push(AuditEntry::new(
            AggregateType::Unit,
            unit_id.to_string(),
            AuditAction::Sell,
            actor.clone(),
            None,
            old_value,
            unit.snapshot(),
            self.clock.now(),
        ));
        self.store.commit_unit(unit, entries).await?;
        info!("unit sold");
        Ok(())
    }

    /// Registers the return of a sold unit.
    #[instrument(skip(self, actor), fields(unit_id = %unit_id))]
    pub async fn register_return(
        &self,
        unit_id: &UnitId,
        actor: &Actor,
        reason: Option<&str>,
    ) -> ReservationResult<()> {
        let key = LockKey::unit(unit_id);
        let _guard = self.locks.acquire(&key, self.config.lock_wait).await?;

        let mut unit = self.store.load(unit_id).await?;
        if unit.status() != UnitStatus::Sold {
            return Err(ReservationError::ItemUnavailable {
                unit_id: unit_id.clone(),
                status: unit.status(),
            });
        }

        let old_value = unit.snapshot();
        unit.mark_returned();
        let entry = AuditEntry::new(
            AggregateType::Unit,
            unit_id.to_string(),
            AuditAction::Return,
            actor.clone(),
            reason.map(ToOwned::to_owned),
            old_value,
            unit.snapshot(),
            self.clock.now(),
        );
        self.store.commit_unit(unit, vec![entry]).await?;
        info!("unit returned");
        Ok(())
    }

    /// Reclaims an expired reservation in place, recording the `Release`
    /// entry that will be committed together with the caller's write.
    fn reclaim_if_expired(&self, unit: &mut Unit, entries: &mut Vec<AuditEntry>) {
        let now = self.clock.now();
        if unit.reservation_expired(now) {
            let old_value = unit.snapshot();
            unit.clear_reservation();
            entries.push(AuditEntry::new(
                AggregateType::Unit,
                unit.id().to_string(),
                AuditAction::Release,
                Actor::automation(),
                Some("TTL expired".to_string()),
                old_value,
                unit.snapshot(),
                now,
            ));
            debug!(unit_id = %unit.id(), "expired reservation reclaimed");
        }
    }

    /// Chooses a unit for variant-level allocation: the first available
    /// unit, or the first one whose reservation has expired (reclaimed
    /// later, under the unit's own lock). Called with the variant lock
    /// held; the choice is only a candidate and is re-checked against a
    /// fresh read once the unit's lock is acquired.
    async fn pick_unit_of_variant(&self, variant_id: &VariantId) -> ReservationResult<UnitId> {
        let now = self.clock.now();
        let units = self.store.list_by_variant(variant_id).await?;

        if let Some(unit) = units
            .iter()
            .find(|unit| unit.status() == UnitStatus::Available)
        {
            return Ok(unit.id().clone());
        }

        if let Some(unit) = units.iter().find(|unit| unit.reservation_expired(now)) {
            return Ok(unit.id().clone());
        }

        debug!(%variant_id, "no unit free to reserve");
        Err(ReservationError::VariantExhausted(variant_id.clone()))
    }
}

impl<S, L> std::fmt::Debug for InventoryReservationManager<S, L>
where
    S: UnitStore + std::fmt::Debug,
    L: LockManager,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryReservationManager")
            .field("store", &self.store)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
