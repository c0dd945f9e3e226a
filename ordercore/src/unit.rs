//! The `Unit` aggregate: one physical, serial-numbered inventory item.
//!
//! A unit's status and its reservation metadata are kept consistent by the
//! transition methods on this type: `Reserved` implies a present
//! `Reservation`, any other status implies it is cleared. Fields are
//! private so the invariant cannot be bypassed.

use crate::types::{Channel, OrderId, Timestamp, UnitId, VariantId};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::time::Duration;

/// Lifecycle status of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitStatus {
    /// In stock and free to reserve or sell.
    Available,
    /// Held for an order, bounded by a TTL.
    Reserved,
    /// Sold to exactly one order.
    Sold,
    /// Returned by the customer after a sale.
    Returned,
    /// Damaged stock, not sellable.
    Damaged,
    /// Administratively withheld from sale.
    Unavailable,
    /// In transit between locations.
    InTransit,
    /// Held for quality control.
    QualityControl,
    /// On display, not sellable.
    Display,
    /// Disposed of; end of lifecycle.
    Disposed,
}

impl UnitStatus {
    /// Whether a reservation may be placed on a unit in this status.
    pub const fn can_be_reserved(self) -> bool {
        matches!(self, Self::Available)
    }

    /// Whether this status ends the unit's lifecycle.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Returned | Self::Damaged | Self::Disposed)
    }
}

impl Display for UnitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Available => "Available",
            Self::Reserved => "Reserved",
            Self::Sold => "Sold",
            Self::Returned => "Returned",
            Self::Damaged => "Damaged",
            Self::Unavailable => "Unavailable",
            Self::InTransit => "InTransit",
            Self::QualityControl => "QualityControl",
            Self::Display => "Display",
            Self::Disposed => "Disposed",
        };
        write!(f, "{name}")
    }
}

/// A time-bounded hold on a unit for one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// The order holding the reservation.
    pub order_id: OrderId,
    /// The sales channel that placed it.
    pub channel: Channel,
    /// When the hold was placed.
    pub reserved_at: Timestamp,
    /// How long the hold is honored. Expiry is enforced lazily on the
    /// next access to the unit.
    pub ttl: Duration,
}

impl Reservation {
    /// Whether this reservation has outlived its TTL as of `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now.since(self.reserved_at) > self.ttl
    }
}

/// A stored unit record whose status contradicts its reservation
/// metadata (`Reserved` without a hold, or a hold on any other status).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unit '{unit_id}' has status {status} inconsistent with its reservation metadata")]
pub struct UnitIntegrityError {
    /// The inconsistent unit.
    pub unit_id: UnitId,
    /// The status it claimed.
    pub status: UnitStatus,
}

/// One physical inventory item, tracked by serial number.
///
/// Deserialization goes through a shadow record validated by `TryFrom`,
/// so a stored record cannot smuggle in an inconsistent
/// status/reservation pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UnitRecord")]
pub struct Unit {
    id: UnitId,
    variant_id: VariantId,
    status: UnitStatus,
    reservation: Option<Reservation>,
}

#[derive(Deserialize)]
struct UnitRecord {
    id: UnitId,
    variant_id: VariantId,
    status: UnitStatus,
    reservation: Option<Reservation>,
}

impl TryFrom<UnitRecord> for Unit {
    type Error = UnitIntegrityError;

    fn try_from(record: UnitRecord) -> Result<Self, Self::Error> {
        if (record.status == UnitStatus::Reserved) != record.reservation.is_some() {
            return Err(UnitIntegrityError {
                unit_id: record.id,
                status: record.status,
            });
        }
        Ok(Self {
            id: record.id,
            variant_id: record.variant_id,
            status: record.status,
            reservation: record.reservation,
        })
    }
}

impl Unit {
    /// Registers a unit on intake. New units start `Available`.
    pub const fn register_intake(id: UnitId, variant_id: VariantId) -> Self {
        Self {
            id,
            variant_id,
            status: UnitStatus::Available,
            reservation: None,
        }
    }

    /// The unit's serial-number identity.
    pub const fn id(&self) -> &UnitId {
        &self.id
    }

    /// The variant this unit belongs to.
    pub const fn variant_id(&self) -> &VariantId {
        &self.variant_id
    }

    /// Current lifecycle status.
    pub const fn status(&self) -> UnitStatus {
        self.status
    }

    /// The active reservation, present exactly when status is `Reserved`.
    pub const fn reservation(&self) -> Option<&Reservation> {
        self.reservation.as_ref()
    }

    /// Whether the unit is `Reserved` and the hold has outlived its TTL.
    pub fn reservation_expired(&self, now: Timestamp) -> bool {
        self.reservation
            .as_ref()
            .is_some_and(|reservation| reservation.is_expired(now))
    }

    /// Places a reservation. The caller must have verified the unit is
    /// `Available`; this method only installs the consistent pair.
    pub fn reserve(&mut self, reservation: Reservation) {
        debug_assert!(self.status.can_be_reserved());
        self.status = UnitStatus::Reserved;
        self.reservation = Some(reservation);
    }

    /// Clears a reservation, returning the unit to `Available`.
    pub fn clear_reservation(&mut self) {
        debug_assert_eq!(self.status, UnitStatus::Reserved);
        self.status = UnitStatus::Available;
        self.reservation = None;
    }

    /// Transitions to `Sold`, clearing any reservation metadata.
    pub fn mark_sold(&mut self) {
        self.status = UnitStatus::Sold;
        self.reservation = None;
    }

    /// Transitions a sold unit to `Returned`.
    pub fn mark_returned(&mut self) {
        debug_assert_eq!(self.status, UnitStatus::Sold);
        self.status = UnitStatus::Returned;
        self.reservation = None;
    }

    /// JSON snapshot of the unit's externally visible state, used for
    /// audit old/new values.
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "status": self.status.to_string(),
            "reservation": self.reservation.as_ref().map(|r| serde_json::json!({
                "order_id": r.order_id.to_string(),
                "channel": r.channel.to_string(),
                "reserved_at": r.reserved_at,
                "ttl_secs": r.ttl.as_secs(),
            })),
        })
    }
}
