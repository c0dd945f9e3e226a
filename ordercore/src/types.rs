//! Core domain types for the `OrderCore` library.
//!
//! All identifier and amount types use smart constructors so that a value,
//! once constructed, is valid everywhere it flows ("parse, don't validate").

use chrono::{DateTime, Utc};
use nutype::nutype;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

/// Order identifier.
///
/// Format: ORD-{UPPERCASE_ALPHANUMERIC}, e.g. `ORD-A1B2C3D4`.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 50, regex = r"^ORD-[A-Z0-9]+$"),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        Display,
        AsRef,
        Deref,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct OrderId(String);

impl OrderId {
    /// Generate a new order ID with a random UUID suffix.
    pub fn generate() -> Self {
        let uuid = Uuid::now_v7().simple().to_string().to_uppercase();
        Self::try_new(format!("ORD-{}", &uuid[..8])).expect("Generated OrderId should be valid")
    }
}

/// Unit (serial number) identifier: one physical, individually tracked
/// inventory item.
///
/// Format: SN-{UPPERCASE_ALPHANUMERIC}, e.g. `SN-500`.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 50, regex = r"^SN-[A-Z0-9]+$"),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        Display,
        AsRef,
        Deref,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct UnitId(String);

/// Product variant identifier: a sellable configuration grouping many units.
///
/// Format: VAR-{UPPERCASE_ALPHANUMERIC}, e.g. `VAR-CPU16RAM`.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 50, regex = r"^VAR-[A-Z0-9]+$"),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        Display,
        AsRef,
        Deref,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct VariantId(String);

/// Cart identifier.
///
/// Format: CRT-{UPPERCASE_ALPHANUMERIC}.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 50, regex = r"^CRT-[A-Z0-9]+$"),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        Display,
        AsRef,
        Deref,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct CartId(String);

/// Sales channel a reservation was made through, e.g. `POS` or `ONLINE`.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 32),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        Display,
        AsRef,
        Deref,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct Channel(String);

/// Identifier of the acting user or system.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 64),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        Display,
        AsRef,
        Deref,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct ActorId(String);

/// Optimistic-concurrency version of an order.
///
/// Versions start at 0 and strictly increase with each committed transition.
#[nutype(
    validate(greater_or_equal = 0),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Display,
        Into,
        Serialize,
        Deserialize
    )
)]
pub struct Version(u64);

impl Version {
    /// Creates the initial version (0) for a newly created order.
    pub fn initial() -> Self {
        Self::try_new(0).expect("0 is always a valid version")
    }

    /// Returns the next version after this one.
    #[must_use]
    pub fn next(self) -> Self {
        let current: u64 = self.into();
        Self::try_new(current + 1).expect("next version should always be valid")
    }
}

/// A timestamp for state changes, reservations, and audit entries.
///
/// Wraps a UTC `DateTime` so the whole system handles time consistently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a new timestamp from a UTC `DateTime`.
    pub const fn new(datetime: DateTime<Utc>) -> Self {
        Self(datetime)
    }

    /// Creates a timestamp representing the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Returns the underlying `DateTime`.
    pub const fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Converts the timestamp into the underlying `DateTime`.
    pub const fn into_datetime(self) -> DateTime<Utc> {
        self.0
    }

    /// Elapsed duration from `earlier` to `self`, or zero if `earlier` is
    /// in the future relative to `self`.
    pub fn since(&self, earlier: Self) -> std::time::Duration {
        (self.0 - earlier.0).to_std().unwrap_or_default()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(datetime: DateTime<Utc>) -> Self {
        Self::new(datetime)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(timestamp: Timestamp) -> Self {
        timestamp.into_datetime()
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Errors produced by the `Money` and `Quantity` smart constructors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    /// Negative, over-scaled, or out-of-range money amount.
    #[error("Invalid money amount: {0}")]
    InvalidAmount(String),
    /// Zero, out-of-range, or overflowing quantity.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),
}

/// A monetary amount with validation.
///
/// Uses `Decimal` for precise financial arithmetic. Must be non-negative
/// with at most 2 decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(Decimal);

impl Money {
    /// Maximum money amount (one trillion currency units).
    pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

    /// Create money from minor units (hundredths), avoiding floating point.
    pub fn from_minor_units(minor: u64) -> Result<Self, MoneyError> {
        let decimal = Decimal::new(minor as i64, 2);
        Self::new(decimal)
    }

    /// Create money from a decimal amount.
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() {
            return Err(MoneyError::InvalidAmount(format!(
                "Money amount cannot be negative: {amount}"
            )));
        }
        if amount.scale() > 2 {
            return Err(MoneyError::InvalidAmount(format!(
                "Money amount cannot have more than 2 decimal places: {amount}"
            )));
        }
        if amount > Self::MAX_AMOUNT {
            return Err(MoneyError::InvalidAmount(format!(
                "Money amount {amount} exceeds maximum {}",
                Self::MAX_AMOUNT
            )));
        }
        Ok(Self(amount))
    }

    /// A zero amount.
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// The underlying decimal value.
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Convert to minor units (hundredths) for storage.
    pub fn to_minor_units(&self) -> u64 {
        (self.0 * Decimal::from(100)).to_u64().unwrap_or(0)
    }

    /// Add two amounts, re-validating the result.
    pub fn checked_add(self, other: Self) -> Result<Self, MoneyError> {
        Self::new(self.0 + other.0)
    }

    /// Signed difference `self - other` as a raw decimal.
    ///
    /// Used for price-drift deltas, which may legitimately be negative.
    pub fn signed_delta(self, other: Self) -> Decimal {
        self.0 - other.0
    }

    /// Multiply by a quantity.
    pub fn multiply_by_quantity(self, quantity: Quantity) -> Result<Self, MoneyError> {
        Self::new(self.0 * Decimal::from(quantity.value()))
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

/// Quantity of a variant on an order line.
///
/// Must be positive, maximum 1000 per line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Quantity(u32);

impl Quantity {
    /// Maximum quantity per order line.
    pub const MAX_QUANTITY: u32 = 1000;

    /// Create a new quantity.
    pub fn new(value: u32) -> Result<Self, MoneyError> {
        if value == 0 {
            return Err(MoneyError::InvalidQuantity(
                "Quantity must be greater than 0".to_string(),
            ));
        }
        if value > Self::MAX_QUANTITY {
            return Err(MoneyError::InvalidQuantity(format!(
                "Quantity {value} exceeds maximum {}",
                Self::MAX_QUANTITY
            )));
        }
        Ok(Self(value))
    }

    /// The underlying value.
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role of the actor requesting an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorRole {
    /// Highest-privilege administrative role; satisfies every role gate.
    Admin,
    /// Store/back-office staff.
    Staff,
    /// End customer.
    Customer,
}

impl Display for ActorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "Admin"),
            Self::Staff => write!(f, "Staff"),
            Self::Customer => write!(f, "Customer"),
        }
    }
}

/// Whether the request originated from a human or internal automation.
///
/// `system_only` transition rules require the automation origin; a role
/// alone is never enough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorOrigin {
    /// A human-initiated request (UI, API on behalf of a user).
    Human,
    /// The internal automation caller (payment callbacks, schedulers).
    Automation,
}

/// The acting identity behind a state-changing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Identifier of the user or system.
    pub id: ActorId,
    /// Role resolved by the identity provider.
    pub role: ActorRole,
    /// Human or automation origin.
    pub origin: ActorOrigin,
}

impl Actor {
    /// A human actor with the given id and role.
    pub fn human(id: ActorId, role: ActorRole) -> Self {
        Self {
            id,
            role,
            origin: ActorOrigin::Human,
        }
    }

    /// The internal automation actor.
    pub fn automation() -> Self {
        Self {
            id: ActorId::try_new("system").expect("\"system\" is a valid actor id"),
            role: ActorRole::Staff,
            origin: ActorOrigin::Automation,
        }
    }

    /// Whether this actor satisfies a role requirement.
    ///
    /// `Admin` always passes; other roles must match exactly.
    pub fn has_role(&self, required: ActorRole) -> bool {
        self.role == ActorRole::Admin || self.role == required
    }

    /// Whether this actor is the internal automation caller.
    pub const fn is_automation(&self) -> bool {
        matches!(self.origin, ActorOrigin::Automation)
    }
}
