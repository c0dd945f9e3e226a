//! Mutual-exclusion port for unit reservations.
//!
//! Every reservation operation serializes on a lock keyed by the unit's
//! identity (or the variant's, when allocating "any available unit").
//! Acquisition is bounded: on deadline expiry the manager fails fast with
//! `LockTimeout` rather than blocking indefinitely. The returned guard
//! releases the lock on drop, so every exit path releases it.

use crate::errors::LockError;
use crate::types::{UnitId, VariantId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::time::Duration;

/// Key identifying a mutual-exclusion scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockKey {
    /// Serializes operations on one unit.
    Unit(UnitId),
    /// Serializes allocation across a variant's units.
    Variant(VariantId),
}

impl LockKey {
    /// Key for a concrete unit.
    pub fn unit(unit_id: &UnitId) -> Self {
        Self::Unit(unit_id.clone())
    }

    /// Key for variant-level allocation.
    pub fn variant(variant_id: &VariantId) -> Self {
        Self::Variant(variant_id.clone())
    }
}

impl Display for LockKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unit(id) => write!(f, "unit:{id}"),
            Self::Variant(id) => write!(f, "variant:{id}"),
        }
    }
}

/// RAII guard for an acquired lock. Dropping it releases the lock.
pub struct LockGuard {
    _held: Box<dyn std::any::Any + Send>,
}

impl LockGuard {
    /// Wraps whatever value the adapter uses to keep the lock held
    /// (e.g. an owned mutex guard or a lease handle).
    pub fn new(held: impl Send + 'static) -> Self {
        Self {
            _held: Box::new(held),
        }
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard").finish_non_exhaustive()
    }
}

/// Distributed (or in-process) mutual exclusion service.
#[async_trait]
pub trait LockManager: Send + Sync {
    /// Acquires the lock for `key`, waiting at most `wait`.
    ///
    /// Returns `LockError::Timeout` once the bounded wait expires. The
    /// manager never retries internally.
    async fn acquire(&self, key: &LockKey, wait: Duration) -> Result<LockGuard, LockError>;
}
