//! Versioned, immutable learned weight snapshots.
//!
//! The feedback loop is the single writer: each learning cycle produces a
//! complete new [`WeightSnapshot`] and swaps it in atomically. Readers
//! (the classifier) clone the current `Arc` and always see a consistent
//! snapshot, never a partially-updated rule set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use vigil_core::Fingerprint;

/// One immutable generation of learned per-fingerprint tier adjustments.
///
/// An adjustment of `-1` biases a fingerprint one tier toward
/// auto-execution; `+1` biases it one tier toward human review.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightSnapshot {
    /// Monotonically increasing snapshot generation.
    pub version: u64,
    /// Per-fingerprint tier shifts, in steps.
    pub adjustments: BTreeMap<Fingerprint, i8>,
}

impl WeightSnapshot {
    /// The empty, unadjusted snapshot (version 0).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The learned shift for a fingerprint; zero when unlearned.
    #[must_use]
    pub fn adjustment_for(&self, fingerprint: &Fingerprint) -> i8 {
        self.adjustments.get(fingerprint).copied().unwrap_or(0)
    }
}

/// Shared handle to the current weight snapshot.
///
/// Shared-read, single-writer: `load` is cheap (an `Arc` clone) and
/// `publish` replaces the whole snapshot atomically.
#[derive(Debug, Clone)]
pub struct WeightHandle {
    inner: Arc<RwLock<Arc<WeightSnapshot>>>,
}

impl WeightHandle {
    /// Create a handle holding the empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(WeightSnapshot::empty()))),
        }
    }

    /// The current snapshot.
    #[must_use]
    pub fn load(&self) -> Arc<WeightSnapshot> {
        Arc::clone(&self.inner.read().unwrap_or_else(std::sync::PoisonError::into_inner))
    }

    /// Replace the current snapshot.
    pub fn publish(&self, snapshot: WeightSnapshot) {
        let version = snapshot.version;
        *self
            .inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Arc::new(snapshot);
        tracing::debug!(version, "published weight snapshot");
    }
}

impl Default for WeightHandle {
    fn default() -> Self {
        Self::new()
    }
}
