//! Feedback recording and the bounded learning cycle.

use std::collections::BTreeMap;
use std::sync::Arc;

use vigil_classifier::{WeightHandle, WeightSnapshot};
use vigil_config::LearningConfig;
use vigil_core::{FeedbackRecord, Fingerprint};
use vigil_storage::FeedbackLog;

use crate::error::FeedbackResult;
use crate::insights::{FeedbackInsights, PatternStat};

/// Records decision outcomes and periodically turns them into weight
/// adjustments.
///
/// Learning is deliberately slow and bounded:
///
/// - a fingerprint needs at least `min_feedback_count` human decisions
///   before it can move at all;
/// - its approval (or denial) rate must reach `confidence_threshold`;
/// - an adjustment moves at most one step per cycle and never exceeds
///   `max_auto_adjustment` in either direction;
/// - a fingerprint that stops meeting the bar decays back toward zero,
///   one step per cycle.
///
/// Auto-executed actions never contribute: the system does not grade its
/// own homework.
pub struct FeedbackTracker {
    log: Arc<dyn FeedbackLog>,
    weights: WeightHandle,
    learning: LearningConfig,
}

/// What one learning cycle changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LearningReport {
    /// Version of the snapshot the cycle published.
    pub snapshot_version: u64,
    /// Adjustments that moved this cycle, with their new values.
    pub moved: Vec<(Fingerprint, i8)>,
}

impl FeedbackTracker {
    /// Create a tracker over a feedback log and the shared weight handle.
    #[must_use]
    pub fn new(log: Arc<dyn FeedbackLog>, weights: WeightHandle, learning: LearningConfig) -> Self {
        Self {
            log,
            weights,
            learning,
        }
    }

    /// Append one resolved decision to the log.
    ///
    /// # Errors
    ///
    /// Returns an error if the log write fails.
    pub fn record(&self, record: &FeedbackRecord) -> FeedbackResult<()> {
        tracing::debug!(
            fingerprint = %record.fingerprint,
            outcome = %record.outcome,
            "feedback recorded"
        );
        self.log.append(record)?;
        Ok(())
    }

    /// Aggregate the full log into a summary.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read.
    pub fn insights(&self) -> FeedbackResult<FeedbackInsights> {
        Ok(FeedbackInsights::aggregate(&self.log.load()?))
    }

    /// Run one learning cycle and publish a new weight snapshot.
    ///
    /// A no-op (still publishing nothing new) when learning is disabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read.
    pub fn run_learning_cycle(&self) -> FeedbackResult<LearningReport> {
        let current = self.weights.load();
        if !self.learning.enabled {
            return Ok(LearningReport {
                snapshot_version: current.version,
                moved: Vec::new(),
            });
        }

        let records = self.log.load()?;
        let stats = per_fingerprint_stats(&records);

        let mut next = WeightSnapshot {
            version: current.version + 1,
            adjustments: current.adjustments.clone(),
        };
        let mut moved = Vec::new();

        // Fingerprints with enough confident evidence drift one step
        // toward their target; everything else decays toward zero.
        let max = i8::try_from(self.learning.max_auto_adjustment).unwrap_or(i8::MAX);
        let keys: std::collections::BTreeSet<Fingerprint> = next
            .adjustments
            .keys()
            .cloned()
            .chain(stats.keys().cloned())
            .collect();
        for fingerprint in keys {
            let current_shift = next.adjustments.get(&fingerprint).copied().unwrap_or(0);
            let target = stats
                .get(&fingerprint)
                .map_or(0, |stat| self.target_shift(stat, max));
            let new_shift = step_toward(current_shift, target);
            if new_shift == current_shift {
                continue;
            }
            tracing::info!(
                fingerprint = %fingerprint,
                from = current_shift,
                to = new_shift,
                "learned adjustment moved"
            );
            if new_shift == 0 {
                next.adjustments.remove(&fingerprint);
            } else {
                next.adjustments.insert(fingerprint.clone(), new_shift);
            }
            moved.push((fingerprint, new_shift));
        }

        let version = next.version;
        self.weights.publish(next);
        Ok(LearningReport {
            snapshot_version: version,
            moved,
        })
    }

    /// Where a fingerprint's adjustment should end up, given its record.
    fn target_shift(&self, stat: &PatternStat, max: i8) -> i8 {
        if stat.total() < self.learning.min_feedback_count {
            return 0;
        }
        if stat
            .approval_rate()
            .is_some_and(|rate| rate >= self.learning.confidence_threshold)
        {
            return -max;
        }
        if stat
            .denial_rate()
            .is_some_and(|rate| rate >= self.learning.confidence_threshold)
        {
            return max;
        }
        0
    }
}

fn per_fingerprint_stats(records: &[FeedbackRecord]) -> BTreeMap<Fingerprint, PatternStat> {
    let mut stats: BTreeMap<Fingerprint, PatternStat> = BTreeMap::new();
    for record in records {
        if !record.outcome.is_human() {
            continue;
        }
        let stat = stats.entry(record.fingerprint.clone()).or_default();
        match record.outcome {
            vigil_core::FeedbackOutcome::Approved => stat.approved += 1,
            vigil_core::FeedbackOutcome::Denied => stat.denied += 1,
            vigil_core::FeedbackOutcome::Expired => stat.expired += 1,
            vigil_core::FeedbackOutcome::Auto => {},
        }
    }
    stats
}

/// One bounded step from `current` toward `target`.
fn step_toward(current: i8, target: i8) -> i8 {
    match target.cmp(&current) {
        std::cmp::Ordering::Greater => current + 1,
        std::cmp::Ordering::Less => current - 1,
        std::cmp::Ordering::Equal => current,
    }
}
