//! Aggregated views over the feedback log.

use serde::Serialize;
use std::collections::BTreeMap;

use vigil_core::{CriticalityTier, FeedbackOutcome, FeedbackRecord, Fingerprint};

/// How many recurring patterns `common_approved` / `common_denied` list.
const TOP_PATTERNS: usize = 5;

/// Per-fingerprint decision counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PatternStat {
    /// Human approvals.
    pub approved: usize,
    /// Human denials.
    pub denied: usize,
    /// Unanswered expirations.
    pub expired: usize,
}

impl PatternStat {
    /// Human decisions recorded for this pattern.
    #[must_use]
    pub fn total(&self) -> usize {
        self.approved + self.denied + self.expired
    }

    /// Fraction of human decisions that approved, if any exist.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn approval_rate(&self) -> Option<f64> {
        let total = self.total();
        (total > 0).then(|| self.approved as f64 / total as f64)
    }

    /// Fraction of human decisions that denied, if any exist.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn denial_rate(&self) -> Option<f64> {
        let total = self.total();
        (total > 0).then(|| self.denied as f64 / total as f64)
    }
}

/// A summary of everything the feedback log says.
///
/// Auto-executed actions are counted separately and excluded from every
/// rate: the system grading its own decisions would let the learning
/// loop feed on itself.
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackInsights {
    /// Human decisions in the log.
    pub human_decisions: usize,
    /// Auto-executed actions in the log.
    pub auto_executed: usize,
    /// Overall human approval rate, if any human decision exists.
    pub approval_rate: Option<f64>,
    /// Median human response latency per tier, in milliseconds.
    pub median_latency_ms: BTreeMap<CriticalityTier, u64>,
    /// Most-approved recurring patterns, most frequent first.
    pub common_approved: Vec<(Fingerprint, PatternStat)>,
    /// Most-denied recurring patterns, most frequent first.
    pub common_denied: Vec<(Fingerprint, PatternStat)>,
}

impl FeedbackInsights {
    /// Aggregate a full pass over the log.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn aggregate(records: &[FeedbackRecord]) -> Self {
        let mut auto_executed = 0;
        let mut approved_total = 0;
        let mut stats: BTreeMap<Fingerprint, PatternStat> = BTreeMap::new();
        let mut latencies: BTreeMap<CriticalityTier, Vec<u64>> = BTreeMap::new();

        for record in records {
            if !record.outcome.is_human() {
                auto_executed += 1;
                continue;
            }
            let stat = stats.entry(record.fingerprint.clone()).or_default();
            match record.outcome {
                FeedbackOutcome::Approved => {
                    stat.approved += 1;
                    approved_total += 1;
                },
                FeedbackOutcome::Denied => stat.denied += 1,
                FeedbackOutcome::Expired => stat.expired += 1,
                FeedbackOutcome::Auto => unreachable!("filtered above"),
            }
            if let Some(ms) = record.response_latency_ms {
                latencies.entry(record.criticality).or_default().push(ms);
            }
        }

        let human_decisions: usize = stats.values().map(PatternStat::total).sum();
        let approval_rate =
            (human_decisions > 0).then(|| approved_total as f64 / human_decisions as f64);

        let median_latency_ms = latencies
            .into_iter()
            .map(|(tier, mut values)| {
                values.sort_unstable();
                (tier, values[values.len() / 2])
            })
            .collect();

        let mut approved: Vec<_> = stats
            .iter()
            .filter(|(_, s)| s.approved > 0)
            .map(|(fp, s)| (fp.clone(), *s))
            .collect();
        approved.sort_by(|a, b| b.1.approved.cmp(&a.1.approved));
        approved.truncate(TOP_PATTERNS);

        let mut denied: Vec<_> = stats
            .iter()
            .filter(|(_, s)| s.denied > 0)
            .map(|(fp, s)| (fp.clone(), *s))
            .collect();
        denied.sort_by(|a, b| b.1.denied.cmp(&a.1.denied));
        denied.truncate(TOP_PATTERNS);

        Self {
            human_decisions,
            auto_executed,
            approval_rate,
            median_latency_ms,
            common_approved: approved,
            common_denied: denied,
        }
    }
}
