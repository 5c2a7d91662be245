//! The decision loop: classify, gate, execute, learn.
//!
//! One entry point, [`DecisionLoop::submit`], takes a proposed action
//! through the whole pipeline:
//!
//! 1. classify it into a tier with a confidence value;
//! 2. auto-execute a LOW action when confidence clears the configured
//!    threshold, skipping human review entirely;
//! 3. otherwise open an approval request and wait for its terminal
//!    status;
//! 4. execute only on approval;
//! 5. record a feedback record either way (auto-executions are tagged so
//!    the learning cycle ignores them).
//!
//! An action that cannot be classified is never dropped and never
//! auto-executed: it is held for review at MEDIUM.

use async_trait::async_trait;
use std::sync::Arc;

use vigil_classifier::{ActionClassifier, Classification};
use vigil_config::RuleConfig;
use vigil_core::{
    ActionRequest, ApprovalStatus, CriticalityTier, FeedbackOutcome, FeedbackRecord, RequestId,
};
use vigil_feedback::FeedbackTracker;

use crate::engine::HitlEngine;
use crate::error::EngineResult;

/// Executes actions once they clear the approval gate.
///
/// Implementations wrap whatever actually performs the work (an email
/// sender, a filesystem, a task queue).
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Perform the action.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError`] when the action could not be carried
    /// out. The approval decision has already been made and recorded;
    /// the failure is surfaced, not retried.
    async fn execute(&self, action: &ActionRequest) -> Result<(), ExecutionError>;
}

/// An approved action could not be carried out.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("execution failed: {message}")]
pub struct ExecutionError {
    /// What went wrong.
    pub message: String,
}

/// How a submitted action came out the far end of the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionOutcome {
    /// Executed without human review.
    AutoExecuted {
        /// The action's id.
        id: RequestId,
        /// The classification that cleared the gate.
        classification: Classification,
    },
    /// A human approved it and it was executed.
    Executed {
        /// The action's id.
        id: RequestId,
        /// The classification that routed it to review.
        classification: Classification,
    },
    /// A human denied it; nothing was executed.
    Denied {
        /// The action's id.
        id: RequestId,
        /// The classification that routed it to review.
        classification: Classification,
    },
    /// No one answered; nothing was executed.
    Expired {
        /// The action's id.
        id: RequestId,
        /// The classification that routed it to review.
        classification: Classification,
    },
    /// Cleared the gate but the executor failed.
    ExecutionFailed {
        /// The action's id.
        id: RequestId,
        /// The classification at the time of the decision.
        classification: Classification,
        /// The executor's diagnostic.
        error: ExecutionError,
    },
}

impl DecisionOutcome {
    /// Whether the action actually ran.
    #[must_use]
    pub fn was_executed(&self) -> bool {
        matches!(self, Self::AutoExecuted { .. } | Self::Executed { .. })
    }
}

/// Drives proposed actions through classification, approval, execution,
/// and feedback.
pub struct DecisionLoop {
    engine: HitlEngine,
    classifier: Arc<ActionClassifier>,
    tracker: Arc<FeedbackTracker>,
    executor: Arc<dyn ActionExecutor>,
    config: Arc<RuleConfig>,
}

impl DecisionLoop {
    /// Wire the pipeline together.
    #[must_use]
    pub fn new(
        engine: HitlEngine,
        classifier: Arc<ActionClassifier>,
        tracker: Arc<FeedbackTracker>,
        executor: Arc<dyn ActionExecutor>,
        config: Arc<RuleConfig>,
    ) -> Self {
        Self {
            engine,
            classifier,
            tracker,
            executor,
            config,
        }
    }

    /// The underlying engine, for resolving and inspecting requests.
    #[must_use]
    pub fn engine(&self) -> &HitlEngine {
        &self.engine
    }

    /// Take one action through the full pipeline.
    ///
    /// Blocks until the action is executed, denied, or expired; callers
    /// that do not want to wait spawn this onto the runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the approval engine loses track of the
    /// request mid-flight.
    pub async fn submit(&self, action: ActionRequest) -> EngineResult<DecisionOutcome> {
        let classification = match self.classifier.classify(&action) {
            Ok(classification) => classification,
            Err(err) => {
                // Never drop and never auto-execute what we cannot
                // classify; hold it for review at MEDIUM.
                tracing::warn!(
                    request_id = %action.id,
                    error = %err,
                    "classification failed; holding for review at medium"
                );
                Classification {
                    tier: CriticalityTier::Medium,
                    confidence: 0.0,
                    reasons: vec![format!("classification failed: {err}")],
                }
            },
        };
        tracing::info!(
            request_id = %action.id,
            action = %action,
            tier = %classification.tier,
            confidence = classification.confidence,
            "action classified"
        );

        if classification.tier == CriticalityTier::Low
            && classification.confidence >= self.config.auto_execute_threshold
        {
            return Ok(self.auto_execute(action, classification).await);
        }

        let id = self.engine.open(action.clone(), classification.tier).await?;
        let status = self.engine.wait_terminal(&id).await?;
        let latency_ms = self
            .engine
            .get(&id)
            .await
            .and_then(|request| request.latency())
            .and_then(|latency| u64::try_from(latency.num_milliseconds()).ok());

        let outcome = match status {
            ApprovalStatus::Approved => {
                self.record_feedback(&action, &classification, FeedbackOutcome::Approved, latency_ms);
                match self.executor.execute(&action).await {
                    Ok(()) => DecisionOutcome::Executed { id, classification },
                    Err(error) => {
                        tracing::error!(request_id = %id, error = %error, "approved action failed to execute");
                        DecisionOutcome::ExecutionFailed {
                            id,
                            classification,
                            error,
                        }
                    },
                }
            },
            ApprovalStatus::Denied => {
                self.record_feedback(&action, &classification, FeedbackOutcome::Denied, latency_ms);
                DecisionOutcome::Denied { id, classification }
            },
            // wait_terminal only ever returns a terminal status, and
            // Expired is the only one left.
            _ => {
                self.record_feedback(&action, &classification, FeedbackOutcome::Expired, None);
                DecisionOutcome::Expired { id, classification }
            },
        };
        Ok(outcome)
    }

    async fn auto_execute(
        &self,
        action: ActionRequest,
        classification: Classification,
    ) -> DecisionOutcome {
        tracing::info!(
            request_id = %action.id,
            confidence = classification.confidence,
            "auto-executing low-criticality action"
        );
        self.record_feedback(&action, &classification, FeedbackOutcome::Auto, None);
        let id = action.id.clone();
        match self.executor.execute(&action).await {
            Ok(()) => DecisionOutcome::AutoExecuted { id, classification },
            Err(error) => {
                tracing::error!(request_id = %id, error = %error, "auto-executed action failed");
                DecisionOutcome::ExecutionFailed {
                    id,
                    classification,
                    error,
                }
            },
        }
    }

    /// Feedback loss is tolerable; decision flow is not, so log failures
    /// instead of propagating them.
    fn record_feedback(
        &self,
        action: &ActionRequest,
        classification: &Classification,
        outcome: FeedbackOutcome,
        latency_ms: Option<u64>,
    ) {
        let record = FeedbackRecord::new(
            action.fingerprint(),
            classification.tier,
            outcome,
            latency_ms,
        );
        if let Err(err) = self.tracker.record(&record) {
            tracing::warn!(request_id = %action.id, error = %err, "failed to record feedback");
        }
    }
}
