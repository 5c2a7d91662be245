//! The approval lifecycle engine.
//!
//! One driver task per open request walks the channel ladder: alert,
//! wait out the response window with periodic resends, escalate to the
//! next channel, and finally expire. Human resolutions arrive through
//! [`HitlEngine::resolve`] and interrupt the driver through a per-request
//! [`Notify`].
//!
//! Persistence is write-ahead with bounded retries. If the history store
//! stays down, the request is marked degraded and continues in memory;
//! losing audit trail is preferable to freezing a decision a human
//! already made.

use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, Notify};

use vigil_alert::{AlertDispatcher, AlertMessage};
use vigil_config::{AlertPreference, RuleConfig};
use vigil_core::{
    retry, ActionRequest, ApprovalRequest, ApprovalStatus, ChannelKind, CriticalityTier,
    HumanResponse, RequestId, RetryConfig, Timestamp,
};
use vigil_storage::{HistoryRecord, HistoryStore, StorageError};

use crate::error::{EngineError, EngineResult};

/// Counts of tracked requests by lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// Requests tracked in total.
    pub total: usize,
    /// Awaiting a response on the first channel.
    pub pending: usize,
    /// Awaiting a response further down the ladder.
    pub escalated: usize,
    /// Postponed by a human.
    pub deferred: usize,
    /// Approved.
    pub approved: usize,
    /// Denied.
    pub denied: usize,
    /// Expired unanswered.
    pub expired: usize,
}

struct RequestCell {
    state: Mutex<ApprovalRequest>,
    notify: Notify,
    done: watch::Sender<Option<ApprovalStatus>>,
}

impl RequestCell {
    fn new(request: ApprovalRequest) -> Arc<Self> {
        let initial = request.status.is_terminal().then_some(request.status);
        let (done, _) = watch::channel(initial);
        Arc::new(Self {
            state: Mutex::new(request),
            notify: Notify::new(),
            done,
        })
    }
}

struct EngineInner {
    config: Arc<RuleConfig>,
    dispatcher: Arc<AlertDispatcher>,
    history: Arc<dyn HistoryStore>,
    cells: DashMap<RequestId, Arc<RequestCell>>,
    retry: RetryConfig,
}

/// Tracks every open approval request and drives its escalation ladder.
#[derive(Clone)]
pub struct HitlEngine {
    inner: Arc<EngineInner>,
}

impl HitlEngine {
    /// Create an engine over a rule document, a dispatcher, and a
    /// history store.
    #[must_use]
    pub fn new(
        config: Arc<RuleConfig>,
        dispatcher: Arc<AlertDispatcher>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                config,
                dispatcher,
                history,
                cells: DashMap::new(),
                retry: RetryConfig::default(),
            }),
        }
    }

    /// Open an approval request for an action and start its driver.
    ///
    /// The first response window starts immediately; its length comes
    /// from the tier's timeout settings.
    ///
    /// # Errors
    ///
    /// Does not currently fail: a persistently failing history store
    /// degrades the request instead of rejecting it.
    pub async fn open(
        &self,
        action: ActionRequest,
        criticality: CriticalityTier,
    ) -> EngineResult<RequestId> {
        let timeout_minutes = self
            .inner
            .config
            .timeout_settings
            .get(criticality)
            .timeout_minutes;
        let timeout_at = Timestamp::now().plus_minutes(i64::from(timeout_minutes));
        let mut request = ApprovalRequest::new(action, criticality, timeout_at);
        let id = request.id.clone();
        persist(&self.inner, &mut request).await;
        tracing::info!(
            request_id = %id,
            criticality = %criticality,
            timeout_minutes,
            "approval request opened"
        );

        let cell = RequestCell::new(request);
        self.inner.cells.insert(id.clone(), Arc::clone(&cell));
        spawn_driver(Arc::clone(&self.inner), cell);
        Ok(id)
    }

    /// Apply a human response to an open request.
    ///
    /// Approve and deny are terminal. Defer parks the request and
    /// reschedules it; when the deferral elapses the ladder restarts
    /// from the first channel. A parked request still accepts an early
    /// approve or deny.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownRequest`] for an untracked id and
    /// [`EngineError::InvalidTransition`] for a late or duplicate
    /// resolution; the stored decision is never overwritten.
    pub async fn resolve(
        &self,
        id: &RequestId,
        response: HumanResponse,
        feedback_text: Option<String>,
    ) -> EngineResult<ApprovalStatus> {
        let cell = self.cell(id)?;
        let mut state = cell.state.lock().await;
        let now = Timestamp::now();
        let status = match response {
            HumanResponse::Approve => {
                state.transition(ApprovalStatus::Approved, now)?;
                ApprovalStatus::Approved
            },
            HumanResponse::Deny => {
                state.transition(ApprovalStatus::Denied, now)?;
                ApprovalStatus::Denied
            },
            HumanResponse::Defer { minutes } => {
                state.transition(ApprovalStatus::Deferred, now)?;
                let minutes = self.inner.config.clamp_defer_minutes(minutes);
                state.timeout_at = now.plus_minutes(i64::from(minutes));
                ApprovalStatus::Deferred
            },
        };
        if let Some(text) = feedback_text {
            state.feedback_text = Some(text);
        }
        persist(&self.inner, &mut state).await;
        tracing::info!(request_id = %id, response = %response, status = %status, "request resolved");
        drop(state);

        cell.notify.notify_one();
        if status.is_terminal() {
            // send_replace stores the value even with no receiver alive,
            // so a later wait_terminal still observes it.
            cell.done.send_replace(Some(status));
        }
        Ok(status)
    }

    /// Wait until the request reaches a terminal status.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownRequest`] for an untracked id.
    pub async fn wait_terminal(&self, id: &RequestId) -> EngineResult<ApprovalStatus> {
        let cell = self.cell(id)?;
        let mut rx = cell.done.subscribe();
        loop {
            if let Some(status) = *rx.borrow_and_update() {
                return Ok(status);
            }
            rx.changed()
                .await
                .map_err(|_| EngineError::UnknownRequest { id: id.clone() })?;
        }
    }

    /// Current state of a tracked request.
    pub async fn get(&self, id: &RequestId) -> Option<ApprovalRequest> {
        let cell = self.inner.cells.get(id).map(|e| Arc::clone(e.value()))?;
        let state = cell.state.lock().await.clone();
        Some(state)
    }

    /// Every tracked request still awaiting a decision.
    pub async fn list_open(&self) -> Vec<ApprovalRequest> {
        let cells: Vec<Arc<RequestCell>> = self
            .inner
            .cells
            .iter()
            .map(|e| Arc::clone(e.value()))
            .collect();
        let mut open = Vec::new();
        for cell in cells {
            let state = cell.state.lock().await;
            if !state.status.is_terminal() {
                open.push(state.clone());
            }
        }
        open.sort_by_key(|r| r.created_at);
        open
    }

    /// Counts of tracked requests by status.
    pub async fn stats(&self) -> EngineStats {
        let cells: Vec<Arc<RequestCell>> = self
            .inner
            .cells
            .iter()
            .map(|e| Arc::clone(e.value()))
            .collect();
        let mut stats = EngineStats::default();
        for cell in cells {
            let status = cell.state.lock().await.status;
            stats.total += 1;
            match status {
                ApprovalStatus::Pending => stats.pending += 1,
                ApprovalStatus::Escalated => stats.escalated += 1,
                ApprovalStatus::Deferred => stats.deferred += 1,
                ApprovalStatus::Approved => stats.approved += 1,
                ApprovalStatus::Denied => stats.denied += 1,
                ApprovalStatus::Expired => stats.expired += 1,
            }
        }
        stats
    }

    /// Latest persisted snapshot of every request ever tracked.
    ///
    /// # Errors
    ///
    /// Returns an error if the history store cannot be read.
    pub fn history(&self) -> EngineResult<Vec<ApprovalRequest>> {
        Ok(self.inner.history.replay()?)
    }

    /// Replay persisted history and restart drivers for every request
    /// that was still in flight.
    ///
    /// A request whose window elapsed while the engine was down resumes
    /// exactly where the ladder left off: an exhausted ladder expires it
    /// immediately, otherwise alerting continues on the next channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the history store cannot be read.
    pub async fn recover(&self) -> EngineResult<usize> {
        let mut restored = 0;
        for request in self.inner.history.replay()? {
            if request.status.is_terminal() || self.inner.cells.contains_key(&request.id) {
                continue;
            }
            tracing::info!(
                request_id = %request.id,
                status = %request.status,
                "recovered in-flight request"
            );
            let cell = RequestCell::new(request.clone());
            self.inner.cells.insert(request.id, Arc::clone(&cell));
            spawn_driver(Arc::clone(&self.inner), cell);
            restored += 1;
        }
        Ok(restored)
    }

    fn cell(&self, id: &RequestId) -> EngineResult<Arc<RequestCell>> {
        self.inner
            .cells
            .get(id)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| EngineError::UnknownRequest { id: id.clone() })
    }
}

/// Append a snapshot with retries; a persistent failure degrades the
/// request instead of blocking it.
async fn persist(inner: &EngineInner, state: &mut ApprovalRequest) {
    let record = HistoryRecord::snapshot(state);
    let history = Arc::clone(&inner.history);
    let result = retry(inner.retry, "history append", || {
        let history = Arc::clone(&history);
        let record = record.clone();
        async move { history.append(&record) }
    })
    .await;
    match result {
        Ok(()) => {},
        Err(StorageError::AlreadyTerminal { ref id }) => {
            tracing::warn!(request_id = %id, "dropped snapshot for closed history");
        },
        Err(err) => {
            state.degraded = true;
            tracing::error!(
                request_id = %state.id,
                error = %err,
                "history persistence failing; request degraded to memory only"
            );
        },
    }
}

fn spawn_driver(inner: Arc<EngineInner>, cell: Arc<RequestCell>) {
    tokio::spawn(async move {
        drive(inner, cell).await;
    });
}

enum Phase {
    Done,
    Parked { resume_at: Timestamp },
    Alert { channel: ChannelKind, deadline: Timestamp, prefs: AlertPreference },
    Exhausted,
}

/// Walk one request through its ladder until it resolves or expires.
async fn drive(inner: Arc<EngineInner>, cell: Arc<RequestCell>) {
    loop {
        let phase = {
            let state = cell.state.lock().await;
            if state.status.is_terminal() {
                Phase::Done
            } else if state.status == ApprovalStatus::Deferred {
                Phase::Parked {
                    resume_at: state.timeout_at,
                }
            } else {
                let ladder = inner.config.channel_ladder(state.criticality);
                match ladder.get(state.escalation_step).copied() {
                    Some(channel) => Phase::Alert {
                        channel,
                        deadline: state.timeout_at,
                        prefs: inner.config.alert_preferences.get(state.criticality).clone(),
                    },
                    None => Phase::Exhausted,
                }
            }
        };

        match phase {
            Phase::Done => break,
            Phase::Exhausted => {
                expire(&inner, &cell).await;
                break;
            },
            Phase::Parked { resume_at } => {
                let wait = duration_until(resume_at);
                if sleep_or_notified(&cell, wait).await {
                    // Status changed under us; re-evaluate.
                    continue;
                }
                let mut state = cell.state.lock().await;
                if state.status != ApprovalStatus::Deferred {
                    continue;
                }
                let timeout_minutes = inner
                    .config
                    .timeout_settings
                    .get(state.criticality)
                    .timeout_minutes;
                let timeout_at = Timestamp::now().plus_minutes(i64::from(timeout_minutes));
                match state.reopen(timeout_at) {
                    Ok(()) => {
                        persist(&inner, &mut state).await;
                        tracing::info!(
                            request_id = %state.id,
                            "deferral elapsed; request reopened"
                        );
                    },
                    Err(err) => tracing::debug!(error = %err, "reopen lost a race"),
                }
            },
            Phase::Alert {
                channel,
                deadline,
                prefs,
            } => {
                if run_window(&inner, &cell, channel, deadline, &prefs).await {
                    // Resolved or deferred mid-window; re-evaluate.
                    continue;
                }
                advance(&inner, &cell).await;
            },
        }
    }
}

/// Alert on one channel until the window closes or the status changes.
///
/// Returns `true` when the request resolved (or was deferred) inside the
/// window, `false` when the window elapsed unanswered.
async fn run_window(
    inner: &EngineInner,
    cell: &RequestCell,
    channel: ChannelKind,
    deadline_ts: Timestamp,
    prefs: &AlertPreference,
) -> bool {
    let window = duration_until(deadline_ts);
    if window.is_zero() {
        // Window already elapsed (replayed request); skip straight to
        // the ladder advance.
        return false;
    }
    let deadline = tokio::time::Instant::now() + window;
    let mut resend: u32 = 0;
    loop {
        let message = {
            let state = cell.state.lock().await;
            if !awaiting_response(&state) {
                return true;
            }
            AlertMessage::for_request(&state, resend)
        };
        let attempt = inner.dispatcher.dispatch(channel, &message).await;
        {
            let mut state = cell.state.lock().await;
            state.record_attempt(attempt);
            persist(inner, &mut state).await;
        }

        let now = tokio::time::Instant::now();
        if now >= deadline {
            return false;
        }
        let remaining = deadline - now;
        let wait = if resend < prefs.max_repeats {
            remaining.min(Duration::from_secs(u64::from(prefs.repeat_interval_secs)))
        } else {
            remaining
        };
        if sleep_or_notified(cell, wait).await && !awaiting_response(&*cell.state.lock().await) {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        resend += 1;
    }
}

/// Move one step down the ladder, or expire when it is exhausted.
async fn advance(inner: &EngineInner, cell: &RequestCell) {
    let mut state = cell.state.lock().await;
    if !awaiting_response(&state) {
        return;
    }
    state.escalation_step += 1;
    let ladder = inner.config.channel_ladder(state.criticality);
    if state.escalation_step >= ladder.len() {
        drop(state);
        expire(inner, cell).await;
        return;
    }
    if state.status == ApprovalStatus::Pending {
        if let Err(err) = state.transition(ApprovalStatus::Escalated, Timestamp::now()) {
            tracing::debug!(error = %err, "escalation lost a race");
            return;
        }
    }
    let timeout_minutes = inner
        .config
        .timeout_settings
        .get(state.criticality)
        .timeout_minutes;
    state.timeout_at = Timestamp::now().plus_minutes(i64::from(timeout_minutes));
    persist(inner, &mut state).await;
    tracing::warn!(
        request_id = %state.id,
        channel = %ladder[state.escalation_step],
        step = state.escalation_step,
        "window elapsed unanswered; escalating"
    );
}

async fn expire(inner: &EngineInner, cell: &RequestCell) {
    let mut state = cell.state.lock().await;
    if state.status.is_terminal() {
        return;
    }
    match state.transition(ApprovalStatus::Expired, Timestamp::now()) {
        Ok(()) => {
            persist(inner, &mut state).await;
            tracing::warn!(
                request_id = %state.id,
                attempts = state.channel_log.len(),
                "channel ladder exhausted; request expired"
            );
            drop(state);
            cell.done.send_replace(Some(ApprovalStatus::Expired));
        },
        Err(err) => tracing::debug!(error = %err, "expiry lost a race"),
    }
}

fn awaiting_response(state: &ApprovalRequest) -> bool {
    matches!(
        state.status,
        ApprovalStatus::Pending | ApprovalStatus::Escalated
    )
}

fn duration_until(at: Timestamp) -> Duration {
    at.since(Timestamp::now()).to_std().unwrap_or_default()
}

/// `true` when the cell was notified before the sleep finished.
async fn sleep_or_notified(cell: &RequestCell, wait: Duration) -> bool {
    tokio::select! {
        () = cell.notify.notified() => true,
        () = tokio::time::sleep(wait) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vigil_alert::ConsoleChannel;
    use vigil_core::{ActionRequest, ActionType};
    use vigil_storage::MemoryHistoryStore;

    fn full_dispatcher() -> Arc<AlertDispatcher> {
        let mut dispatcher = AlertDispatcher::new();
        for kind in [ChannelKind::Notification, ChannelKind::Sms, ChannelKind::Call] {
            dispatcher.register(Arc::new(ConsoleChannel::new(kind)));
        }
        Arc::new(dispatcher)
    }

    fn make_engine() -> (HitlEngine, Arc<MemoryHistoryStore>) {
        let config = Arc::new(vigil_config::load(None).unwrap());
        let history = Arc::new(MemoryHistoryStore::new());
        let engine = HitlEngine::new(config, full_dispatcher(), Arc::clone(&history) as _);
        (engine, history)
    }

    fn high_action() -> ActionRequest {
        ActionRequest::new(ActionType::EmailSend, "CEO@company.com", "urgent: wire details")
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_then_approve() {
        let (engine, history) = make_engine();
        let id = engine
            .open(high_action(), CriticalityTier::High)
            .await
            .unwrap();

        assert_eq!(engine.list_open().await.len(), 1);
        let status = engine
            .resolve(&id, HumanResponse::Approve, Some("looks right".to_string()))
            .await
            .unwrap();
        assert_eq!(status, ApprovalStatus::Approved);
        assert_eq!(engine.wait_terminal(&id).await.unwrap(), ApprovalStatus::Approved);

        let request = engine.get(&id).await.unwrap();
        assert_eq!(request.feedback_text.as_deref(), Some("looks right"));
        assert!(request.latency().is_some());
        assert!(!request.degraded);
        // Opened + resolved snapshots at minimum
        assert!(history.count().unwrap() >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_resolution_rejected() {
        let (engine, _) = make_engine();
        let id = engine
            .open(high_action(), CriticalityTier::High)
            .await
            .unwrap();

        engine.resolve(&id, HumanResponse::Deny, None).await.unwrap();
        let err = engine
            .resolve(&id, HumanResponse::Approve, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition(_)));
        // The stored decision stands
        assert_eq!(engine.get(&id).await.unwrap().status, ApprovalStatus::Denied);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_request() {
        let (engine, _) = make_engine();
        let err = engine
            .resolve(&RequestId::new(), HumanResponse::Approve, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownRequest { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_high_ladder_escalates_then_expires() {
        let (engine, _) = make_engine();
        let id = engine
            .open(high_action(), CriticalityTier::High)
            .await
            .unwrap();

        // First window: call, 5 minutes. Step past it.
        tokio::time::sleep(Duration::from_secs(5 * 60 + 5)).await;
        let request = engine.get(&id).await.unwrap();
        assert_eq!(request.status, ApprovalStatus::Escalated);
        assert_eq!(request.escalation_step, 1);

        // Let the remaining windows (sms, notification) elapse.
        assert_eq!(engine.wait_terminal(&id).await.unwrap(), ApprovalStatus::Expired);

        let request = engine.get(&id).await.unwrap();
        let channels: Vec<ChannelKind> =
            request.channel_log.iter().map(|a| a.channel).collect();
        assert!(channels.contains(&ChannelKind::Call));
        assert!(channels.contains(&ChannelKind::Sms));
        assert!(channels.contains(&ChannelKind::Notification));
        // 5-minute window, 60s repeat interval, 3 repeats: 4 sends on
        // the first channel alone
        assert!(request.channel_log.len() >= 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_low_tier_expires_without_escalating() {
        let (engine, _) = make_engine();
        let action = ActionRequest::new(ActionType::ReminderSet, "self", "water plants");
        let id = engine.open(action, CriticalityTier::Low).await.unwrap();

        assert_eq!(engine.wait_terminal(&id).await.unwrap(), ApprovalStatus::Expired);
        let request = engine.get(&id).await.unwrap();
        // Escalation is disabled for low: a single notification-only window
        assert!(request
            .channel_log
            .iter()
            .all(|a| a.channel == ChannelKind::Notification));
    }

    #[tokio::test(start_paused = true)]
    async fn test_defer_restarts_ladder() {
        let (engine, _) = make_engine();
        let id = engine
            .open(high_action(), CriticalityTier::High)
            .await
            .unwrap();

        // Escalate once so the restart is observable.
        tokio::time::sleep(Duration::from_secs(5 * 60 + 5)).await;
        assert_eq!(engine.get(&id).await.unwrap().escalation_step, 1);

        let status = engine
            .resolve(&id, HumanResponse::Defer { minutes: Some(10) }, None)
            .await
            .unwrap();
        assert_eq!(status, ApprovalStatus::Deferred);

        // Deferral elapses; request reopens at the top of the ladder.
        tokio::time::sleep(Duration::from_secs(10 * 60 + 5)).await;
        let request = engine.get(&id).await.unwrap();
        assert_eq!(request.status, ApprovalStatus::Pending);
        assert_eq!(request.escalation_step, 0);

        engine.resolve(&id, HumanResponse::Approve, None).await.unwrap();
        assert_eq!(engine.wait_terminal(&id).await.unwrap(), ApprovalStatus::Approved);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_terminal_after_resolution() {
        let (engine, _) = make_engine();
        let id = engine
            .open(high_action(), CriticalityTier::High)
            .await
            .unwrap();

        // Resolve first, subscribe after: the terminal status must still
        // be observable by a late waiter.
        engine.resolve(&id, HumanResponse::Approve, None).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(engine.wait_terminal(&id).await.unwrap(), ApprovalStatus::Approved);
    }

    #[tokio::test(start_paused = true)]
    async fn test_approve_during_deferral() {
        let (engine, _) = make_engine();
        let id = engine
            .open(high_action(), CriticalityTier::High)
            .await
            .unwrap();

        engine
            .resolve(&id, HumanResponse::Defer { minutes: Some(30) }, None)
            .await
            .unwrap();

        // The human comes back one minute in; the decision lands without
        // waiting out the deferral.
        tokio::time::sleep(Duration::from_secs(60)).await;
        let status = engine
            .resolve(&id, HumanResponse::Approve, None)
            .await
            .unwrap();
        assert_eq!(status, ApprovalStatus::Approved);
        assert_eq!(engine.wait_terminal(&id).await.unwrap(), ApprovalStatus::Approved);
        assert_eq!(engine.get(&id).await.unwrap().status, ApprovalStatus::Approved);
    }

    #[tokio::test(start_paused = true)]
    async fn test_defer_minutes_clamped() {
        let (engine, _) = make_engine();
        let id = engine
            .open(high_action(), CriticalityTier::High)
            .await
            .unwrap();

        // Far beyond max_defer_minutes (120)
        engine
            .resolve(&id, HumanResponse::Defer { minutes: Some(10_000) }, None)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(120 * 60 + 5)).await;
        assert_eq!(engine.get(&id).await.unwrap().status, ApprovalStatus::Pending);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats() {
        let (engine, _) = make_engine();
        let a = engine.open(high_action(), CriticalityTier::High).await.unwrap();
        let b = engine
            .open(ActionRequest::new(ActionType::SmsSend, "client", "eta?"), CriticalityTier::Medium)
            .await
            .unwrap();
        engine.resolve(&a, HumanResponse::Approve, None).await.unwrap();

        let stats = engine.stats().await;
        assert_eq!(stats.total, 2);
        assert_eq!(stats.approved, 1);
        assert_eq!(stats.pending, 1);

        engine.resolve(&b, HumanResponse::Deny, None).await.unwrap();
        let stats = engine.stats().await;
        assert_eq!(stats.denied, 1);
        assert_eq!(stats.pending, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recover_resumes_in_flight_requests() {
        let config = Arc::new(vigil_config::load(None).unwrap());
        let history = Arc::new(MemoryHistoryStore::new());

        // Seed history as a previous process would have left it: one
        // resolved request and one still pending with an elapsed window.
        let resolved = {
            let mut r = ApprovalRequest::new(
                high_action(),
                CriticalityTier::High,
                Timestamp::now().plus_minutes(5),
            );
            history.append(&HistoryRecord::snapshot(&r)).unwrap();
            r.transition(ApprovalStatus::Approved, Timestamp::now()).unwrap();
            history.append(&HistoryRecord::snapshot(&r)).unwrap();
            r
        };
        let stale = {
            let r = ApprovalRequest::new(
                ActionRequest::new(ActionType::ReminderSet, "self", "water plants"),
                CriticalityTier::Low,
                Timestamp::now().plus_minutes(-5),
            );
            history.append(&HistoryRecord::snapshot(&r)).unwrap();
            r
        };

        let engine = HitlEngine::new(config, full_dispatcher(), Arc::clone(&history) as _);
        let restored = engine.recover().await.unwrap();
        assert_eq!(restored, 1);
        assert!(engine.get(&resolved.id).await.is_none());

        // The stale low request has no remaining channels after its
        // elapsed window, so recovery expires it.
        assert_eq!(
            engine.wait_terminal(&stale.id).await.unwrap(),
            ApprovalStatus::Expired
        );
    }
}
