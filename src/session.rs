//! Exam session orchestration
//!
//! Glue the exam host screen provides in the reference platform: a rules
//! dialog gates the start, acceptance enters exam mode and starts
//! monitoring, and reaching the violation limit force-submits the session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::events::InputEvent;
use crate::monitor::{
    CaptureError, Clipboard, DisplayCapture, GuardedCapture, MonitorPolicy, Verdict,
    ViolationMonitor,
};
use crate::report::SessionReport;
use crate::violation::Violation;
use crate::viewport::{SessionStore, ViewportBackend, ViewportGuard, ViewportOptions};

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    Submitted,
    Exited,
    /// Forced submission after the violation limit was reached.
    AutoSubmitted,
}

/// Structured content of the pre-exam rules dialog.
#[derive(Debug, Clone, Serialize)]
pub struct ExamRules {
    pub prohibited: Vec<&'static str>,
    pub warning_policy: Vec<String>,
    pub allowed: Vec<&'static str>,
}

impl ExamRules {
    pub fn standard(max_warnings: u32) -> Self {
        let warning_policy = vec![
            "You will receive a warning for each violation detected".to_string(),
            format!("Maximum of {max_warnings} warnings allowed"),
            format!(
                "After {max_warnings} warnings, your exam will be automatically submitted"
            ),
            "All violations are logged and timestamped".to_string(),
        ];
        Self {
            prohibited: vec![
                "Switching to other tabs or applications",
                "Leaving the exam page",
                "Taking screenshots or screen recordings",
                "Opening developer tools",
                "Using external resources or materials",
                "Copying or sharing exam content",
            ],
            warning_policy,
            allowed: vec![
                "Using the built-in calculator",
                "Navigating between questions",
                "Bookmarking questions for review",
                "Submitting your exam when ready",
            ],
        }
    }
}

/// One proctored exam attempt: the monitor, the viewport lockdown, and the
/// lifecycle wiring between them.
pub struct ExamSession<S: SessionStore, B: ViewportBackend> {
    id: Uuid,
    monitor: ViolationMonitor,
    viewport: ViewportGuard<S, B>,
    capture: GuardedCapture,
    limit_hit: Arc<AtomicBool>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    outcome: Option<SessionOutcome>,
}

impl<S: SessionStore, B: ViewportBackend> ExamSession<S, B> {
    pub fn new(
        policy: MonitorPolicy,
        options: ViewportOptions,
        store: S,
        backend: B,
        clipboard: Box<dyn Clipboard + Send>,
        capture_provider: Option<Arc<dyn DisplayCapture>>,
    ) -> Self {
        let limit_hit = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&limit_hit);
        let monitor = ViolationMonitor::new(
            policy,
            clipboard,
            Box::new(move |violations: &[Violation]| {
                warn!(
                    violations = violations.len(),
                    "maximum violations reached; session will be submitted"
                );
                flag.store(true, Ordering::SeqCst);
            }),
        );
        let capture = monitor.capture_guard(capture_provider);
        let viewport = ViewportGuard::with_options(store, backend, options);

        Self {
            id: Uuid::new_v4(),
            monitor,
            viewport,
            capture,
            limit_hit,
            started_at: None,
            ended_at: None,
            outcome: None,
        }
    }

    /// Rules-dialog acceptance: lock the viewport and start monitoring.
    pub fn accept_rules(&mut self, now: DateTime<Utc>) {
        if self.started_at.is_some() {
            debug!("session already started");
            return;
        }
        info!(session_id = %self.id, "exam rules accepted; starting proctored session");
        self.viewport.enter_exam_mode();
        self.monitor.start_monitoring();
        self.started_at = Some(now);
    }

    /// Feeds one event through the monitor. Capture requests go through the
    /// guarded provider instead.
    pub fn handle_event(&mut self, event: &InputEvent, now: DateTime<Utc>) -> Verdict {
        if let InputEvent::CaptureRequested = event {
            return match self.capture.acquire() {
                Ok(stream) => {
                    debug!(source = %stream.source, "capture request allowed");
                    Verdict {
                        suppress_default: false,
                        prompt: None,
                    }
                }
                Err(e) => {
                    debug!("capture request rejected: {e}");
                    Verdict {
                        suppress_default: matches!(e, CaptureError::BlockedByExam),
                        prompt: None,
                    }
                }
            };
        }
        self.monitor.handle_event(event, now)
    }

    /// Pass-through for the host to mark its own dialogs, so a confirmation
    /// prompt never registers as a tab switch.
    pub fn set_modal_suspended(&mut self, suspended: bool) {
        self.monitor.set_modal_suspended(suspended);
    }

    /// Drives the deferred auto-submit. Returns true when this call ended
    /// the session.
    pub fn tick(&mut self, now: DateTime<Utc>) -> bool {
        self.monitor.fire_limit_if_due(now);
        if self.limit_hit.load(Ordering::SeqCst) && self.outcome.is_none() {
            self.finish(SessionOutcome::AutoSubmitted, true, now);
            return true;
        }
        false
    }

    pub fn submit(&mut self, now: DateTime<Utc>) {
        if self.outcome.is_some() {
            debug!("session already ended");
            return;
        }
        self.finish(SessionOutcome::Submitted, true, now);
    }

    pub fn exit(&mut self, now: DateTime<Utc>) {
        if self.outcome.is_some() {
            debug!("session already ended");
            return;
        }
        self.finish(SessionOutcome::Exited, false, now);
    }

    fn finish(&mut self, outcome: SessionOutcome, submitted: bool, now: DateTime<Utc>) {
        info!(session_id = %self.id, ?outcome, "ending proctored session");
        self.monitor.stop_monitoring();
        self.viewport.exit_exam_mode(submitted);
        self.ended_at = Some(now);
        self.outcome = Some(outcome);
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn outcome(&self) -> Option<SessionOutcome> {
        self.outcome
    }

    pub fn violations(&self) -> Vec<Violation> {
        self.monitor.violations()
    }

    pub fn warning_count(&self) -> u32 {
        self.monitor.warning_count()
    }

    pub fn pending_submit_due(&self) -> Option<DateTime<Utc>> {
        self.monitor.pending_submit_due()
    }

    pub fn viewport(&self) -> &ViewportGuard<S, B> {
        &self.viewport
    }

    pub fn report(&self) -> SessionReport {
        SessionReport {
            session_id: self.id,
            started_at: self.started_at,
            ended_at: self.ended_at,
            outcome: self.outcome,
            warning_count: self.monitor.warning_count(),
            max_warnings: self.monitor.max_warnings(),
            violations: self.monitor.violations(),
        }
    }
}
