//! Guarded screen-capture capability
//!
//! The browser original monkey-patched the global display-capture API while
//! an exam was running. Here the host only reaches capture through a
//! [`GuardedCapture`] handle that shares the monitor's session state: while
//! monitoring is active every acquisition fails with
//! [`CaptureError::BlockedByExam`] and is itself recorded as a violation;
//! once monitoring stops, requests pass straight through to the real
//! provider.

use chrono::Utc;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::warn;

use super::{lock_state, SessionState};
use crate::violation::ViolationKind;

#[derive(Debug, Error)]
pub enum CaptureError {
    /// The request was rejected because an exam session is active. Distinct
    /// from [`CaptureError::Denied`] so a host can tell an exam block apart
    /// from a user/OS refusal.
    #[error("screen recording is not allowed during an active exam")]
    BlockedByExam,
    #[error("display capture denied: {0}")]
    Denied(String),
    #[error("display capture is not available in this environment")]
    Unavailable,
}

/// Handle to an acquired capture stream.
#[derive(Debug, Clone)]
pub struct CaptureStream {
    pub source: String,
}

/// Acquisition side of a platform's display-capture API.
pub trait DisplayCapture: Send + Sync {
    fn acquire(&self) -> Result<CaptureStream, CaptureError>;
}

pub struct GuardedCapture {
    inner: Option<Arc<dyn DisplayCapture>>,
    state: Arc<Mutex<SessionState>>,
}

impl GuardedCapture {
    pub(crate) fn new(
        inner: Option<Arc<dyn DisplayCapture>>,
        state: Arc<Mutex<SessionState>>,
    ) -> Self {
        Self { inner, state }
    }
}

impl DisplayCapture for GuardedCapture {
    fn acquire(&self) -> Result<CaptureStream, CaptureError> {
        {
            let mut state = lock_state(&self.state);
            if state.is_active() {
                warn!("screen capture request blocked during exam");
                let _ = state.record(ViolationKind::ScreenRecordingAttempt, Utc::now());
                return Err(CaptureError::BlockedByExam);
            }
        }
        match &self.inner {
            Some(inner) => inner.acquire(),
            None => Err(CaptureError::Unavailable),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::{MonitorPolicy, NoopClipboard, ViolationMonitor};

    struct FakeCapture;

    impl DisplayCapture for FakeCapture {
        fn acquire(&self) -> Result<CaptureStream, CaptureError> {
            Ok(CaptureStream {
                source: "display-0".to_string(),
            })
        }
    }

    struct DenyingCapture;

    impl DisplayCapture for DenyingCapture {
        fn acquire(&self) -> Result<CaptureStream, CaptureError> {
            Err(CaptureError::Denied("user dismissed the picker".to_string()))
        }
    }

    fn monitor() -> ViolationMonitor {
        ViolationMonitor::new(
            MonitorPolicy::default(),
            Box::new(NoopClipboard),
            Box::new(|_| {}),
        )
    }

    #[test]
    fn test_acquire_blocked_while_active_and_recorded() {
        let mut monitor = monitor();
        let guard = monitor.capture_guard(Some(Arc::new(FakeCapture)));

        monitor.start_monitoring();
        let result = guard.acquire();
        assert!(matches!(result, Err(CaptureError::BlockedByExam)));
        assert_eq!(
            monitor.violations()[0].kind,
            ViolationKind::ScreenRecordingAttempt
        );
        // Capture blocks never advance the warning counter.
        assert_eq!(monitor.warning_count(), 0);

        monitor.stop_monitoring();
        let stream = guard.acquire().expect("pass-through after stop");
        assert_eq!(stream.source, "display-0");
        assert_eq!(monitor.violations().len(), 1);
    }

    #[test]
    fn test_acquire_before_start_passes_through() {
        let monitor = monitor();
        let guard = monitor.capture_guard(Some(Arc::new(FakeCapture)));
        assert!(guard.acquire().is_ok());
        assert!(monitor.violations().is_empty());
    }

    #[test]
    fn test_missing_provider_degrades_gracefully() {
        let monitor = monitor();
        let guard = monitor.capture_guard(None);
        assert!(matches!(guard.acquire(), Err(CaptureError::Unavailable)));
        assert!(monitor.violations().is_empty());
    }

    #[test]
    fn test_platform_denial_passes_through_unchanged() {
        let monitor = monitor();
        let guard = monitor.capture_guard(Some(Arc::new(DenyingCapture)));
        assert!(matches!(guard.acquire(), Err(CaptureError::Denied(_))));
        assert!(monitor.violations().is_empty());
    }
}
