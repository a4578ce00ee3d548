//! Violation monitoring and escalation for one exam attempt
//!
//! The monitor is passive: the host feeds it [`InputEvent`]s and renders
//! whatever [`WarningPrompt`] comes back. All counters live behind a single
//! mutex shared only with the [`GuardedCapture`] handle, so a multi-threaded
//! host gets serialized access to the violation log for free.

pub mod capture;
pub mod clipboard;

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use crate::config::ProctorConfig;
use crate::events::{InputEvent, Key, KeyChord};
use crate::violation::{Escalation, Violation, ViolationKind, WarningPrompt};

pub use capture::{CaptureError, CaptureStream, DisplayCapture, GuardedCapture};
pub use clipboard::{Clipboard, NoopClipboard};

/// Escalation policy for one session, fixed at construction.
#[derive(Debug, Clone)]
pub struct MonitorPolicy {
    pub max_warnings: u32,
    /// Delay between showing the terminal warning and invoking the limit
    /// callback, so the user can read the message. Reference value: 2000ms.
    pub auto_submit_delay_ms: u64,
    pub log_context_menu: bool,
}

impl Default for MonitorPolicy {
    fn default() -> Self {
        Self {
            max_warnings: 3,
            auto_submit_delay_ms: 2000,
            log_context_menu: true,
        }
    }
}

impl From<&ProctorConfig> for MonitorPolicy {
    fn from(config: &ProctorConfig) -> Self {
        Self {
            max_warnings: config.max_warnings,
            auto_submit_delay_ms: config.auto_submit_delay_ms,
            log_context_menu: config.log_context_menu,
        }
    }
}

/// Outcome of handling a single event, visible to the host synchronously
/// before any UI is rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    /// The originating event's default action must be cancelled.
    pub suppress_default: bool,
    /// Warning dialog state to render, if this event produced a warning.
    pub prompt: Option<WarningPrompt>,
}

impl Verdict {
    fn pass() -> Self {
        Self {
            suppress_default: false,
            prompt: None,
        }
    }

    fn suppressed() -> Self {
        Self {
            suppress_default: true,
            prompt: None,
        }
    }
}

/// Shortcut categories the keydown rules block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockedShortcut {
    Screenshot,
    Print,
    Devtools,
}

/// Matches the blocked shortcut table: Ctrl/Cmd+Shift+S, Ctrl/Cmd+P, and the
/// devtools set (F12, Ctrl/Cmd+Shift+I, Ctrl/Cmd+Shift+J, Ctrl/Cmd+U).
fn classify_shortcut(chord: &KeyChord) -> Option<BlockedShortcut> {
    let char_is = |target: char| match chord.key {
        Key::Char(c) => c.eq_ignore_ascii_case(&target),
        _ => false,
    };

    if chord.primary() && chord.shift && char_is('s') {
        return Some(BlockedShortcut::Screenshot);
    }
    if chord.primary() && char_is('p') {
        return Some(BlockedShortcut::Print);
    }
    if chord.key == Key::F12
        || (chord.primary() && chord.shift && (char_is('i') || char_is('j')))
        || (chord.primary() && char_is('u'))
    {
        return Some(BlockedShortcut::Devtools);
    }
    None
}

/// Per-session monitoring state. Shared with [`GuardedCapture`] handles.
pub(crate) struct SessionState {
    active: bool,
    modal_suspended: bool,
    max_warnings: u32,
    warning_count: u32,
    violations: Vec<Violation>,
    escalation: Escalation,
    pending_due: Option<DateTime<Utc>>,
    limit_fired: bool,
}

impl SessionState {
    fn new(max_warnings: u32) -> Self {
        Self {
            active: false,
            modal_suspended: false,
            max_warnings,
            warning_count: 0,
            violations: Vec::new(),
            escalation: Escalation::Idle,
            pending_due: None,
            limit_fired: false,
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active
    }

    /// Appends a violation to the log. Advances the warning counter only
    /// when the kind carries a warning and the limit has not already been
    /// reached, which keeps the counter at `min(N, max_warnings)` and makes
    /// this the single place warning policy is applied.
    pub(crate) fn record(&mut self, kind: ViolationKind, now: DateTime<Utc>) -> Option<WarningPrompt> {
        warn!(kind = ?kind, "violation recorded: {}", kind.description());
        self.violations.push(Violation::new(kind, now));

        if !kind.counts_as_warning() || self.escalation == Escalation::LimitReached {
            return None;
        }
        self.warning_count += 1;
        Some(WarningPrompt {
            warning_count: self.warning_count,
            max_warnings: self.max_warnings,
            limit_reached: self.warning_count >= self.max_warnings,
        })
    }
}

pub(crate) fn lock_state(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Callback invoked at most once per session, when the warning count reaches
/// the configured maximum.
pub type LimitCallback = Box<dyn FnMut(&[Violation]) + Send>;

pub struct ViolationMonitor {
    state: Arc<Mutex<SessionState>>,
    clipboard: Box<dyn Clipboard + Send>,
    on_limit: LimitCallback,
    auto_submit_delay_ms: u64,
    log_context_menu: bool,
}

impl ViolationMonitor {
    pub fn new(
        policy: MonitorPolicy,
        clipboard: Box<dyn Clipboard + Send>,
        on_limit: LimitCallback,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::new(policy.max_warnings))),
            clipboard,
            on_limit,
            auto_submit_delay_ms: policy.auto_submit_delay_ms,
            log_context_menu: policy.log_context_menu,
        }
    }

    /// Starts evaluating events as violations. Idempotent.
    pub fn start_monitoring(&mut self) {
        let mut state = lock_state(&self.state);
        if state.active {
            debug!("monitoring already active");
        }
        state.active = true;
        if state.escalation == Escalation::Idle {
            state.escalation = Escalation::Active;
        }
        info!("anti-cheat monitoring started");
    }

    /// Stops evaluating events. Safe to call without a prior start; the
    /// violation log and counters are retained for reporting.
    pub fn stop_monitoring(&mut self) {
        let mut state = lock_state(&self.state);
        state.active = false;
        info!("anti-cheat monitoring stopped");
    }

    /// While suspended, visibility-hidden events are not treated as tab
    /// switches. The host sets this around its own dialogs so a legitimate
    /// modal never self-triggers a violation.
    pub fn set_modal_suspended(&mut self, suspended: bool) {
        lock_state(&self.state).modal_suspended = suspended;
    }

    /// A capture provider handle gated by this monitor's session state.
    /// Pass `None` when the platform has no capture API; the guard then
    /// degrades to reporting [`CaptureError::Unavailable`] while inactive.
    pub fn capture_guard(
        &self,
        inner: Option<Arc<dyn DisplayCapture>>,
    ) -> GuardedCapture {
        GuardedCapture::new(inner, Arc::clone(&self.state))
    }

    pub fn violations(&self) -> Vec<Violation> {
        lock_state(&self.state).violations.clone()
    }

    pub fn warning_count(&self) -> u32 {
        lock_state(&self.state).warning_count
    }

    pub fn max_warnings(&self) -> u32 {
        lock_state(&self.state).max_warnings
    }

    pub fn escalation(&self) -> Escalation {
        lock_state(&self.state).escalation
    }

    pub fn is_active(&self) -> bool {
        lock_state(&self.state).active
    }

    /// When the terminal warning has been shown, the instant at which the
    /// limit callback becomes due. `None` before the limit and after firing.
    pub fn pending_submit_due(&self) -> Option<DateTime<Utc>> {
        let state = lock_state(&self.state);
        if state.limit_fired {
            None
        } else {
            state.pending_due
        }
    }

    /// Fires the limit callback if its delay has elapsed. Returns true on the
    /// single invocation; every later call is a no-op.
    pub fn fire_limit_if_due(&mut self, now: DateTime<Utc>) -> bool {
        let violations = {
            let mut state = lock_state(&self.state);
            match state.pending_due {
                Some(due) if now >= due && !state.limit_fired => {
                    state.limit_fired = true;
                    state.violations.clone()
                }
                _ => return false,
            }
        };
        info!(
            violations = violations.len(),
            "violation limit reached; invoking session termination callback"
        );
        (self.on_limit)(&violations);
        true
    }

    /// Evaluates one event against the detection rules. Counter updates are
    /// visible through the accessors before this returns, so the warning UI
    /// always renders current state.
    pub fn handle_event(&mut self, event: &InputEvent, now: DateTime<Utc>) -> Verdict {
        {
            let state = lock_state(&self.state);
            if !state.active {
                return Verdict::pass();
            }
        }

        match event {
            InputEvent::VisibilityChanged { hidden: true } => self.on_page_hidden(now),
            // Losing focus without the page going hidden is not a violation:
            // clicking a browser dialog or a non-covering window does this.
            InputEvent::VisibilityChanged { hidden: false } | InputEvent::WindowBlur => {
                Verdict::pass()
            }
            InputEvent::KeyUp { chord } if chord.key == Key::PrintScreen => {
                self.on_print_screen(now)
            }
            InputEvent::KeyUp { .. } => Verdict::pass(),
            InputEvent::KeyDown { chord } => self.on_key_down(chord, now),
            InputEvent::ContextMenu => {
                if self.log_context_menu {
                    let _ = lock_state(&self.state).record(ViolationKind::RightClickAttempt, now);
                }
                Verdict::suppressed()
            }
            // Routed through the guarded capture provider by the host.
            InputEvent::CaptureRequested => Verdict::pass(),
        }
    }

    fn on_page_hidden(&mut self, now: DateTime<Utc>) -> Verdict {
        let mut state = lock_state(&self.state);
        if state.modal_suspended {
            debug!("visibility change ignored while a host modal is open");
            return Verdict::pass();
        }

        let prompt = match state.record(ViolationKind::TabSwitch, now) {
            Some(prompt) => prompt,
            None => {
                // Terminal state: keep the evidence, leave the counter capped.
                debug!("tab switch after limit; logged without a new warning");
                return Verdict::pass();
            }
        };

        if prompt.limit_reached {
            state.escalation = Escalation::LimitReached;
            state.pending_due =
                Some(now + Duration::milliseconds(self.auto_submit_delay_ms as i64));
            warn!(
                warning_count = prompt.warning_count,
                "maximum warnings reached; auto-submit armed"
            );
        } else {
            warn!(
                warning_count = prompt.warning_count,
                remaining = prompt.remaining(),
                "tab switch warning issued"
            );
        }

        Verdict {
            suppress_default: false,
            prompt: Some(prompt),
        }
    }

    fn on_print_screen(&mut self, now: DateTime<Utc>) -> Verdict {
        let _ = lock_state(&self.state).record(ViolationKind::ScreenshotAttempt, now);
        // Best-effort: overwrite whatever the OS put on the clipboard.
        if let Err(e) = self.clipboard.clear() {
            debug!("clipboard clear failed: {e:#}");
        }
        Verdict::pass()
    }

    fn on_key_down(&mut self, chord: &KeyChord, now: DateTime<Utc>) -> Verdict {
        let kind = match classify_shortcut(chord) {
            Some(BlockedShortcut::Screenshot) => ViolationKind::ScreenshotShortcutBlocked,
            Some(BlockedShortcut::Print) => ViolationKind::PrintAttempt,
            Some(BlockedShortcut::Devtools) => ViolationKind::DevtoolsAttempt,
            None => return Verdict::pass(),
        };
        let _ = lock_state(&self.state).record(kind, now);
        Verdict::suppressed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use chrono::TimeZone;

    #[derive(Default, Clone)]
    struct RecordingClipboard {
        clears: Arc<Mutex<u32>>,
        fail: bool,
    }

    impl Clipboard for RecordingClipboard {
        fn clear(&mut self) -> anyhow::Result<()> {
            if self.fail {
                bail!("clipboard access denied");
            }
            *self.clears.lock().unwrap() += 1;
            Ok(())
        }
    }

    type CallbackLog = Arc<Mutex<Vec<Vec<Violation>>>>;

    fn counting_callback() -> (CallbackLog, LimitCallback) {
        let log: CallbackLog = Arc::new(Mutex::new(Vec::new()));
        let inner = Arc::clone(&log);
        let callback: LimitCallback =
            Box::new(move |violations| inner.lock().unwrap().push(violations.to_vec()));
        (log, callback)
    }

    fn monitor() -> (ViolationMonitor, CallbackLog, RecordingClipboard) {
        let clipboard = RecordingClipboard::default();
        let (log, callback) = counting_callback();
        let monitor =
            ViolationMonitor::new(MonitorPolicy::default(), Box::new(clipboard.clone()), callback);
        (monitor, log, clipboard)
    }

    fn t(seconds: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, seconds).unwrap()
    }

    fn hidden() -> InputEvent {
        InputEvent::VisibilityChanged { hidden: true }
    }

    #[test]
    fn test_events_ignored_before_start() {
        let (mut monitor, log, _) = monitor();
        let verdict = monitor.handle_event(&hidden(), t(0));
        assert_eq!(verdict, Verdict::pass());
        assert_eq!(monitor.warning_count(), 0);
        assert!(monitor.violations().is_empty());
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_three_tab_switches_reach_limit_with_single_callback() {
        let (mut monitor, log, _) = monitor();
        monitor.start_monitoring();

        for (i, second) in [0u32, 5, 10].iter().enumerate() {
            let verdict = monitor.handle_event(&hidden(), t(*second));
            let prompt = verdict.prompt.expect("tab switch must prompt a warning");
            assert_eq!(prompt.warning_count, i as u32 + 1);
            assert_eq!(prompt.limit_reached, i == 2);
        }

        assert_eq!(monitor.warning_count(), 3);
        assert_eq!(monitor.escalation(), Escalation::LimitReached);
        let violations = monitor.violations();
        assert_eq!(violations.len(), 3);
        assert!(violations.iter().all(|v| v.kind == ViolationKind::TabSwitch));

        // Callback only fires after the fixed delay.
        assert!(log.lock().unwrap().is_empty());
        let due = monitor.pending_submit_due().expect("auto-submit armed");
        assert_eq!(due, t(10) + Duration::milliseconds(2000));

        assert!(!monitor.fire_limit_if_due(t(11)));
        assert!(monitor.fire_limit_if_due(t(13)));
        // Exactly once.
        assert!(!monitor.fire_limit_if_due(t(20)));
        assert!(monitor.pending_submit_due().is_none());

        let calls = log.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].len(), 3);
    }

    #[test]
    fn test_warning_count_capped_after_limit() {
        let (mut monitor, _, _) = monitor();
        monitor.start_monitoring();
        for second in 0..5 {
            monitor.handle_event(&hidden(), t(second));
        }
        // min(N, max_warnings) on the counter, full evidence in the log.
        assert_eq!(monitor.warning_count(), 3);
        assert_eq!(monitor.violations().len(), 5);
    }

    #[test]
    fn test_devtools_shortcut_logged_without_warning() {
        let (mut monitor, _, _) = monitor();
        monitor.start_monitoring();

        let verdict = monitor.handle_event(
            &InputEvent::KeyDown {
                chord: KeyChord::key(Key::F12),
            },
            t(0),
        );
        assert!(verdict.suppress_default);
        assert!(verdict.prompt.is_none());

        let violations = monitor.violations();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::DevtoolsAttempt);
        assert_eq!(monitor.warning_count(), 0);
    }

    #[test]
    fn test_shortcut_classification_table() {
        let cases = [
            ("ctrl+shift+s", Some(BlockedShortcut::Screenshot)),
            ("meta+shift+s", Some(BlockedShortcut::Screenshot)),
            ("ctrl+p", Some(BlockedShortcut::Print)),
            ("meta+p", Some(BlockedShortcut::Print)),
            ("f12", Some(BlockedShortcut::Devtools)),
            ("ctrl+shift+i", Some(BlockedShortcut::Devtools)),
            ("meta+shift+j", Some(BlockedShortcut::Devtools)),
            ("ctrl+u", Some(BlockedShortcut::Devtools)),
            ("ctrl+s", None),
            ("shift+s", None),
            ("ctrl+shift+p", Some(BlockedShortcut::Print)),
            ("p", None),
            ("ctrl+i", None),
        ];
        for (raw, expected) in cases {
            let chord: KeyChord = raw.parse().unwrap();
            assert_eq!(classify_shortcut(&chord), expected, "chord {raw}");
        }
    }

    #[test]
    fn test_modal_suspension_blocks_tab_switch_detection() {
        let (mut monitor, _, _) = monitor();
        monitor.start_monitoring();
        monitor.set_modal_suspended(true);

        monitor.handle_event(&hidden(), t(0));
        monitor.handle_event(&InputEvent::VisibilityChanged { hidden: false }, t(1));
        assert_eq!(monitor.warning_count(), 0);
        assert!(monitor.violations().is_empty());

        monitor.set_modal_suspended(false);
        let verdict = monitor.handle_event(&hidden(), t(2));
        assert!(verdict.prompt.is_some());
        assert_eq!(monitor.warning_count(), 1);
    }

    #[test]
    fn test_blur_without_hidden_never_counts() {
        let (mut monitor, _, _) = monitor();
        monitor.start_monitoring();
        monitor.handle_event(&InputEvent::WindowBlur, t(0));
        monitor.handle_event(&InputEvent::VisibilityChanged { hidden: false }, t(1));
        assert_eq!(monitor.warning_count(), 0);
        assert!(monitor.violations().is_empty());
    }

    #[test]
    fn test_print_screen_clears_clipboard_and_logs() {
        let (mut monitor, _, clipboard) = monitor();
        monitor.start_monitoring();

        let verdict = monitor.handle_event(
            &InputEvent::KeyUp {
                chord: KeyChord::key(Key::PrintScreen),
            },
            t(0),
        );
        // Keyup arrives after the fact; there is no default to suppress.
        assert!(!verdict.suppress_default);
        assert_eq!(*clipboard.clears.lock().unwrap(), 1);
        assert_eq!(
            monitor.violations()[0].kind,
            ViolationKind::ScreenshotAttempt
        );
        assert_eq!(monitor.warning_count(), 0);
    }

    #[test]
    fn test_clipboard_failure_is_swallowed() {
        let (_, callback) = counting_callback();
        let clipboard = RecordingClipboard {
            fail: true,
            ..Default::default()
        };
        let mut monitor =
            ViolationMonitor::new(MonitorPolicy::default(), Box::new(clipboard), callback);
        monitor.start_monitoring();

        monitor.handle_event(
            &InputEvent::KeyUp {
                chord: KeyChord::key(Key::PrintScreen),
            },
            t(0),
        );
        // Violation still recorded even though the clear failed.
        assert_eq!(monitor.violations().len(), 1);
    }

    #[test]
    fn test_context_menu_suppressed_and_logged() {
        let (mut monitor, _, _) = monitor();
        monitor.start_monitoring();
        let verdict = monitor.handle_event(&InputEvent::ContextMenu, t(0));
        assert!(verdict.suppress_default);
        assert_eq!(
            monitor.violations()[0].kind,
            ViolationKind::RightClickAttempt
        );
    }

    #[test]
    fn test_context_menu_logging_can_be_disabled() {
        let (_, callback) = counting_callback();
        let policy = MonitorPolicy {
            log_context_menu: false,
            ..Default::default()
        };
        let mut monitor =
            ViolationMonitor::new(policy, Box::new(RecordingClipboard::default()), callback);
        monitor.start_monitoring();
        let verdict = monitor.handle_event(&InputEvent::ContextMenu, t(0));
        assert!(verdict.suppress_default);
        assert!(monitor.violations().is_empty());
    }

    #[test]
    fn test_stop_monitoring_freezes_counters() {
        let (mut monitor, log, _) = monitor();
        monitor.start_monitoring();
        monitor.handle_event(&hidden(), t(0));
        assert_eq!(monitor.warning_count(), 1);

        monitor.stop_monitoring();
        for second in 1..10 {
            monitor.handle_event(&hidden(), t(second));
            monitor.handle_event(
                &InputEvent::KeyDown {
                    chord: KeyChord::key(Key::F12),
                },
                t(second),
            );
        }
        assert_eq!(monitor.warning_count(), 1);
        assert_eq!(monitor.violations().len(), 1);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_stop_without_start_is_safe() {
        let (mut monitor, _, _) = monitor();
        monitor.stop_monitoring();
        assert!(!monitor.is_active());
        assert_eq!(monitor.escalation(), Escalation::Idle);
    }

    #[test]
    fn test_start_is_idempotent() {
        let (mut monitor, _, _) = monitor();
        monitor.start_monitoring();
        monitor.handle_event(&hidden(), t(0));
        monitor.start_monitoring();
        // Restarting does not reset counts or escalation.
        assert_eq!(monitor.warning_count(), 1);
        assert_eq!(monitor.escalation(), Escalation::Active);
    }

    #[test]
    fn test_penultimate_warning_keeps_continue_affordance() {
        let (mut monitor, _, _) = monitor();
        monitor.start_monitoring();
        monitor.handle_event(&hidden(), t(0));
        let verdict = monitor.handle_event(&hidden(), t(1));
        let prompt = verdict.prompt.unwrap();
        assert_eq!(prompt.warning_count, 2);
        assert_eq!(prompt.remaining(), 1);
        assert!(!prompt.limit_reached);
        assert!(monitor.pending_submit_due().is_none());
    }
}
