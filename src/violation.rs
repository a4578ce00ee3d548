//! Violation records, warning prompts and the escalation state machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of a detected rule breach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationKind {
    TabSwitch,
    ScreenshotAttempt,
    ScreenshotShortcutBlocked,
    PrintAttempt,
    DevtoolsAttempt,
    RightClickAttempt,
    ScreenRecordingAttempt,
}

impl ViolationKind {
    pub fn description(&self) -> &'static str {
        match self {
            ViolationKind::TabSwitch => "Left exam page / switched tab",
            ViolationKind::ScreenshotAttempt => "Screenshot attempt detected",
            ViolationKind::ScreenshotShortcutBlocked => "Screenshot shortcut blocked",
            ViolationKind::PrintAttempt => "Print attempt blocked",
            ViolationKind::DevtoolsAttempt => "Developer tools access blocked",
            ViolationKind::RightClickAttempt => "Context menu blocked",
            ViolationKind::ScreenRecordingAttempt => "Screen recording attempt blocked",
        }
    }

    /// Only tab switches count toward the warning threshold. Keyboard and
    /// capture violations are logged without advancing the counter, matching
    /// the shipped policy of the reference platform.
    pub fn counts_as_warning(&self) -> bool {
        matches!(self, ViolationKind::TabSwitch)
    }
}

/// One detected rule breach. Immutable once created; appended to an ordered,
/// append-only log owned by the monitor for the session's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub occurred_at: DateTime<Utc>,
}

impl Violation {
    pub fn new(kind: ViolationKind, occurred_at: DateTime<Utc>) -> Self {
        Self { kind, occurred_at }
    }
}

/// Typed warning state handed to the presentation layer. The monitor never
/// renders anything itself; whoever shows the dialog reads this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarningPrompt {
    pub warning_count: u32,
    pub max_warnings: u32,
    pub limit_reached: bool,
}

impl WarningPrompt {
    /// Warnings left before the session is force-submitted.
    pub fn remaining(&self) -> u32 {
        self.max_warnings.saturating_sub(self.warning_count)
    }
}

/// Escalation states for one monitored session. `LimitReached` is terminal;
/// the host is responsible for ending the session once the limit callback
/// fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    Idle,
    Active,
    LimitReached,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_tab_switch_counts_as_warning() {
        let warning_kinds: Vec<_> = [
            ViolationKind::TabSwitch,
            ViolationKind::ScreenshotAttempt,
            ViolationKind::ScreenshotShortcutBlocked,
            ViolationKind::PrintAttempt,
            ViolationKind::DevtoolsAttempt,
            ViolationKind::RightClickAttempt,
            ViolationKind::ScreenRecordingAttempt,
        ]
        .into_iter()
        .filter(ViolationKind::counts_as_warning)
        .collect();
        assert_eq!(warning_kinds, vec![ViolationKind::TabSwitch]);
    }

    #[test]
    fn test_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&ViolationKind::ScreenRecordingAttempt).unwrap();
        assert_eq!(json, "\"screen-recording-attempt\"");
    }

    #[test]
    fn test_prompt_remaining() {
        let prompt = WarningPrompt {
            warning_count: 2,
            max_warnings: 3,
            limit_reached: false,
        };
        assert_eq!(prompt.remaining(), 1);

        let terminal = WarningPrompt {
            warning_count: 3,
            max_warnings: 3,
            limit_reached: true,
        };
        assert_eq!(terminal.remaining(), 0);
    }
}
