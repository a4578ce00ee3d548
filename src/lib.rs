//! ExamGuard - proctoring core for timed exam practice sessions
//!
//! Two cooperating components form the core: [`monitor::ViolationMonitor`]
//! detects prohibited actions during an active session and enforces the
//! warning/auto-submit escalation policy, while [`viewport::ViewportGuard`]
//! owns the environmental lockdown (viewport scaling, zoom, orientation,
//! unload protection) that makes an exam session distinct from normal
//! browsing. [`session::ExamSession`] wires both together the way an exam
//! host screen would: rules acceptance starts monitoring and lockdown,
//! submit/exit tears both down, and reaching the violation limit
//! force-submits the session.

pub mod config;
pub mod events;
pub mod logging;
pub mod monitor;
pub mod report;
pub mod session;
pub mod violation;
pub mod viewport;

pub use events::{InputEvent, Key, KeyChord};
pub use monitor::{MonitorPolicy, Verdict, ViolationMonitor};
pub use session::{ExamRules, ExamSession, SessionOutcome};
pub use violation::{Escalation, Violation, ViolationKind, WarningPrompt};
pub use viewport::{ViewportGuard, ViewportOptions};
