//! Clipboard capability used by the PrintScreen rule
//!
//! Clearing the clipboard after a PrintScreen keyup is best-effort: the
//! monitor swallows failures, so an implementation may freely return errors
//! when the platform refuses access.

use anyhow::Result;

pub trait Clipboard: Send {
    /// Overwrite the clipboard contents with an empty value.
    fn clear(&mut self) -> Result<()>;
}

/// For hosts without clipboard access; the PrintScreen violation is still
/// logged, only the clear becomes a no-op.
pub struct NoopClipboard;

impl Clipboard for NoopClipboard {
    fn clear(&mut self) -> Result<()> {
        Ok(())
    }
}
