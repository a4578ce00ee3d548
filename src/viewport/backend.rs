//! Environment abstraction for the viewport lockdown
//!
//! Every side effect the browser original applied to the document (viewport
//! meta tag, zoom, exam stylesheet, gesture/context-menu blockers, unload
//! confirmation, orientation lock) becomes a trait method here, so the guard
//! runs against a real host adapter in production and a recording double in
//! tests and the replay harness.

use anyhow::{bail, Result};

pub trait ViewportBackend: Send {
    /// Current viewport scaling configuration, if the platform has one.
    fn viewport_config(&self) -> Option<String>;
    fn set_viewport_config(&mut self, config: &str);

    /// Current page zoom, if the platform has one.
    fn zoom(&self) -> Option<String>;
    fn set_zoom(&mut self, zoom: &str);

    fn set_exam_stylesheet(&mut self, applied: bool);
    fn set_gesture_blocking(&mut self, blocked: bool);
    fn set_context_menu_blocking(&mut self, blocked: bool);

    /// Arm or disarm the native navigate-away confirmation.
    fn set_unload_guard(&mut self, armed: bool);

    /// Best-effort; callers swallow errors from unsupported platforms.
    fn lock_landscape(&mut self) -> Result<()>;
    fn unlock_orientation(&mut self) -> Result<()>;
}

/// In-memory backend that records the applied environment. Used by the
/// replay binary and as the test double.
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    pub viewport: Option<String>,
    pub zoom: Option<String>,
    pub exam_stylesheet: bool,
    pub gesture_blocking: bool,
    pub context_menu_blocking: bool,
    pub unload_guard: bool,
    pub orientation_locked: bool,
    pub supports_orientation: bool,
}

impl RecordingBackend {
    pub fn with_viewport(viewport: &str) -> Self {
        Self {
            viewport: Some(viewport.to_string()),
            ..Default::default()
        }
    }
}

impl ViewportBackend for RecordingBackend {
    fn viewport_config(&self) -> Option<String> {
        self.viewport.clone()
    }

    fn set_viewport_config(&mut self, config: &str) {
        self.viewport = Some(config.to_string());
    }

    fn zoom(&self) -> Option<String> {
        self.zoom.clone()
    }

    fn set_zoom(&mut self, zoom: &str) {
        self.zoom = Some(zoom.to_string());
    }

    fn set_exam_stylesheet(&mut self, applied: bool) {
        self.exam_stylesheet = applied;
    }

    fn set_gesture_blocking(&mut self, blocked: bool) {
        self.gesture_blocking = blocked;
    }

    fn set_context_menu_blocking(&mut self, blocked: bool) {
        self.context_menu_blocking = blocked;
    }

    fn set_unload_guard(&mut self, armed: bool) {
        self.unload_guard = armed;
    }

    fn lock_landscape(&mut self) -> Result<()> {
        if !self.supports_orientation {
            bail!("orientation lock not supported");
        }
        self.orientation_locked = true;
        Ok(())
    }

    fn unlock_orientation(&mut self) -> Result<()> {
        if !self.supports_orientation {
            bail!("orientation unlock not supported");
        }
        self.orientation_locked = false;
        Ok(())
    }
}
