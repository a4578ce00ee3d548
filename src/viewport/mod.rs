//! Viewport lockdown for the duration of a proctored session
//!
//! [`ViewportGuard`] toggles the environment between the unrestricted
//! default view and a locked exam view: fixed scale, no pinch zoom, exam
//! stylesheet, context-menu and gesture blockers, and a navigate-away
//! confirmation that stays armed until the exam is submitted or exited
//! intentionally. Exam-mode state persists across a reload through the
//! injected [`SessionStore`], so a refresh mid-exam re-applies the lockdown
//! before anything else runs.

pub mod backend;
pub mod store;

use tracing::{debug, info, warn};

pub use backend::{RecordingBackend, ViewportBackend};
pub use store::{FileStore, MemoryStore, PersistedState, SessionStore, StoreError};

use crate::config::ViewportConfig;

/// Locked exam viewport: fixed at 100%, user scaling disabled.
pub const EXAM_VIEWPORT: &str =
    "width=device-width, initial-scale=1.0, maximum-scale=1.0, user-scalable=no, viewport-fit=cover";
/// Default scalable viewport restored when no pre-exam value was captured.
pub const DEFAULT_VIEWPORT: &str = "width=device-width, initial-scale=1.0";
pub const EXAM_ZOOM: &str = "100%";
pub const DEFAULT_ZOOM: &str = "auto";

#[derive(Debug, Clone)]
pub struct ViewportOptions {
    /// Try to lock the screen to landscape while in exam mode. Best-effort.
    pub lock_orientation: bool,
}

impl Default for ViewportOptions {
    fn default() -> Self {
        Self {
            lock_orientation: true,
        }
    }
}

impl From<&ViewportConfig> for ViewportOptions {
    fn from(config: &ViewportConfig) -> Self {
        Self {
            lock_orientation: config.lock_orientation,
        }
    }
}

pub struct ViewportGuard<S: SessionStore, B: ViewportBackend> {
    store: S,
    backend: B,
    options: ViewportOptions,
    exam_mode: bool,
    exam_submitted: bool,
    saved_viewport: Option<String>,
    saved_zoom: Option<String>,
}

impl<S: SessionStore, B: ViewportBackend> ViewportGuard<S, B> {
    pub fn new(store: S, backend: B) -> Self {
        Self::with_options(store, backend, ViewportOptions::default())
    }

    /// Reads persisted state and applies the matching view immediately, so a
    /// reload mid-exam never shows the unrestricted layout.
    pub fn with_options(store: S, backend: B, options: ViewportOptions) -> Self {
        let persisted = store.load().unwrap_or_else(|e| {
            warn!("failed to load persisted exam state, assuming defaults: {e}");
            PersistedState::default()
        });

        let mut guard = Self {
            store,
            backend,
            options,
            exam_mode: persisted.exam_mode,
            exam_submitted: persisted.exam_submitted,
            saved_viewport: None,
            saved_zoom: None,
        };

        if guard.exam_mode {
            info!("exam mode persisted across reload; re-applying lockdown");
            guard.apply_exam_view();
        } else {
            guard.apply_default_view();
        }
        guard
    }

    /// Enters the locked exam view. Captures the current viewport and zoom
    /// first so an exit restores them verbatim. Idempotent.
    pub fn enter_exam_mode(&mut self) {
        if self.exam_mode {
            debug!("already in exam mode");
            return;
        }
        info!("entering exam mode; locking viewport");

        self.saved_viewport = self.backend.viewport_config();
        self.saved_zoom = self.backend.zoom();
        self.exam_mode = true;
        self.exam_submitted = false;
        self.persist();

        self.apply_exam_view();
        if self.options.lock_orientation {
            if let Err(e) = self.backend.lock_landscape() {
                debug!("landscape lock unavailable: {e:#}");
            }
        }
    }

    /// Leaves exam mode and restores the pre-exam environment, falling back
    /// to a default scalable viewport when nothing was captured. Safe to
    /// call without a prior enter.
    pub fn exit_exam_mode(&mut self, submitted: bool) {
        info!(submitted, "exiting exam mode; restoring viewport");
        self.exam_mode = false;
        self.exam_submitted = submitted;
        self.persist();

        let viewport = self.saved_viewport.take();
        self.backend
            .set_viewport_config(viewport.as_deref().unwrap_or(DEFAULT_VIEWPORT));
        let zoom = self.saved_zoom.take();
        self.backend.set_zoom(zoom.as_deref().unwrap_or(DEFAULT_ZOOM));

        self.backend.set_exam_stylesheet(false);
        self.backend.set_gesture_blocking(false);
        self.backend.set_context_menu_blocking(false);
        self.backend.set_unload_guard(false);
        if let Err(e) = self.backend.unlock_orientation() {
            debug!("orientation unlock unavailable: {e:#}");
        }
    }

    /// Whether a navigate-away attempt should trigger the native
    /// confirmation prompt.
    pub fn should_confirm_unload(&self) -> bool {
        self.exam_mode && !self.exam_submitted
    }

    pub fn is_exam_mode(&self) -> bool {
        self.exam_mode
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn apply_exam_view(&mut self) {
        self.backend.set_viewport_config(EXAM_VIEWPORT);
        self.backend.set_zoom(EXAM_ZOOM);
        self.backend.set_exam_stylesheet(true);
        self.backend.set_gesture_blocking(true);
        self.backend.set_context_menu_blocking(true);
        self.backend.set_unload_guard(true);
    }

    fn apply_default_view(&mut self) {
        self.backend.set_viewport_config(DEFAULT_VIEWPORT);
        self.backend.set_zoom(DEFAULT_ZOOM);
        self.backend.set_exam_stylesheet(false);
        self.backend.set_gesture_blocking(false);
        self.backend.set_context_menu_blocking(false);
        self.backend.set_unload_guard(false);
    }

    /// Persistence is best-effort; a storage failure must never break the
    /// lockdown itself.
    fn persist(&self) {
        let state = PersistedState {
            exam_mode: self.exam_mode,
            exam_submitted: self.exam_submitted,
        };
        if let Err(e) = self.store.save(&state) {
            warn!("failed to persist exam state: {e}");
        }
    }
}
