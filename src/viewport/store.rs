//! Durable session flags
//!
//! Only two pieces of proctoring state survive a page reload: whether exam
//! mode is active and whether the exam was submitted. The original kept them
//! in ambient sessionStorage; here they live behind an explicit store so
//! tests substitute memory and the binary uses a JSON file.

use serde::{Deserialize, Serialize};
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    pub exam_mode: bool,
    pub exam_submitted: bool,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read session state: {0}")]
    Read(#[source] std::io::Error),
    #[error("failed to write session state: {0}")]
    Write(#[source] std::io::Error),
    #[error("session state is corrupt: {0}")]
    Corrupt(#[source] serde_json::Error),
}

pub trait SessionStore: Send {
    fn load(&self) -> Result<PersistedState, StoreError>;
    fn save(&self, state: &PersistedState) -> Result<(), StoreError>;
}

/// Shared in-memory store. Clones observe the same state, which lets a test
/// hand the "same browser session" to a second guard to simulate a reload.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<PersistedState>>,
}

impl MemoryStore {
    pub fn new(initial: PersistedState) -> Self {
        Self {
            state: Arc::new(Mutex::new(initial)),
        }
    }
}

impl SessionStore for MemoryStore {
    fn load(&self) -> Result<PersistedState, StoreError> {
        Ok(*self.state.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn save(&self, state: &PersistedState) -> Result<(), StoreError> {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = *state;
        Ok(())
    }
}

/// JSON file store used by the replay binary.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionStore for FileStore {
    fn load(&self) -> Result<PersistedState, StoreError> {
        if !self.path.exists() {
            return Ok(PersistedState::default());
        }
        let file = std::fs::File::open(&self.path).map_err(StoreError::Read)?;
        serde_json::from_reader(BufReader::new(file)).map_err(StoreError::Corrupt)
    }

    fn save(&self, state: &PersistedState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(StoreError::Write)?;
            }
        }
        let file = std::fs::File::create(&self.path).map_err(StoreError::Write)?;
        serde_json::to_writer_pretty(BufWriter::new(file), state)
            .map_err(|e| StoreError::Write(std::io::Error::new(std::io::ErrorKind::Other, e)))
    }
}
