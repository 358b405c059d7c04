//! Local persisted state
//!
//! Two durable entries outlive the process: the selected route day and the
//! session marker. Both sit behind the [`LocalState`] port so the engine
//! never touches global state directly.

use parking_lot::Mutex;
use shared::models::{RouteDay, SessionMarker};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ROUTE_DAY_KEY: &str = "route_day";
pub const SESSION_KEY: &str = "session";

#[derive(Debug, Error)]
pub enum LocalStateError {
    #[error("local state I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("local state is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),
}

pub type LocalStateResult<T> = Result<T, LocalStateError>;

/// Durable string key/value port
pub trait LocalState: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: String) -> LocalStateResult<()>;

    fn remove(&self, key: &str) -> LocalStateResult<()>;

    /// Persisted route day, or the default tag if absent or unreadable
    fn route_day(&self) -> RouteDay {
        match self.get(ROUTE_DAY_KEY) {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Ignoring persisted route day");
                RouteDay::default()
            }),
            None => RouteDay::default(),
        }
    }

    fn set_route_day(&self, day: RouteDay) -> LocalStateResult<()> {
        self.set(ROUTE_DAY_KEY, day.as_str().to_string())
    }

    fn session(&self) -> Option<SessionMarker> {
        let raw = self.get(SESSION_KEY)?;
        serde_json::from_str(&raw).ok()
    }

    /// Open a session valid for `ttl_millis` from `now_millis`
    fn start_session(&self, now_millis: i64, ttl_millis: i64) -> LocalStateResult<SessionMarker> {
        let marker = SessionMarker::new(now_millis, ttl_millis);
        self.set(SESSION_KEY, serde_json::to_string(&marker)?)?;
        Ok(marker)
    }

    fn session_active(&self, now_millis: i64) -> bool {
        self.session().is_some_and(|m| m.is_active(now_millis))
    }

    fn end_session(&self) -> LocalStateResult<()> {
        self.remove(SESSION_KEY)
    }
}

/// JSON file backed state (`<work_dir>/state.json`)
pub struct FileLocalState {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileLocalState {
    /// Open the state file, starting empty if it does not exist
    pub fn open(path: impl AsRef<Path>) -> LocalStateResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // 先写临时文件再 rename，避免写一半的文件
    fn flush(&self, entries: &BTreeMap<String, String>) -> LocalStateResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(entries)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl LocalState for FileLocalState {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> LocalStateResult<()> {
        let mut entries = self.entries.lock();
        entries.insert(key.to_string(), value);
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> LocalStateResult<()> {
        let mut entries = self.entries.lock();
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }
}

/// Volatile state for tests and embedding
#[derive(Default)]
pub struct MemoryLocalState {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryLocalState {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalState for MemoryLocalState {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> LocalStateResult<()> {
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> LocalStateResult<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}
