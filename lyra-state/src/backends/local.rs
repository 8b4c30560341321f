//! Local file backend for state storage
//!
//! Stores state in a local JSON file (default: lyra.state.json) next to a
//! `.lock` file. The lock file is created exclusively, so two hosts cannot
//! both acquire it; an expired lock is taken over. A lock file that cannot be
//! parsed is treated as held until it is older than the lock timeout.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Duration;
use log::{debug, warn};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::backend::{BackendConfig, BackendError, BackendResult, StateBackend};
use crate::lock::{DEFAULT_LOCK_TIMEOUT_SECS, LockInfo};
use crate::state::StateFile;

/// Contents of the lock file
enum LockFile {
    Absent,
    Held(LockInfo),
    /// Created but not parsable, usually because its writer is mid-write
    Incomplete { age: std::time::Duration },
}

/// Local file backend
pub struct LocalBackend {
    state_path: PathBuf,
    lock_path: PathBuf,
    lock_timeout: Duration,
}

impl LocalBackend {
    pub const DEFAULT_STATE_FILE: &'static str = "lyra.state.json";

    /// lyra.state.json in the current directory
    pub fn new() -> Self {
        Self::with_path(PathBuf::from(Self::DEFAULT_STATE_FILE))
    }

    pub fn with_path(state_path: PathBuf) -> Self {
        let lock_path = state_path.with_extension("lock");
        Self {
            state_path,
            lock_path,
            lock_timeout: Duration::seconds(DEFAULT_LOCK_TIMEOUT_SECS),
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Attributes: `path` (string), `lock_timeout_secs` (int, > 0)
    pub fn from_config(config: &BackendConfig) -> BackendResult<Self> {
        let path = config
            .get_string("path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(Self::DEFAULT_STATE_FILE));
        let mut backend = Self::with_path(path);

        if let Some(secs) = config.get_int("lock_timeout_secs") {
            if secs <= 0 {
                return Err(BackendError::configuration(format!(
                    "lock_timeout_secs must be positive, got {}",
                    secs
                )));
            }
            backend = backend.with_lock_timeout(Duration::seconds(secs));
        }
        Ok(backend)
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    async fn read_lock(&self) -> BackendResult<LockFile> {
        let content = match fs::read_to_string(&self.lock_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(LockFile::Absent),
            Err(e) => return Err(BackendError::Io(format!("Failed to read lock file: {}", e))),
        };

        match serde_json::from_str(&content) {
            Ok(lock) => Ok(LockFile::Held(lock)),
            Err(e) => {
                debug!("Lock file {} is not parsable: {}", self.lock_path.display(), e);
                let age = fs::metadata(&self.lock_path)
                    .await
                    .ok()
                    .and_then(|m| m.modified().ok())
                    .and_then(|modified| modified.elapsed().ok())
                    .unwrap_or_default();
                Ok(LockFile::Incomplete { age })
            }
        }
    }

    /// The parsed lock `lock_id` refers to, for release and force-unlock
    async fn held_lock(&self, lock_id: &str) -> BackendResult<LockInfo> {
        match self.read_lock().await? {
            LockFile::Held(existing) if existing.id == lock_id => Ok(existing),
            LockFile::Held(existing) => Err(BackendError::LockMismatch {
                expected: lock_id.to_string(),
                actual: existing.id,
            }),
            LockFile::Incomplete { .. } => Err(BackendError::LockMismatch {
                expected: lock_id.to_string(),
                actual: "unknown (lock file not parsable)".to_string(),
            }),
            LockFile::Absent => Err(BackendError::LockNotFound(lock_id.to_string())),
        }
    }

    fn is_stale(&self, age: std::time::Duration) -> bool {
        Duration::from_std(age).map_or(true, |age| age >= self.lock_timeout)
    }

    /// Create the lock file only if it does not exist yet
    async fn create_lock_file(&self, lock: &LockInfo) -> BackendResult<bool> {
        let content = serde_json::to_string_pretty(lock)
            .map_err(|e| BackendError::Serialization(format!("Failed to serialize lock: {}", e)))?;

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.lock_path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(BackendError::Io(format!("Failed to create lock file: {}", e))),
        };

        file.write_all(content.as_bytes())
            .await
            .map_err(|e| BackendError::Io(format!("Failed to write lock file: {}", e)))?;
        file.sync_all()
            .await
            .map_err(|e| BackendError::Io(format!("Failed to write lock file: {}", e)))?;
        Ok(true)
    }

    async fn remove_lock_file(&self) -> BackendResult<()> {
        fs::remove_file(&self.lock_path)
            .await
            .map_err(|e| BackendError::Io(format!("Failed to remove lock file: {}", e)))
    }
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateBackend for LocalBackend {
    async fn read_state(&self) -> BackendResult<Option<StateFile>> {
        let content = match fs::read_to_string(&self.state_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(BackendError::Io(format!("Failed to read state file: {}", e))),
        };

        let state: StateFile = serde_json::from_str(&content).map_err(|e| {
            BackendError::InvalidState(format!("Failed to parse state file: {}", e))
        })?;

        if state.version > StateFile::CURRENT_VERSION {
            return Err(BackendError::InvalidState(format!(
                "state file version {} is newer than supported version {}",
                state.version,
                StateFile::CURRENT_VERSION
            )));
        }

        Ok(Some(state))
    }

    async fn write_state(&self, state: &StateFile) -> BackendResult<()> {
        let content = serde_json::to_string_pretty(state).map_err(|e| {
            BackendError::Serialization(format!("Failed to serialize state: {}", e))
        })?;

        // Write-then-rename so a crash never leaves a truncated state file
        let tmp_path = self.state_path.with_extension("json.tmp");
        fs::write(&tmp_path, content)
            .await
            .map_err(|e| BackendError::Io(format!("Failed to write state file: {}", e)))?;
        fs::rename(&tmp_path, &self.state_path)
            .await
            .map_err(|e| BackendError::Io(format!("Failed to replace state file: {}", e)))?;

        debug!("Wrote state serial {} to {}", state.serial, self.state_path.display());
        Ok(())
    }

    async fn acquire_lock(&self, operation: &str) -> BackendResult<LockInfo> {
        let lock = LockInfo::with_timeout(operation, self.lock_timeout);

        if self.create_lock_file(&lock).await? {
            return Ok(lock);
        }

        match self.read_lock().await? {
            LockFile::Held(existing) if !existing.is_expired() => {
                return Err(BackendError::locked(&existing));
            }
            LockFile::Incomplete { age } if !self.is_stale(age) => return Err(lock_being_written()),
            LockFile::Held(existing) => warn!(
                "Taking over expired lock {} held by {} ({})",
                existing.id, existing.who, existing.operation
            ),
            LockFile::Incomplete { .. } => warn!(
                "Taking over unparsable lock file {}",
                self.lock_path.display()
            ),
            LockFile::Absent => {}
        }

        match fs::remove_file(&self.lock_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(BackendError::Io(format!("Failed to remove lock file: {}", e)));
            }
        }
        if self.create_lock_file(&lock).await? {
            return Ok(lock);
        }

        // Another host won the race for the expired lock
        match self.read_lock().await? {
            LockFile::Held(winner) => Err(BackendError::locked(&winner)),
            LockFile::Incomplete { .. } => Err(lock_being_written()),
            LockFile::Absent => Err(BackendError::Io("lock file vanished while acquiring".to_string())),
        }
    }

    async fn release_lock(&self, lock: &LockInfo) -> BackendResult<()> {
        self.held_lock(&lock.id).await?;
        self.remove_lock_file().await
    }

    async fn force_unlock(&self, lock_id: &str) -> BackendResult<()> {
        self.held_lock(lock_id).await?;
        self.remove_lock_file().await
    }
}

/// The holder of a lock file still being written is not known yet
fn lock_being_written() -> BackendError {
    BackendError::Locked {
        lock_id: "unknown".to_string(),
        who: "unknown".to_string(),
        operation: "lock file being written".to_string(),
    }
}
