use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use arc_swap::{ArcSwap, ArcSwapOption};
use serde::{Deserialize, Serialize};

use crate::{PermissionMatrix, StoreError, UserId};

/// Authenticated session as issued at login
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_id: UserId,
    #[serde(default)]
    pub is_client_admin: bool,
    #[serde(default)]
    pub role_id: Option<u64>,
    #[serde(default)]
    pub role_name: Option<String>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("is_client_admin", &self.is_client_admin)
            .field("role_id", &self.role_id)
            .field("role_name", &self.role_name)
            .finish()
    }
}

/// Everything persisted locally: the session and the last known matrix, written and cleared
/// as one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    #[serde(default)]
    pub session: Option<Session>,
    #[serde(default)]
    pub matrix: PermissionMatrix,
}

impl StoredSession {
    pub fn token(&self) -> Option<&str> {
        self.session.as_ref().map(|session| session.token.as_str())
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.session.as_ref().map(|session| session.user_id)
    }

    pub fn is_client_admin(&self) -> bool {
        self.session.as_ref().is_some_and(|session| session.is_client_admin)
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }
}

/// Where [StoredSession] lives between process restarts
pub trait StateBackend: Send + Sync {
    fn load(&self) -> Result<Option<StoredSession>, StoreError>;
    fn save(&self, state: &StoredSession) -> Result<(), StoreError>;
    fn clear(&self) -> Result<(), StoreError>;
}

/// JSON document on disk, replaced through a temp file and rename
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileBackend { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl StateBackend for FileBackend {
    fn load(&self) -> Result<Option<StoredSession>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn save(&self, state: &StoredSession) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let temp = self.temp_path();
        fs::write(&temp, serde_json::to_vec_pretty(state)?)?;
        fs::rename(&temp, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-process backend for tests and sessions that must not outlive the process
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: ArcSwapOption<StoredSession>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: StoredSession) -> Self {
        MemoryBackend {
            state: ArcSwapOption::from_pointee(state),
        }
    }

    /// What is persisted right now
    pub fn persisted(&self) -> Option<StoredSession> {
        self.state.load_full().map(|state| StoredSession::clone(&state))
    }
}

impl StateBackend for MemoryBackend {
    fn load(&self) -> Result<Option<StoredSession>, StoreError> {
        Ok(self.persisted())
    }

    fn save(&self, state: &StoredSession) -> Result<(), StoreError> {
        self.state.store(Some(Arc::new(state.clone())));
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.state.store(None);
        Ok(())
    }
}

/// Current session and last known matrix.
///
/// Read-through cache that is only ever replaced wholesale: every write builds a new
/// [StoredSession] and swaps it in atomically, then persists it.
pub struct PermissionStore {
    backend: Arc<dyn StateBackend>,
    current: ArcSwap<StoredSession>,
}

impl PermissionStore {
    pub fn new(backend: Arc<dyn StateBackend>) -> Self {
        PermissionStore {
            backend,
            current: ArcSwap::from_pointee(StoredSession::default()),
        }
    }

    /// Restores persisted state into memory. Nothing persisted restores an empty state.
    pub fn init(&self) -> Result<Arc<StoredSession>, StoreError> {
        let restored = Arc::new(self.backend.load()?.unwrap_or_default());
        self.current.store(restored.clone());
        Ok(restored)
    }

    pub fn snapshot(&self) -> Arc<StoredSession> {
        self.current.load_full()
    }

    /// Replaces the whole state. Memory is only swapped once the backend accepted it.
    pub fn update(&self, state: StoredSession) -> Result<(), StoreError> {
        let state = Arc::new(state);
        self.backend.save(&state)?;
        self.current.store(state);
        Ok(())
    }

    /// Replaces the cached matrix, provided the session still belongs to `user_id`.
    ///
    /// Returns whether the matrix was applied. A refresh that resolves after logout or after
    /// another user logged in is dropped, and without a user there is nothing to apply or
    /// persist. The in-memory swap happens even when persisting fails.
    pub fn hydrate(&self, user_id: Option<UserId>, matrix: PermissionMatrix) -> Result<bool, StoreError> {
        if user_id.is_none() {
            return Ok(false);
        }
        let mut applied = false;
        self.current.rcu(|current| {
            applied = current.user_id() == user_id;
            let mut next = StoredSession::clone(current);
            if applied {
                next.matrix = matrix.clone();
            }
            next
        });
        if !applied {
            return Ok(false);
        }
        self.backend.save(&self.current.load_full())?;
        Ok(true)
    }

    /// Drops session and matrix, in memory and on the backend
    pub fn clear(&self) -> Result<(), StoreError> {
        self.current.store(Arc::new(StoredSession::default()));
        self.backend.clear()
    }
}
