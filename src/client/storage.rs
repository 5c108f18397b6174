use crate::error::AuthError;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

/// Where a client keeps the persisted session identifier between runs.
pub trait SessionStorage: Send + Sync {
    fn load(&self) -> Result<Option<String>, AuthError>;

    /// Persists the identifier. `None` removes the entry entirely.
    fn save(&self, session_id: Option<&str>) -> Result<(), AuthError>;
}

/// Single-file persistence. The file holds the bare identifier and is
/// removed when the session is cleared.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Conventional per-application location under the platform data dir,
    /// e.g. `~/.local/share/<app>/session` on Linux.
    pub fn for_app(app: &str) -> Self {
        let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            path: base.join(app).join("session"),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl SessionStorage for FileStorage {
    fn load(&self) -> Result<Option<String>, AuthError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let trimmed = contents.trim();
                Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AuthError::client_storage("failed to read persisted session", e)),
        }
    }

    fn save(&self, session_id: Option<&str>) -> Result<(), AuthError> {
        match session_id {
            Some(id) => {
                if let Some(parent) = self.path.parent() {
                    fs::create_dir_all(parent).map_err(|e| AuthError::client_storage("failed to create session directory", e))?;
                }
                fs::write(&self.path, id).map_err(|e| AuthError::client_storage("failed to persist session", e))
            }
            None => match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(AuthError::client_storage("failed to remove persisted session", e)),
            },
        }
    }
}

/// In-memory persistence for tests and embeddings without a disk.
#[derive(Default)]
pub struct MemoryStorage {
    value: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> Result<Option<String>, AuthError> {
        let value = match self.value.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(value.clone())
    }

    fn save(&self, session_id: Option<&str>) -> Result<(), AuthError> {
        let mut value = match self.value.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *value = session_id.map(str::to_string);
        Ok(())
    }
}
