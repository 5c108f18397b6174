use crate::client::storage::SessionStorage;
use crate::error::AuthError;
use std::sync::{Arc, RwLock};

/// Holds a client's current session identifier, mirroring persistent
/// storage. Construct one at startup and pass a handle to whatever issues
/// authenticated calls; cloning shares the same state.
#[derive(Clone)]
pub struct SessionHandle {
    storage: Arc<dyn SessionStorage>,
    current: Arc<RwLock<Option<String>>>,
}

impl SessionHandle {
    /// Seeds the in-memory value from storage, once.
    pub fn new(storage: Arc<dyn SessionStorage>) -> Result<Self, AuthError> {
        let current = storage.load()?;
        Ok(Self {
            storage,
            current: Arc::new(RwLock::new(current)),
        })
    }

    pub fn session_id(&self) -> Option<String> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.session_id().is_some()
    }

    /// Persists first, then updates the in-memory value, so storage always
    /// reflects the latest committed state before dependents observe it.
    pub fn set_session_id(&self, session_id: Option<&str>) -> Result<(), AuthError> {
        self.storage.save(session_id)?;
        let mut current = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *current = session_id.map(str::to_string);
        Ok(())
    }

    pub fn sign_out(&self) -> Result<(), AuthError> {
        self.set_session_id(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::storage::{FileStorage, MemoryStorage};

    #[test]
    fn set_then_get_round_trips() {
        let handle = SessionHandle::new(Arc::new(MemoryStorage::new())).unwrap();
        assert_eq!(handle.session_id(), None);

        handle.set_session_id(Some("s1")).unwrap();
        assert_eq!(handle.session_id(), Some("s1".to_string()));
        assert!(handle.is_signed_in());

        handle.sign_out().unwrap();
        assert_eq!(handle.session_id(), None);
    }

    #[test]
    fn clones_share_state() {
        let handle = SessionHandle::new(Arc::new(MemoryStorage::new())).unwrap();
        let other = handle.clone();

        handle.set_session_id(Some("s1")).unwrap();
        assert_eq!(other.session_id(), Some("s1".to_string()));
    }

    #[test]
    fn a_reload_re_seeds_from_storage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session");

        let handle = SessionHandle::new(Arc::new(FileStorage::new(&path))).unwrap();
        handle.set_session_id(Some("s1")).unwrap();
        drop(handle);

        // A fresh handle over the same storage sees the persisted value.
        let reloaded = SessionHandle::new(Arc::new(FileStorage::new(&path))).unwrap();
        assert_eq!(reloaded.session_id(), Some("s1".to_string()));

        reloaded.sign_out().unwrap();
        let reloaded = SessionHandle::new(Arc::new(FileStorage::new(&path))).unwrap();
        assert_eq!(reloaded.session_id(), None);
    }
}
