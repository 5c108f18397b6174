use crate::database::document::{Collection, Document, DocumentPatch, DocumentStore};
use crate::error::{AuthError, StoreError};
use crate::models::key::{Key, KeyPatch};
use crate::models::session::{Session, SessionPatch};
use crate::models::user::{User, UserPatch};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

/// The persistence contract the auth core drives. Implemented for any
/// [`DocumentStore`] by [`DocumentAdapter`].
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AuthError>;
    /// Inserts the user, then the initial credential when one is supplied.
    /// Two backend calls; atomicity is the backend's transaction boundary.
    async fn set_user(&self, user: &User, key: Option<&Key>) -> Result<(), AuthError>;
    async fn update_user(&self, user_id: &str, patch: &UserPatch) -> Result<(), AuthError>;
    /// No-op when the user does not exist.
    async fn delete_user(&self, user_id: &str) -> Result<(), AuthError>;

    async fn get_session(&self, session_id: &str) -> Result<Option<Session>, AuthError>;
    async fn get_sessions_by_user_id(&self, user_id: &str) -> Result<Vec<Session>, AuthError>;
    /// Both rows, or `None` when either is absent. Never a partial pair.
    async fn get_session_and_user(&self, session_id: &str) -> Result<Option<(Session, User)>, AuthError>;
    /// Fails with an invalid-user error when the owning user is absent.
    async fn set_session(&self, session: &Session) -> Result<(), AuthError>;
    async fn update_session(&self, session_id: &str, patch: &SessionPatch) -> Result<(), AuthError>;
    /// No-op when the session does not exist.
    async fn delete_session(&self, session_id: &str) -> Result<(), AuthError>;
    /// One backend delete per matching row.
    async fn delete_sessions_by_user_id(&self, user_id: &str) -> Result<(), AuthError>;
    /// Every session row; serves the dead-session sweep.
    async fn list_sessions(&self) -> Result<Vec<Session>, AuthError>;

    async fn get_key(&self, key_id: &str) -> Result<Option<Key>, AuthError>;
    async fn get_keys_by_user_id(&self, user_id: &str) -> Result<Vec<Key>, AuthError>;
    /// Fails with a duplicate-key error when the identifier exists and an
    /// invalid-user error when the referenced user is absent; performs no
    /// insert on either failure.
    async fn set_key(&self, key: &Key) -> Result<(), AuthError>;
    async fn update_key(&self, key_id: &str, patch: &KeyPatch) -> Result<(), AuthError>;
    /// No-op when the key does not exist.
    async fn delete_key(&self, key_id: &str) -> Result<(), AuthError>;
    /// One backend delete per matching row.
    async fn delete_keys_by_user_id(&self, user_id: &str) -> Result<(), AuthError>;
}

/// Maps the typed auth CRUD contract onto a document store's query/index API.
#[derive(Clone)]
pub struct DocumentAdapter<D> {
    db: D,
}

impl<D: DocumentStore> DocumentAdapter<D> {
    pub fn new(db: D) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &D {
        &self.db
    }

    async fn find<T: DeserializeOwned>(&self, collection: Collection, id: &str) -> Result<Option<T>, AuthError> {
        self.db.find_by_id(collection, id).await?.map(decode).transpose()
    }

    async fn find_by_user<T: DeserializeOwned>(&self, collection: Collection, user_id: &str) -> Result<Vec<T>, AuthError> {
        let documents = self.db.find_by_user_id(collection, user_id).await?;
        documents.into_iter().map(decode).collect()
    }

    async fn delete_by_user(&self, collection: Collection, user_id: &str) -> Result<(), AuthError> {
        let documents = self.db.find_by_user_id(collection, user_id).await?;
        let count = documents.len();
        for document in documents {
            if let Some(id) = document.get("id").and_then(serde_json::Value::as_str) {
                self.db.delete(collection, id).await?;
            }
        }
        debug!(collection = collection.name(), user_id, count, "deleted rows by user id");
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(document: Document) -> Result<T, AuthError> {
    serde_json::from_value(serde_json::Value::Object(document))
        .map_err(|e| AuthError::store("failed to decode stored document", StoreError::Codec(e)))
}

fn encode<T: Serialize>(record: &T) -> Result<Document, AuthError> {
    match serde_json::to_value(record).map_err(StoreError::Codec)? {
        serde_json::Value::Object(document) => Ok(document),
        other => Err(AuthError::store(
            "record serialized to a non-object document",
            StoreError::backend(format!("unexpected document shape: {other}")),
        )),
    }
}

fn timestamp(value: &chrono::DateTime<chrono::Utc>) -> Result<serde_json::Value, AuthError> {
    serde_json::to_value(value).map_err(AuthError::from)
}

#[async_trait]
impl<D: DocumentStore> StorageAdapter for DocumentAdapter<D> {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AuthError> {
        self.find(Collection::Users, user_id).await
    }

    async fn set_user(&self, user: &User, key: Option<&Key>) -> Result<(), AuthError> {
        self.db.insert(Collection::Users, encode(user)?).await?;
        if let Some(key) = key {
            self.set_key(key).await?;
        }
        Ok(())
    }

    async fn update_user(&self, user_id: &str, patch: &UserPatch) -> Result<(), AuthError> {
        if self.get_user(user_id).await?.is_none() {
            return Err(AuthError::InvalidUserId(user_id.to_string()));
        }
        let mut document = DocumentPatch::new();
        if let Some(attributes) = &patch.attributes {
            document.extend(attributes.clone());
        }
        Ok(self.db.patch(Collection::Users, user_id, document).await?)
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), AuthError> {
        if self.get_user(user_id).await?.is_none() {
            return Ok(());
        }
        Ok(self.db.delete(Collection::Users, user_id).await?)
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<Session>, AuthError> {
        self.find(Collection::Sessions, session_id).await
    }

    async fn get_sessions_by_user_id(&self, user_id: &str) -> Result<Vec<Session>, AuthError> {
        self.find_by_user(Collection::Sessions, user_id).await
    }

    async fn get_session_and_user(&self, session_id: &str) -> Result<Option<(Session, User)>, AuthError> {
        let Some(session) = self.get_session(session_id).await? else {
            return Ok(None);
        };
        let Some(user) = self.get_user(&session.user_id).await? else {
            return Ok(None);
        };
        Ok(Some((session, user)))
    }

    async fn set_session(&self, session: &Session) -> Result<(), AuthError> {
        if self.get_user(&session.user_id).await?.is_none() {
            return Err(AuthError::InvalidUserId(session.user_id.clone()));
        }
        Ok(self.db.insert(Collection::Sessions, encode(session)?).await?)
    }

    async fn update_session(&self, session_id: &str, patch: &SessionPatch) -> Result<(), AuthError> {
        if self.get_session(session_id).await?.is_none() {
            return Err(AuthError::InvalidSessionId(session_id.to_string()));
        }
        let mut document = DocumentPatch::new();
        if let Some(active_expires) = &patch.active_expires {
            document.insert("active_expires".to_string(), timestamp(active_expires)?);
        }
        if let Some(idle_expires) = &patch.idle_expires {
            document.insert("idle_expires".to_string(), timestamp(idle_expires)?);
        }
        if let Some(attributes) = &patch.attributes {
            document.extend(attributes.clone());
        }
        Ok(self.db.patch(Collection::Sessions, session_id, document).await?)
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), AuthError> {
        if self.get_session(session_id).await?.is_none() {
            return Ok(());
        }
        Ok(self.db.delete(Collection::Sessions, session_id).await?)
    }

    async fn delete_sessions_by_user_id(&self, user_id: &str) -> Result<(), AuthError> {
        self.delete_by_user(Collection::Sessions, user_id).await
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, AuthError> {
        let documents = self.db.list(Collection::Sessions).await?;
        documents.into_iter().map(decode).collect()
    }

    async fn get_key(&self, key_id: &str) -> Result<Option<Key>, AuthError> {
        self.find(Collection::Keys, key_id).await
    }

    async fn get_keys_by_user_id(&self, user_id: &str) -> Result<Vec<Key>, AuthError> {
        self.find_by_user(Collection::Keys, user_id).await
    }

    async fn set_key(&self, key: &Key) -> Result<(), AuthError> {
        if self.get_key(&key.id).await?.is_some() {
            return Err(AuthError::DuplicateKeyId(key.id.clone()));
        }
        if self.get_user(&key.user_id).await?.is_none() {
            return Err(AuthError::InvalidUserId(key.user_id.clone()));
        }
        Ok(self.db.insert(Collection::Keys, encode(key)?).await?)
    }

    async fn update_key(&self, key_id: &str, patch: &KeyPatch) -> Result<(), AuthError> {
        if self.get_key(key_id).await?.is_none() {
            return Err(AuthError::InvalidKeyId(key_id.to_string()));
        }
        let mut document = DocumentPatch::new();
        if let Some(hashed_password) = &patch.hashed_password {
            document.insert("hashed_password".to_string(), serde_json::to_value(hashed_password)?);
        }
        Ok(self.db.patch(Collection::Keys, key_id, document).await?)
    }

    async fn delete_key(&self, key_id: &str) -> Result<(), AuthError> {
        if self.get_key(key_id).await?.is_none() {
            return Ok(());
        }
        Ok(self.db.delete(Collection::Keys, key_id).await?)
    }

    async fn delete_keys_by_user_id(&self, user_id: &str) -> Result<(), AuthError> {
        self.delete_by_user(Collection::Keys, user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryStore;
    use crate::models::Attributes;
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn adapter() -> (DocumentAdapter<MemoryStore>, MemoryStore) {
        let store = MemoryStore::new();
        (DocumentAdapter::new(store.clone()), store)
    }

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            created_at: Utc::now(),
            attributes: Attributes::new(),
        }
    }

    fn session(id: &str, user_id: &str) -> Session {
        let now = Utc::now();
        Session {
            id: id.to_string(),
            user_id: user_id.to_string(),
            active_expires: now + Duration::hours(1),
            idle_expires: now + Duration::hours(2),
            attributes: Attributes::new(),
        }
    }

    fn key(id: &str, user_id: &str) -> Key {
        Key {
            id: id.to_string(),
            user_id: user_id.to_string(),
            hashed_password: None,
        }
    }

    #[tokio::test]
    async fn set_key_rejects_duplicates_without_inserting() {
        let (adapter, store) = adapter();
        adapter.set_user(&user("u1"), None).await.unwrap();
        adapter.set_key(&key("password:a@b.com", "u1")).await.unwrap();

        let err = adapter.set_key(&key("password:a@b.com", "u1")).await.unwrap_err();
        assert!(matches!(err, AuthError::DuplicateKeyId(id) if id == "password:a@b.com"));
        assert_eq!(store.len(Collection::Keys), 1);
    }

    #[tokio::test]
    async fn set_key_rejects_unknown_users_without_inserting() {
        let (adapter, store) = adapter();

        let err = adapter.set_key(&key("password:a@b.com", "ghost")).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidUserId(id) if id == "ghost"));
        assert!(store.is_empty(Collection::Keys));
    }

    #[tokio::test]
    async fn set_session_rejects_unknown_users() {
        let (adapter, store) = adapter();

        let err = adapter.set_session(&session("s1", "ghost")).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidUserId(_)));
        assert!(store.is_empty(Collection::Sessions));
    }

    #[tokio::test]
    async fn set_user_stores_the_initial_credential_with_the_user() {
        let (adapter, store) = adapter();
        adapter.set_user(&user("u1"), Some(&key("password:a@b.com", "u1"))).await.unwrap();

        assert_eq!(store.len(Collection::Users), 1);
        assert_eq!(store.len(Collection::Keys), 1);
        let stored = adapter.get_key("password:a@b.com").await.unwrap().unwrap();
        assert_eq!(stored.user_id, "u1");
    }

    #[tokio::test]
    async fn updates_fail_on_absent_rows() {
        let (adapter, _) = adapter();

        let err = adapter.update_user("ghost", &UserPatch::default()).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidUserId(_)));

        let err = adapter.update_session("ghost", &SessionPatch::default()).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidSessionId(_)));

        let err = adapter.update_key("ghost", &KeyPatch::default()).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidKeyId(_)));
    }

    #[tokio::test]
    async fn update_session_patches_only_named_fields() {
        let (adapter, _) = adapter();
        adapter.set_user(&user("u1"), None).await.unwrap();
        let original = session("s1", "u1");
        adapter.set_session(&original).await.unwrap();

        let later = original.idle_expires + Duration::hours(1);
        adapter
            .update_session(
                "s1",
                &SessionPatch {
                    active_expires: Some(later),
                    ..SessionPatch::default()
                },
            )
            .await
            .unwrap();

        let updated = adapter.get_session("s1").await.unwrap().unwrap();
        assert_eq!(updated.active_expires, later);
        assert_eq!(updated.idle_expires, original.idle_expires);
        assert_eq!(updated.user_id, "u1");
    }

    #[tokio::test]
    async fn update_key_can_clear_the_stored_secret() {
        let (adapter, _) = adapter();
        adapter.set_user(&user("u1"), None).await.unwrap();
        let mut k = key("k1", "u1");
        k.hashed_password = Some("hash".to_string());
        adapter.set_key(&k).await.unwrap();

        adapter
            .update_key(
                "k1",
                &KeyPatch {
                    hashed_password: Some(None),
                },
            )
            .await
            .unwrap();

        let updated = adapter.get_key("k1").await.unwrap().unwrap();
        assert_eq!(updated.hashed_password, None);
    }

    #[tokio::test]
    async fn deletes_on_absent_rows_are_no_ops() {
        let (adapter, _) = adapter();
        adapter.delete_user("ghost").await.unwrap();
        adapter.delete_session("ghost").await.unwrap();
        adapter.delete_key("ghost").await.unwrap();
    }

    #[tokio::test]
    async fn get_session_and_user_never_returns_a_partial_pair() {
        let (adapter, store) = adapter();
        adapter.set_user(&user("u1"), None).await.unwrap();
        adapter.set_session(&session("s1", "u1")).await.unwrap();

        assert!(adapter.get_session_and_user("s1").await.unwrap().is_some());
        assert!(adapter.get_session_and_user("ghost").await.unwrap().is_none());

        // Orphan the session: the pair must collapse to None, not (session, -).
        store.delete(Collection::Users, "u1").await.unwrap();
        assert!(adapter.get_session_and_user("s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_sessions_by_user_id_drains_and_then_no_ops() {
        let (adapter, store) = adapter();
        adapter.set_user(&user("u1"), None).await.unwrap();
        for id in ["s1", "s2", "s3"] {
            adapter.set_session(&session(id, "u1")).await.unwrap();
        }

        adapter.delete_sessions_by_user_id("u1").await.unwrap();
        assert!(store.is_empty(Collection::Sessions));

        adapter.delete_sessions_by_user_id("u1").await.unwrap();
        adapter.delete_sessions_by_user_id("u1").await.unwrap();
        assert!(store.is_empty(Collection::Sessions));
    }

    #[tokio::test]
    async fn lookups_by_user_id_return_only_that_users_rows_in_order() {
        let (adapter, _) = adapter();
        adapter.set_user(&user("u1"), None).await.unwrap();
        adapter.set_user(&user("u2"), None).await.unwrap();
        adapter.set_key(&key("password:a@b.com", "u1")).await.unwrap();
        adapter.set_key(&key("password:c@d.com", "u2")).await.unwrap();
        adapter.set_key(&key("oauth:a", "u1")).await.unwrap();

        let keys = adapter.get_keys_by_user_id("u1").await.unwrap();
        let ids: Vec<_> = keys.iter().map(|k| k.id.as_str()).collect();
        assert_eq!(ids, vec!["password:a@b.com", "oauth:a"]);

        assert!(adapter.get_keys_by_user_id("ghost").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn attributes_survive_the_document_round_trip() {
        let (adapter, _) = adapter();
        let mut u = user("u1");
        u.attributes.insert("email".to_string(), json!("a@b.com"));
        u.attributes.insert("role".to_string(), json!("admin"));
        adapter.set_user(&u, None).await.unwrap();

        let stored = adapter.get_user("u1").await.unwrap().unwrap();
        assert_eq!(stored, u);
    }
}
