use crate::database::document::{Collection, Document, DocumentPatch, DocumentStore};
use crate::error::StoreError;
use async_trait::async_trait;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Insertion-ordered in-memory backend. Reference implementation of the
/// [`DocumentStore`] contract; backs the test suite and embeddings that do
/// not bring an external database.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Tables>>,
}

#[derive(Default)]
struct Tables {
    users: Vec<Document>,
    sessions: Vec<Document>,
    keys: Vec<Document>,
}

impl Tables {
    fn collection(&self, collection: Collection) -> &Vec<Document> {
        match collection {
            Collection::Users => &self.users,
            Collection::Sessions => &self.sessions,
            Collection::Keys => &self.keys,
        }
    }

    fn collection_mut(&mut self, collection: Collection) -> &mut Vec<Document> {
        match collection {
            Collection::Users => &mut self.users,
            Collection::Sessions => &mut self.sessions,
            Collection::Keys => &mut self.keys,
        }
    }
}

fn field<'d>(document: &'d Document, name: &str) -> Option<&'d str> {
    document.get(name).and_then(serde_json::Value::as_str)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held in a collection.
    pub fn len(&self, collection: Collection) -> usize {
        self.read().collection(collection).len()
    }

    pub fn is_empty(&self, collection: Collection) -> bool {
        self.len(collection) == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_by_id(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
        let tables = self.read();
        Ok(tables.collection(collection).iter().find(|d| field(d, "id") == Some(id)).cloned())
    }

    async fn find_by_user_id(&self, collection: Collection, user_id: &str) -> Result<Vec<Document>, StoreError> {
        let tables = self.read();
        Ok(tables
            .collection(collection)
            .iter()
            .filter(|d| field(d, "user_id") == Some(user_id))
            .cloned()
            .collect())
    }

    async fn list(&self, collection: Collection) -> Result<Vec<Document>, StoreError> {
        Ok(self.read().collection(collection).clone())
    }

    async fn insert(&self, collection: Collection, document: Document) -> Result<(), StoreError> {
        self.write().collection_mut(collection).push(document);
        Ok(())
    }

    async fn patch(&self, collection: Collection, id: &str, patch: DocumentPatch) -> Result<(), StoreError> {
        let mut tables = self.write();
        if let Some(document) = tables.collection_mut(collection).iter_mut().find(|d| field(d, "id") == Some(id)) {
            for (name, value) in patch {
                document.insert(name, value);
            }
        }
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        self.write().collection_mut(collection).retain(|d| field(d, "id") != Some(id));
        Ok(())
    }
}
