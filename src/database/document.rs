use crate::error::StoreError;
use async_trait::async_trait;

/// A stored record: a flat JSON object.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Shallow patch merged key-by-key onto an existing document.
pub type DocumentPatch = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Sessions,
    Keys,
}

impl Collection {
    pub fn name(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Sessions => "sessions",
            Collection::Keys => "auth_keys",
        }
    }

    /// Fields a backend must index to serve the lookups below.
    pub fn indexed_fields(self) -> &'static [&'static str] {
        match self {
            Collection::Users => &["id"],
            Collection::Sessions | Collection::Keys => &["id", "user_id"],
        }
    }
}

/// The persistence contract consumed by the storage adapter. Implementations
/// are cheap-clone handles onto a shared backend.
///
/// Atomicity: each call is one backend operation. Multi-row sequences issued
/// by the adapter (user plus initial key, per-row bulk deletes) get exactly
/// the transaction semantics the backend provides around them, nothing more.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Indexed point lookup on `id`.
    async fn find_by_id(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError>;

    /// Indexed lookup on `user_id`, in insertion order.
    async fn find_by_user_id(&self, collection: Collection, user_id: &str) -> Result<Vec<Document>, StoreError>;

    /// Every document of the collection, in insertion order.
    async fn list(&self, collection: Collection) -> Result<Vec<Document>, StoreError>;

    async fn insert(&self, collection: Collection, document: Document) -> Result<(), StoreError>;

    /// Merges `patch` onto the document with the given `id`. The adapter
    /// checks existence first; patching an absent document is backend-defined.
    async fn patch(&self, collection: Collection, id: &str, patch: DocumentPatch) -> Result<(), StoreError>;

    /// Removes the document with the given `id`, if present.
    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError>;
}
