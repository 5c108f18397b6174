use serde::{Deserialize, Serialize};

/// Provider name for password credentials.
pub const PASSWORD_PROVIDER: &str = "password";

/// A stored credential: one row per provider/provider-local pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Key {
    /// `"<provider>:<provider user id>"`, e.g. `password:a@b.com`. Unique.
    pub id: String,
    pub user_id: String,
    /// Argon2 hash of the secret, or `None` for secret-less providers.
    pub hashed_password: Option<String>,
}

/// Builds the stored identifier for a provider/provider-local pair.
pub fn key_id(provider_id: &str, provider_user_id: &str) -> String {
    format!("{provider_id}:{provider_user_id}")
}

/// Splits a stored identifier back into its provider and provider-local parts.
pub fn split_key_id(id: &str) -> Option<(&str, &str)> {
    id.split_once(':')
}

/// Partial update for a key row.
#[derive(Debug, Clone, Default)]
pub struct KeyPatch {
    /// `Some(None)` clears the stored secret; `None` leaves it untouched.
    pub hashed_password: Option<Option<String>>,
}
