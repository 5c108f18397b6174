use crate::models::Attributes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An account record. Everything beyond the identifier and creation time is
/// consumer-defined.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub attributes: Attributes,
}

/// Partial update for a user row. `None` leaves the field untouched; the
/// identifier and creation time are immutable.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    /// Attribute keys to merge onto the stored record.
    pub attributes: Option<Attributes>,
}
