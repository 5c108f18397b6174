pub mod key;
pub mod session;
pub mod user;

/// Consumer-defined fields carried alongside the fixed columns of a record.
pub type Attributes = serde_json::Map<String, serde_json::Value>;
