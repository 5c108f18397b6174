use thiserror::Error;

/// Failures surfaced by a [`DocumentStore`](crate::database::document::DocumentStore)
/// backend or by the record codec sitting on top of it.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document codec error: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("storage backend error: {message}")]
    Backend { message: String },
}

impl StoreError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("duplicate key id: {0}")]
    DuplicateKeyId(String),
    #[error("invalid user id: {0}")]
    InvalidUserId(String),
    #[error("invalid key id: {0}")]
    InvalidKeyId(String),
    #[error("invalid session id: {0}")]
    InvalidSessionId(String),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("internal storage error")]
    Store {
        message: String,
        #[source]
        source: StoreError,
    },
    #[error("internal password hash error")]
    PasswordHash { message: String },
    #[error("client storage error")]
    ClientStorage {
        message: String,
        #[source]
        source: std::io::Error,
    },
    #[error("internal server error")]
    ConfigurationError {
        message: String,
        #[source]
        source: figment::Error,
    },
}

impl AuthError {
    pub fn store(message: impl Into<String>, source: StoreError) -> Self {
        Self::Store {
            message: message.into(),
            source,
        }
    }

    pub fn password_hash(message: impl Into<String>, source: password_hash::Error) -> Self {
        Self::PasswordHash {
            message: format!("{}: {}", message.into(), source),
        }
    }

    pub fn client_storage(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::ClientStorage {
            message: message.into(),
            source,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        AuthError::store("document store operation failed", e)
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(e: serde_json::Error) -> Self {
        AuthError::from(StoreError::Codec(e))
    }
}

impl From<password_hash::Error> for AuthError {
    fn from(e: password_hash::Error) -> Self {
        AuthError::password_hash("Password hashing failed", e)
    }
}

impl From<figment::Error> for AuthError {
    fn from(e: figment::Error) -> Self {
        AuthError::ConfigurationError {
            message: "Failed to read configuration".to_string(),
            source: e,
        }
    }
}
