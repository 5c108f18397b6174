use crate::config::AuthConfig;
use crate::database::adapter::{DocumentAdapter, StorageAdapter};
use crate::database::document::DocumentStore;
use crate::error::AuthError;
use crate::models::Attributes;
use crate::models::key::{self, Key, KeyPatch};
use crate::models::session::{Session, SessionPatch, SessionState};
use crate::models::user::{User, UserPatch};
use argon2::Argon2;
use chrono::Utc;
use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, Salt, SaltString};
use std::sync::LazyLock;
use tracing::debug;
use uuid::Uuid;

/// A real Argon2 hash generated once at startup, used as a timing decoy
/// so that credential checks for non-existent keys take the same time as
/// checks for existing ones.
static DUMMY_HASH: LazyLock<String> = LazyLock::new(|| {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(b"dummy-never-matches", Salt::from(&salt))
        .expect("failed to generate dummy hash")
        .to_string()
});

/// A credential to attach to a user at creation time. The plain-text
/// `password` is hashed before it reaches storage; `None` stores a
/// secret-less key.
#[derive(Debug, Clone)]
pub struct NewKey {
    pub provider_id: String,
    pub provider_user_id: String,
    pub password: Option<String>,
}

/// The auth core: user, key and session lifecycle over a storage adapter.
#[derive(Clone)]
pub struct Auth<D> {
    adapter: DocumentAdapter<D>,
    config: AuthConfig,
}

impl<D: DocumentStore + Clone> Auth<D> {
    pub fn new(db: D, config: AuthConfig) -> Self {
        Self {
            adapter: DocumentAdapter::new(db),
            config,
        }
    }

    pub fn db(&self) -> &D {
        self.adapter.db()
    }

    pub fn adapter(&self) -> &DocumentAdapter<D> {
        &self.adapter
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Creates a user with a generated identifier and, when supplied, its
    /// initial credential in the same storage call. A duplicate credential
    /// identifier or dangling user reference surfaces from the adapter.
    pub async fn create_user(&self, new_key: Option<NewKey>, attributes: Attributes) -> Result<User, AuthError> {
        let user = User {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            attributes,
        };
        let key = match new_key {
            Some(new_key) => Some(Key {
                id: key::key_id(&new_key.provider_id, &new_key.provider_user_id),
                user_id: user.id.clone(),
                hashed_password: new_key.password.as_deref().map(hash_password).transpose()?,
            }),
            None => None,
        };
        self.adapter.set_user(&user, key.as_ref()).await?;
        debug!(user_id = %user.id, "created user");
        Ok(user)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<User, AuthError> {
        self.adapter
            .get_user(user_id)
            .await?
            .ok_or_else(|| AuthError::InvalidUserId(user_id.to_string()))
    }

    /// Merges attribute keys onto the stored user record.
    pub async fn update_user_attributes(&self, user_id: &str, attributes: Attributes) -> Result<User, AuthError> {
        self.adapter
            .update_user(
                user_id,
                &UserPatch {
                    attributes: Some(attributes),
                },
            )
            .await?;
        self.get_user(user_id).await
    }

    /// Removes the user's sessions, keys and finally the user row. Each step
    /// is a separate storage call; see the adapter for the atomicity boundary.
    pub async fn delete_user(&self, user_id: &str) -> Result<(), AuthError> {
        self.adapter.delete_sessions_by_user_id(user_id).await?;
        self.adapter.delete_keys_by_user_id(user_id).await?;
        self.adapter.delete_user(user_id).await
    }

    /// Looks up a credential and, when it stores a secret, verifies the
    /// supplied password against it. Unknown keys burn a decoy verification
    /// so their timing matches known ones.
    pub async fn use_key(&self, provider_id: &str, provider_user_id: &str, password: Option<&str>) -> Result<Key, AuthError> {
        let id = key::key_id(provider_id, provider_user_id);
        let Some(stored) = self.adapter.get_key(&id).await? else {
            if let Some(password) = password {
                dummy_verify(password);
            }
            return Err(AuthError::InvalidKeyId(id));
        };
        match (&stored.hashed_password, password) {
            (Some(hash), Some(password)) => verify_password(hash, password)?,
            (None, None) => {}
            // A secret on exactly one side can never verify.
            (Some(_), None) | (None, Some(_)) => return Err(AuthError::InvalidCredentials),
        }
        Ok(stored)
    }

    /// Replaces (or clears) the secret stored on a credential.
    pub async fn update_key_password(&self, provider_id: &str, provider_user_id: &str, password: Option<&str>) -> Result<(), AuthError> {
        let id = key::key_id(provider_id, provider_user_id);
        let hashed_password = password.map(hash_password).transpose()?;
        self.adapter
            .update_key(
                &id,
                &KeyPatch {
                    hashed_password: Some(hashed_password),
                },
            )
            .await
    }

    /// Creates a session for an existing user, with deadlines from the
    /// configured lifetime policy.
    pub async fn create_session(&self, user_id: &str, attributes: Attributes) -> Result<Session, AuthError> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            active_expires: now + self.config.active_period(),
            idle_expires: now + self.config.idle_period(),
            attributes,
        };
        self.adapter.set_session(&session).await?;
        debug!(session_id = %session.id, user_id, "created session");
        Ok(session)
    }

    /// Read-only lookup. An unknown or dead session is an invalid-session
    /// error; the stored row is never touched.
    pub async fn get_session(&self, session_id: &str) -> Result<Session, AuthError> {
        let Some((session, _user)) = self.adapter.get_session_and_user(session_id).await? else {
            return Err(AuthError::InvalidSessionId(session_id.to_string()));
        };
        if session.is_dead(Utc::now()) {
            return Err(AuthError::InvalidSessionId(session_id.to_string()));
        }
        Ok(session)
    }

    /// Write-path validation. Active sessions pass through unchanged; idle
    /// ones get both deadlines re-extended from now and the extension
    /// persisted; dead ones are deleted and reported invalid.
    pub async fn validate_session(&self, session_id: &str) -> Result<Session, AuthError> {
        let Some((mut session, _user)) = self.adapter.get_session_and_user(session_id).await? else {
            return Err(AuthError::InvalidSessionId(session_id.to_string()));
        };
        let now = Utc::now();
        match session.state(now) {
            SessionState::Active => Ok(session),
            SessionState::Idle => {
                session.active_expires = now + self.config.active_period();
                session.idle_expires = now + self.config.idle_period();
                self.adapter
                    .update_session(
                        session_id,
                        &SessionPatch {
                            active_expires: Some(session.active_expires),
                            idle_expires: Some(session.idle_expires),
                            attributes: None,
                        },
                    )
                    .await?;
                debug!(session_id, "renewed idle session");
                Ok(session)
            }
            SessionState::Dead => {
                self.adapter.delete_session(session_id).await?;
                Err(AuthError::InvalidSessionId(session_id.to_string()))
            }
        }
    }

    pub async fn invalidate_session(&self, session_id: &str) -> Result<(), AuthError> {
        self.adapter.delete_session(session_id).await
    }

    pub async fn invalidate_all_user_sessions(&self, user_id: &str) -> Result<(), AuthError> {
        self.adapter.delete_sessions_by_user_id(user_id).await
    }

    /// Deletes the user's sessions that are past their idle deadline.
    pub async fn delete_dead_user_sessions(&self, user_id: &str) -> Result<usize, AuthError> {
        let now = Utc::now();
        let sessions = self.adapter.get_sessions_by_user_id(user_id).await?;
        let mut removed = 0;
        for session in sessions {
            if session.is_dead(now) {
                self.adapter.delete_session(&session.id).await?;
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(user_id, removed, "deleted dead sessions");
        }
        Ok(removed)
    }

    /// Whole-collection cleanup pass, for scheduled maintenance.
    pub async fn sweep_dead_sessions(&self) -> Result<usize, AuthError> {
        let now = Utc::now();
        let sessions = self.adapter.list_sessions().await?;
        let mut removed = 0;
        for session in sessions {
            if session.is_dead(now) {
                self.adapter.delete_session(&session.id).await?;
                removed += 1;
            }
        }
        debug!(removed, "swept dead sessions");
        Ok(removed)
    }
}

pub(crate) fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt_string = SaltString::generate(&mut OsRng);
    let salt = Salt::from(&salt_string);
    let hash = PasswordHash::generate(Argon2::default(), password.as_bytes(), salt)?;
    Ok(hash.to_string())
}

fn verify_password(stored: &str, password: &str) -> Result<(), AuthError> {
    let hash = PasswordHash::new(stored).map_err(|e| AuthError::password_hash("Failed to parse stored password hash", e))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// Perform a throwaway Argon2 verification to equalize response timing
/// regardless of whether the target credential exists.
fn dummy_verify(password: &str) {
    let hash = PasswordHash::new(&DUMMY_HASH).expect("invalid dummy hash");
    let _ = Argon2::default().verify_password(password.as_bytes(), &hash);
}
