use crate::database::document::DocumentStore;
use crate::error::AuthError;
use crate::models::Attributes;
use crate::models::key::PASSWORD_PROVIDER;
use crate::models::session::Session;
use crate::service::auth::{Auth, NewKey};
use tracing::debug;

/// Extra attributes for the session created by a sign-in. Defaults to none.
#[derive(Debug, Clone, Default)]
pub struct SessionFields {
    pub session: Attributes,
}

/// Extra attributes stored at sign-up: `user` lands on the new user record,
/// `session` on its first session. Both default to none.
#[derive(Debug, Clone, Default)]
pub struct SignUpFields {
    pub user: Attributes,
    pub session: Attributes,
}

/// Verifies the password credential for `email` and creates a session for
/// its owner. Wrong passwords and unknown emails fail without creating any
/// row.
pub async fn sign_in_with_email_and_password<D>(auth: &Auth<D>, email: &str, password: &str, fields: SessionFields) -> Result<Session, AuthError>
where
    D: DocumentStore + Clone,
{
    let key = auth.use_key(PASSWORD_PROVIDER, email, Some(password)).await?;
    let session = auth.create_session(&key.user_id, fields.session).await?;
    debug!(user_id = %key.user_id, "signed in with password");
    Ok(session)
}

/// Creates a user (with `email` merged into its attributes) together with a
/// password credential, then a session for the new user. An email that
/// already has a credential surfaces the adapter's duplicate-key error.
pub async fn sign_up_with_email_and_password<D>(auth: &Auth<D>, email: &str, password: &str, fields: SignUpFields) -> Result<Session, AuthError>
where
    D: DocumentStore + Clone,
{
    let mut attributes = fields.user;
    attributes.insert("email".to_string(), serde_json::Value::String(email.to_string()));
    let user = auth
        .create_user(
            Some(NewKey {
                provider_id: PASSWORD_PROVIDER.to_string(),
                provider_user_id: email.to_string(),
                password: Some(password.to_string()),
            }),
            attributes,
        )
        .await?;
    let session = auth.create_session(&user.id, fields.session).await?;
    debug!(user_id = %user.id, "signed up with password");
    Ok(session)
}
