pub mod client;
pub mod config;
pub mod database;
pub mod error;
pub mod handler;
pub mod models;
pub mod service;

pub use config::{AuthConfig, LoggingConfig, Mode, SessionConfig};
pub use error::{AuthError, StoreError};
pub use handler::{
    Call, MutationCtx, QueryCtx, SessionResolution, internal_mutation_with_auth, internal_query_with_auth, mutation_with_auth,
    query_with_auth,
};
pub use service::auth::Auth;

use tracing_subscriber::EnvFilter;

/// Installs a global tracing subscriber, for hosts that do not bring their
/// own. The RUST_LOG environment variable gives fine-grained control per
/// module:
///
/// ```text
/// RUST_LOG=debug                        - Set all to debug
/// RUST_LOG=latchkey=debug               - Set this crate to debug
/// RUST_LOG=info,latchkey::handler=debug - Global info, wrappers at debug
/// ```
pub fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_line_number(true);

    if logging.json_format {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::form::{FormData, SignForm};
    use crate::client::session::SessionHandle;
    use crate::client::storage::MemoryStorage;
    use crate::client::{call, form::Flow};
    use crate::database::memory::MemoryStore;
    use crate::service::password::{SessionFields, SignUpFields, sign_in_with_email_and_password, sign_up_with_email_and_password};
    use std::sync::Arc;

    /// Client form → backend mutation → session handle → authenticated query.
    #[tokio::test]
    async fn end_to_end_sign_up_and_query() {
        let auth = Auth::new(MemoryStore::new(), AuthConfig::default());
        let session = SessionHandle::new(Arc::new(MemoryStorage::new())).unwrap();
        let mut form = SignForm::new(session.clone());
        form.set_flow(Flow::SignUp);

        let data = FormData::new().with("email", "a@b.com").with("password", "pw");
        let sign_in = |email: String, password: String| {
            let auth = auth.clone();
            async move {
                let call = Call::new(None, (email, password));
                mutation_with_auth(&auth, call, |ctx: MutationCtx<MemoryStore>, (email, password)| async move {
                    sign_in_with_email_and_password(&ctx.auth, &email, &password, SessionFields::default())
                        .await
                        .map(|s| s.id)
                })
                .await
            }
        };
        let sign_up = |email: String, password: String| {
            let auth = auth.clone();
            async move {
                let call = Call::new(None, (email, password));
                mutation_with_auth(&auth, call, |ctx: MutationCtx<MemoryStore>, (email, password)| async move {
                    sign_up_with_email_and_password(&ctx.auth, &email, &password, SignUpFields::default())
                        .await
                        .map(|s| s.id)
                })
                .await
            }
        };

        form.submit(&data, sign_in, sign_up).await.expect("sign-up must succeed");
        assert!(session.is_signed_in());

        // Subsequent calls carry the stored identifier and resolve to a user.
        let user_id = call::query_with_session(&session, (), |call| async {
            query_with_auth(&auth, call, |ctx: QueryCtx<MemoryStore>, ()| async move {
                Ok(ctx.session.map(|s| s.user_id))
            })
            .await
        })
        .await
        .unwrap();
        assert!(user_id.is_some());

        // Signing out clears the handle; the next call is anonymous.
        session.sign_out().unwrap();
        let user_id = call::query_with_session(&session, (), |call| async {
            query_with_auth(&auth, call, |ctx: QueryCtx<MemoryStore>, ()| async move {
                Ok(ctx.session.map(|s| s.user_id))
            })
            .await
        })
        .await
        .unwrap();
        assert!(user_id.is_none());
    }
}
