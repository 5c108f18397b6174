use crate::database::document::DocumentStore;
use crate::error::{AuthError, StoreError};
use crate::models::session::{Session, SessionState};
use crate::service::auth::Auth;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::{debug, warn};

/// Argument envelope for authenticated calls: the caller's argument schema
/// with a `session_id` field appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Call<A> {
    pub session_id: Option<String>,
    #[serde(flatten)]
    pub args: A,
}

impl<A> Call<A> {
    pub fn new(session_id: Option<String>, args: A) -> Self {
        Self { session_id, args }
    }

    pub fn anonymous(args: A) -> Self {
        Self {
            session_id: None,
            args,
        }
    }
}

/// Whether an entry point is exposed to untrusted clients or reserved for
/// trusted callers inside the backend. Resolution semantics are identical;
/// the distinction is recorded on the trace output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Internal,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Internal => "internal",
        }
    }
}

/// Outcome of resolving the `session_id` field of an incoming call.
///
/// Handlers only ever see the [`session`](Self::session) collapse; the full
/// enum is public for embedders that want to surface richer signals.
#[derive(Debug)]
pub enum SessionResolution {
    /// The call carried no session identifier. Storage was never consulted.
    Missing,
    /// An identifier was supplied but did not resolve to a usable session:
    /// unknown, expired, or idle on a read-only path.
    Rejected,
    /// The storage backend failed while resolving.
    Failed(StoreError),
    Active(Session),
}

impl SessionResolution {
    /// The presence/absence view handlers branch on.
    pub fn session(self) -> Option<Session> {
        match self {
            SessionResolution::Active(session) => Some(session),
            _ => None,
        }
    }
}

/// Read-only execution context: the backend handle plus the resolved session.
pub struct QueryCtx<D> {
    pub db: D,
    pub session: Option<Session>,
}

/// Write-path execution context: additionally carries a handler-scoped auth
/// instance for session- and credential-mutating work.
pub struct MutationCtx<D> {
    pub db: D,
    pub auth: Auth<D>,
    pub session: Option<Session>,
}

/// Read-path resolution: returns the session as stored, never renews. Idle
/// sessions are rejected here; only write paths may extend them.
pub async fn resolve_existing_session<D>(auth: &Auth<D>, session_id: Option<&str>) -> SessionResolution
where
    D: DocumentStore + Clone,
{
    let Some(session_id) = session_id else {
        return SessionResolution::Missing;
    };
    match auth.get_session(session_id).await {
        Ok(session) if session.state(Utc::now()) == SessionState::Idle => SessionResolution::Rejected,
        Ok(session) => SessionResolution::Active(session),
        Err(AuthError::Store { source, .. }) => {
            warn!(session_id, error = %source, "session lookup failed");
            SessionResolution::Failed(source)
        }
        Err(_) => SessionResolution::Rejected,
    }
}

/// Write-path resolution: delegates to [`Auth::validate_session`], which may
/// extend an idle session's deadlines and persist the extension.
pub async fn resolve_and_renew_session<D>(auth: &Auth<D>, session_id: Option<&str>) -> SessionResolution
where
    D: DocumentStore + Clone,
{
    let Some(session_id) = session_id else {
        return SessionResolution::Missing;
    };
    match auth.validate_session(session_id).await {
        Ok(session) => SessionResolution::Active(session),
        Err(AuthError::Store { source, .. }) => {
            warn!(session_id, error = %source, "session validation failed");
            SessionResolution::Failed(source)
        }
        Err(_) => SessionResolution::Rejected,
    }
}

/// Wraps a query handler: resolves the appended `session_id` and invokes the
/// handler with a read-only context. Handler errors propagate unchanged;
/// resolution failures collapse to an absent session.
pub async fn query_with_auth<D, A, T, F, Fut>(auth: &Auth<D>, call: Call<A>, handler: F) -> Result<T, AuthError>
where
    D: DocumentStore + Clone,
    F: FnOnce(QueryCtx<D>, A) -> Fut,
    Fut: Future<Output = Result<T, AuthError>>,
{
    run_query(Visibility::Public, auth, call, handler).await
}

/// [`query_with_auth`] for trusted callers inside the backend.
pub async fn internal_query_with_auth<D, A, T, F, Fut>(auth: &Auth<D>, call: Call<A>, handler: F) -> Result<T, AuthError>
where
    D: DocumentStore + Clone,
    F: FnOnce(QueryCtx<D>, A) -> Fut,
    Fut: Future<Output = Result<T, AuthError>>,
{
    run_query(Visibility::Internal, auth, call, handler).await
}

/// Wraps a mutation handler: resolves (and possibly renews) the appended
/// `session_id` and invokes the handler with a write-path context.
pub async fn mutation_with_auth<D, A, T, F, Fut>(auth: &Auth<D>, call: Call<A>, handler: F) -> Result<T, AuthError>
where
    D: DocumentStore + Clone,
    F: FnOnce(MutationCtx<D>, A) -> Fut,
    Fut: Future<Output = Result<T, AuthError>>,
{
    run_mutation(Visibility::Public, auth, call, handler).await
}

/// [`mutation_with_auth`] for trusted callers inside the backend.
pub async fn internal_mutation_with_auth<D, A, T, F, Fut>(auth: &Auth<D>, call: Call<A>, handler: F) -> Result<T, AuthError>
where
    D: DocumentStore + Clone,
    F: FnOnce(MutationCtx<D>, A) -> Fut,
    Fut: Future<Output = Result<T, AuthError>>,
{
    run_mutation(Visibility::Internal, auth, call, handler).await
}

async fn run_query<D, A, T, F, Fut>(visibility: Visibility, auth: &Auth<D>, call: Call<A>, handler: F) -> Result<T, AuthError>
where
    D: DocumentStore + Clone,
    F: FnOnce(QueryCtx<D>, A) -> Fut,
    Fut: Future<Output = Result<T, AuthError>>,
{
    let resolution = resolve_existing_session(auth, call.session_id.as_deref()).await;
    debug!(
        visibility = visibility.as_str(),
        authenticated = matches!(resolution, SessionResolution::Active(_)),
        "dispatching query"
    );
    let ctx = QueryCtx {
        db: auth.db().clone(),
        session: resolution.session(),
    };
    handler(ctx, call.args).await
}

async fn run_mutation<D, A, T, F, Fut>(visibility: Visibility, auth: &Auth<D>, call: Call<A>, handler: F) -> Result<T, AuthError>
where
    D: DocumentStore + Clone,
    F: FnOnce(MutationCtx<D>, A) -> Fut,
    Fut: Future<Output = Result<T, AuthError>>,
{
    let resolution = resolve_and_renew_session(auth, call.session_id.as_deref()).await;
    debug!(
        visibility = visibility.as_str(),
        authenticated = matches!(resolution, SessionResolution::Active(_)),
        "dispatching mutation"
    );
    let ctx = MutationCtx {
        db: auth.db().clone(),
        auth: auth.clone(),
        session: resolution.session(),
    };
    handler(ctx, call.args).await
}
