use crate::client::session::SessionHandle;
use crate::handler::Call;
use std::future::Future;

/// Merges the current session identifier into an outgoing call's arguments.
pub fn attach<A>(session: &SessionHandle, args: A) -> Call<A> {
    Call::new(session.session_id(), args)
}

/// Sends a query with the current session identifier attached.
pub async fn query_with_session<A, T, E, F, Fut>(session: &SessionHandle, args: A, send: F) -> Result<T, E>
where
    F: FnOnce(Call<A>) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    send(attach(session, args)).await
}

/// Sends a mutation with the current session identifier attached. No
/// optimistic update is layered on top: the caller sees only the
/// server-confirmed result.
pub async fn mutate_with_session<A, T, E, F, Fut>(session: &SessionHandle, args: A, send: F) -> Result<T, E>
where
    F: FnOnce(Call<A>) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    send(attach(session, args)).await
}
