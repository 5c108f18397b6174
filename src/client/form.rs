use crate::client::session::SessionHandle;
use crate::error::AuthError;
use std::future::Future;
use tracing::debug;

/// The two modes of the authentication form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    SignIn,
    SignUp,
}

impl Flow {
    pub fn toggled(self) -> Self {
        match self {
            Flow::SignIn => Flow::SignUp,
            Flow::SignUp => Flow::SignIn,
        }
    }
}

/// Submitted form fields by name. Missing fields read as empty strings, so
/// extraction never fails.
#[derive(Debug, Clone, Default)]
pub struct FormData {
    fields: Vec<(String, String)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn get(&self, name: &str) -> String {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.clone())
            .unwrap_or_default()
    }
}

type ErrorCallback = Box<dyn Fn(Flow, &AuthError) + Send + Sync>;

/// Sign-in/sign-up flow state: the current mode, an opaque error slot and an
/// optional error callback. Submission is not re-entrancy guarded; callers
/// disable the control while one is pending.
pub struct SignForm {
    session: SessionHandle,
    flow: Flow,
    error: Option<AuthError>,
    on_error: Option<ErrorCallback>,
}

impl SignForm {
    pub fn new(session: SessionHandle) -> Self {
        Self {
            session,
            flow: Flow::SignIn,
            error: None,
            on_error: None,
        }
    }

    pub fn with_error_callback(mut self, callback: impl Fn(Flow, &AuthError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }

    pub fn flow(&self) -> Flow {
        self.flow
    }

    pub fn set_flow(&mut self, flow: Flow) {
        self.flow = flow;
    }

    /// Switches mode and clears any stale error from the previous one.
    pub fn toggle_flow(&mut self) {
        self.flow = self.flow.toggled();
        self.clear_error();
    }

    /// The failure of the most recent submission, if any. Presence is all
    /// the UI inspects; the value stays opaque.
    pub fn error(&self) -> Option<&AuthError> {
        self.error.as_ref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Clears the previous error, extracts `email`/`password` (absent fields
    /// default to empty strings), awaits the flow-appropriate operation and
    /// commits the returned session identifier to the handle. On failure the
    /// error is forwarded to the callback, then stored.
    pub async fn submit<Si, Su, FutI, FutU>(&mut self, data: &FormData, sign_in: Si, sign_up: Su) -> Option<String>
    where
        Si: FnOnce(String, String) -> FutI,
        FutI: Future<Output = Result<String, AuthError>>,
        Su: FnOnce(String, String) -> FutU,
        FutU: Future<Output = Result<String, AuthError>>,
    {
        self.clear_error();
        let email = data.get("email");
        let password = data.get("password");

        let result = match self.flow {
            Flow::SignIn => sign_in(email, password).await,
            Flow::SignUp => sign_up(email, password).await,
        };
        let result = result.and_then(|session_id| {
            self.session.set_session_id(Some(&session_id))?;
            Ok(session_id)
        });

        match result {
            Ok(session_id) => Some(session_id),
            Err(error) => {
                debug!(flow = ?self.flow, "form submission failed");
                if let Some(on_error) = &self.on_error {
                    on_error(self.flow, &error);
                }
                self.error = Some(error);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::storage::MemoryStorage;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn handle() -> SessionHandle {
        SessionHandle::new(Arc::new(MemoryStorage::new())).unwrap()
    }

    async fn ok_op(_email: String, _password: String) -> Result<String, AuthError> {
        Ok("new-session".to_string())
    }

    async fn failing_op(_email: String, _password: String) -> Result<String, AuthError> {
        Err(AuthError::InvalidCredentials)
    }

    #[tokio::test]
    async fn successful_submission_commits_the_session() {
        let session = handle();
        let mut form = SignForm::new(session.clone());

        let data = FormData::new().with("email", "a@b.com").with("password", "pw");
        let id = form.submit(&data, ok_op, failing_op).await;

        assert_eq!(id, Some("new-session".to_string()));
        assert_eq!(session.session_id(), Some("new-session".to_string()));
        assert!(form.error().is_none());
    }

    #[tokio::test]
    async fn missing_fields_default_to_empty_strings() {
        let mut form = SignForm::new(handle());

        let seen = Arc::new(std::sync::Mutex::new((String::from("-"), String::from("-"))));
        let seen_in_op = seen.clone();
        form.submit(&FormData::new(), |email, password| async move {
            *seen_in_op.lock().unwrap() = (email, password);
            Ok("s".to_string())
        }, failing_op)
        .await;

        assert_eq!(*seen.lock().unwrap(), (String::new(), String::new()));
    }

    #[tokio::test]
    async fn failures_are_stored_and_forwarded() {
        let session = handle();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let mut form = SignForm::new(session.clone()).with_error_callback(move |flow, error| {
            assert_eq!(flow, Flow::SignIn);
            assert!(matches!(error, AuthError::InvalidCredentials));
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let id = form.submit(&FormData::new(), failing_op, ok_op).await;

        assert_eq!(id, None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(form.error(), Some(AuthError::InvalidCredentials)));
        assert_eq!(session.session_id(), None);
    }

    #[tokio::test]
    async fn toggling_the_flow_clears_the_error() {
        let mut form = SignForm::new(handle());
        form.submit(&FormData::new(), failing_op, ok_op).await;
        assert!(form.error().is_some());

        form.toggle_flow();
        assert_eq!(form.flow(), Flow::SignUp);
        assert!(form.error().is_none());
    }

    #[tokio::test]
    async fn submission_runs_the_flow_appropriate_operation() {
        let mut form = SignForm::new(handle());
        form.set_flow(Flow::SignUp);

        // Sign-in would fail; sign-up must be the one that runs.
        let id = form.submit(&FormData::new(), failing_op, ok_op).await;
        assert_eq!(id, Some("new-session".to_string()));
    }

    #[tokio::test]
    async fn a_new_submission_clears_the_previous_error() {
        let mut form = SignForm::new(handle());
        form.submit(&FormData::new(), failing_op, ok_op).await;
        assert!(form.error().is_some());

        form.submit(&FormData::new(), ok_op, failing_op).await;
        assert!(form.error().is_none());
    }
}
