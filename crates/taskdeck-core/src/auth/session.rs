use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::{AuthResponse, LoginRequest, RegisterRequest, User};

use super::TokenStore;

/// Where the session stands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionStatus {
    /// The stored credential has not been checked yet
    Bootstrapping,
    Authenticated,
    #[default]
    Anonymous,
}

/// Client-side record of the signed-in user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub user: Option<User>,
    pub authenticated: bool,
    pub loading: bool,
    pub error: Option<String>,
    status: SessionStatus,
}

impl Session {
    fn bootstrapping() -> Self {
        Self {
            loading: true,
            status: SessionStatus::Bootstrapping,
            ..Self::default()
        }
    }

    fn authenticated(user: User) -> Self {
        Self {
            user: Some(user),
            authenticated: true,
            loading: false,
            error: None,
            status: SessionStatus::Authenticated,
        }
    }

    fn anonymous() -> Self {
        Self::default()
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Signed in, but the credential could not be saved: {0}")]
    Storage(String),
}

/// Owns the session state and the operations that change it.
///
/// Login, register and status checks are serialized; logout is immediate.
/// Observers either take a `snapshot()` or `subscribe()` to every change.
pub struct SessionController {
    api: ApiClient,
    tokens: Arc<TokenStore>,
    state: watch::Sender<Session>,
    op_lock: Mutex<()>,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("session", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl SessionController {
    pub fn new(api: ApiClient) -> Self {
        let tokens = Arc::clone(api.tokens());
        let (state, _) = watch::channel(Session::bootstrapping());
        Self {
            api,
            tokens,
            state,
            op_lock: Mutex::new(()),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.state.borrow().status()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().authenticated
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Validate the stored credential against the backend.
    ///
    /// Run at startup and whenever the caller wants to know whether the
    /// session survived. Failures never surface as an error: the credential
    /// is dropped and the session settles anonymous.
    pub async fn check_status(&self) -> SessionStatus {
        let _guard = self.op_lock.lock().await;

        let Some(token) = self.tokens.read() else {
            debug!("No stored credential");
            self.state.send_replace(Session::anonymous());
            return SessionStatus::Anonymous;
        };

        if self.tokens.is_expired(&token) {
            info!("Stored credential expired, signing out");
            self.state.send_replace(Session::anonymous());
            return SessionStatus::Anonymous;
        }

        match self.api.current_user_with(&token).await {
            Ok(user) => {
                info!(user_id = %user.id, "Restored session");
                self.state.send_replace(Session::authenticated(user));
                SessionStatus::Authenticated
            }
            Err(e) => {
                warn!(error = %e, "Stored credential rejected, signing out");
                self.tokens.clear();
                self.state.send_replace(Session::anonymous());
                SessionStatus::Anonymous
            }
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.authenticate("login", self.api.login(&request)).await
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<User, AuthError> {
        let request = RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            name: name.map(str::to_string),
        };
        self.authenticate("register", self.api.register(&request))
            .await
    }

    /// Drop the credential and reset the session. Does not contact the backend.
    pub fn logout(&self) {
        self.tokens.clear();
        self.state.send_replace(Session::anonymous());
        info!("Signed out");
    }

    async fn authenticate<F>(&self, action: &str, call: F) -> Result<User, AuthError>
    where
        F: std::future::Future<Output = Result<AuthResponse, ApiError>>,
    {
        let _guard = self.op_lock.lock().await;

        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });

        let result = match call.await {
            Ok(resp) => self
                .tokens
                .save(&resp.token)
                .map(|()| resp.user)
                .map_err(|e| AuthError::Storage(e.to_string())),
            Err(ApiError::Unauthorized) => Err(AuthError::InvalidCredentials),
            Err(e) => Err(AuthError::Api(e)),
        };

        match result {
            Ok(user) => {
                info!(user_id = %user.id, action, "Authenticated");
                self.state.send_replace(Session::authenticated(user.clone()));
                Ok(user)
            }
            Err(e) => {
                warn!(error = %e, action, "Authentication failed");
                let message = e.to_string();
                self.state.send_modify(|s| {
                    s.loading = false;
                    s.error = Some(message);
                });
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_derivation() {
        assert_eq!(Session::bootstrapping().status(), SessionStatus::Bootstrapping);
        assert_eq!(Session::anonymous().status(), SessionStatus::Anonymous);

        let user: User =
            serde_json::from_str(r#"{"id":"1","email":"a@b.com"}"#).unwrap();
        assert_eq!(Session::authenticated(user).status(), SessionStatus::Authenticated);

        // a login in flight does not make an anonymous session bootstrapping
        let mut pending = Session::anonymous();
        pending.loading = true;
        assert_eq!(pending.status(), SessionStatus::Anonymous);
    }

    #[tokio::test]
    async fn test_new_controller_is_bootstrapping() {
        let api = ApiClient::new("http://localhost:1", Arc::new(TokenStore::in_memory())).unwrap();
        let controller = SessionController::new(api);
        assert_eq!(controller.status(), SessionStatus::Bootstrapping);
        assert!(controller.snapshot().loading);
    }

    #[tokio::test]
    async fn test_check_without_credential_is_anonymous() {
        let api = ApiClient::new("http://localhost:1", Arc::new(TokenStore::in_memory())).unwrap();
        let controller = SessionController::new(api);
        assert_eq!(controller.check_status().await, SessionStatus::Anonymous);
        let session = controller.snapshot();
        assert!(!session.loading);
        assert_eq!(session.error, None);
    }

    #[tokio::test]
    async fn test_check_with_malformed_credential_skips_network() {
        let tokens = Arc::new(TokenStore::in_memory());
        tokens.save("garbage").unwrap();
        let api = ApiClient::new("http://localhost:1", Arc::clone(&tokens)).unwrap();
        let controller = SessionController::new(api);

        assert_eq!(controller.check_status().await, SessionStatus::Anonymous);
        assert_eq!(tokens.read(), None);
        assert_eq!(controller.snapshot().error, None);
    }

    #[test]
    fn test_logout_resets_state() {
        let tokens = Arc::new(TokenStore::in_memory());
        tokens.save("a.b.c").unwrap();
        let api = ApiClient::new("http://localhost:1", Arc::clone(&tokens)).unwrap();
        let controller = SessionController::new(api);
        let mut rx = controller.subscribe();

        controller.logout();
        assert_eq!(tokens.read(), None);
        assert_eq!(controller.status(), SessionStatus::Anonymous);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), Session::default());
    }
}
