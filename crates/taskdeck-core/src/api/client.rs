//! API client for the taskdeck REST backend.
//!
//! Every request is JSON in both directions. Authenticated requests take the
//! bearer credential from the shared `TokenStore` at send time, so a login or
//! logout elsewhere is picked up by the next call without rebuilding the
//! client.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Method, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::auth::TokenStore;
use crate::models::{
    AuthResponse, LoginRequest, NewTask, RegisterRequest, Task, TaskId, TaskUpdate, TokenInfo,
    User,
};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Backend used when no base URL is configured
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

/// Which credential a request carries
#[derive(Debug, Clone, Copy)]
enum Credential<'a> {
    /// Whatever valid credential the token store holds, if any
    Stored,
    /// A specific credential, regardless of what is stored
    Bearer(&'a str),
    /// No credential; a 401 says nothing about the stored one
    Anonymous,
}

#[derive(Debug, Serialize)]
struct ToggleCompleteBody {
    completed: bool,
}

/// API client for the taskdeck backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    tokens: Arc<TokenStore>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client that leaves timeouts to the transport
    pub fn new(base_url: impl Into<String>, tokens: Arc<TokenStore>) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, tokens, None)
    }

    /// Create a client with an optional overall request timeout
    pub fn with_timeout(
        base_url: impl Into<String>,
        tokens: Arc<TokenStore>,
        timeout: Option<Duration>,
    ) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(ApiError::Request)?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client,
            base_url,
            tokens,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The token store this client reads credentials from
    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn default_headers(&self, token: Option<&str>) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        if let Some(token) = token {
            match HeaderValue::from_str(&format!("Bearer {}", token)) {
                Ok(value) => {
                    headers.insert(header::AUTHORIZATION, value);
                }
                Err(_) => {
                    warn!("Stored credential cannot be sent as a header, clearing it");
                    self.tokens.clear();
                    return Err(ApiError::Unauthorized);
                }
            }
        }
        Ok(headers)
    }

    /// Send a request and turn any non-2xx answer into an `ApiError`.
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
        credential: Credential<'_>,
        extra_headers: HeaderMap,
    ) -> Result<Response, ApiError> {
        let token = match credential {
            Credential::Stored => self.tokens.valid_token(),
            Credential::Bearer(token) => Some(token.to_string()),
            Credential::Anonymous => None,
        };

        let mut headers = self.default_headers(token.as_deref())?;
        // Callers may replace the defaults but never drop them. `extend`
        // replaces each named header with all of the caller's values.
        headers.extend(extra_headers);

        let url = self.url(endpoint);
        debug!(method = %method, url = %url, authenticated = token.is_some(), "Sending request");

        let mut request = self.client.request(method.clone(), &url).headers(headers);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            warn!(method = %method, url = %url, error = %e, "Request failed before a response");
            ApiError::from_transport(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED && !matches!(credential, Credential::Anonymous) {
            if let Some(sent) = token.as_deref() {
                if self.tokens.clear_if_current(sent) {
                    warn!(url = %url, "Credential rejected by server, cleared it");
                }
            }
        }

        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), url = %url, "Request returned an error status");
        Err(ApiError::from_status(status, &body))
    }

    /// Parse a JSON body; 204 and empty bodies yield `None`
    async fn parse<T: DeserializeOwned>(response: Response) -> Result<Option<T>, ApiError> {
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let text = response.text().await.map_err(ApiError::from_transport)?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    /// Send a request carrying the stored credential.
    ///
    /// `headers` are applied over the JSON content type and bearer defaults.
    /// Resolves to `None` for 204/empty responses.
    pub async fn request<T, B>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
        headers: HeaderMap,
    ) -> Result<Option<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self
            .send(method, endpoint, body, Credential::Stored, headers)
            .await?;
        Self::parse(response).await
    }

    /// Like `request`, but a body is required
    async fn fetch<T, B>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
        credential: Credential<'_>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self
            .send(method, endpoint, body, credential, HeaderMap::new())
            .await?;
        Self::parse(response).await?.ok_or_else(|| {
            ApiError::InvalidResponse(format!("Empty response body from {}", endpoint))
        })
    }

    // ===== Tasks =====

    pub async fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
        self.fetch(Method::GET, "/tasks/", None::<&()>, Credential::Stored)
            .await
    }

    pub async fn create_task(&self, task: &NewTask) -> Result<Task, ApiError> {
        self.fetch(Method::POST, "/tasks/", Some(task), Credential::Stored)
            .await
    }

    /// Update the fields set in `update`
    pub async fn update_task(&self, id: TaskId, update: &TaskUpdate) -> Result<Task, ApiError> {
        let endpoint = format!("/tasks/{}", id);
        self.fetch(Method::PUT, &endpoint, Some(update), Credential::Stored)
            .await
    }

    pub async fn toggle_complete(&self, id: TaskId, completed: bool) -> Result<Task, ApiError> {
        let endpoint = format!("/tasks/{}/complete", id);
        let body = ToggleCompleteBody { completed };
        self.fetch(Method::PATCH, &endpoint, Some(&body), Credential::Stored)
            .await
    }

    /// Delete a task. Whatever body the server sends back is ignored.
    pub async fn delete_task(&self, id: TaskId) -> Result<(), ApiError> {
        let endpoint = format!("/tasks/{}", id);
        self.send(
            Method::DELETE,
            &endpoint,
            None::<&()>,
            Credential::Stored,
            HeaderMap::new(),
        )
        .await?;
        Ok(())
    }

    // ===== Authentication =====

    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        self.fetch(
            Method::POST,
            "/auth/register",
            Some(request),
            Credential::Anonymous,
        )
        .await
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.fetch(
            Method::POST,
            "/auth/login",
            Some(request),
            Credential::Anonymous,
        )
        .await
    }

    /// User owning the stored credential
    pub async fn current_user(&self) -> Result<User, ApiError> {
        let info: TokenInfo = self
            .fetch(Method::GET, "/auth/token", None::<&()>, Credential::Stored)
            .await?;
        Ok(info.into())
    }

    /// User owning `token`, whether or not it is the stored credential
    pub async fn current_user_with(&self, token: &str) -> Result<User, ApiError> {
        let info: TokenInfo = self
            .fetch(
                Method::GET,
                "/auth/token",
                None::<&()>,
                Credential::Bearer(token),
            )
            .await?;
        Ok(info.into())
    }
}
