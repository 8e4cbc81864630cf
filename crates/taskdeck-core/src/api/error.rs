use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: unable to connect to the server. Please make sure the backend server is running.")]
    NetworkUnavailable(#[source] reqwest::Error),

    #[error("Request timed out waiting for the server.")]
    Timeout(#[source] reqwest::Error),

    #[error("Unauthorized. Please log in again.")]
    Unauthorized,

    #[error("API request failed: {status} - {body}")]
    Http { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request failed: {0}")]
    Request(#[source] reqwest::Error),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid carrying excessive data around
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    pub fn from_status(status: StatusCode, body: &str) -> Self {
        if status == StatusCode::UNAUTHORIZED {
            return ApiError::Unauthorized;
        }
        let body = if body.trim().is_empty() {
            status.canonical_reason().unwrap_or_default().to_string()
        } else {
            Self::truncate_body(body)
        };
        ApiError::Http {
            status: status.as_u16(),
            body,
        }
    }

    /// Classify a transport failure. Only a failed connection means the
    /// backend is unreachable; a slow answer is a timeout.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_connect() {
            ApiError::NetworkUnavailable(err)
        } else if err.is_timeout() {
            ApiError::Timeout(err)
        } else if err.is_decode() {
            ApiError::InvalidResponse(err.to_string())
        } else {
            ApiError::Request(err)
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::NetworkUnavailable(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Timeout(_))
    }

    /// HTTP status carried by the error, if it came from a response
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized => Some(401),
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_401_is_unauthorized() {
        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, "bad token");
        assert!(err.is_unauthorized());
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn test_other_status_carries_body() {
        let err = ApiError::from_status(StatusCode::UNPROCESSABLE_ENTITY, r#"{"detail":"bad"}"#);
        match &err {
            ApiError::Http { status, body } => {
                assert_eq!(*status, 422);
                assert_eq!(body, r#"{"detail":"bad"}"#);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            err.to_string(),
            r#"API request failed: 422 - {"detail":"bad"}"#
        );
    }

    #[test]
    fn test_empty_body_uses_reason_phrase() {
        let err = ApiError::from_status(StatusCode::NOT_FOUND, "");
        assert_eq!(err.to_string(), "API request failed: 404 - Not Found");
    }

    #[test]
    fn test_long_body_is_truncated() {
        let body = "é".repeat(400);
        let truncated = ApiError::truncate_body(&body);
        assert!(truncated.contains("truncated, 800 total bytes"));
        assert!(truncated.len() < body.len());
    }
}
