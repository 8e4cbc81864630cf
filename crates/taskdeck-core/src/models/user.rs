use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::deserialize_id;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct User {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(rename = "createdAt", alias = "created_at", default)]
    pub created_at: String,
    #[serde(rename = "updatedAt", alias = "updated_at", default)]
    pub updated_at: String,
}

impl User {
    /// Name if the user set one, email otherwise
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.email,
        }
    }
}

/// Body returned by `/auth/login` and `/auth/register`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Body returned by `GET /auth/token` when the bearer credential is valid.
///
/// The endpoint only promises the user id; everything else is filled in
/// when present.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenInfo {
    #[serde(deserialize_with = "deserialize_id", alias = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<String>,
    #[serde(default, alias = "updatedAt")]
    pub updated_at: Option<String>,
}

impl From<TokenInfo> for User {
    fn from(info: TokenInfo) -> Self {
        let now = Utc::now().to_rfc3339();
        User {
            id: info.user_id,
            email: info.email.unwrap_or_default(),
            name: info.name,
            bio: None,
            created_at: info.created_at.unwrap_or_else(|| now.clone()),
            updated_at: info.updated_at.unwrap_or(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_auth_response() {
        let json = r#"{"user":{"id":"1","email":"a@b.com"},"token":"abc.def.ghi"}"#;
        let resp: AuthResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.user.id, "1");
        assert_eq!(resp.user.email, "a@b.com");
        assert_eq!(resp.user.name, None);
        assert_eq!(resp.token, "abc.def.ghi");
    }

    #[test]
    fn test_numeric_user_id() {
        let json = r#"{"id":42,"email":"a@b.com","created_at":"2024-01-01T00:00:00Z"}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, "42");
        assert_eq!(user.created_at, "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_token_info_into_user() {
        let json = r#"{"user_id":7,"email":"x@y.z","created_at":"2024-05-01T10:00:00Z"}"#;
        let info: TokenInfo = serde_json::from_str(json).unwrap();
        let user = User::from(info);
        assert_eq!(user.id, "7");
        assert_eq!(user.email, "x@y.z");
        assert_eq!(user.created_at, "2024-05-01T10:00:00Z");
        assert!(!user.updated_at.is_empty());
    }

    #[test]
    fn test_token_info_without_email() {
        let info: TokenInfo = serde_json::from_str(r#"{"user_id":"u-1"}"#).unwrap();
        let user = User::from(info);
        assert_eq!(user.email, "");
        assert_eq!(user.display_name(), "");
    }

    #[test]
    fn test_register_request_omits_missing_name() {
        let req = RegisterRequest {
            email: "a@b.com".to_string(),
            password: "x".to_string(),
            name: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("name").is_none());
    }
}
