//! Bearer credential inspection.
//!
//! Credentials are JWTs: `header.payload.signature`, where the payload is
//! base64-encoded JSON. Only the payload is read and the signature is never
//! verified; the backend remains the authority on validity. The client uses
//! the `exp` claim to avoid sending credentials it already knows are dead.

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;

/// Claims read from a credential payload. Unknown claims are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Claims {
    /// Expiry as a Unix timestamp in seconds. Absent means never expires.
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub iat: Option<i64>,
}

impl Claims {
    /// A credential is expired once `exp` is at or before `now`
    pub fn is_expired_at(&self, now: i64) -> bool {
        matches!(self.exp, Some(exp) if exp <= now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp())
    }

    /// Seconds until expiry, or `None` for credentials without `exp`
    pub fn seconds_remaining(&self) -> Option<i64> {
        self.exp.map(|exp| (exp - Utc::now().timestamp()).max(0))
    }
}

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Malformed credential: expected 3 dot-separated segments, found {0}")]
    SegmentCount(usize),

    #[error("Malformed credential: payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Malformed credential: payload is not a JSON object: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decode the claims carried in a credential's middle segment.
///
/// Both the URL-safe alphabet used by JWTs and the standard alphabet are
/// accepted, with or without padding.
pub fn decode_claims(token: &str) -> Result<Claims, TokenError> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    if segments.len() != 3 {
        return Err(TokenError::SegmentCount(segments.len()));
    }

    let payload = segments[1].trim_end_matches('=');
    let bytes = match URL_SAFE_NO_PAD.decode(payload) {
        Ok(bytes) => bytes,
        Err(_) => STANDARD_NO_PAD.decode(payload)?,
    };

    let value: serde_json::Value = serde_json::from_slice(&bytes)?;
    if !value.is_object() {
        return Err(TokenError::Json(serde::de::Error::custom(
            "payload must be a JSON object",
        )));
    }
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build an unsigned credential around the given payload
    pub(crate) fn make_token(payload: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{}.{}.signature", header, body)
    }

    #[test]
    fn test_decode_exp() {
        let token = make_token(&serde_json::json!({"sub": "1", "exp": 4_000_000_000_i64}));
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.exp, Some(4_000_000_000));
        assert_eq!(claims.sub.as_deref(), Some("1"));
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_expiry_boundary() {
        let claims = Claims {
            exp: Some(1_000),
            ..Claims::default()
        };
        assert!(!claims.is_expired_at(999));
        assert!(claims.is_expired_at(1_000));
        assert!(claims.is_expired_at(1_001));
    }

    #[test]
    fn test_missing_exp_never_expires() {
        let token = make_token(&serde_json::json!({"sub": "1"}));
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.exp, None);
        assert!(!claims.is_expired_at(i64::MAX));
        assert_eq!(claims.seconds_remaining(), None);
    }

    #[test]
    fn test_standard_alphabet_with_padding() {
        let body = base64::engine::general_purpose::STANDARD.encode(r#"{"exp":10}"#);
        assert!(body.ends_with('='));
        let claims = decode_claims(&format!("h.{}.s", body)).unwrap();
        assert_eq!(claims.exp, Some(10));
    }

    #[test]
    fn test_wrong_segment_count() {
        assert!(matches!(decode_claims("opaque"), Err(TokenError::SegmentCount(1))));
        assert!(matches!(decode_claims("a.b.c.d"), Err(TokenError::SegmentCount(4))));
    }

    #[test]
    fn test_bad_base64() {
        assert!(matches!(decode_claims("a.!!!.c"), Err(TokenError::Base64(_))));
    }

    #[test]
    fn test_payload_not_object() {
        let body = URL_SAFE_NO_PAD.encode("[1,2]");
        assert!(matches!(decode_claims(&format!("a.{}.c", body)), Err(TokenError::Json(_))));
        let body = URL_SAFE_NO_PAD.encode("not json");
        assert!(matches!(decode_claims(&format!("a.{}.c", body)), Err(TokenError::Json(_))));
    }

    #[test]
    fn test_non_numeric_exp_is_malformed() {
        let token = make_token(&serde_json::json!({"exp": "tomorrow"}));
        assert!(decode_claims(&token).is_err());
    }
}
