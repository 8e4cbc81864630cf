//! Authentication module for credentials and the user session.
//!
//! This module provides:
//! - `TokenStore`: persistence and expiry inspection of the bearer credential,
//!   backed by the OS keychain, a file, or memory
//! - `decode_claims`: typed decoding of the credential payload
//! - `SessionController`: startup check, login, register and logout

pub mod session;
pub mod store;
pub mod token;

pub use session::{AuthError, Session, SessionController, SessionStatus};
pub use store::{FileStorage, KeyringStorage, MemoryStorage, TokenStorage, TokenStore, TOKEN_KEY};
pub use token::{decode_claims, Claims, TokenError};
