//! REST API client module for the taskdeck backend.
//!
//! This module provides the `ApiClient` for the task and authentication
//! endpoints. Requests carry the stored bearer credential, and any 401
//! answered to such a request invalidates it.

pub mod client;
pub mod error;

pub use client::{ApiClient, DEFAULT_API_BASE_URL};
pub use error::ApiError;
