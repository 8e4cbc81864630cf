//! Core library for taskdeck: a client for a task-management REST backend.
//!
//! The pieces stack leaves-first:
//! - [`auth::TokenStore`] persists the bearer credential
//! - [`api::ApiClient`] talks to the backend and invalidates rejected credentials
//! - [`auth::SessionController`] tracks who is signed in
//! - [`tasks::TaskCollection`] keeps the dashboard's task list in step with the server

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod tasks;

pub use api::{ApiClient, ApiError};
pub use auth::{Session, SessionController, SessionStatus, TokenStore};
pub use config::Config;
pub use models::{NewTask, Task, TaskFilter, TaskId, TaskUpdate, User};
pub use tasks::TaskCollection;
