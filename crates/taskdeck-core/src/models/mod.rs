//! Data models for taskdeck entities.
//!
//! - `User`, `AuthResponse`, `TokenInfo`: identity records returned by the
//!   authentication endpoints
//! - `Task`, `NewTask`, `TaskUpdate`: to-do items and their request bodies
//! - `TaskFilter`: client-side view predicate over a task list

pub mod task;
pub mod user;

pub use task::{NewTask, Task, TaskFilter, TaskId, TaskUpdate};
pub use user::{AuthResponse, LoginRequest, RegisterRequest, TokenInfo, User};

use serde::{Deserialize, Deserializer};

/// Accept an identifier sent either as a JSON string or a JSON number.
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}
