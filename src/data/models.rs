//! Stored document models.
//!
//! Field names are camelCase to match the stored documents. Timestamps are
//! stored as epoch milliseconds so the store orders them numerically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub const ROLE_TUTOR: &str = "Tutor";
const LEARNER_ROLES: &[&str] = &["Student", "Learner"];

/// Current time truncated to the millisecond precision documents store.
pub fn stored_now() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

/// Treat an explicit `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A user profile owned by the external profile service. Read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subjects: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub bio: String,
}

impl UserProfile {
    pub fn is_tutor(&self) -> bool {
        self.role.trim() == ROLE_TUTOR
    }

    pub fn is_learner(&self) -> bool {
        LEARNER_ROLES.contains(&self.role.trim())
    }

    pub fn teaches(&self, subject: &str) -> bool {
        self.subjects.iter().any(|s| s == subject)
    }

    /// Case-insensitive substring search over the space-joined subject list.
    pub fn subjects_contain(&self, search: &str) -> bool {
        self.subjects
            .join(" ")
            .to_lowercase()
            .contains(&search.to_lowercase())
    }
}

/// Read-only tutor snapshot used for one matching run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorProfile {
    pub uid: String,
    pub name: String,
    pub subjects: Vec<String>,
    pub bio: String,
}

impl From<UserProfile> for TutorProfile {
    fn from(user: UserProfile) -> Self {
        Self {
            uid: user.id,
            name: user.name,
            subjects: user.subjects,
            bio: user.bio,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doubt {
    pub id: String,
    /// Owning learner.
    pub uid: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    pub subject: String,
    pub title: String,
    pub description: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub recommended_tutors: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub accepted_tutors: Vec<String>,
}

/// A pending, one-directional proposal to connect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRequest {
    pub id: String,
    pub from_uid: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub from_name: String,
    pub to_uid: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub to_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

/// An undirected edge between two users, stored with `user_a < user_b`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,
    pub user_a: String,
    pub user_b: String,
    pub initiated_by: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Connection {
    /// The other participant, if `uid` is part of this connection.
    pub fn peer_of(&self, uid: &str) -> Option<&str> {
        if self.user_a == uid {
            Some(&self.user_b)
        } else if self.user_b == uid {
            Some(&self.user_a)
        } else {
            None
        }
    }
}

/// Session issued by the external authentication service; keyed by token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub uid: String,
}
