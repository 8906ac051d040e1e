//! Peer directory and profile handlers.

use std::collections::HashSet;

use axum::extract::{Path, Query, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use ts_rs::TS;

use crate::data::connections::{connections_for, get_connection_between};
use crate::data::models::UserProfile;
use crate::data::users::{self, get_user};
use crate::state::AppState;
use crate::web::error::{ApiError, store_error};
use crate::web::middleware::auth::AuthUser;

/// Directory entry. Email is only shown on the full profile.
#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PeerResponse {
    pub uid: String,
    pub name: String,
    pub role: String,
    pub subjects: Vec<String>,
    pub bio: String,
}

impl From<UserProfile> for PeerResponse {
    fn from(user: UserProfile) -> Self {
        Self {
            uid: user.id,
            name: user.name,
            role: user.role,
            subjects: user.subjects,
            bio: user.bio,
        }
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProfileResponse {
    pub uid: String,
    pub name: String,
    pub email: Option<String>,
    pub role: String,
    pub subjects: Vec<String>,
    pub bio: String,
    /// Whether the caller is already connected with this user.
    pub connected: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListUsersParams {
    pub subject: Option<String>,
}

/// `GET /api/users` -- Users the caller could connect with.
///
/// Excludes the caller and anyone they are already connected with. `subject`
/// is a case-insensitive substring search over each user's subjects.
#[instrument(skip_all)]
pub async fn list_users(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ListUsersParams>,
) -> Result<Json<Vec<PeerResponse>>, ApiError> {
    let store = state.store.as_ref();

    let (all, connections) = tokio::try_join!(
        users::list_users(store, params.subject.as_deref()),
        connections_for(store, &principal.uid),
    )
    .map_err(|e| store_error("List users", e))?;

    let connected: HashSet<&str> = connections
        .iter()
        .filter_map(|c| c.peer_of(&principal.uid))
        .collect();

    let peers: Vec<PeerResponse> = all
        .into_iter()
        .filter(|user| user.id != principal.uid && !connected.contains(user.id.as_str()))
        .map(Into::into)
        .collect();
    debug!(count = peers.len(), excluded = connected.len(), "listed peers");
    Ok(Json(peers))
}

/// `GET /api/users/{uid}`
#[instrument(skip_all, fields(%uid))]
pub async fn get_profile(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let store = state.store.as_ref();

    let user = get_user(store, &uid)
        .await
        .map_err(|e| store_error("Profile lookup", e))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    let connected = get_connection_between(store, &principal.uid, &user.id)
        .await
        .map_err(|e| store_error("Connection lookup", e))?
        .is_some();

    Ok(Json(ProfileResponse {
        uid: user.id,
        name: user.name,
        email: user.email,
        role: user.role,
        subjects: user.subjects,
        bio: user.bio,
        connected,
    }))
}
