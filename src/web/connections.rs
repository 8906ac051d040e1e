//! Connection request and connection handlers.
//!
//! Thin HTTP wrappers over [`crate::data::connections`]; the acting user is
//! always the authenticated principal.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};
use ts_rs::TS;

use crate::data::connections::{self as data};
use crate::data::models::{Connection, ConnectionRequest};
use crate::data::users::get_user;
use crate::state::AppState;
use crate::store::DocumentStore;
use crate::web::error::{ApiError, ApiJson, store_error};
use crate::web::middleware::auth::AuthUser;

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ConnectionRequestResponse {
    pub id: String,
    pub from_uid: String,
    pub from_name: String,
    pub to_uid: String,
    pub to_name: String,
    pub message: String,
    /// RFC 3339.
    pub created_at: String,
}

impl From<ConnectionRequest> for ConnectionRequestResponse {
    fn from(request: ConnectionRequest) -> Self {
        Self {
            id: request.id,
            from_uid: request.from_uid,
            from_name: request.from_name,
            to_uid: request.to_uid,
            to_name: request.to_name,
            message: request.message,
            created_at: request.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ConnectionResponse {
    pub id: String,
    pub user_a: String,
    pub user_b: String,
    /// The other participant, relative to the caller.
    pub peer_uid: String,
    pub peer_name: String,
    pub initiated_by: String,
    pub message: String,
    /// RFC 3339.
    pub created_at: String,
}

#[derive(Debug, Default, Deserialize, TS)]
#[serde(default, rename_all = "camelCase")]
#[ts(export)]
pub struct SendRequestBody {
    pub to_uid: String,
    #[ts(optional)]
    pub message: Option<String>,
}

/// Simple acknowledgement response for mutating operations.
#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OkResponse {
    pub ok: bool,
}

async fn to_response(
    store: &dyn DocumentStore,
    viewer: &str,
    connection: Connection,
) -> Result<ConnectionResponse, ApiError> {
    let peer_uid = connection.peer_of(viewer).unwrap_or_default().to_owned();
    let peer_name = match get_user(store, &peer_uid).await {
        Ok(Some(user)) => user.name,
        Ok(None) => String::new(),
        Err(e) => return Err(store_error("Peer lookup", e)),
    };
    Ok(ConnectionResponse {
        id: connection.id,
        user_a: connection.user_a,
        user_b: connection.user_b,
        peer_uid,
        peer_name,
        initiated_by: connection.initiated_by,
        message: connection.message,
        created_at: connection.created_at.to_rfc3339(),
    })
}

/// `POST /api/requests` -- Ask another user to connect.
#[instrument(skip_all, fields(to_uid = %body.to_uid))]
pub async fn send_request(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SendRequestBody>,
) -> Result<(StatusCode, Json<ConnectionRequestResponse>), ApiError> {
    let to_uid = body.to_uid.trim();
    if to_uid.is_empty() {
        return Err(ApiError::bad_request("toUid is required"));
    }

    let request = data::send_request(
        state.store.as_ref(),
        &principal,
        to_uid,
        body.message.as_deref(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(request.into())))
}

/// `GET /api/requests/incoming`
#[instrument(skip_all)]
pub async fn incoming_requests(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ConnectionRequestResponse>>, ApiError> {
    let requests = data::incoming_requests(state.store.as_ref(), &principal.uid)
        .await
        .map_err(|e| store_error("List incoming requests", e))?;
    Ok(Json(requests.into_iter().map(Into::into).collect()))
}

/// `GET /api/requests/outgoing`
#[instrument(skip_all)]
pub async fn outgoing_requests(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ConnectionRequestResponse>>, ApiError> {
    let requests = data::outgoing_requests(state.store.as_ref(), &principal.uid)
        .await
        .map_err(|e| store_error("List outgoing requests", e))?;
    Ok(Json(requests.into_iter().map(Into::into).collect()))
}

/// `POST /api/requests/{id}/accept` -- Recipient accepts; returns the connection.
#[instrument(skip_all, fields(%id))]
pub async fn accept_request(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConnectionResponse>, ApiError> {
    let store = state.store.as_ref();
    let connection = data::accept_request(store, &principal, &id).await?;
    Ok(Json(to_response(store, &principal.uid, connection).await?))
}

/// `POST /api/requests/{id}/reject` -- Recipient declines.
#[instrument(skip_all, fields(%id))]
pub async fn reject_request(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiError> {
    data::reject_request(state.store.as_ref(), &principal, &id).await?;
    Ok(Json(OkResponse { ok: true }))
}

/// `GET /api/connections` -- Everyone the caller is connected with.
#[instrument(skip_all)]
pub async fn list_connections(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ConnectionResponse>>, ApiError> {
    let store = state.store.as_ref();
    let connections = data::connections_for(store, &principal.uid)
        .await
        .map_err(|e| store_error("List connections", e))?;

    let mut out = Vec::with_capacity(connections.len());
    for connection in connections {
        if connection.peer_of(&principal.uid).is_none() {
            warn!(connection_id = %connection.id, "connection listed for non-participant");
            continue;
        }
        out.push(to_response(store, &principal.uid, connection).await?);
    }
    Ok(Json(out))
}
