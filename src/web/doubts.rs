//! Doubt handlers.
//!
//! Thin HTTP wrappers over [`crate::data::doubts`]. Creating a doubt starts a
//! background matching run; its result shows up in `recommendedTutors`.
//! Responses carry a `tutorNames` map so clients can render both tutor lists.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use ts_rs::TS;

use crate::data::doubts::{self, AcceptOutcome, NewDoubt};
use crate::data::models::Doubt;
use crate::data::users::{display_names, get_user};
use crate::matching::MatchRequest;
use crate::state::AppState;
use crate::store::DocumentStore;
use crate::web::error::{ApiError, ApiJson, store_error};
use crate::web::middleware::auth::AuthUser;

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DoubtResponse {
    pub id: String,
    pub uid: String,
    pub name: String,
    pub subject: String,
    pub title: String,
    pub description: String,
    /// RFC 3339.
    pub created_at: String,
    pub recommended_tutors: Vec<String>,
    pub accepted_tutors: Vec<String>,
    /// Display names for the uids in both tutor lists. Deleted profiles are absent.
    pub tutor_names: BTreeMap<String, String>,
}

impl DoubtResponse {
    fn new(doubt: Doubt, names: &BTreeMap<String, String>) -> Self {
        let tutor_names = doubt
            .recommended_tutors
            .iter()
            .chain(&doubt.accepted_tutors)
            .filter_map(|uid| Some((uid.clone(), names.get(uid)?.clone())))
            .collect();
        Self {
            id: doubt.id,
            uid: doubt.uid,
            name: doubt.name,
            subject: doubt.subject,
            title: doubt.title,
            description: doubt.description,
            created_at: doubt.created_at.to_rfc3339(),
            recommended_tutors: doubt.recommended_tutors,
            accepted_tutors: doubt.accepted_tutors,
            tutor_names,
        }
    }
}

/// Build responses for a batch of doubts, looking each tutor name up once.
async fn doubt_responses(
    store: &dyn DocumentStore,
    doubts: Vec<Doubt>,
) -> Result<Vec<DoubtResponse>, ApiError> {
    let uids: Vec<&str> = doubts
        .iter()
        .flat_map(|d| d.recommended_tutors.iter().chain(&d.accepted_tutors))
        .map(String::as_str)
        .collect();
    let names = display_names(store, uids)
        .await
        .map_err(|e| store_error("Tutor name lookup", e))?;
    Ok(doubts
        .into_iter()
        .map(|doubt| DoubtResponse::new(doubt, &names))
        .collect())
}

async fn doubt_response(store: &dyn DocumentStore, doubt: Doubt) -> Result<DoubtResponse, ApiError> {
    let mut responses = doubt_responses(store, vec![doubt]).await?;
    responses
        .pop()
        .ok_or_else(|| ApiError::internal_error("Doubt response was not built"))
}

#[derive(Debug, Default, Deserialize, TS)]
#[serde(default, rename_all = "camelCase")]
#[ts(export)]
pub struct CreateDoubtBody {
    pub title: String,
    pub description: String,
    pub subject: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListDoubtsParams {
    pub subject: Option<String>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AcceptDoubtResponse {
    /// False when this tutor had already accepted.
    pub accepted: bool,
    pub doubt: DoubtResponse,
}

/// `POST /api/doubts` -- Post a doubt as the signed-in learner.
#[instrument(skip_all)]
pub async fn create_doubt(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateDoubtBody>,
) -> Result<(StatusCode, Json<DoubtResponse>), ApiError> {
    let learner = get_user(state.store.as_ref(), &principal.uid)
        .await
        .map_err(|e| store_error("Profile lookup", e))?
        .ok_or_else(|| ApiError::forbidden("No profile for the signed-in user"))?;

    let doubt = doubts::create_doubt(
        state.store.as_ref(),
        &learner,
        NewDoubt {
            title: body.title,
            description: body.description,
            subject: body.subject,
        },
    )
    .await?;

    state.spawn_matching(MatchRequest {
        doubt_id: doubt.id.clone(),
        subject: doubt.subject.clone(),
        description: doubt.description.clone(),
    });

    let response = DoubtResponse::new(doubt, &BTreeMap::new());
    Ok((StatusCode::CREATED, Json(response)))
}

/// `GET /api/doubts` -- All doubts, newest first, optionally by subject.
#[instrument(skip_all)]
pub async fn list_doubts(
    _user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ListDoubtsParams>,
) -> Result<Json<Vec<DoubtResponse>>, ApiError> {
    let subject = params
        .subject
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let doubts = doubts::list_doubts(state.store.as_ref(), subject)
        .await
        .map_err(|e| store_error("List doubts", e))?;
    Ok(Json(doubt_responses(state.store.as_ref(), doubts).await?))
}

/// `GET /api/doubts/mine` -- Doubts posted by the signed-in learner.
#[instrument(skip_all)]
pub async fn my_doubts(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<DoubtResponse>>, ApiError> {
    let doubts = doubts::list_for_learner(state.store.as_ref(), &principal.uid)
        .await
        .map_err(|e| store_error("List own doubts", e))?;
    Ok(Json(doubt_responses(state.store.as_ref(), doubts).await?))
}

/// `GET /api/doubts/{id}`
#[instrument(skip_all, fields(%id))]
pub async fn get_doubt(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DoubtResponse>, ApiError> {
    let doubt = doubts::get_doubt(state.store.as_ref(), &id)
        .await
        .map_err(|e| store_error("Get doubt", e))?
        .ok_or_else(|| ApiError::not_found("Doubt not found"))?;
    Ok(Json(doubt_response(state.store.as_ref(), doubt).await?))
}

/// `POST /api/doubts/{id}/accept` -- Accept a doubt as an eligible tutor.
#[instrument(skip_all, fields(%id))]
pub async fn accept_doubt(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AcceptDoubtResponse>, ApiError> {
    let store = state.store.as_ref();

    let doubt = doubts::get_doubt(store, &id)
        .await
        .map_err(|e| store_error("Get doubt", e))?
        .ok_or_else(|| ApiError::not_found("Doubt not found"))?;
    let tutor = get_user(store, &principal.uid)
        .await
        .map_err(|e| store_error("Profile lookup", e))?
        .ok_or_else(|| ApiError::forbidden("No profile for the signed-in user"))?;
    doubts::check_tutor_eligibility(&tutor, &doubt)?;

    let outcome = doubts::accept_doubt(store, &id, &tutor.id).await?;
    if outcome == AcceptOutcome::AlreadyAccepted {
        info!(doubt_id = %id, tutor = %tutor.id, "doubt already accepted by tutor");
    }

    let doubt = doubts::get_doubt(store, &id)
        .await
        .map_err(|e| store_error("Get doubt", e))?
        .ok_or_else(|| ApiError::not_found("Doubt not found"))?;

    Ok(Json(AcceptDoubtResponse {
        accepted: outcome == AcceptOutcome::Added,
        doubt: doubt_response(store, doubt).await?,
    }))
}
