//! Direct matching endpoint.

use axum::extract::State;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use ts_rs::TS;

use crate::data::doubts::get_doubt;
use crate::matching::MatchRequest;
use crate::state::AppState;
use crate::web::error::{ApiError, ApiJson, store_error};

#[derive(Debug, Default, Deserialize, TS)]
#[serde(default, rename_all = "camelCase")]
#[ts(export)]
pub struct MatchTutorBody {
    pub doubt_id: String,
    pub subject: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MatchTutorResponse {
    pub matched_tutors: Vec<String>,
}

/// `POST /api/matchTutor` -- Run matching for an existing doubt and return the
/// persisted recommendation set.
#[instrument(skip_all, fields(doubt_id = %body.doubt_id))]
pub async fn match_tutor(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<MatchTutorBody>,
) -> Result<Json<MatchTutorResponse>, ApiError> {
    let request = MatchRequest {
        doubt_id: body.doubt_id.trim().to_owned(),
        subject: body.subject.trim().to_owned(),
        description: body.description.trim().to_owned(),
    };
    if request.doubt_id.is_empty() || request.subject.is_empty() || request.description.is_empty()
    {
        return Err(ApiError::bad_request("doubtId, subject and description are required"));
    }

    if get_doubt(state.store.as_ref(), &request.doubt_id)
        .await
        .map_err(|e| store_error("Get doubt", e))?
        .is_none()
    {
        return Err(ApiError::not_found("Doubt not found"));
    }

    let matched_tutors = state.pipeline.run(&request).await?;
    Ok(Json(MatchTutorResponse { matched_tutors }))
}
