//! Web API router construction.

use std::time::Duration;

use axum::{
    Router,
    extract::Request,
    routing::{get, post},
};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer};

use crate::state::AppState;
use crate::web::error::ApiError;
use crate::web::middleware::request_id::RequestIdLayer;
use crate::web::{connections, doubts, matching, status, users};

/// Creates the web server router
pub fn create_router(app_state: AppState) -> Router {
    let api_router = Router::new()
        .route("/health", get(status::health))
        .route("/status", get(status::status))
        .route("/matchTutor", post(matching::match_tutor))
        .route("/doubts", get(doubts::list_doubts).post(doubts::create_doubt))
        .route("/doubts/mine", get(doubts::my_doubts))
        .route("/doubts/{id}", get(doubts::get_doubt))
        .route("/doubts/{id}/accept", post(doubts::accept_doubt))
        .route("/requests", post(connections::send_request))
        .route("/requests/incoming", get(connections::incoming_requests))
        .route("/requests/outgoing", get(connections::outgoing_requests))
        .route("/requests/{id}/accept", post(connections::accept_request))
        .route("/requests/{id}/reject", post(connections::reject_request))
        .route("/connections", get(connections::list_connections))
        .route("/users", get(users::list_users))
        .route("/users/{uid}", get(users::get_profile))
        .with_state(app_state.clone());

    let router = Router::new()
        .nest("/api", api_router)
        .fallback(not_found)
        .with_state(app_state);

    router.layer((
        // Outermost: per-request ID span + severity-proportional response logging.
        RequestIdLayer,
        CompressionLayer::new()
            .zstd(true)
            .br(true)
            .gzip(true)
            .quality(tower_http::CompressionLevel::Fastest),
        TimeoutLayer::new(Duration::from_secs(60)),
    ))
}

async fn not_found(request: Request) -> ApiError {
    ApiError::not_found(format!("No route for {} {}", request.method(), request.uri().path()))
}
