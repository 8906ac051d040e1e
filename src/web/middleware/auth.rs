//! Bearer-token authentication extractor.
//!
//! Handlers that act on behalf of a user take [`AuthUser`]; the uid it
//! carries comes from the verified session, never from the request body.
//!
//! ```ignore
//! async fn handler(AuthUser(principal): AuthUser, ...) -> impl IntoResponse { ... }
//! ```

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use tracing::debug;

use crate::auth::Principal;
use crate::state::AppState;
use crate::web::error::{ApiError, store_error};

/// The verified acting user.
pub struct AuthUser(pub Principal);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;

        match state.identity.verify(token).await {
            Ok(Some(principal)) => Ok(AuthUser(principal)),
            Ok(None) => {
                debug!("rejected unknown session token");
                Err(ApiError::unauthorized("Invalid or expired session"))
            }
            Err(e) => Err(store_error("Session lookup", e)),
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim()).filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("bearer  abc ")), Some("abc"));
        assert_eq!(bearer_token(&headers("Basic abc")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&headers("abc")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
