//! Per-request tracing spans with caller-supplied or generated request IDs.
//!
//! An incoming `X-Request-Id` header is reused when it is a sane token, so
//! logs correlate with upstream proxies. Otherwise a ULID is generated. The
//! resolved ID is always echoed back in the `X-Request-Id` response header.

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::response::Response;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use tracing::Instrument;

static REQUEST_ID: &str = "x-request-id";
const MAX_INCOMING_LEN: usize = 128;

#[derive(Clone)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService { inner }
    }
}

#[derive(Clone)]
pub struct RequestIdService<S> {
    inner: S,
}

fn incoming_id(req: &Request) -> Option<String> {
    let raw = req.headers().get(REQUEST_ID)?.to_str().ok()?.trim();
    let valid = !raw.is_empty()
        && raw.len() <= MAX_INCOMING_LEN
        && raw
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'));
    valid.then(|| raw.to_owned())
}

impl<S, B> Service<Request> for RequestIdService<S>
where
    S: Service<Request, Response = Response<B>> + Send + 'static,
    S::Future: Send + 'static,
    S::Error: std::fmt::Debug,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let req_id = incoming_id(&req).unwrap_or_else(|| ulid::Ulid::new().to_string());

        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let span = tracing::info_span!("request", req_id = %req_id);
        let start = Instant::now();

        let future = self.inner.call(req);
        let header_value = HeaderValue::from_str(&req_id).ok();

        Box::pin(
            async move {
                let mut result = future.await;
                let duration_ms = start.elapsed().as_millis() as u64;

                match &result {
                    Ok(response) => {
                        let status = response.status().as_u16();
                        match status {
                            200..=399 => {
                                tracing::debug!(method = %method, path = %path, status, duration_ms, "Response");
                            }
                            400..=499 => {
                                tracing::info!(method = %method, path = %path, status, duration_ms, "Response");
                            }
                            _ => {
                                tracing::warn!(method = %method, path = %path, status, duration_ms, "Response");
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!(method = %method, path = %path, error = ?e, duration_ms, "Request failed");
                    }
                }

                if let Ok(ref mut response) = result
                    && let Some(value) = header_value
                {
                    response.headers_mut().insert(REQUEST_ID, value);
                }

                result
            }
            .instrument(span),
        )
    }
}
