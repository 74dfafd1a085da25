/// Request plumbing shared by all routes
use axum::{
    extract::Request,
    http::{header::AUTHORIZATION, HeaderMap},
};
use tracing::Span;

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Request span; `caller_id` is filled in once the caller is authenticated
pub fn make_request_span(request: &Request) -> Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        caller_id = tracing::field::Empty,
    )
}
