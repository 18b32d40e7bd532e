use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

/// Requires an `Authorization: Bearer <token>` header.
///
/// Only presence is checked here. The identity provider is the authority
/// on whether the token is valid.
pub async fn require_bearer(req: Request, next: Next) -> Result<Response, AppError> {
    if bearer_token(req.headers()).is_none() {
        tracing::debug!(path = %req.uri().path(), "Missing bearer token");
        return Err(AppError::Unauthorized(anyhow::anyhow!(
            "Token de autorización requerido"
        )));
    }

    Ok(next.run(req).await)
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
