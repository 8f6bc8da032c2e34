use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::common::error::AppError;
use crate::common::response::ApiError;
use crate::modules::auth::service::verify_token;
use crate::state::AppState;

/// The token from an `Authorization: Bearer ...` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Verifies the bearer token and injects its [`TokenClaims`] into the request.
///
/// [`TokenClaims`]: crate::modules::auth::dto::TokenClaims
pub async fn auth_middleware(State(state): State<AppState>, mut req: Request, next: Next) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())
        .ok_or_else(|| AppError::unauthorized("Missing or invalid token"))?
        .to_string();

    if state.revoked.is_revoked(&token).await.map_err(AppError::from)? {
        return Err(AppError::unauthorized("Token has been revoked").into());
    }

    let claims = verify_token(&state.config.jwt_secret, &token)?;
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
