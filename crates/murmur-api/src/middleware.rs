use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{DecodingKey, Validation, decode};

use murmur_types::api::Claims;

use crate::auth::AppState;
use crate::error::ApiError;

/// Cookie carrying the session token for browser clients.
pub const SESSION_COOKIE: &str = "murmur_session";

pub fn decode_token(token: &str, secret: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims)
}

/// Claims from a valid, unexpired session token, looked up in the
/// `Authorization: Bearer` header first and the session cookie second.
pub fn session_claims(headers: &HeaderMap, secret: &str) -> Option<Claims> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if let Some(claims) = bearer.and_then(|token| decode_token(token, secret)) {
        return Some(claims);
    }

    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .and_then(|cookie| decode_token(cookie.value(), secret))
}

/// Reject requests without a valid session; otherwise make the caller's
/// `Claims` available to the handler as an extension.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = session_claims(req.headers(), &state.config.jwt_secret)
        .ok_or_else(|| ApiError::Auth("not authenticated".into()))?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
