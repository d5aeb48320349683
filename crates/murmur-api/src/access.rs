//! Route access policy.
//!
//! Runs once per request, ahead of every handler. Signed-in users are kept
//! away from the auth pages; anonymous users are kept out of the dashboard.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

use crate::auth::AppState;
use crate::middleware::session_claims;

pub const DASHBOARD: &str = "/dashboard";
pub const SIGN_IN: &str = "/sign-in";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    RedirectToDashboard,
    RedirectToSignIn,
}

pub fn decide(has_session: bool, path: &str) -> RouteDecision {
    let path = match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };

    let auth_page = matches!(path, "/" | "/sign-in" | "/sign-up") || path.starts_with("/verify");

    if has_session && auth_page {
        RouteDecision::RedirectToDashboard
    } else if !has_session && path.starts_with(DASHBOARD) {
        RouteDecision::RedirectToSignIn
    } else {
        RouteDecision::Allow
    }
}

pub async fn route_access(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let has_session = session_claims(req.headers(), &state.config.jwt_secret).is_some();

    match decide(has_session, req.uri().path()) {
        RouteDecision::Allow => next.run(req).await,
        RouteDecision::RedirectToDashboard => {
            debug!("Redirecting signed-in request for {} to dashboard", req.uri().path());
            Redirect::to(DASHBOARD).into_response()
        }
        RouteDecision::RedirectToSignIn => {
            debug!("Redirecting anonymous request for {} to sign-in", req.uri().path());
            Redirect::to(SIGN_IN).into_response()
        }
    }
}
