use axum::{
    Router,
    middleware,
    routing::{delete, get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::access::route_access;
use crate::auth::{self, AppState};
use crate::error::ApiError;
use crate::inbox;
use crate::middleware::require_auth;
use crate::suggestions;

/// Full application router. The route access policy wraps everything,
/// including the fallback, so it runs before any handler.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/sign-up", post(auth::sign_up))
        .route("/api/verify-code", post(auth::verify_code))
        .route("/api/sign-in", post(auth::sign_in_handler))
        .route("/api/sign-out", post(auth::sign_out))
        .route("/api/check-username-unique", get(auth::check_username_unique))
        .route("/api/send-message", post(inbox::send_message_handler))
        .route("/api/suggest-messages", post(suggestions::suggest_messages))
        .route("/health", get(health))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route(
            "/api/accept-messages",
            get(inbox::get_accept_messages).post(inbox::set_accept_messages),
        )
        .route("/api/get-messages", get(inbox::get_messages))
        .route(
            "/api/delete-message/{messageid}",
            delete(inbox::delete_message_handler),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(fallback)
        .layer(middleware::from_fn_with_state(state, route_access))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    "ok"
}

async fn fallback() -> ApiError {
    ApiError::NotFound("no such route".into())
}
