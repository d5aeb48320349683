use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::{
    WithRejection,
    cookie::{Cookie, CookieJar, SameSite},
};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use murmur_db::Database;
use murmur_types::api::{
    ApiResponse, Claims, SignInRequest, SignInResponse, SignUpRequest, SignUpResponse,
    UsernameQuery, VerifyCodeRequest,
};

use crate::blocking;
use crate::config::Config;
use crate::error::ApiError;
use crate::middleware::SESSION_COOKIE;
use crate::notifier::{HttpNotifier, LogNotifier, Notifier};
use crate::suggestions::{HttpSuggestionProvider, StaticSuggestions, SuggestionProvider};
use crate::validation;
use crate::verification;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub config: Config,
    pub notifier: Arc<dyn Notifier>,
    pub suggestions: Arc<dyn SuggestionProvider>,
}

impl AppStateInner {
    /// Wire collaborators from config: HTTP mail and suggestion endpoints
    /// when configured, logging / static stand-ins otherwise.
    pub fn from_config(db: Database, config: Config) -> AppState {
        let notifier: Arc<dyn Notifier> = match &config.notify {
            Some(notify) => Arc::new(HttpNotifier::new(notify.clone())),
            None => {
                info!("No mail API configured; verification codes will be logged");
                Arc::new(LogNotifier)
            }
        };
        let suggestions: Arc<dyn SuggestionProvider> = match &config.suggest {
            Some(suggest) => Arc::new(HttpSuggestionProvider::new(suggest.clone())),
            None => Arc::new(StaticSuggestions),
        };

        Arc::new(Self {
            db,
            config,
            notifier,
            suggestions,
        })
    }
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hashing failed: {e}")))?
        .to_string();
    Ok(hash)
}

fn password_matches(password: &str, hash: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("stored hash unreadable: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub fn create_token(
    secret: &str,
    user_id: Uuid,
    username: &str,
    session_days: i64,
) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (Utc::now() + chrono::Duration::days(session_days)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Check credentials. `identifier` is an email address or a username.
/// Accounts that never finished verification cannot sign in.
pub fn sign_in(
    db: &Database,
    config: &Config,
    identifier: &str,
    password: &str,
) -> Result<SignInResponse, ApiError> {
    let bad_credentials = || ApiError::Auth("invalid email/username or password".into());

    let found = if identifier.contains('@') {
        db.find_by_email(&identifier.trim().to_ascii_lowercase())?
    } else {
        db.find_by_username(identifier.trim())?
    };
    let account = found.ok_or_else(bad_credentials)?;

    if !password_matches(password, &account.password)? {
        return Err(bad_credentials());
    }

    if !account.is_verified {
        return Err(ApiError::Auth(
            "please verify your account before signing in".into(),
        ));
    }

    let user_id: Uuid = account
        .id
        .parse()
        .map_err(|e: uuid::Error| ApiError::Internal(e.into()))?;
    let token = create_token(&config.jwt_secret, user_id, &account.username, config.session_days)
        .map_err(ApiError::Internal)?;

    Ok(SignInResponse {
        success: true,
        user_id,
        username: account.username,
        token,
    })
}

/// POST /api/sign-up
pub async fn sign_up(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<SignUpRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let registration = verification::register(&state, req, Utc::now()).await?;

    let message = if registration.reissued {
        "A new verification code has been sent. Please verify your account."
    } else {
        "User registered successfully. Please verify your account."
    };

    Ok((
        StatusCode::CREATED,
        Json(SignUpResponse {
            success: true,
            message: message.into(),
            user_id: registration.account_id,
        }),
    ))
}

/// POST /api/verify-code
pub async fn verify_code(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<VerifyCodeRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    blocking(move || verification::verify(&state.db, &req.username, &req.code, Utc::now())).await?;

    Ok(Json(ApiResponse::ok("Account verified successfully")))
}

/// GET /api/check-username-unique?username=..
pub async fn check_username_unique(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<UsernameQuery>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    validation::username(&query.username)?;

    let available =
        blocking(move || verification::username_available(&state.db, &query.username)).await?;

    if available {
        Ok((StatusCode::OK, Json(ApiResponse::ok("Username is unique"))))
    } else {
        Ok((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::failed("Username is already taken")),
        ))
    }
}

/// POST /api/sign-in: returns the token and also sets it as a session cookie.
pub async fn sign_in_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(req), _): WithRejection<Json<SignInRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let resp = blocking(move || sign_in(&state.db, &state.config, &req.identifier, &req.password))
        .await?;

    info!("{} signed in", resp.username);

    let cookie = Cookie::build((SESSION_COOKIE, resp.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);

    Ok((jar.add(cookie), Json(resp)))
}

/// POST /api/sign-out
pub async fn sign_out(jar: CookieJar) -> impl IntoResponse {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Json(ApiResponse::ok("Signed out")))
}
