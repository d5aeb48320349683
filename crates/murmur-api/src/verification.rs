//! Account verification lifecycle.
//!
//! `NoAccount -> PendingVerification -> Verified`. A pending account can be
//! re-registered any number of times before it is verified; each attempt
//! reissues the code and pushes the expiry forward. Verified is terminal.

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{info, warn};
use uuid::Uuid;

use murmur_db::Database;
use murmur_db::models::PendingAccount;
use murmur_types::api::SignUpRequest;

use crate::auth::{AppState, hash_password};
use crate::blocking;
use crate::error::ApiError;
use crate::validation;

/// Outcome of a successful registration attempt.
#[derive(Debug, Clone)]
pub struct Registration {
    pub account_id: Uuid,
    pub username: String,
    /// An existing unverified account with this email was reused.
    pub reissued: bool,
    pub code_expires_at: DateTime<Utc>,
}

/// Six decimal digits.
pub fn generate_code() -> String {
    rand::rng().random_range(100_000..1_000_000u32).to_string()
}

/// Register (or re-register) an account and send its verification code.
///
/// The account row is committed before the notifier runs. If delivery fails
/// the caller gets `ApiError::Delivery` but the pending account stays, and a
/// later attempt with the same email reissues the code.
pub async fn register(
    state: &AppState,
    req: SignUpRequest,
    now: DateTime<Utc>,
) -> Result<Registration, ApiError> {
    validation::username(&req.username)?;
    let email = validation::email(&req.email)?;
    validation::password(&req.password)?;

    let code = generate_code();
    let expires_at = now + state.config.code_ttl;

    let store = state.clone();
    let username = req.username.clone();
    let lookup_email = email.clone();
    let stored_code = code.clone();
    let saved = blocking(move || {
        let db = &store.db;

        if let Some(existing) = db.find_by_email(&lookup_email)? {
            if existing.is_verified {
                return Err(ApiError::Conflict("email already in use".into()));
            }
        }

        if db.find_verified_by_username(&username)?.is_some() {
            return Err(ApiError::Conflict("username taken".into()));
        }

        let password_hash = hash_password(&req.password)?;
        let new_id = Uuid::new_v4().to_string();

        let saved = db.save_pending(&PendingAccount {
            id: &new_id,
            username: &username,
            email: &lookup_email,
            password_hash: &password_hash,
            verify_code: &stored_code,
            verify_code_expiry: expires_at.timestamp_millis(),
            created_at: now.timestamp_millis(),
        })?;
        Ok(saved)
    })
    .await?;

    let account_id: Uuid = saved
        .id
        .parse()
        .map_err(|e: uuid::Error| ApiError::Internal(e.into()))?;
    let code_expires_at = DateTime::from_timestamp_millis(saved.verify_code_expiry)
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("stored expiry out of range")))?;

    if saved.reissued {
        info!("Reissued verification code for pending account {} ({})", req.username, account_id);
    } else {
        info!("Registered pending account {} ({})", req.username, account_id);
    }

    let send = state
        .notifier
        .send_verification_code(&email, &req.username, &code);
    match tokio::time::timeout(state.config.external_timeout, send).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            warn!("Verification email to {} failed: {}", email, e);
            return Err(ApiError::Delivery(
                "account saved but the verification email could not be sent; sign up again to resend it"
                    .into(),
            ));
        }
        Err(_) => {
            warn!("Verification email to {} timed out", email);
            return Err(ApiError::Delivery(
                "account saved but sending the verification email timed out; sign up again to resend it"
                    .into(),
            ));
        }
    }

    Ok(Registration {
        account_id,
        username: req.username,
        reissued: saved.reissued,
        code_expires_at,
    })
}

/// Check `code` against the pending accounts holding `username` and mark
/// the matching one verified.
///
/// Several pending accounts may share a username, so the code picks the
/// account. When nothing matches, the newest holder of the name decides
/// between `ExpiredCode` and `InvalidCode`. A second verification of an
/// already-verified account is rejected with `InvalidCode`: the code is
/// consumed on success.
pub fn verify(db: &Database, username: &str, code: &str, now: DateTime<Utc>) -> Result<(), ApiError> {
    let holder = db
        .find_by_username(username)?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;

    validation::verify_code(code)?;

    let pending = db.find_pending_by_username(username)?;
    let matched = pending.into_iter().find(|row| {
        row.verify_code
            .as_deref()
            .is_some_and(|stored| codes_match(stored, code))
    });

    let Some(account) = matched else {
        if holder.is_verified {
            return Err(ApiError::InvalidCode("account is already verified".into()));
        }
        let Some(expiry) = holder.verify_code_expiry else {
            return Err(ApiError::InvalidCode("no verification code has been issued".into()));
        };
        if now.timestamp_millis() >= expiry {
            return Err(ApiError::ExpiredCode);
        }
        return Err(ApiError::InvalidCode("incorrect verification code".into()));
    };

    match account.verify_code_expiry {
        Some(expiry) if now.timestamp_millis() < expiry => {}
        _ => return Err(ApiError::ExpiredCode),
    }

    // A verified holder of the same name surfaces here as a conflict.
    if !db.mark_verified(&account.id)? {
        // Lost a race with a concurrent verification of the same account.
        return Err(ApiError::InvalidCode("account is already verified".into()));
    }

    info!("Account {} ({}) verified", account.username, account.id);
    Ok(())
}

/// Compare without short-circuiting on the first differing byte.
fn codes_match(stored: &str, given: &str) -> bool {
    stored.len() == given.len()
        && stored
            .bytes()
            .zip(given.bytes())
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
}

/// A username is available unless a verified account holds it.
pub fn username_available(db: &Database, username: &str) -> Result<bool, ApiError> {
    Ok(db.find_verified_by_username(username)?.is_none())
}
