use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use murmur_db::Database;
use murmur_db::models::MessageRow;
use murmur_types::api::{
    AcceptMessagesRequest, AcceptMessagesResponse, ApiResponse, Claims, MessagesResponse,
    SendMessageRequest,
};
use murmur_types::models::Message;

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;
use crate::validation::MESSAGE_MIN;

fn message_from_row(row: MessageRow) -> Message {
    Message {
        id: row.id.parse().unwrap_or_else(|e| {
            warn!("Corrupt message id '{}': {}", row.id, e);
            Uuid::default()
        }),
        created_at: DateTime::from_timestamp_millis(row.created_at).unwrap_or_else(|| {
            warn!("Corrupt created_at {} on message '{}'", row.created_at, row.id);
            DateTime::default()
        }),
        content: row.content,
    }
}

fn not_found_user() -> ApiError {
    ApiError::NotFound("user not found".into())
}

// -- Ingestion gate --

/// Append an anonymous message to `username`'s inbox.
///
/// Only verified accounts can be addressed, the same rule the username
/// availability check uses. Nothing about the sender is recorded.
pub fn send_message(
    db: &Database,
    max_len: usize,
    username: &str,
    content: &str,
    now: DateTime<Utc>,
) -> Result<Message, ApiError> {
    let account = db
        .find_verified_by_username(username)?
        .ok_or_else(not_found_user)?;

    if !account.is_accepting_messages {
        return Err(ApiError::MessageRejected);
    }

    if content.trim().is_empty() {
        return Err(ApiError::Validation("message content must not be empty".into()));
    }
    if content.chars().count() > max_len {
        return Err(ApiError::Validation(format!(
            "message content must be no longer than {max_len} characters"
        )));
    }

    // Stored exactly as sent.
    let message = Message {
        id: Uuid::new_v4(),
        content: content.to_string(),
        created_at: now,
    };

    // The insert re-checks the gate, so a toggle that lands between the
    // lookup above and this write still wins.
    let appended = db.append_message(
        &account.id,
        &message.id.to_string(),
        &message.content,
        now.timestamp_millis(),
    )?;
    if !appended {
        return Err(ApiError::MessageRejected);
    }

    info!("Message {} delivered to {}", message.id, account.username);
    Ok(message)
}

// -- Inbox manager (owner only) --

pub fn list_messages(db: &Database, owner: &Claims) -> Result<Vec<Message>, ApiError> {
    let owner_id = owner.sub.to_string();
    db.find_by_id(&owner_id)?.ok_or_else(not_found_user)?;

    let rows = db.list_messages(&owner_id)?;
    Ok(rows.into_iter().map(message_from_row).collect())
}

/// Remove one message from the owner's inbox. A message that is not there
/// (already deleted, or someone else's) is reported as `MessageNotFound` and
/// leaves the inbox untouched.
pub fn delete_message(db: &Database, owner: &Claims, message_id: Uuid) -> Result<(), ApiError> {
    let removed = db.delete_message(&owner.sub.to_string(), &message_id.to_string())?;
    if removed == 0 {
        return Err(ApiError::MessageNotFound);
    }
    info!("{} deleted message {}", owner.username, message_id);
    Ok(())
}

pub fn set_accepting_messages(db: &Database, owner: &Claims, value: bool) -> Result<bool, ApiError> {
    if !db.set_accepting(&owner.sub.to_string(), value)? {
        return Err(not_found_user());
    }
    info!("{} is {} messages", owner.username, if value { "accepting" } else { "not accepting" });
    Ok(value)
}

pub fn get_accepting_messages(db: &Database, owner: &Claims) -> Result<bool, ApiError> {
    db.get_accepting(&owner.sub.to_string())?
        .ok_or_else(not_found_user)
}

// -- Handlers --

/// POST /api/send-message: anonymous, no session required.
pub async fn send_message_handler(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<SendMessageRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    if req.content.trim().chars().count() < MESSAGE_MIN {
        return Err(ApiError::Validation(format!(
            "message content must be at least {MESSAGE_MIN} characters"
        )));
    }

    blocking(move || {
        send_message(
            &state.db,
            state.config.max_message_len,
            &req.username,
            &req.content,
            Utc::now(),
        )
    })
    .await?;

    Ok(Json(ApiResponse::ok("Message sent successfully")))
}

/// GET /api/get-messages
pub async fn get_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = blocking(move || list_messages(&state.db, &claims)).await?;

    Ok(Json(MessagesResponse {
        success: true,
        messages,
    }))
}

/// DELETE /api/delete-message/{messageid}
pub async fn delete_message_handler(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let message_id: Uuid = message_id
        .parse()
        .map_err(|_| ApiError::Validation("invalid message id".into()))?;

    blocking(move || delete_message(&state.db, &claims, message_id)).await?;

    Ok(Json(ApiResponse::ok("Message deleted successfully")))
}

/// GET /api/accept-messages
pub async fn get_accept_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let value = blocking(move || get_accepting_messages(&state.db, &claims)).await?;

    Ok(Json(AcceptMessagesResponse {
        success: true,
        is_accepting_messages: value,
    }))
}

/// POST /api/accept-messages
pub async fn set_accept_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<AcceptMessagesRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let value =
        blocking(move || set_accepting_messages(&state.db, &claims, req.accept_messages)).await?;

    Ok(Json(AcceptMessagesResponse {
        success: true,
        is_accepting_messages: value,
    }))
}
