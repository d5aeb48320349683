/// Database row types. These map directly to SQLite rows.
/// Distinct from murmur-types API models to keep the DB layer independent.
/// Timestamps are unix milliseconds.

#[derive(Debug, Clone)]
pub struct AccountRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub verify_code: Option<String>,
    pub verify_code_expiry: Option<i64>,
    pub is_verified: bool,
    pub is_accepting_messages: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: String,
    pub account_id: String,
    pub content: String,
    pub created_at: i64,
}

/// Input for a registration attempt: either a brand new pending account or
/// a reissue over an existing unverified row with the same email.
pub struct PendingAccount<'a> {
    pub id: &'a str,
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub verify_code: &'a str,
    pub verify_code_expiry: i64,
    pub created_at: i64,
}

/// What `save_pending` actually stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedPending {
    pub id: String,
    /// True when an existing unverified row was overwritten.
    pub reissued: bool,
    pub verify_code_expiry: i64,
}
