use rusqlite::ErrorCode;

pub type DbResult<T> = std::result::Result<T, DbError>;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A uniqueness rule was violated. The message is safe to show to users.
    #[error("{0}")]
    Conflict(&'static str),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(code, msg) = &err {
            if code.code == ErrorCode::ConstraintViolation
                && code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
            {
                let msg = msg.as_deref().unwrap_or_default();
                return if msg.contains("accounts.email") {
                    DbError::Conflict("email already in use")
                } else if msg.contains("accounts.username") {
                    DbError::Conflict("username taken")
                } else {
                    DbError::Conflict("duplicate value")
                };
            }
        }
        DbError::Internal(err.into())
    }
}
