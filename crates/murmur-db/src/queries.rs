use crate::models::{AccountRow, MessageRow, PendingAccount, SavedPending};
use crate::{Database, DbError, DbResult};
use rusqlite::{Connection, OptionalExtension, Row};

const ACCOUNT_COLUMNS: &str = "id, username, email, password, verify_code, verify_code_expiry, \
     is_verified, is_accepting_messages, created_at";

impl Database {
    // -- Accounts --

    /// Any account holding `username`. A verified holder wins; otherwise the
    /// most recently created pending row is returned.
    pub fn find_by_username(&self, username: &str) -> DbResult<Option<AccountRow>> {
        self.with_conn(|conn| {
            query_account(
                conn,
                "WHERE username = ?1 ORDER BY is_verified DESC, created_at DESC LIMIT 1",
                username,
            )
        })
    }

    pub fn find_verified_by_username(&self, username: &str) -> DbResult<Option<AccountRow>> {
        self.with_conn(|conn| {
            query_account(conn, "WHERE username = ?1 AND is_verified = 1", username)
        })
    }

    /// Every unverified row holding `username`, newest first. Pending
    /// accounts may share a name until one of them is verified.
    pub fn find_pending_by_username(&self, username: &str) -> DbResult<Vec<AccountRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {ACCOUNT_COLUMNS} FROM accounts
                 WHERE username = ?1 AND is_verified = 0
                 ORDER BY created_at DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([username], account_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn find_by_email(&self, email: &str) -> DbResult<Option<AccountRow>> {
        self.with_conn(|conn| query_account(conn, "WHERE email = ?1", email))
    }

    pub fn find_by_id(&self, id: &str) -> DbResult<Option<AccountRow>> {
        self.with_conn(|conn| query_account(conn, "WHERE id = ?1", id))
    }

    /// Create a pending account, or reissue over the unverified row that
    /// already owns this email.
    ///
    /// The upsert only fires while the existing row is unverified, so a
    /// verified owner of the email surfaces as a conflict even when two
    /// registrations race. On reissue the stored expiry is pushed strictly
    /// past the previous one.
    pub fn save_pending(&self, account: &PendingAccount<'_>) -> DbResult<SavedPending> {
        self.with_conn(|conn| {
            let stored: Option<(String, i64)> = conn
                .query_row(
                    "INSERT INTO accounts
                        (id, username, email, password, verify_code, verify_code_expiry, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                     ON CONFLICT(email) DO UPDATE SET
                        username = excluded.username,
                        password = excluded.password,
                        verify_code = excluded.verify_code,
                        verify_code_expiry = MAX(
                            excluded.verify_code_expiry,
                            COALESCE(accounts.verify_code_expiry, 0) + 1
                        )
                     WHERE accounts.is_verified = 0
                     RETURNING id, verify_code_expiry",
                    rusqlite::params![
                        account.id,
                        account.username,
                        account.email,
                        account.password_hash,
                        account.verify_code,
                        account.verify_code_expiry,
                        account.created_at,
                    ],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            // No row back means the conflict target exists but is verified.
            let (id, verify_code_expiry) = stored.ok_or(DbError::Conflict("email already in use"))?;

            Ok(SavedPending {
                reissued: id != account.id,
                id,
                verify_code_expiry,
            })
        })
    }

    /// Flip a pending account to verified and drop its code.
    /// Returns false if the account was missing or already verified.
    pub fn mark_verified(&self, id: &str) -> DbResult<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE accounts
                 SET is_verified = 1, verify_code = NULL, verify_code_expiry = NULL
                 WHERE id = ?1 AND is_verified = 0",
                [id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Returns false if no such account exists.
    pub fn set_accepting(&self, id: &str, value: bool) -> DbResult<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE accounts SET is_accepting_messages = ?2 WHERE id = ?1",
                rusqlite::params![id, value],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn get_accepting(&self, id: &str) -> DbResult<Option<bool>> {
        self.with_conn(|conn| {
            let value = conn
                .query_row(
                    "SELECT is_accepting_messages FROM accounts WHERE id = ?1",
                    [id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value)
        })
    }

    // -- Messages --

    /// Append a message if, at the moment of insert, the account is still
    /// accepting. Returns false when the gate was closed.
    pub fn append_message(
        &self,
        account_id: &str,
        message_id: &str,
        content: &str,
        created_at: i64,
    ) -> DbResult<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO messages (id, account_id, content, created_at)
                 SELECT ?1, id, ?3, ?4 FROM accounts
                 WHERE id = ?2 AND is_accepting_messages = 1",
                rusqlite::params![message_id, account_id, content, created_at],
            )?;
            Ok(inserted > 0)
        })
    }

    /// Inbox contents, most recent first.
    pub fn list_messages(&self, account_id: &str) -> DbResult<Vec<MessageRow>> {
        self.with_conn(|conn| query_messages(conn, account_id))
    }

    /// Remove one message owned by `account_id`. Returns the number of rows
    /// removed, so 0 means it was not there (or belongs to someone else).
    pub fn delete_message(&self, account_id: &str, message_id: &str) -> DbResult<usize> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM messages WHERE id = ?1 AND account_id = ?2",
                [message_id, account_id],
            )?;
            Ok(removed)
        })
    }
}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<AccountRow> {
    Ok(AccountRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        verify_code: row.get(4)?,
        verify_code_expiry: row.get(5)?,
        is_verified: row.get(6)?,
        is_accepting_messages: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn query_account(conn: &Connection, filter: &str, key: &str) -> DbResult<Option<AccountRow>> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts {filter}");
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([key], account_from_row).optional()?;
    Ok(row)
}

fn query_messages(conn: &Connection, account_id: &str) -> DbResult<Vec<MessageRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, account_id, content, created_at
         FROM messages
         WHERE account_id = ?1
         ORDER BY seq DESC",
    )?;

    let rows = stmt
        .query_map([account_id], |row| {
            Ok(MessageRow {
                id: row.get(0)?,
                account_id: row.get(1)?,
                content: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}
