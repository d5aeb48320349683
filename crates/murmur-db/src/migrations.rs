use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (accounts + inbox)");
        conn.execute_batch(
            "
            CREATE TABLE accounts (
                id                      TEXT PRIMARY KEY,
                username                TEXT NOT NULL,
                email                   TEXT NOT NULL UNIQUE,
                password                TEXT NOT NULL,
                verify_code             TEXT,
                verify_code_expiry      INTEGER,
                is_verified             INTEGER NOT NULL DEFAULT 0,
                is_accepting_messages   INTEGER NOT NULL DEFAULT 1,
                created_at              INTEGER NOT NULL,
                CHECK (verify_code IS NULL OR verify_code_expiry IS NOT NULL)
            );

            -- Only verified accounts hold a username; pending rows may share one.
            CREATE UNIQUE INDEX idx_accounts_verified_username
                ON accounts(username) WHERE is_verified = 1;

            CREATE INDEX idx_accounts_username
                ON accounts(username, created_at);

            CREATE TABLE messages (
                seq         INTEGER PRIMARY KEY AUTOINCREMENT,
                id          TEXT NOT NULL UNIQUE,
                account_id  TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
                content     TEXT NOT NULL CHECK (length(content) > 0),
                created_at  INTEGER NOT NULL
            );

            CREATE INDEX idx_messages_account
                ON messages(account_id, seq);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
