//! Idempotent schema setup for the SQLite ledger.
//!
//! Statements mirror `crate::schema`; every table is created with
//! `IF NOT EXISTS` so `init_schema` can run on every startup.

use diesel::prelude::*;

use super::diesel_pool::{run_blocking, DieselError, SqlitePool};

const STATEMENTS: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS platform_profiles (
        user_id BIGINT PRIMARY KEY NOT NULL,
        external_id TEXT,
        access_token TEXT NOT NULL,
        refresh_token TEXT NOT NULL,
        is_bot_active INTEGER NOT NULL DEFAULT 0,
        updated_at TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS search_settings (
        user_id BIGINT PRIMARY KEY NOT NULL,
        resume_id TEXT NOT NULL,
        search_text TEXT NOT NULL,
        area_id TEXT NOT NULL DEFAULT '113',
        salary INTEGER,
        currency TEXT NOT NULL DEFAULT 'RUR',
        period INTEGER NOT NULL DEFAULT 30,
        schedule TEXT,
        employment TEXT,
        order_by TEXT NOT NULL DEFAULT 'publication_time',
        cover_letter TEXT
    )"#,
    r#"CREATE TABLE IF NOT EXISTS applications (
        id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
        user_id BIGINT NOT NULL,
        posting_id TEXT NOT NULL,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL,
        UNIQUE (user_id, posting_id)
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_applications_user ON applications(user_id, created_at)",
];

/// Create all ledger tables if they do not exist yet.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), DieselError> {
    run_blocking(pool.clone(), |conn| {
        conn.transaction(|conn| {
            for statement in STATEMENTS {
                diesel::sql_query(*statement).execute(conn)?;
            }
            Ok(())
        })
    })
    .await
}
