//! Durable state: linked accounts, search settings and application outcomes.
//!
//! The worker only sees the [`ApplicationLedger`] trait; [`DieselLedger`]
//! is the SQLite implementation used by the binary.

pub mod diesel_ledger;
pub mod diesel_models;
pub mod diesel_pool;
pub mod migrations;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{
    ApplicationRecord, ApplicationStatus, PlatformProfile, SearchSettings, TokenPair, UserId,
};

pub use diesel_ledger::DieselLedger;
pub use diesel_pool::{create_diesel_pool, SqlitePool};

/// Failure of the persistence layer. Always aborts the current pass.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("no linked account for user {0}")]
    MissingProfile(UserId),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Storage consumed by the harvest worker and the bot service.
///
/// `log_application` must tolerate conflicts: recording a second outcome
/// for the same (user, posting) pair keeps the first and succeeds.
#[async_trait]
pub trait ApplicationLedger: Send + Sync {
    async fn get_profile(&self, user_id: UserId) -> LedgerResult<Option<PlatformProfile>>;

    async fn get_settings(&self, user_id: UserId) -> LedgerResult<Option<SearchSettings>>;

    /// Replace the stored token pair. Fails with `MissingProfile` when the
    /// user has never linked an account.
    async fn update_tokens(&self, user_id: UserId, tokens: &TokenPair) -> LedgerResult<()>;

    async fn is_applied(&self, user_id: UserId, posting_id: &str) -> LedgerResult<bool>;

    /// Record an outcome. Returns `false` if one was already recorded.
    async fn log_application(
        &self,
        user_id: UserId,
        posting_id: &str,
        status: ApplicationStatus,
    ) -> LedgerResult<bool>;

    async fn set_bot_state(&self, user_id: UserId, active: bool) -> LedgerResult<()>;

    /// Create or replace the linked account, keeping the bot flag if the
    /// profile already exists.
    async fn upsert_profile(
        &self,
        user_id: UserId,
        external_id: Option<&str>,
        tokens: &TokenPair,
    ) -> LedgerResult<()>;

    async fn upsert_settings(&self, user_id: UserId, settings: &SearchSettings)
        -> LedgerResult<()>;

    /// Most recent outcomes first.
    async fn list_applications(&self, user_id: UserId) -> LedgerResult<Vec<ApplicationRecord>>;

    /// Users whose bot is switched on.
    async fn active_users(&self) -> LedgerResult<Vec<UserId>>;
}

/// Parse an RFC3339 timestamp column, falling back to now on garbage.
pub(crate) fn parse_datetime(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
