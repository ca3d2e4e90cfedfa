//! Diesel-based application ledger for SQLite.
//!
//! Since diesel-async only supports Postgres/MySQL, SQLite operations use sync Diesel
//! wrapped in spawn_blocking.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;

use super::diesel_models::{
    ApplicationRow, NewApplication, NewPlatformProfile, PlatformProfileRecord,
    SearchSettingsRecord,
};
use super::diesel_pool::{run_blocking, SqlitePool};
use super::{parse_datetime, ApplicationLedger, LedgerError, LedgerResult};
use crate::models::{
    ApplicationRecord, ApplicationStatus, PlatformProfile, SearchSettings, TokenPair, UserId,
};
use crate::schema::{applications, platform_profiles, search_settings};

impl From<PlatformProfileRecord> for PlatformProfile {
    fn from(record: PlatformProfileRecord) -> Self {
        PlatformProfile {
            user_id: record.user_id,
            external_id: record.external_id,
            tokens: TokenPair::new(record.access_token, record.refresh_token),
            is_bot_active: record.is_bot_active != 0,
        }
    }
}

impl From<SearchSettingsRecord> for SearchSettings {
    fn from(record: SearchSettingsRecord) -> Self {
        SearchSettings {
            resume_id: record.resume_id,
            search_text: record.search_text,
            area_id: record.area_id,
            salary: record.salary,
            currency: record.currency,
            period: record.period,
            schedule: record.schedule,
            employment: record.employment,
            order_by: record.order_by,
            cover_letter: record.cover_letter,
        }
    }
}

impl SearchSettingsRecord {
    fn from_settings(user_id: UserId, settings: &SearchSettings) -> Self {
        SearchSettingsRecord {
            user_id,
            resume_id: settings.resume_id.clone(),
            search_text: settings.search_text.clone(),
            area_id: settings.area_id.clone(),
            salary: settings.salary,
            currency: settings.currency.clone(),
            period: settings.period,
            schedule: settings.schedule.clone(),
            employment: settings.employment.clone(),
            order_by: settings.order_by.clone(),
            cover_letter: settings.cover_letter.clone(),
        }
    }
}

impl From<ApplicationRow> for ApplicationRecord {
    fn from(row: ApplicationRow) -> Self {
        ApplicationRecord {
            user_id: row.user_id,
            status: ApplicationStatus::from_str(&row.status).unwrap_or(ApplicationStatus::Error),
            external_posting_id: row.posting_id,
            created_at: parse_datetime(&row.created_at),
        }
    }
}

/// SQLite-backed [`ApplicationLedger`].
#[derive(Clone)]
pub struct DieselLedger {
    pool: SqlitePool,
}

impl DieselLedger {
    /// Create a new ledger with an existing pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the database at `path` and make sure the schema exists.
    pub async fn open(path: &std::path::Path) -> LedgerResult<Self> {
        let pool = super::create_diesel_pool(path)?;
        super::migrations::init_schema(&pool).await?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl ApplicationLedger for DieselLedger {
    async fn get_profile(&self, user_id: UserId) -> LedgerResult<Option<PlatformProfile>> {
        let record = run_blocking(self.pool.clone(), move |conn| {
            platform_profiles::table
                .find(user_id)
                .select(PlatformProfileRecord::as_select())
                .first(conn)
                .optional()
        })
        .await?;
        Ok(record.map(PlatformProfile::from))
    }

    async fn get_settings(&self, user_id: UserId) -> LedgerResult<Option<SearchSettings>> {
        let record = run_blocking(self.pool.clone(), move |conn| {
            search_settings::table
                .find(user_id)
                .select(SearchSettingsRecord::as_select())
                .first(conn)
                .optional()
        })
        .await?;
        Ok(record.map(SearchSettings::from))
    }

    async fn update_tokens(&self, user_id: UserId, tokens: &TokenPair) -> LedgerResult<()> {
        let access = tokens.access_token.clone();
        let refresh = tokens.refresh_token.clone();
        let now = Utc::now().to_rfc3339();

        let rows = run_blocking(self.pool.clone(), move |conn| {
            diesel::update(platform_profiles::table.find(user_id))
                .set((
                    platform_profiles::access_token.eq(&access),
                    platform_profiles::refresh_token.eq(&refresh),
                    platform_profiles::updated_at.eq(&now),
                ))
                .execute(conn)
        })
        .await?;

        if rows == 0 {
            return Err(LedgerError::MissingProfile(user_id));
        }
        Ok(())
    }

    async fn is_applied(&self, user_id: UserId, posting_id: &str) -> LedgerResult<bool> {
        use diesel::dsl::count_star;

        let posting_id = posting_id.to_string();
        let count: i64 = run_blocking(self.pool.clone(), move |conn| {
            applications::table
                .filter(applications::user_id.eq(user_id))
                .filter(applications::posting_id.eq(&posting_id))
                .select(count_star())
                .first(conn)
        })
        .await?;
        Ok(count > 0)
    }

    async fn log_application(
        &self,
        user_id: UserId,
        posting_id: &str,
        status: ApplicationStatus,
    ) -> LedgerResult<bool> {
        let posting_id = posting_id.to_string();
        let now = Utc::now().to_rfc3339();

        let rows = run_blocking(self.pool.clone(), move |conn| {
            let new_application = NewApplication {
                user_id,
                posting_id: &posting_id,
                status: status.as_str(),
                created_at: &now,
            };

            diesel::insert_into(applications::table)
                .values(&new_application)
                .on_conflict_do_nothing()
                .execute(conn)
        })
        .await?;
        Ok(rows > 0)
    }

    async fn set_bot_state(&self, user_id: UserId, active: bool) -> LedgerResult<()> {
        let now = Utc::now().to_rfc3339();

        let rows = run_blocking(self.pool.clone(), move |conn| {
            diesel::update(platform_profiles::table.find(user_id))
                .set((
                    platform_profiles::is_bot_active.eq(i32::from(active)),
                    platform_profiles::updated_at.eq(&now),
                ))
                .execute(conn)
        })
        .await?;

        if rows == 0 {
            return Err(LedgerError::MissingProfile(user_id));
        }
        Ok(())
    }

    async fn upsert_profile(
        &self,
        user_id: UserId,
        external_id: Option<&str>,
        tokens: &TokenPair,
    ) -> LedgerResult<()> {
        let external_id = external_id.map(str::to_string);
        let access = tokens.access_token.clone();
        let refresh = tokens.refresh_token.clone();
        let now = Utc::now().to_rfc3339();

        run_blocking(self.pool.clone(), move |conn| {
            let new_profile = NewPlatformProfile {
                user_id,
                external_id: external_id.as_deref(),
                access_token: &access,
                refresh_token: &refresh,
                is_bot_active: 0,
                updated_at: &now,
            };

            diesel::insert_into(platform_profiles::table)
                .values(&new_profile)
                .on_conflict(platform_profiles::user_id)
                .do_update()
                .set((
                    platform_profiles::external_id.eq(external_id.as_deref()),
                    platform_profiles::access_token.eq(&access),
                    platform_profiles::refresh_token.eq(&refresh),
                    platform_profiles::updated_at.eq(&now),
                ))
                .execute(conn)?;
            Ok(())
        })
        .await?;
        Ok(())
    }

    async fn upsert_settings(
        &self,
        user_id: UserId,
        settings: &SearchSettings,
    ) -> LedgerResult<()> {
        let record = SearchSettingsRecord::from_settings(user_id, settings);

        run_blocking(self.pool.clone(), move |conn| {
            diesel::insert_into(search_settings::table)
                .values(&record)
                .on_conflict(search_settings::user_id)
                .do_update()
                .set(&record)
                .execute(conn)?;
            Ok(())
        })
        .await?;
        Ok(())
    }

    async fn list_applications(&self, user_id: UserId) -> LedgerResult<Vec<ApplicationRecord>> {
        let rows = run_blocking(self.pool.clone(), move |conn| {
            applications::table
                .filter(applications::user_id.eq(user_id))
                .order((applications::created_at.desc(), applications::id.desc()))
                .select(ApplicationRow::as_select())
                .load(conn)
        })
        .await?;
        Ok(rows.into_iter().map(ApplicationRecord::from).collect())
    }

    async fn active_users(&self) -> LedgerResult<Vec<UserId>> {
        let users = run_blocking(self.pool.clone(), move |conn| {
            platform_profiles::table
                .filter(platform_profiles::is_bot_active.ne(0))
                .order(platform_profiles::user_id.asc())
                .select(platform_profiles::user_id)
                .load::<i64>(conn)
        })
        .await?;
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_test_db() -> (DieselLedger, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let ledger = DieselLedger::open(&dir.path().join("test.db")).await.unwrap();
        (ledger, dir)
    }

    #[tokio::test]
    async fn test_profile_crud() {
        let (ledger, _dir) = setup_test_db().await;

        assert!(ledger.get_profile(1).await.unwrap().is_none());

        ledger
            .upsert_profile(1, Some("ext-1"), &TokenPair::new("a1", "r1"))
            .await
            .unwrap();
        let profile = ledger.get_profile(1).await.unwrap().unwrap();
        assert_eq!(profile.external_id.as_deref(), Some("ext-1"));
        assert_eq!(profile.tokens, TokenPair::new("a1", "r1"));
        assert!(!profile.is_bot_active);

        ledger.set_bot_state(1, true).await.unwrap();
        ledger
            .update_tokens(1, &TokenPair::new("a2", "r2"))
            .await
            .unwrap();
        let profile = ledger.get_profile(1).await.unwrap().unwrap();
        assert!(profile.is_bot_active);
        assert_eq!(profile.tokens.access_token, "a2");
        assert_eq!(profile.tokens.refresh_token, "r2");

        // Relinking keeps the bot flag.
        ledger
            .upsert_profile(1, Some("ext-1"), &TokenPair::new("a3", "r3"))
            .await
            .unwrap();
        let profile = ledger.get_profile(1).await.unwrap().unwrap();
        assert!(profile.is_bot_active);
        assert_eq!(profile.tokens.access_token, "a3");
        assert_eq!(ledger.active_users().await.unwrap(), vec![1]);

        ledger.set_bot_state(1, false).await.unwrap();
        assert!(ledger.active_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_updates_require_linked_profile() {
        let (ledger, _dir) = setup_test_db().await;

        let err = ledger
            .update_tokens(7, &TokenPair::new("a", "r"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::MissingProfile(7)));

        let err = ledger.set_bot_state(7, true).await.unwrap_err();
        assert!(matches!(err, LedgerError::MissingProfile(7)));
    }

    #[tokio::test]
    async fn test_settings_upsert_replaces_all_fields() {
        let (ledger, _dir) = setup_test_db().await;

        let mut settings = SearchSettings::new("resume-1", "rust developer");
        settings.salary = Some(300_000);
        settings.schedule = Some("remote".to_string());
        ledger.upsert_settings(3, &settings).await.unwrap();
        assert_eq!(ledger.get_settings(3).await.unwrap(), Some(settings.clone()));

        settings.salary = None;
        settings.schedule = None;
        settings.cover_letter = Some("Hello".to_string());
        ledger.upsert_settings(3, &settings).await.unwrap();

        let stored = ledger.get_settings(3).await.unwrap().unwrap();
        assert_eq!(stored.salary, None);
        assert_eq!(stored.schedule, None);
        assert_eq!(stored.cover_letter.as_deref(), Some("Hello"));
    }

    #[tokio::test]
    async fn test_log_application_is_idempotent() {
        let (ledger, _dir) = setup_test_db().await;

        assert!(!ledger.is_applied(1, "100").await.unwrap());
        assert!(ledger
            .log_application(1, "100", ApplicationStatus::Applied)
            .await
            .unwrap());
        assert!(!ledger
            .log_application(1, "100", ApplicationStatus::Error)
            .await
            .unwrap());
        assert!(ledger.is_applied(1, "100").await.unwrap());

        // Same posting for another user is independent.
        assert!(!ledger.is_applied(2, "100").await.unwrap());

        let history = ledger.list_applications(1).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].external_posting_id, "100");
        assert_eq!(history[0].status, ApplicationStatus::Applied);
    }
}
