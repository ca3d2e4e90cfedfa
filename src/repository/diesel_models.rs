//! Diesel ORM models for database tables.
//!
//! For SQLite, operations are wrapped in spawn_blocking (see `diesel_pool`).

use std::fmt;

use diesel::prelude::*;

use crate::schema;

/// Platform profile record from the database.
///
/// `Debug` hides the tokens.
#[derive(Queryable, Selectable, Identifiable, Clone)]
#[diesel(table_name = schema::platform_profiles)]
#[diesel(primary_key(user_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PlatformProfileRecord {
    pub user_id: i64,
    pub external_id: Option<String>,
    pub access_token: String,
    pub refresh_token: String,
    pub is_bot_active: i32,
    pub updated_at: String,
}

/// New platform profile for insertion.
#[derive(Insertable)]
#[diesel(table_name = schema::platform_profiles)]
pub struct NewPlatformProfile<'a> {
    pub user_id: i64,
    pub external_id: Option<&'a str>,
    pub access_token: &'a str,
    pub refresh_token: &'a str,
    pub is_bot_active: i32,
    pub updated_at: &'a str,
}

impl fmt::Debug for PlatformProfileRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformProfileRecord")
            .field("user_id", &self.user_id)
            .field("external_id", &self.external_id)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("is_bot_active", &self.is_bot_active)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

impl fmt::Debug for NewPlatformProfile<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewPlatformProfile")
            .field("user_id", &self.user_id)
            .field("external_id", &self.external_id)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("is_bot_active", &self.is_bot_active)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Search settings record from the database.
#[derive(Queryable, Selectable, Identifiable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = schema::search_settings)]
#[diesel(primary_key(user_id))]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SearchSettingsRecord {
    pub user_id: i64,
    pub resume_id: String,
    pub search_text: String,
    pub area_id: String,
    pub salary: Option<i32>,
    pub currency: String,
    pub period: i32,
    pub schedule: Option<String>,
    pub employment: Option<String>,
    pub order_by: String,
    pub cover_letter: Option<String>,
}

/// Application record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::applications)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ApplicationRow {
    pub id: i32,
    pub user_id: i64,
    pub posting_id: String,
    pub status: String,
    pub created_at: String,
}

/// New application for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::applications)]
pub struct NewApplication<'a> {
    pub user_id: i64,
    pub posting_id: &'a str,
    pub status: &'a str,
    pub created_at: &'a str,
}
