//! Domain types shared by the worker, the ledger and the platform gateway.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Internal user identifier.
pub type UserId = i64;

/// OAuth access/refresh token pair for a linked platform account.
///
/// `Debug` is redacted so tokens never end up in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// A user's linked platform account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformProfile {
    pub user_id: UserId,
    /// Account id on the remote platform, if known.
    pub external_id: Option<String>,
    pub tokens: TokenPair,
    pub is_bot_active: bool,
}

/// Search and application preferences for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSettings {
    pub resume_id: String,
    pub search_text: String,
    #[serde(default = "default_area_id")]
    pub area_id: String,
    #[serde(default)]
    pub salary: Option<i32>,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Only postings published within this many days.
    #[serde(default = "default_period")]
    pub period: i32,
    #[serde(default)]
    pub schedule: Option<String>,
    #[serde(default)]
    pub employment: Option<String>,
    #[serde(default = "default_order_by")]
    pub order_by: String,
    #[serde(default)]
    pub cover_letter: Option<String>,
}

fn default_area_id() -> String {
    "113".to_string()
}
fn default_currency() -> String {
    "RUR".to_string()
}
fn default_period() -> i32 {
    30
}
fn default_order_by() -> String {
    "publication_time".to_string()
}

impl SearchSettings {
    /// Settings with platform defaults for everything but the required fields.
    pub fn new(resume_id: impl Into<String>, search_text: impl Into<String>) -> Self {
        Self {
            resume_id: resume_id.into(),
            search_text: search_text.into(),
            area_id: default_area_id(),
            salary: None,
            currency: default_currency(),
            period: default_period(),
            schedule: None,
            employment: None,
            order_by: default_order_by(),
            cover_letter: None,
        }
    }
}

/// Recorded outcome of one application attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Applied,
    /// The platform reports the application already exists.
    AlreadyAppliedExternal,
    Error,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::AlreadyAppliedExternal => "already_applied_external",
            Self::Error => "error",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "applied" => Some(Self::Applied),
            "already_applied_external" => Some(Self::AlreadyAppliedExternal),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of application history. Never updated once written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationRecord {
    pub user_id: UserId,
    pub external_posting_id: String,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
}
