//! Shared fixtures: a mock platform, a throwaway ledger and a fast worker.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::MockServer;

use autoapply::http::{ClientConfig, RateLimitConfig, RateLimiter, ResilientHttpClient, RetryPolicy};
use autoapply::platform::{ErrorValueDetector, PlatformGateway};
use autoapply::repository::{ApplicationLedger, DieselLedger};
use autoapply::worker::{HarvestConfig, HarvestWorker};
use autoapply::{PlatformConfig, SearchSettings, TokenPair};

pub const USER: i64 = 42;

/// Retries without meaningful waits.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
    }
}

pub fn client(base_url: &str) -> ResilientHttpClient {
    let config = ClientConfig {
        retry: fast_retry(),
        ..ClientConfig::new(base_url)
    };
    let limiter = RateLimiter::with_config(RateLimitConfig {
        limit: 1000,
        window: Duration::from_secs(1),
    });
    ResilientHttpClient::new(config, limiter).unwrap()
}

pub fn gateway(server: &MockServer) -> PlatformGateway {
    let platform = PlatformConfig {
        client_id: "client".into(),
        client_secret: "secret".into(),
        redirect_uri: "http://localhost/callback".into(),
        api_base_url: server.uri(),
        auth_url: format!("{}/oauth/authorize", server.uri()),
        token_url: format!("{}/oauth/token", server.uri()),
    };
    PlatformGateway::new(client(&server.uri()), platform)
}

/// Ledger in a temp dir. Keep the `TempDir` alive for the test's duration.
pub async fn ledger() -> (Arc<DieselLedger>, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let ledger = DieselLedger::open(&dir.path().join("test.db"))
        .await
        .expect("Failed to open ledger");
    (Arc::new(ledger), dir)
}

/// Link an account, store settings and switch the bot on.
pub async fn seed_active_user(ledger: &DieselLedger, user_id: i64) {
    ledger
        .upsert_profile(user_id, Some("ext"), &TokenPair::new("old-access", "old-refresh"))
        .await
        .unwrap();
    let mut settings = SearchSettings::new("resume-1", "rust");
    settings.cover_letter = Some("Hello".to_string());
    ledger.upsert_settings(user_id, &settings).await.unwrap();
    ledger.set_bot_state(user_id, true).await.unwrap();
}

pub fn no_delay() -> HarvestConfig {
    HarvestConfig {
        apply_delay: Duration::ZERO,
        page_delay: Duration::ZERO,
        page_size: 20,
    }
}

pub fn worker(server: &MockServer, ledger: Arc<DieselLedger>, config: HarvestConfig) -> HarvestWorker {
    HarvestWorker::new(
        gateway(server),
        ledger,
        Arc::new(ErrorValueDetector::default()),
        config,
    )
}

/// Search response body with the given posting ids.
pub fn search_page(ids: &[&str], page: u32, pages: u32) -> serde_json::Value {
    let items: Vec<_> = ids
        .iter()
        .map(|id| {
            json!({
                "id": id,
                "name": format!("Rust developer {}", id),
                "employer": { "id": "1", "name": "Acme" },
                "alternate_url": format!("https://hh.ru/vacancy/{}", id),
            })
        })
        .collect();
    json!({
        "items": items,
        "found": ids.len() as u64 * pages as u64,
        "pages": pages,
        "page": page,
        "per_page": 20,
    })
}

pub fn tokens(access: &str, refresh: &str) -> serde_json::Value {
    json!({
        "access_token": access,
        "refresh_token": refresh,
        "token_type": "bearer",
        "expires_in": 1209600,
    })
}
