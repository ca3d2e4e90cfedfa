//! Account linking and bot control through the service layer.

mod common;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use autoapply::repository::ApplicationLedger;
use autoapply::services::{BotService, BotState, ServiceError};
use autoapply::worker::PassDispatcher;
use autoapply::SearchSettings;

use common::USER;

#[tokio::test]
async fn link_account_stores_tokens_and_external_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::tokens("a1", "r1")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("Authorization", "Bearer a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "777",
            "email": "dev@example.com",
            "first_name": "Ann",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (ledger, _dir) = common::ledger().await;
    let service = BotService::new(common::gateway(&server), ledger.clone());

    let me = service.link_account(USER, "code").await.unwrap();
    assert_eq!(me.id, "777");

    let profile = ledger.get_profile(USER).await.unwrap().unwrap();
    assert_eq!(profile.external_id.as_deref(), Some("777"));
    assert_eq!(profile.tokens.access_token, "a1");
    assert!(!profile.is_bot_active);
}

#[tokio::test]
async fn bot_control_requires_linked_account() {
    let server = MockServer::start().await;
    let (ledger, _dir) = common::ledger().await;
    let service = BotService::new(common::gateway(&server), ledger);

    let err = service.set_bot_state(USER, true).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotLinked(USER)), "got {err:?}");

    let err = service.list_resumes(USER).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotLinked(USER)), "got {err:?}");
}

#[tokio::test]
async fn starting_bot_triggers_a_pass() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vacancies"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::search_page(&["1"], 0, 1)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/negotiations"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let (ledger, _dir) = common::ledger().await;
    common::seed_active_user(&ledger, USER).await;
    ledger.set_bot_state(USER, false).await.unwrap();

    let (dispatcher, handle) = PassDispatcher::spawn(
        common::worker(&server, ledger.clone(), common::no_delay()),
        1,
    );
    let service = BotService::new(common::gateway(&server), ledger.clone()).with_dispatcher(dispatcher);

    assert_eq!(service.set_bot_state(USER, true).await.unwrap(), BotState::Started);
    drop(service);

    let stats = handle.await.unwrap();
    assert_eq!(stats.completed, 1);
    assert!(ledger.is_applied(USER, "1").await.unwrap());
}

#[tokio::test]
async fn stopping_bot_does_not_trigger_a_pass() {
    let server = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let (ledger, _dir) = common::ledger().await;
    common::seed_active_user(&ledger, USER).await;

    let (dispatcher, handle) = PassDispatcher::spawn(
        common::worker(&server, ledger.clone(), common::no_delay()),
        1,
    );
    let service = BotService::new(common::gateway(&server), ledger.clone()).with_dispatcher(dispatcher);

    assert_eq!(service.set_bot_state(USER, false).await.unwrap(), BotState::Stopped);
    drop(service);

    assert_eq!(handle.await.unwrap().started, 0);
    assert!(!ledger.get_profile(USER).await.unwrap().unwrap().is_bot_active);
}

#[tokio::test]
async fn settings_roundtrip_and_resume_listing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/resumes/mine"))
        .and(header("Authorization", "Bearer old-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "id": "resume-1", "title": "Rust developer" }],
            "found": 1,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (ledger, _dir) = common::ledger().await;
    common::seed_active_user(&ledger, USER).await;
    let service = BotService::new(common::gateway(&server), ledger);

    let mut settings = SearchSettings::new("resume-1", "backend");
    settings.employment = Some("full".to_string());
    service.upsert_settings(USER, &settings).await.unwrap();
    assert_eq!(service.get_settings(USER).await.unwrap(), Some(settings));

    let resumes = service.list_resumes(USER).await.unwrap();
    assert_eq!(resumes.len(), 1);
    assert_eq!(resumes[0].title.as_deref(), Some("Rust developer"));
}
