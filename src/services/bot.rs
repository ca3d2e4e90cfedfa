//! Account linking, settings and bot control for a single user.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::http::RequestError;
use crate::models::{ApplicationRecord, SearchSettings, UserId};
use crate::platform::{PlatformGateway, Resume, UserInfo};
use crate::repository::{ApplicationLedger, LedgerError};
use crate::worker::PassDispatcher;

/// Errors from service operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("no linked platform account for user {0}")]
    NotLinked(UserId),

    #[error(transparent)]
    Ledger(LedgerError),

    #[error("platform request failed: {0}")]
    Request(#[from] RequestError),
}

impl From<LedgerError> for ServiceError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::MissingProfile(user_id) => ServiceError::NotLinked(user_id),
            other => ServiceError::Ledger(other),
        }
    }
}

/// Result of switching the bot on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotState {
    Started,
    Stopped,
}

impl BotState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BotState::Started => "started",
            BotState::Stopped => "stopped",
        }
    }
}

/// User-facing operations over the ledger and the platform.
#[derive(Clone)]
pub struct BotService {
    gateway: PlatformGateway,
    ledger: Arc<dyn ApplicationLedger>,
    dispatcher: Option<PassDispatcher>,
}

impl BotService {
    pub fn new(gateway: PlatformGateway, ledger: Arc<dyn ApplicationLedger>) -> Self {
        Self {
            gateway,
            ledger,
            dispatcher: None,
        }
    }

    /// Trigger a pass through `dispatcher` whenever a bot is started.
    pub fn with_dispatcher(mut self, dispatcher: PassDispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn login_url(&self) -> Result<String, ServiceError> {
        Ok(self.gateway.login_url()?)
    }

    /// Exchange an authorization code and store the resulting account.
    pub async fn link_account(&self, user_id: UserId, code: &str) -> Result<UserInfo, ServiceError> {
        let tokens = self.gateway.exchange_code(code).await?;
        let me = self.gateway.get_user_info(&tokens.access_token).await?;
        self.ledger
            .upsert_profile(user_id, Some(&me.id), &tokens)
            .await?;
        info!(user_id, external_id = %me.id, "platform account linked");
        Ok(me)
    }

    pub async fn get_settings(&self, user_id: UserId) -> Result<Option<SearchSettings>, ServiceError> {
        Ok(self.ledger.get_settings(user_id).await?)
    }

    pub async fn upsert_settings(
        &self,
        user_id: UserId,
        settings: &SearchSettings,
    ) -> Result<SearchSettings, ServiceError> {
        self.ledger.upsert_settings(user_id, settings).await?;
        Ok(settings.clone())
    }

    /// Persist the bot flag. Starting the bot also queues a pass.
    pub async fn set_bot_state(&self, user_id: UserId, active: bool) -> Result<BotState, ServiceError> {
        self.ledger.set_bot_state(user_id, active).await?;

        if !active {
            info!(user_id, "bot stopped");
            return Ok(BotState::Stopped);
        }

        info!(user_id, "bot started");
        if let Some(dispatcher) = &self.dispatcher {
            dispatcher.start_pass(user_id);
        }
        Ok(BotState::Started)
    }

    /// Resumes of the linked account, fetched with the stored token.
    pub async fn list_resumes(&self, user_id: UserId) -> Result<Vec<Resume>, ServiceError> {
        let profile = self
            .ledger
            .get_profile(user_id)
            .await?
            .ok_or(ServiceError::NotLinked(user_id))?;
        Ok(self.gateway.list_resumes(&profile.tokens.access_token).await?)
    }

    pub async fn history(&self, user_id: UserId) -> Result<Vec<ApplicationRecord>, ServiceError> {
        Ok(self.ledger.list_applications(user_id).await?)
    }
}
