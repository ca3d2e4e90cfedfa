//! One harvest pass for one user.
//!
//! A pass loads the user's profile and search settings, walks the search
//! results page by page and applies to every posting that has no recorded
//! outcome yet. All durable facts go through the [`ApplicationLedger`].
//!
//! ```text
//! Init ─► Searching ─► Applying ─► Paging ─► Done
//!            │  ▲         │  ▲        │
//!            ▼  │         ▼  │        └─► Searching
//!       RefreshingToken  RefreshingToken
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::http::RequestError;
use crate::models::{ApplicationStatus, SearchSettings, TokenPair, UserId};
use crate::platform::{DuplicateDetector, PlatformGateway, PostingRef, SearchFilters, SearchPage};
use crate::repository::{ApplicationLedger, LedgerError};

/// Pacing and page size for a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestConfig {
    /// Pause after every apply attempt, whatever its outcome.
    pub apply_delay: Duration,
    /// Pause between two search page fetches.
    pub page_delay: Duration,
    pub page_size: u32,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            apply_delay: Duration::from_secs(2),
            page_delay: Duration::from_secs(1),
            page_size: 20,
        }
    }
}

/// How a pass ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PassEnd {
    /// Bot switched off, no linked account or no search settings.
    #[default]
    Idle,
    /// Every page was visited.
    Exhausted,
    /// A page could not be fetched for a reason other than authorization.
    SearchFailed,
    /// Search stayed unauthorized after a token refresh, or the refresh failed.
    Unauthorized,
    /// The ledger could not be read or written.
    LedgerFailed,
}

/// Counters collected during a pass, logged when it ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub pages: u32,
    pub applied: u32,
    pub already_applied: u32,
    /// Postings skipped because an outcome was already recorded.
    pub skipped: u32,
    /// Apply attempts that ended in an error and were not recorded.
    pub failed: u32,
    pub token_refreshes: u32,
    pub end: PassEnd,
}

/// Reasons a pass stops early.
#[derive(Debug)]
enum PassError {
    Ledger(LedgerError),
    Unauthorized,
    Refresh(RequestError),
    Search { page: u32, error: RequestError },
}

impl From<LedgerError> for PassError {
    fn from(e: LedgerError) -> Self {
        PassError::Ledger(e)
    }
}

/// Per-pass state.
struct PassContext {
    user_id: UserId,
    tokens: TokenPair,
    settings: SearchSettings,
    filters: SearchFilters,
}

/// Runs harvest passes. Cheap to clone; passes for different users may
/// run concurrently on clones of the same worker.
#[derive(Clone)]
pub struct HarvestWorker {
    gateway: PlatformGateway,
    ledger: Arc<dyn ApplicationLedger>,
    detector: Arc<dyn DuplicateDetector>,
    config: HarvestConfig,
}

impl HarvestWorker {
    pub fn new(
        gateway: PlatformGateway,
        ledger: Arc<dyn ApplicationLedger>,
        detector: Arc<dyn DuplicateDetector>,
        config: HarvestConfig,
    ) -> Self {
        Self {
            gateway,
            ledger,
            detector,
            config,
        }
    }

    /// Run one complete pass for `user_id`. Never fails; the outcome of
    /// each posting is in the ledger and the returned summary.
    pub async fn run_pass(&self, user_id: UserId) -> PassSummary {
        let mut summary = PassSummary::default();

        summary.end = match self.harvest(user_id, &mut summary).await {
            Ok(end) => end,
            Err(PassError::Ledger(e)) => {
                error!(user_id, error = %e, "ledger failure, aborting pass");
                PassEnd::LedgerFailed
            }
            Err(PassError::Unauthorized) => {
                error!(user_id, "still unauthorized after token refresh, abandoning pass");
                PassEnd::Unauthorized
            }
            Err(PassError::Refresh(e)) => {
                error!(user_id, error = %e, "token refresh failed, abandoning pass");
                PassEnd::Unauthorized
            }
            Err(PassError::Search { page, error }) => {
                warn!(user_id, page, error = %error, "search failed, ending pass");
                PassEnd::SearchFailed
            }
        };

        info!(
            user_id,
            end = ?summary.end,
            pages = summary.pages,
            applied = summary.applied,
            already_applied = summary.already_applied,
            skipped = summary.skipped,
            failed = summary.failed,
            "pass finished"
        );
        summary
    }

    async fn harvest(
        &self,
        user_id: UserId,
        summary: &mut PassSummary,
    ) -> Result<PassEnd, PassError> {
        let Some(profile) = self.ledger.get_profile(user_id).await? else {
            info!(user_id, "no linked account, nothing to do");
            return Ok(PassEnd::Idle);
        };
        if !profile.is_bot_active {
            info!(user_id, "bot inactive, nothing to do");
            return Ok(PassEnd::Idle);
        }
        let Some(settings) = self.ledger.get_settings(user_id).await? else {
            info!(user_id, "no search settings, nothing to do");
            return Ok(PassEnd::Idle);
        };

        let mut ctx = PassContext {
            user_id,
            tokens: profile.tokens,
            filters: SearchFilters::from(&settings),
            settings,
        };

        let mut page = 0u32;
        loop {
            let result = self.search_page(&mut ctx, page, summary).await?;
            summary.pages += 1;

            if result.items.is_empty() {
                debug!(user_id, page, "empty page");
                break;
            }

            for posting in &result.items {
                if self
                    .ledger
                    .is_applied(user_id, &posting.external_id)
                    .await?
                {
                    summary.skipped += 1;
                    continue;
                }

                self.apply_to(&mut ctx, posting, summary).await?;
                tokio::time::sleep(self.config.apply_delay).await;
            }

            page += 1;
            if page >= result.total_pages {
                break;
            }
            tokio::time::sleep(self.config.page_delay).await;
        }

        Ok(PassEnd::Exhausted)
    }

    async fn search_page(
        &self,
        ctx: &mut PassContext,
        page: u32,
        summary: &mut PassSummary,
    ) -> Result<SearchPage, PassError> {
        match self.fetch_page(ctx, page).await {
            Ok(result) => return Ok(result),
            Err(RequestError::Unauthorized) => {}
            Err(error) => return Err(PassError::Search { page, error }),
        }

        self.refresh(ctx, summary).await?;
        match self.fetch_page(ctx, page).await {
            Ok(result) => Ok(result),
            Err(RequestError::Unauthorized) => Err(PassError::Unauthorized),
            Err(error) => Err(PassError::Search { page, error }),
        }
    }

    async fn fetch_page(&self, ctx: &PassContext, page: u32) -> Result<SearchPage, RequestError> {
        self.gateway
            .search_postings(
                &ctx.tokens.access_token,
                &ctx.settings.search_text,
                &ctx.filters,
                page,
                self.config.page_size,
            )
            .await
    }

    /// Attempt one posting. Only ledger failures propagate.
    async fn apply_to(
        &self,
        ctx: &mut PassContext,
        posting: &PostingRef,
        summary: &mut PassSummary,
    ) -> Result<(), PassError> {
        let user_id = ctx.user_id;
        let posting_id = posting.external_id.as_str();

        let mut outcome = self.submit(ctx, posting_id).await;
        if matches!(outcome, Err(RequestError::Unauthorized)) {
            match self.refresh(ctx, summary).await {
                Ok(()) => outcome = self.submit(ctx, posting_id).await,
                Err(PassError::Refresh(e)) => {
                    warn!(user_id, posting_id, error = %e, "token refresh failed, skipping posting");
                    summary.failed += 1;
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }

        match outcome {
            Ok(()) => {
                self.ledger
                    .log_application(user_id, posting_id, ApplicationStatus::Applied)
                    .await?;
                summary.applied += 1;
                info!(user_id, posting_id, title = %posting.title, "applied");
            }
            Err(err) if self.detector.is_already_applied(&err) => {
                self.ledger
                    .log_application(user_id, posting_id, ApplicationStatus::AlreadyAppliedExternal)
                    .await?;
                summary.already_applied += 1;
                info!(user_id, posting_id, "already applied on the platform");
            }
            Err(RequestError::Unauthorized) => {
                summary.failed += 1;
                warn!(user_id, posting_id, "still unauthorized after token refresh, skipping posting");
            }
            Err(err) => {
                summary.failed += 1;
                error!(user_id, posting_id, status = ?err.status(), error = %err, "apply failed");
            }
        }
        Ok(())
    }

    async fn submit(&self, ctx: &PassContext, posting_id: &str) -> Result<(), RequestError> {
        self.gateway
            .apply(
                &ctx.tokens.access_token,
                posting_id,
                &ctx.settings.resume_id,
                ctx.settings.cover_letter.as_deref(),
            )
            .await
    }

    /// Exchange the refresh token and persist the new pair before the
    /// caller retries anything.
    async fn refresh(&self, ctx: &mut PassContext, summary: &mut PassSummary) -> Result<(), PassError> {
        debug!(user_id = ctx.user_id, "refreshing access token");
        let tokens = self
            .gateway
            .refresh_token(&ctx.tokens.refresh_token)
            .await
            .map_err(PassError::Refresh)?;

        self.ledger.update_tokens(ctx.user_id, &tokens).await?;
        ctx.tokens = tokens;
        summary.token_refreshes += 1;
        info!(user_id = ctx.user_id, "access token refreshed");
        Ok(())
    }
}
