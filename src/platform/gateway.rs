//! Typed operations over the platform's REST API.

use tracing::debug;
use url::Url;

use super::dto::{
    NegotiationPayload, Resume, ResumeList, SearchFilters, SearchPage, TokenResponse, UserInfo,
};
use crate::config::PlatformConfig;
use crate::http::{ApiRequest, RequestError, RequestOutcome, ResilientHttpClient};
use crate::models::TokenPair;

/// Domain façade over [`ResilientHttpClient`].
///
/// Each call maps to one HTTP request. Failures are passed through as
/// classified by the client; pagination is left to the caller.
#[derive(Debug, Clone)]
pub struct PlatformGateway {
    client: ResilientHttpClient,
    config: PlatformConfig,
}

impl PlatformGateway {
    pub fn new(client: ResilientHttpClient, config: PlatformConfig) -> Self {
        Self { client, config }
    }

    /// URL the user opens in a browser to authorize this application.
    pub fn login_url(&self) -> RequestOutcome<String> {
        let url = Url::parse_with_params(
            &self.config.auth_url,
            &[
                ("response_type", "code"),
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
            ],
        )
        .map_err(|e| RequestError::InvalidRequest(format!("{}: {}", self.config.auth_url, e)))?;
        Ok(url.into())
    }

    /// Trade an authorization code for a token pair.
    pub async fn exchange_code(&self, code: &str) -> RequestOutcome<TokenPair> {
        let form = vec![
            ("grant_type".to_string(), "authorization_code".to_string()),
            ("client_id".to_string(), self.config.client_id.clone()),
            ("client_secret".to_string(), self.config.client_secret.clone()),
            ("code".to_string(), code.to_string()),
            ("redirect_uri".to_string(), self.config.redirect_uri.clone()),
        ];
        let request = ApiRequest::post(&self.config.token_url).form(form);
        let tokens: TokenResponse = self.client.execute_json(&request).await?;
        Ok(tokens.into())
    }

    /// Obtain a fresh token pair from a refresh token.
    pub async fn refresh_token(&self, refresh_token: &str) -> RequestOutcome<TokenPair> {
        let form = vec![
            ("grant_type".to_string(), "refresh_token".to_string()),
            ("refresh_token".to_string(), refresh_token.to_string()),
            ("client_id".to_string(), self.config.client_id.clone()),
            ("client_secret".to_string(), self.config.client_secret.clone()),
        ];
        let request = ApiRequest::post(&self.config.token_url).form(form);
        let tokens: TokenResponse = self.client.execute_json(&request).await?;
        Ok(tokens.into())
    }

    pub async fn get_user_info(&self, access_token: &str) -> RequestOutcome<UserInfo> {
        let request = ApiRequest::get("/me").bearer(access_token);
        self.client.execute_json(&request).await
    }

    pub async fn list_resumes(&self, access_token: &str) -> RequestOutcome<Vec<Resume>> {
        let request = ApiRequest::get("/resumes/mine").bearer(access_token);
        let list: ResumeList = self.client.execute_json(&request).await?;
        Ok(list.items)
    }

    /// Fetch one zero-based page of postings matching `text` and `filters`.
    pub async fn search_postings(
        &self,
        access_token: &str,
        text: &str,
        filters: &SearchFilters,
        page: u32,
        per_page: u32,
    ) -> RequestOutcome<SearchPage> {
        let mut request = ApiRequest::get("/vacancies")
            .bearer(access_token)
            .query("text", text)
            .query("page", page)
            .query("per_page", per_page);
        request.query.extend(filters.to_query());

        let result: SearchPage = self.client.execute_json(&request).await?;
        debug!(
            page,
            items = result.items.len(),
            pages = result.total_pages,
            found = result.total_found,
            "search page fetched"
        );
        Ok(result)
    }

    /// Apply to a posting with the given resume and cover letter.
    pub async fn apply(
        &self,
        access_token: &str,
        posting_id: &str,
        resume_id: &str,
        cover_letter: Option<&str>,
    ) -> RequestOutcome<()> {
        let payload = NegotiationPayload {
            vacancy_id: posting_id.to_string(),
            resume_id: resume_id.to_string(),
            message: cover_letter.unwrap_or_default().to_string(),
        };
        let body =
            serde_json::to_value(&payload).map_err(|e| RequestError::InvalidRequest(e.to_string()))?;
        let request = ApiRequest::post("/negotiations").bearer(access_token).json(body);
        self.client.execute(&request).await?;
        Ok(())
    }
}
