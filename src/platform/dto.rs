//! Wire formats of the recruiting platform's REST API.

use serde::{Deserialize, Serialize};

use crate::models::{SearchSettings, TokenPair};

/// Response of the OAuth token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl From<TokenResponse> for TokenPair {
    fn from(resp: TokenResponse) -> Self {
        TokenPair::new(resp.access_token, resp.refresh_token)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Employer {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Salary {
    #[serde(default)]
    pub from: Option<i64>,
    #[serde(default)]
    pub to: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub gross: Option<bool>,
}

/// A posting as listed in search results.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PostingRef {
    #[serde(rename = "id")]
    pub external_id: String,
    #[serde(rename = "name")]
    pub title: String,
    #[serde(default)]
    pub employer: Employer,
    #[serde(default)]
    pub salary: Option<Salary>,
    #[serde(rename = "alternate_url", default)]
    pub url: String,
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchPage {
    pub items: Vec<PostingRef>,
    #[serde(rename = "found")]
    pub total_found: u64,
    #[serde(rename = "pages")]
    pub total_pages: u32,
    #[serde(rename = "page")]
    pub page_index: u32,
}

/// Optional search filters; `None` fields are left out of the query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
    pub area: Option<String>,
    pub salary: Option<i32>,
    pub currency: Option<String>,
    pub period: Option<i32>,
    pub schedule: Option<String>,
    pub employment: Option<String>,
    pub order_by: Option<String>,
}

impl SearchFilters {
    /// Query parameters in the platform's naming.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(ref area) = self.area {
            query.push(("area".to_string(), area.clone()));
        }
        if let Some(salary) = self.salary {
            query.push(("salary".to_string(), salary.to_string()));
            if let Some(ref currency) = self.currency {
                query.push(("currency".to_string(), currency.clone()));
            }
        }
        if let Some(period) = self.period {
            query.push(("period".to_string(), period.to_string()));
        }
        if let Some(ref schedule) = self.schedule {
            query.push(("schedule".to_string(), schedule.clone()));
        }
        if let Some(ref employment) = self.employment {
            query.push(("employment".to_string(), employment.clone()));
        }
        if let Some(ref order_by) = self.order_by {
            query.push(("order_by".to_string(), order_by.clone()));
        }
        query
    }
}

impl From<&SearchSettings> for SearchFilters {
    fn from(settings: &SearchSettings) -> Self {
        Self {
            area: Some(settings.area_id.clone()),
            salary: settings.salary,
            currency: Some(settings.currency.clone()),
            period: Some(settings.period),
            schedule: settings.schedule.clone(),
            employment: settings.employment.clone(),
            order_by: Some(settings.order_by.clone()),
        }
    }
}

/// Body of an apply (negotiation) request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NegotiationPayload {
    pub vacancy_id: String,
    pub resume_id: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resume {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub alternate_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ResumeList {
    #[serde(default)]
    pub items: Vec<Resume>,
}

/// Account info of the token owner (`GET /me`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserInfo {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}
