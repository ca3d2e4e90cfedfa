//! Detection of "already applied" responses.
//!
//! Platforms signal a duplicate application differently, so the check is a
//! trait. The HeadHunter signal is a 403 whose body lists an error with
//! `value == "already_applied"`.

use std::fmt::Debug;

use serde::Deserialize;

use crate::http::RequestError;

/// Decides whether a failed apply means the platform already has the application.
pub trait DuplicateDetector: Send + Sync + Debug {
    fn is_already_applied(&self, err: &RequestError) -> bool;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ErrorEntry {
    #[serde(default)]
    value: Option<String>,
}

/// Matches an HTTP error with a given status whose JSON body contains an
/// `errors[].value` equal to the given marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorValueDetector {
    pub status: u16,
    pub value: String,
}

impl Default for ErrorValueDetector {
    fn default() -> Self {
        Self {
            status: 403,
            value: "already_applied".to_string(),
        }
    }
}

impl DuplicateDetector for ErrorValueDetector {
    fn is_already_applied(&self, err: &RequestError) -> bool {
        let RequestError::Http { status, body } = err else {
            return false;
        };
        if *status != self.status {
            return false;
        }
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => parsed
                .errors
                .iter()
                .any(|e| e.value.as_deref() == Some(self.value.as_str())),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16, body: &str) -> RequestError {
        RequestError::Http {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_detects_already_applied_403() {
        let detector = ErrorValueDetector::default();
        assert!(detector.is_already_applied(&http(
            403,
            r#"{"errors":[{"type":"negotiations","value":"already_applied"}]}"#
        )));
        assert!(detector.is_already_applied(&http(
            403,
            r#"{"errors":[{"value":"limit_exceeded"},{"value":"already_applied"}]}"#
        )));
    }

    #[test]
    fn test_other_403s_are_not_duplicates() {
        let detector = ErrorValueDetector::default();
        assert!(!detector.is_already_applied(&http(
            403,
            r#"{"errors":[{"value":"test_required"}]}"#
        )));
        assert!(!detector.is_already_applied(&http(403, "<html>forbidden</html>")));
        assert!(!detector.is_already_applied(&http(403, "")));
    }

    #[test]
    fn test_requires_matching_status() {
        let detector = ErrorValueDetector::default();
        assert!(!detector.is_already_applied(&http(
            400,
            r#"{"errors":[{"value":"already_applied"}]}"#
        )));
        assert!(!detector.is_already_applied(&RequestError::Unauthorized));
    }
}
