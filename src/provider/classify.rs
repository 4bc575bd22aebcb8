//! Provider failure classification
//!
//! Providers only expose failures as text, so the category is recovered by
//! case-insensitive substring matching. Keep all wording dependencies here.

use serde::Serialize;

/// Kind of provider failure surfaced to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    QuotaExceeded,
    InvalidCredential,
    RateLimited,
    BillingIssue,
    Unclassified,
}

impl ErrorCategory {
    /// Client-facing text for the category; `raw` is only used when unclassified
    pub fn client_message(&self, raw: &str) -> String {
        match self {
            ErrorCategory::QuotaExceeded => {
                "API quota exceeded. Check your provider subscription.".to_string()
            }
            ErrorCategory::InvalidCredential => "Invalid or unauthorized API key.".to_string(),
            ErrorCategory::RateLimited => "Rate limit reached. Please wait a moment.".to_string(),
            ErrorCategory::BillingIssue => {
                "Billing problem. Check your provider account.".to_string()
            }
            ErrorCategory::Unclassified => format!("Technical error: {}", raw),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::QuotaExceeded => "quota_exceeded",
            ErrorCategory::InvalidCredential => "invalid_credential",
            ErrorCategory::RateLimited => "rate_limited",
            ErrorCategory::BillingIssue => "billing_issue",
            ErrorCategory::Unclassified => "unclassified",
        }
    }
}

/// Map raw provider error text to a category. First match wins.
pub fn classify(raw: &str) -> ErrorCategory {
    let text = raw.to_lowercase();

    if text.contains("insufficient_quota") || text.contains("quota") {
        ErrorCategory::QuotaExceeded
    } else if text.contains("invalid_api_key") || text.contains("unauthorized") {
        ErrorCategory::InvalidCredential
    } else if text.contains("rate_limit") {
        ErrorCategory::RateLimited
    } else if text.contains("billing") {
        ErrorCategory::BillingIssue
    } else {
        ErrorCategory::Unclassified
    }
}
