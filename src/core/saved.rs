//! Saved fund bookkeeping types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Opaque identifier of a registered user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn generate() -> Self {
        UserId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        UserId(value.to_string())
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        UserId(value)
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A bookmarked fund. `scheme_name` and `scheme_code` are a snapshot taken
/// when the fund was saved and are never refreshed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedFund {
    pub fund_id: String,
    pub scheme_name: String,
    pub scheme_code: String,
}

impl SavedFund {
    pub fn new(fund_id: &str, scheme_name: &str, scheme_code: &str) -> Self {
        Self {
            fund_id: fund_id.to_string(),
            scheme_name: scheme_name.to_string(),
            scheme_code: scheme_code.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub saved_funds: Vec<SavedFund>,
}

impl UserRecord {
    pub fn new(username: &str) -> Self {
        Self {
            id: UserId::generate(),
            username: username.to_string(),
            created_at: Utc::now(),
            saved_funds: Vec::new(),
        }
    }

    pub fn has_fund(&self, fund_id: &str) -> bool {
        self.saved_funds.iter().any(|f| f.fund_id == fund_id)
    }
}
