use thiserror::Error;

/// Domain errors of the saved funds operations.
#[derive(Debug, Error)]
pub enum SavedFundsError {
    #[error("no valid credential was presented")]
    Unauthenticated,
    #[error("user not found")]
    NotFound,
    #[error("fund already saved: {fund_id}")]
    Conflict { fund_id: String },
    #[error("username already taken: {username}")]
    UsernameTaken { username: String },
    #[error("storage unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),
}

impl SavedFundsError {
    pub fn duplicate_fund(fund_id: &str) -> Self {
        SavedFundsError::Conflict {
            fund_id: fund_id.to_string(),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, SavedFundsError::Conflict { .. })
    }
}

impl From<anyhow::Error> for SavedFundsError {
    fn from(err: anyhow::Error) -> Self {
        SavedFundsError::Unavailable(err)
    }
}

impl From<serde_json::Error> for SavedFundsError {
    fn from(err: serde_json::Error) -> Self {
        SavedFundsError::Unavailable(err.into())
    }
}

pub type Result<T, E = SavedFundsError> = std::result::Result<T, E>;
