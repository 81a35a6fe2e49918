use crate::core::error::{Result, SavedFundsError};
use crate::core::identity::IdentityProvider;
use crate::core::saved::{SavedFund, UserId};
use crate::store::SavedFundsStore;
use std::sync::Arc;
use tracing::debug;

/// Input of the add operation, as sent by a client.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveFundRequest {
    pub fund_id: String,
    pub scheme_name: String,
    pub scheme_code: String,
}

/// Authenticated entry point to the saved funds store. Every call carries
/// the caller's credential; nothing is read from ambient session state.
pub struct SavedFundsService {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<SavedFundsStore>,
}

impl SavedFundsService {
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<SavedFundsStore>) -> Self {
        Self { identity, store }
    }

    pub async fn add(
        &self,
        credential: Option<&str>,
        request: &SaveFundRequest,
    ) -> Result<SavedFund> {
        let user_id = self.authenticate(credential).await?;
        self.store
            .add(
                &user_id,
                &request.fund_id,
                &request.scheme_name,
                &request.scheme_code,
            )
            .await
    }

    pub async fn list(&self, credential: Option<&str>) -> Result<Vec<SavedFund>> {
        let user_id = self.authenticate(credential).await?;
        self.store.list(&user_id).await
    }

    pub async fn remove(&self, credential: Option<&str>, fund_id: &str) -> Result<()> {
        let user_id = self.authenticate(credential).await?;
        self.store.remove(&user_id, fund_id).await
    }

    async fn authenticate(&self, credential: Option<&str>) -> Result<UserId> {
        let Some(credential) = credential else {
            debug!("No credential presented");
            return Err(SavedFundsError::Unauthenticated);
        };
        self.identity
            .verify(credential)
            .await?
            .ok_or(SavedFundsError::Unauthenticated)
    }
}
