//! Identity abstractions

use super::saved::UserId;
use anyhow::Result;
use async_trait::async_trait;

/// Resolves a caller's credential to a verified user.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` means the credential is not recognised.
    async fn verify(&self, credential: &str) -> Result<Option<UserId>>;
}
