use super::{CREDENTIALS, USERNAMES, USERS};
use crate::core::cache::{KeyValueCollection, Store};
use crate::core::error::{Result, SavedFundsError};
use crate::core::identity::IdentityProvider;
use crate::core::saved::{UserId, UserRecord};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// A freshly registered user and the bearer token issued for it.
#[derive(Debug, Clone)]
pub struct Registration {
    pub user: UserRecord,
    pub token: String,
}

/// Creates users and issues their credentials.
pub struct UserDirectory {
    users: Arc<dyn KeyValueCollection>,
    usernames: Arc<dyn KeyValueCollection>,
    credentials: Arc<dyn KeyValueCollection>,
    register_lock: Mutex<()>,
}

impl UserDirectory {
    pub fn new(store: &dyn Store) -> anyhow::Result<Self> {
        Ok(Self {
            users: store.get_collection(USERS)?,
            usernames: store.get_collection(USERNAMES)?,
            credentials: store.get_collection(CREDENTIALS)?,
            register_lock: Mutex::new(()),
        })
    }

    /// Registers a user and issues its token. The username is claimed
    /// last; if any write fails, the earlier ones are undone.
    pub async fn register(&self, username: &str) -> Result<Registration> {
        let username = username.trim();
        let _guard = self.register_lock.lock().await;

        if self.usernames.contains(username.as_bytes()).await? {
            return Err(SavedFundsError::UsernameTaken {
                username: username.to_string(),
            });
        }

        let user = UserRecord::new(username);
        let token = uuid::Uuid::new_v4().simple().to_string();

        if let Err(err) = self.write_registration(&user, &token).await {
            warn!(username, error = %err, "Registration failed, rolling back");
            self.rollback(&user, &token).await;
            return Err(err);
        }

        info!(user_id = %user.id, username, "Registered user");
        Ok(Registration { user, token })
    }

    async fn write_registration(&self, user: &UserRecord, token: &str) -> Result<()> {
        let id = user.id.as_str().as_bytes();
        self.users.put(id, &serde_json::to_vec(user)?).await?;
        self.credentials.put(token.as_bytes(), id).await?;
        self.usernames.put(user.username.as_bytes(), id).await?;
        Ok(())
    }

    async fn rollback(&self, user: &UserRecord, token: &str) {
        let undo = [
            (&self.usernames, user.username.as_bytes()),
            (&self.credentials, token.as_bytes()),
            (&self.users, user.id.as_str().as_bytes()),
        ];
        for (collection, key) in undo {
            if let Err(e) = collection.remove(key).await {
                warn!(user_id = %user.id, error = %e, "Failed to undo registration write");
            }
        }
    }

    pub async fn find(&self, user_id: &UserId) -> Result<Option<UserRecord>> {
        match self.users.get(user_id.as_str().as_bytes()).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Identity provider backed by the tokens this directory issued.
    pub fn identity(&self) -> TokenIdentity {
        TokenIdentity {
            credentials: Arc::clone(&self.credentials),
        }
    }
}

pub struct TokenIdentity {
    credentials: Arc<dyn KeyValueCollection>,
}

#[async_trait]
impl IdentityProvider for TokenIdentity {
    async fn verify(&self, credential: &str) -> anyhow::Result<Option<UserId>> {
        let token = credential.trim();
        if token.is_empty() {
            return Ok(None);
        }
        let user_id = self
            .credentials
            .get(token.as_bytes())
            .await?
            .map(|bytes| String::from_utf8(bytes).map(UserId::from))
            .transpose()?;
        debug!(found = user_id.is_some(), "Verified credential");
        Ok(user_id)
    }
}
