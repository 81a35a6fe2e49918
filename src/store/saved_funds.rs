use super::USERS;
use crate::core::cache::{KeyValueCollection, Store};
use crate::core::error::{Result, SavedFundsError};
use crate::core::saved::{SavedFund, UserId, UserRecord};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

/// Per-user saved fund lists, stored as a field of the user record.
///
/// The backing collection only guarantees atomic writes of a single key, so
/// every read-modify-write of a user record runs under that user's lock.
/// Locks of different users are independent.
pub struct SavedFundsStore {
    users: Arc<dyn KeyValueCollection>,
    locks: Mutex<HashMap<UserId, Arc<AsyncMutex<()>>>>,
}

impl SavedFundsStore {
    pub fn new(store: &dyn Store) -> anyhow::Result<Self> {
        Ok(Self::with_collection(store.get_collection(USERS)?))
    }

    pub fn with_collection(users: Arc<dyn KeyValueCollection>) -> Self {
        Self {
            users,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Appends a fund to the user's list. Fails with `Conflict` when the
    /// `fund_id` is already saved; the list is left untouched in that case.
    pub async fn add(
        &self,
        user_id: &UserId,
        fund_id: &str,
        scheme_name: &str,
        scheme_code: &str,
    ) -> Result<SavedFund> {
        let _guard = self.lock_user(user_id).await?;
        let mut record = self.load(user_id).await?;

        if record.has_fund(fund_id) {
            debug!(%user_id, fund_id, "Fund already saved");
            return Err(SavedFundsError::duplicate_fund(fund_id));
        }

        let fund = SavedFund::new(fund_id, scheme_name, scheme_code);
        record.saved_funds.push(fund.clone());
        self.save(&record).await?;

        debug!(%user_id, fund_id, count = record.saved_funds.len(), "Saved fund");
        Ok(fund)
    }

    /// The user's saved funds in insertion order.
    pub async fn list(&self, user_id: &UserId) -> Result<Vec<SavedFund>> {
        let record = self.load(user_id).await?;
        Ok(record.saved_funds)
    }

    /// Removes the fund if present. Removing an unsaved fund succeeds.
    pub async fn remove(&self, user_id: &UserId, fund_id: &str) -> Result<()> {
        let _guard = self.lock_user(user_id).await?;
        let mut record = self.load(user_id).await?;

        let before = record.saved_funds.len();
        record.saved_funds.retain(|f| f.fund_id != fund_id);
        if record.saved_funds.len() == before {
            debug!(%user_id, fund_id, "Fund not saved, nothing to remove");
            return Ok(());
        }

        self.save(&record).await?;
        debug!(%user_id, fund_id, "Removed fund");
        Ok(())
    }

    async fn lock_user(&self, user_id: &UserId) -> Result<UserGuard<'_>> {
        let lock = {
            let mut locks = self.lock_table()?;
            Arc::clone(locks.entry(user_id.clone()).or_default())
        };
        let guard = lock.lock_owned().await;
        Ok(UserGuard {
            guard: Some(guard),
            user_id: user_id.clone(),
            locks: &self.locks,
        })
    }

    fn lock_table(&self) -> Result<MutexGuard<'_, HashMap<UserId, Arc<AsyncMutex<()>>>>> {
        self.locks.lock().map_err(|_| {
            SavedFundsError::Unavailable(anyhow::anyhow!("User lock table poisoned"))
        })
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or_default()
    }

    async fn load(&self, user_id: &UserId) -> Result<UserRecord> {
        let bytes = self
            .users
            .get(user_id.as_str().as_bytes())
            .await?
            .ok_or(SavedFundsError::NotFound)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn save(&self, record: &UserRecord) -> Result<()> {
        self.users
            .put(record.id.as_str().as_bytes(), &serde_json::to_vec(record)?)
            .await?;
        Ok(())
    }
}

/// Holds a user's lock. On release the table entry is dropped once no other
/// caller holds or waits for it.
struct UserGuard<'a> {
    guard: Option<OwnedMutexGuard<()>>,
    user_id: UserId,
    locks: &'a Mutex<HashMap<UserId, Arc<AsyncMutex<()>>>>,
}

impl Drop for UserGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let Ok(mut locks) = self.locks.lock() else {
            return;
        };
        let idle = locks
            .get(&self.user_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if idle {
            locks.remove(&self.user_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryCollection;
    use anyhow::anyhow;
    use async_trait::async_trait;

    async fn store_with_user(username: &str) -> (SavedFundsStore, UserId) {
        let users = Arc::new(MemoryCollection::new());
        let record = UserRecord::new(username);
        users
            .put(
                record.id.as_str().as_bytes(),
                &serde_json::to_vec(&record).unwrap(),
            )
            .await
            .unwrap();
        (SavedFundsStore::with_collection(users), record.id)
    }

    fn fund_ids(funds: &[SavedFund]) -> Vec<&str> {
        funds.iter().map(|f| f.fund_id.as_str()).collect()
    }

    #[tokio::test]
    async fn add_returns_entry_and_list_contains_it() {
        let (store, u1) = store_with_user("u1").await;

        let fund = store
            .add(&u1, "SC100", "Axis Bluechip Fund", "SC100")
            .await
            .unwrap();
        assert_eq!(fund, SavedFund::new("SC100", "Axis Bluechip Fund", "SC100"));

        let funds = store.list(&u1).await.unwrap();
        assert_eq!(funds, vec![fund]);
    }

    #[tokio::test]
    async fn duplicate_add_conflicts_and_leaves_list_unchanged() {
        let (store, u1) = store_with_user("u1").await;
        store
            .add(&u1, "SC100", "Axis Bluechip Fund", "SC100")
            .await
            .unwrap();

        let err = store
            .add(&u1, "SC100", "Renamed Fund", "SC999")
            .await
            .unwrap_err();
        assert!(matches!(err, SavedFundsError::Conflict { .. }));

        let funds = store.list(&u1).await.unwrap();
        assert_eq!(funds.len(), 1);
        assert_eq!(funds[0].scheme_name, "Axis Bluechip Fund");
        assert_eq!(funds[0].scheme_code, "SC100");
    }

    #[tokio::test]
    async fn list_of_new_user_is_empty() {
        let (store, u1) = store_with_user("u1").await;
        assert!(store.list(&u1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let (store, u1) = store_with_user("u1").await;
        store.add(&u1, "SC100", "Axis Bluechip Fund", "SC100").await.unwrap();

        store.remove(&u1, "SC100").await.unwrap();
        store.remove(&u1, "SC100").await.unwrap();

        assert!(store.list(&u1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_of_unsaved_fund_is_noop() {
        let (store, u1) = store_with_user("u1").await;
        store.add(&u1, "SC100", "Axis Bluechip Fund", "SC100").await.unwrap();

        store.remove(&u1, "SC999").await.unwrap();

        assert_eq!(fund_ids(&store.list(&u1).await.unwrap()), vec!["SC100"]);
    }

    #[tokio::test]
    async fn readding_places_fund_at_the_end() {
        let (store, u1) = store_with_user("u1").await;
        store.add(&u1, "A", "Fund A", "A").await.unwrap();
        store.add(&u1, "B", "Fund B", "B").await.unwrap();
        store.add(&u1, "C", "Fund C", "C").await.unwrap();
        assert_eq!(fund_ids(&store.list(&u1).await.unwrap()), vec!["A", "B", "C"]);

        store.remove(&u1, "A").await.unwrap();
        assert_eq!(fund_ids(&store.list(&u1).await.unwrap()), vec!["B", "C"]);

        store.add(&u1, "A", "Fund A", "A").await.unwrap();
        assert_eq!(fund_ids(&store.list(&u1).await.unwrap()), vec!["B", "C", "A"]);
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let (store, _) = store_with_user("u1").await;
        let ghost = UserId::from("ghost");

        assert!(matches!(
            store.add(&ghost, "SC100", "Fund", "SC100").await,
            Err(SavedFundsError::NotFound)
        ));
        assert!(matches!(
            store.list(&ghost).await,
            Err(SavedFundsError::NotFound)
        ));
        assert!(matches!(
            store.remove(&ghost, "SC100").await,
            Err(SavedFundsError::NotFound)
        ));
    }

    #[tokio::test]
    async fn users_do_not_share_lists() {
        let users = Arc::new(MemoryCollection::new());
        let store = SavedFundsStore::with_collection(users.clone());
        let mut ids = Vec::new();
        for name in ["u1", "u2"] {
            let record = UserRecord::new(name);
            users
                .put(
                    record.id.as_str().as_bytes(),
                    &serde_json::to_vec(&record).unwrap(),
                )
                .await
                .unwrap();
            ids.push(record.id);
        }

        store.add(&ids[0], "SC100", "Fund", "SC100").await.unwrap();
        store.add(&ids[1], "SC100", "Fund", "SC100").await.unwrap();
        store.remove(&ids[0], "SC100").await.unwrap();

        assert!(store.list(&ids[0]).await.unwrap().is_empty());
        assert_eq!(fund_ids(&store.list(&ids[1]).await.unwrap()), vec!["SC100"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_duplicate_adds_yield_one_success() {
        let (store, u1) = store_with_user("u1").await;
        let store = Arc::new(store);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                let u1 = u1.clone();
                tokio::spawn(async move { store.add(&u1, "SC100", "Fund", "SC100").await })
            })
            .collect();

        let mut successes = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(e) if e.is_conflict() => conflicts += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(conflicts, 15);
        assert_eq!(store.list(&u1).await.unwrap().len(), 1);
    }

    struct FailingCollection;

    #[async_trait]
    impl KeyValueCollection for FailingCollection {
        async fn get(&self, _key: &[u8]) -> anyhow::Result<Option<Vec<u8>>> {
            Err(anyhow!("disk on fire"))
        }

        async fn put(&self, _key: &[u8], _value: &[u8]) -> anyhow::Result<()> {
            Err(anyhow!("disk on fire"))
        }

        async fn remove(&self, _key: &[u8]) -> anyhow::Result<()> {
            Err(anyhow!("disk on fire"))
        }
    }

    /// Reads succeed, writes fail.
    #[derive(Default)]
    struct ReadOnlyCollection {
        inner: MemoryCollection,
    }

    #[async_trait]
    impl KeyValueCollection for ReadOnlyCollection {
        async fn get(&self, key: &[u8]) -> anyhow::Result<Option<Vec<u8>>> {
            self.inner.get(key).await
        }

        async fn put(&self, _key: &[u8], _value: &[u8]) -> anyhow::Result<()> {
            Err(anyhow!("disk full"))
        }

        async fn remove(&self, _key: &[u8]) -> anyhow::Result<()> {
            Err(anyhow!("disk full"))
        }
    }

    #[tokio::test]
    async fn storage_failure_is_unavailable() {
        let store = SavedFundsStore::with_collection(Arc::new(FailingCollection));
        let u1 = UserId::from("u1");

        assert!(matches!(
            store.list(&u1).await,
            Err(SavedFundsError::Unavailable(_))
        ));
        assert!(matches!(
            store.add(&u1, "SC100", "Fund", "SC100").await,
            Err(SavedFundsError::Unavailable(_))
        ));
        assert!(matches!(
            store.remove(&u1, "SC100").await,
            Err(SavedFundsError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn failed_write_leaves_record_untouched() {
        let users = Arc::new(ReadOnlyCollection::default());
        let mut record = UserRecord::new("u1");
        record
            .saved_funds
            .push(SavedFund::new("SC100", "Axis Bluechip Fund", "SC100"));
        let stored = serde_json::to_vec(&record).unwrap();
        users
            .inner
            .put(record.id.as_str().as_bytes(), &stored)
            .await
            .unwrap();
        let store = SavedFundsStore::with_collection(users.clone());

        assert!(matches!(
            store.add(&record.id, "SC200", "Axis Small Cap Fund", "SC200").await,
            Err(SavedFundsError::Unavailable(_))
        ));
        assert!(matches!(
            store.remove(&record.id, "SC100").await,
            Err(SavedFundsError::Unavailable(_))
        ));

        assert_eq!(
            fund_ids(&store.list(&record.id).await.unwrap()),
            vec!["SC100"]
        );
        assert_eq!(
            users.get(record.id.as_str().as_bytes()).await.unwrap(),
            Some(stored)
        );
    }

    #[tokio::test]
    async fn lock_table_does_not_grow() {
        let (store, u1) = store_with_user("u1").await;

        for i in 0..10 {
            let ghost = UserId::from(format!("ghost-{i}"));
            assert!(store.add(&ghost, "SC100", "Fund", "SC100").await.is_err());
            assert!(store.remove(&ghost, "SC100").await.is_err());
        }
        store.add(&u1, "SC100", "Fund", "SC100").await.unwrap();
        store.remove(&u1, "SC100").await.unwrap();

        assert_eq!(store.tracked_locks(), 0);
    }
}
