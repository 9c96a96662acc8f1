//! In-memory `SubscriptionStore` for handler and projector tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{StoreError, SubscriptionStore};
use crate::models::subscription::{NewSubscription, SubscriptionRecord};
use crate::models::user::UserAccount;

#[derive(Default)]
pub struct MemoryStore {
    subscriptions: Mutex<HashMap<String, SubscriptionRecord>>,
    users: Mutex<HashMap<String, UserAccount>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail as if the pool timed out.
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn insert(&self, record: SubscriptionRecord) {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(record.id.clone(), record);
    }

    pub fn insert_user(&self, user: UserAccount) {
        self.users.lock().unwrap().insert(user.id.clone(), user);
    }

    pub fn user(&self, id: &str) -> Option<UserAccount> {
        self.users.lock().unwrap().get(id).cloned()
    }

    pub fn get(&self, id: &str) -> Option<SubscriptionRecord> {
        self.subscriptions.lock().unwrap().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.subscriptions.lock().unwrap().len()
    }

    /// Number of write calls that reached the store, successful or not.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn begin_write(&self) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn upsert_subscription(&self, record: &NewSubscription) -> Result<(), StoreError> {
        self.begin_write()?;
        if !self.users.lock().unwrap().contains_key(&record.user_id) {
            return Err(StoreError::UnknownUser(record.user_id.clone()));
        }
        let mut rows = self.subscriptions.lock().unwrap();
        let created_at = rows
            .get(&record.id)
            .map(|existing| existing.created_at)
            .unwrap_or_else(Utc::now);
        rows.insert(
            record.id.clone(),
            SubscriptionRecord {
                id: record.id.clone(),
                user_id: record.user_id.clone(),
                status: record.status.clone(),
                price_id: record.price_id.clone(),
                current_period_end: record.current_period_end,
                created_at,
            },
        );
        Ok(())
    }

    async fn update_subscription_state(
        &self,
        id: &str,
        status: &str,
        current_period_end: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.begin_write()?;
        let mut rows = self.subscriptions.lock().unwrap();
        match rows.get_mut(id) {
            Some(row) => {
                row.status = status.to_string();
                row.current_period_end = current_period_end;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_subscription_for_user(
        &self,
        user_id: &str,
    ) -> Result<Option<SubscriptionRecord>, StoreError> {
        let rows = self.subscriptions.lock().unwrap();
        Ok(rows
            .values()
            .filter(|row| row.user_id == user_id)
            .max_by_key(|row| row.created_at)
            .cloned())
    }

    async fn find_user(&self, id: &str) -> Result<Option<UserAccount>, StoreError> {
        Ok(self.users.lock().unwrap().get(id).cloned())
    }

    async fn ensure_user(&self, id: &str, email: &str) -> Result<(), StoreError> {
        self.begin_write()?;
        let now = Utc::now();
        let mut users = self.users.lock().unwrap();
        let user = users.entry(id.to_string()).or_insert_with(|| UserAccount {
            id: id.to_string(),
            email: email.to_string(),
            created_at: now,
            updated_at: now,
        });
        if user.email != email {
            user.email = email.to_string();
            user.updated_at = now;
        }
        Ok(())
    }
}
