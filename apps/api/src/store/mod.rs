//! Relational store boundary for the `subscriptions` and `users` tables.

#[cfg(test)]
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::subscription::{NewSubscription, SubscriptionRecord};
use crate::models::user::UserAccount;

pub use postgres::PgSubscriptionStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store call timed out after {0:?}")]
    TimedOut(std::time::Duration),

    /// A subscription referenced a user id with no `users` row.
    #[error("No user row for id '{0}'")]
    UnknownUser(String),
}

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Insert-or-replace keyed on the subscription id. Fails with
    /// [`StoreError::UnknownUser`] when `record.user_id` has no `users` row.
    async fn upsert_subscription(&self, record: &NewSubscription) -> Result<(), StoreError>;

    /// Sets `status` and `current_period_end` on the row with `id`.
    /// Returns `false` when no row matched; nothing is inserted in that case.
    async fn update_subscription_state(
        &self,
        id: &str,
        status: &str,
        current_period_end: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Latest subscription owned by a user, if any.
    async fn find_subscription_for_user(
        &self,
        user_id: &str,
    ) -> Result<Option<SubscriptionRecord>, StoreError>;

    async fn find_user(&self, id: &str) -> Result<Option<UserAccount>, StoreError>;

    /// Mirrors an identity-provider account into `users`, refreshing the
    /// email when the row already exists.
    async fn ensure_user(&self, id: &str, email: &str) -> Result<(), StoreError>;
}
