use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{StoreError, SubscriptionStore};
use crate::models::subscription::{NewSubscription, SubscriptionRecord};
use crate::models::user::UserAccount;

/// `SubscriptionStore` backed by Postgres.
///
/// Concurrent writes to the same id are serialized by Postgres row locks;
/// the last write wins.
#[derive(Clone)]
pub struct PgSubscriptionStore {
    pool: PgPool,
}

impl PgSubscriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionStore for PgSubscriptionStore {
    async fn upsert_subscription(&self, record: &NewSubscription) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (id, user_id, status, price_id, current_period_end)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                user_id = EXCLUDED.user_id,
                status = EXCLUDED.status,
                price_id = EXCLUDED.price_id,
                current_period_end = EXCLUDED.current_period_end
            "#,
        )
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(&record.status)
        .bind(&record.price_id)
        .bind(record.current_period_end)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                StoreError::UnknownUser(record.user_id.clone())
            }
            _ => StoreError::Database(e),
        })?;

        Ok(())
    }

    async fn update_subscription_state(
        &self,
        id: &str,
        status: &str,
        current_period_end: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE subscriptions SET status = $2, current_period_end = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .bind(current_period_end)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_subscription_for_user(
        &self,
        user_id: &str,
    ) -> Result<Option<SubscriptionRecord>, StoreError> {
        let record = sqlx::query_as::<_, SubscriptionRecord>(
            r#"
            SELECT id, user_id, status, price_id, current_period_end, created_at
            FROM subscriptions
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn find_user(&self, id: &str) -> Result<Option<UserAccount>, StoreError> {
        let user = sqlx::query_as::<_, UserAccount>(
            "SELECT id, email, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn ensure_user(&self, id: &str, email: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET
                email = EXCLUDED.email,
                updated_at = NOW()
            WHERE users.email IS DISTINCT FROM EXCLUDED.email
            "#,
        )
        .bind(id)
        .bind(email)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
