use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use sqlx::FromRow;

/// A row of the `subscriptions` table.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct SubscriptionRecord {
    pub id: String,
    pub user_id: String,
    pub status: String,
    pub price_id: String,
    #[serde(serialize_with = "iso_millis")]
    pub current_period_end: DateTime<Utc>,
    #[serde(serialize_with = "iso_millis")]
    pub created_at: DateTime<Utc>,
}

/// Full row written by a completed checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubscription {
    pub id: String,
    pub user_id: String,
    pub status: String,
    pub price_id: String,
    pub current_period_end: DateTime<Utc>,
}

/// Converts processor epoch seconds into a UTC timestamp.
/// Returns `None` for values outside chrono's representable range.
pub fn from_epoch_seconds(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(secs, 0)
}

/// Renders timestamps as `2023-11-14T22:13:20.000Z`.
pub fn to_iso_millis(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn iso_millis<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&to_iso_millis(ts))
}
