use chrono::{DateTime, Utc};
use uuid::Uuid;

/// One row of the append-only send ledger.
///
/// `subscriber_count` is the size of the recipient snapshot taken when the
/// broadcast started. It is immutable history: later unsubscribes never
/// change a past send's denominator.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Send {
    pub id: Uuid,
    pub sent_at: DateTime<Utc>,
    pub article_count: i32,
    pub subscriber_count: i32,
}
