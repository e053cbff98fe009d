use actix_web::{web, HttpResponse, ResponseError};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, PgPool, Row};

use crate::domain::send::Send;

const DEFAULT_LIMIT: i64 = 10;

#[derive(Deserialize, Debug)]
pub struct StatsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SendStats {
    pub send: Send,
    pub unique_opens: i64,
    pub open_rate_percent: f64,
}

#[tracing::instrument(
    name = "Listing recent sends with open rates",
    skip(db_pool),
    fields(limit = %query.limit)
)]
pub async fn handle_list_send_stats(
    query: web::Query<StatsQuery>,
    db_pool: web::Data<PgPool>,
) -> Result<HttpResponse, SendStatsError> {
    let stats = get_recent_send_stats(&db_pool, query.limit.max(0)).await?;

    Ok(HttpResponse::Ok().json(stats))
}

async fn get_recent_send_stats(
    db_pool: &PgPool,
    limit: i64,
) -> Result<Vec<SendStats>, sqlx::Error> {
    sqlx::query(
        r#"
        SELECT s.id, s.sent_at, s.article_count, s.subscriber_count,
               COUNT(DISTINCT o.subscriber_id) AS unique_opens
        FROM sends s
        LEFT JOIN opens o ON o.send_id = s.id
        GROUP BY s.id
        ORDER BY s.sent_at DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .map(|row: PgRow| {
        let send = Send {
            id: row.get("id"),
            sent_at: row.get("sent_at"),
            article_count: row.get("article_count"),
            subscriber_count: row.get("subscriber_count"),
        };
        let unique_opens: i64 = row.get("unique_opens");

        SendStats {
            open_rate_percent: open_rate_percent(unique_opens, send.subscriber_count),
            unique_opens,
            send,
        }
    })
    .fetch_all(db_pool)
    .await
}

/// Open rate against the send's snapshot denominator, rounded to one
/// decimal. A zero-subscriber send rates 0 instead of dividing by zero.
fn open_rate_percent(unique_opens: i64, subscriber_count: i32) -> f64 {
    if subscriber_count <= 0 {
        return 0.0;
    }

    (unique_opens as f64 / subscriber_count as f64 * 1000.0).round() / 10.0
}

#[derive(thiserror::Error)]
pub enum SendStatsError {
    #[error("Failed to read the send ledger.")]
    DatabaseError(#[from] sqlx::Error),
}

impl std::fmt::Debug for SendStatsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Caused by:\n\t({})", self)
    }
}

impl ResponseError for SendStatsError {
    fn status_code(&self) -> StatusCode {
        match self {
            SendStatsError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
