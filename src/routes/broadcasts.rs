use std::collections::HashMap;
use std::sync::Arc;

use actix_web::{web, HttpResponse, ResponseError};
use chrono::Utc;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, PgPool, Row};
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::config::BroadcastSettings;
use crate::domain::article_summary::ArticleSummary;
use crate::domain::send::Send;
use crate::domain::subscriber_email::SubscriberEmail;
use crate::email_client::EmailClient;
use crate::startup::ApplicationBaseUrl;
use crate::templates::{NewsletterTemplate, TemplateContext, DEFAULT_TITLE};

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastBody {
    pub article_ids: Vec<i64>,
    #[serde(default = "default_template_id")]
    pub template: String,
    pub custom_title: Option<String>,
}

fn default_template_id() -> String {
    String::from("default")
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastOutcome {
    pub send_id: Uuid,
    pub successful: u64,
    pub failed: u64,
}

/// One row of the subscriber snapshot taken when the broadcast starts.
/// Subscribers added or deactivated afterwards do not affect this run.
struct ActiveSubscriber {
    id: Uuid,
    email: String,
}

#[tracing::instrument(
    name = "Broadcasting a newsletter to all active subscribers",
    skip(body, db_pool, email_client, base_url, broadcast_settings),
    fields(
        article_ids = ?body.article_ids,
        template = %body.template
    )
)]
pub async fn handle_broadcast(
    body: web::Json<BroadcastBody>,
    db_pool: web::Data<PgPool>,
    email_client: web::Data<EmailClient>,
    base_url: web::Data<ApplicationBaseUrl>,
    broadcast_settings: web::Data<BroadcastSettings>,
) -> Result<HttpResponse, BroadcastError> {
    if body.article_ids.is_empty() {
        return Err(BroadcastError::InvalidRequest);
    }

    let subscribers = get_active_subscribers(&db_pool).await?;

    if subscribers.is_empty() {
        return Err(BroadcastError::NoRecipients);
    }

    let articles = get_article_summaries(&db_pool, &body.article_ids).await?;

    if articles.is_empty() {
        return Err(BroadcastError::NoArticlesFound);
    }

    // The ledger records that a broadcast was attempted, not that it
    // succeeded. From here on the handler always answers with counts.
    let send = insert_send(&db_pool, articles.len(), subscribers.len()).await?;
    let template = NewsletterTemplate::resolve(&body.template);
    let subject = body
        .custom_title
        .clone()
        .unwrap_or_else(|| String::from(DEFAULT_TITLE));

    let (successful, failed) = dispatch_to_subscribers(
        subscribers,
        articles,
        template,
        subject,
        body.custom_title.clone(),
        send.id,
        base_url.get_ref().0.clone(),
        email_client,
        broadcast_settings.max_concurrent_sends,
    )
    .await;

    Ok(HttpResponse::Ok().json(BroadcastOutcome {
        send_id: send.id,
        successful,
        failed,
    }))
}

#[allow(clippy::too_many_arguments)]
#[tracing::instrument(
    name = "Draining the per-recipient worker pool",
    skip_all,
    fields(
        send_id = %send_id,
        recipients = subscribers.len()
    )
)]
async fn dispatch_to_subscribers(
    subscribers: Vec<ActiveSubscriber>,
    articles: Vec<ArticleSummary>,
    template: NewsletterTemplate,
    subject: String,
    custom_title: Option<String>,
    send_id: Uuid,
    base_url: String,
    email_client: web::Data<EmailClient>,
    max_concurrent_sends: usize,
) -> (u64, u64) {
    let articles = Arc::new(articles);
    let subject = Arc::new(subject);
    let custom_title = Arc::new(custom_title);
    let base_url = Arc::new(base_url);
    // Mail providers throttle aggressively, so recipients are drained
    // through a fixed-size pool instead of fanned out all at once. One
    // permit per in-flight transport call.
    let semaphore = Arc::new(Semaphore::new(max_concurrent_sends.max(1)));
    let mut handles = Vec::with_capacity(subscribers.len());

    for subscriber in subscribers {
        let permit = semaphore.clone().acquire_owned().await.unwrap();
        let email_client = email_client.clone();
        let articles = articles.clone();
        let subject = subject.clone();
        let custom_title = custom_title.clone();
        let base_url = base_url.clone();

        handles.push(tokio::spawn(async move {
            let _permit = permit;

            deliver_to_subscriber(
                &email_client,
                &subscriber,
                &articles,
                template,
                custom_title.as_deref(),
                &subject,
                send_id,
                &base_url,
            )
            .await
        }));
    }

    let mut successful: u64 = 0;
    let mut failed: u64 = 0;

    // Every handle is awaited so that successful + failed equals the
    // snapshot size exactly. A panicked task counts as a failed recipient.
    for handle in handles {
        match handle.await {
            Ok(Ok(())) => successful += 1,
            Ok(Err(_)) => failed += 1,
            Err(join_error) => {
                tracing::error!("Delivery task panicked: {:?}", join_error);
                failed += 1;
            }
        }
    }

    (successful, failed)
}

#[derive(thiserror::Error, Debug)]
enum DeliveryError {
    #[error("{0}")]
    InvalidRecipient(String),
    #[error("Transport rejected the email.")]
    Transport(#[source] reqwest::Error),
}

/// Renders the personalized document for one recipient and hands it to the
/// transport. Failures are reported to the pool, never propagated further.
#[allow(clippy::too_many_arguments)]
async fn deliver_to_subscriber(
    email_client: &EmailClient,
    subscriber: &ActiveSubscriber,
    articles: &[ArticleSummary],
    template: NewsletterTemplate,
    custom_title: Option<&str>,
    subject: &str,
    send_id: Uuid,
    base_url: &str,
) -> Result<(), DeliveryError> {
    let recipient = match SubscriberEmail::parse(subscriber.email.clone()) {
        Ok(email) => email,
        Err(err) => {
            tracing::warn!("Skipping undeliverable subscriber {}: {}", subscriber.id, err);
            return Err(DeliveryError::InvalidRecipient(err));
        }
    };
    let context = TemplateContext {
        articles,
        recipient_email: recipient.as_ref(),
        recipient_id: subscriber.id,
        send_id,
        custom_title,
        base_url,
    };
    let html = template.render(&context);

    email_client
        .send_email(recipient.clone(), subject, &html)
        .await
        .map_err(|err| {
            tracing::warn!(
                "Failed to deliver newsletter to {}: {:?}",
                recipient.as_ref(),
                err
            );
            DeliveryError::Transport(err)
        })
}

#[tracing::instrument(name = "Fetch the active subscriber snapshot", skip(db_pool))]
async fn get_active_subscribers(db_pool: &PgPool) -> Result<Vec<ActiveSubscriber>, sqlx::Error> {
    sqlx::query(
        r#"
        SELECT id, email
        FROM subscribers
        WHERE active = TRUE
        "#,
    )
    .map(|row: PgRow| ActiveSubscriber {
        id: row.get("id"),
        email: row.get("email"),
    })
    .fetch_all(db_pool)
    .await
}

#[tracing::instrument(name = "Fetch the requested article summaries", skip(db_pool))]
async fn get_article_summaries(
    db_pool: &PgPool,
    article_ids: &[i64],
) -> Result<Vec<ArticleSummary>, sqlx::Error> {
    let articles = sqlx::query(
        r#"
        SELECT id, title, excerpt, image, category, created_at
        FROM articles
        WHERE id = ANY($1)
        "#,
    )
    .bind(article_ids.to_vec())
    .map(|row: PgRow| ArticleSummary {
        id: row.get("id"),
        title: row.get("title"),
        excerpt: row.get("excerpt"),
        image: row.get("image"),
        category: row.get("category"),
        created_at: row.get("created_at"),
    })
    .fetch_all(db_pool)
    .await?;

    // The operator chose the ordering; the database does not preserve it.
    // Ids that resolved nothing are skipped, duplicates collapse to the
    // first occurrence.
    let mut articles_by_id: HashMap<i64, ArticleSummary> = articles
        .into_iter()
        .map(|article| (article.id, article))
        .collect();

    Ok(article_ids
        .iter()
        .filter_map(|id| articles_by_id.remove(id))
        .collect())
}

#[tracing::instrument(name = "Insert a send ledger entry", skip(db_pool))]
async fn insert_send(
    db_pool: &PgPool,
    article_count: usize,
    subscriber_count: usize,
) -> Result<Send, sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO sends (id, sent_at, article_count, subscriber_count)
        VALUES ($1, $2, $3, $4)
        RETURNING id, sent_at, article_count, subscriber_count
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(Utc::now())
    .bind(article_count as i32)
    .bind(subscriber_count as i32)
    .map(|row: PgRow| Send {
        id: row.get("id"),
        sent_at: row.get("sent_at"),
        article_count: row.get("article_count"),
        subscriber_count: row.get("subscriber_count"),
    })
    .fetch_one(db_pool)
    .await
}

#[derive(thiserror::Error)]
pub enum BroadcastError {
    #[error("articleIds must contain at least one article id.")]
    InvalidRequest,
    #[error("There are no active subscribers to broadcast to.")]
    NoRecipients,
    #[error("None of the requested articles exist.")]
    NoArticlesFound,
    #[error("Failed to prepare the broadcast.")]
    DatabaseError(#[from] sqlx::Error),
}

impl std::fmt::Debug for BroadcastError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Caused by:\n\t({})", self)
    }
}

impl ResponseError for BroadcastError {
    fn status_code(&self) -> StatusCode {
        match self {
            BroadcastError::InvalidRequest => StatusCode::BAD_REQUEST,
            BroadcastError::NoRecipients => StatusCode::CONFLICT,
            BroadcastError::NoArticlesFound => StatusCode::NOT_FOUND,
            BroadcastError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
