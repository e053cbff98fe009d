use chrono::{DateTime, Utc};

/// Read-only projection of an article, just enough to render a digest entry.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ArticleSummary {
    pub id: i64,
    pub title: String,
    pub excerpt: String,
    pub image: Option<String>,
    pub category: String,
    pub created_at: DateTime<Utc>,
}
