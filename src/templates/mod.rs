mod classic;
mod compact;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::article_summary::ArticleSummary;

/// Title block used when the operator does not provide a custom one.
pub const DEFAULT_TITLE: &str = "New articles from the blog";

/// Everything a template needs to produce one recipient's email.
///
/// The only per-recipient variance in a broadcast is the tracking pixel URL,
/// which encodes `(recipient_id, send_id)`, and the unsubscribe link.
pub struct TemplateContext<'a> {
    pub articles: &'a [ArticleSummary],
    pub recipient_email: &'a str,
    pub recipient_id: Uuid,
    pub send_id: Uuid,
    pub custom_title: Option<&'a str>,
    pub base_url: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewsletterTemplate {
    Classic,
    Compact,
}

#[derive(Debug, serde::Serialize)]
pub struct TemplateDescription {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

impl NewsletterTemplate {
    pub fn all() -> [NewsletterTemplate; 2] {
        [NewsletterTemplate::Classic, NewsletterTemplate::Compact]
    }

    /// Unknown ids fall back to the default template instead of erroring.
    pub fn resolve(id: &str) -> NewsletterTemplate {
        match id {
            "compact" => NewsletterTemplate::Compact,
            _ => NewsletterTemplate::Classic,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            NewsletterTemplate::Classic => "default",
            NewsletterTemplate::Compact => "compact",
        }
    }

    pub fn describe(&self) -> TemplateDescription {
        match self {
            NewsletterTemplate::Classic => TemplateDescription {
                id: self.id(),
                name: "Classic digest",
                description: "Full article cards with images, excerpts and categories.",
            },
            NewsletterTemplate::Compact => TemplateDescription {
                id: self.id(),
                name: "Compact list",
                description: "Trimmed-down list layout for text-heavy inboxes.",
            },
        }
    }

    /// Renders the complete HTML document for one recipient.
    ///
    /// Rendering is pure: the same context always produces byte-identical
    /// output.
    pub fn render(&self, ctx: &TemplateContext) -> String {
        match self {
            NewsletterTemplate::Classic => classic::render(ctx),
            NewsletterTemplate::Compact => compact::render(ctx),
        }
    }
}

pub(crate) fn title<'a>(ctx: &'a TemplateContext<'_>) -> &'a str {
    ctx.custom_title.unwrap_or(DEFAULT_TITLE)
}

pub(crate) fn tracking_pixel(ctx: &TemplateContext) -> String {
    format!(
        r#"<img src="{}/newsletter/track/{}/{}" width="1" height="1" alt="" style="display:none;"/>"#,
        ctx.base_url, ctx.recipient_id, ctx.send_id
    )
}

pub(crate) fn unsubscribe_url(ctx: &TemplateContext) -> String {
    format!(
        "{}/newsletter/unsubscribe?email={}",
        ctx.base_url, ctx.recipient_email
    )
}

pub(crate) fn article_url(ctx: &TemplateContext, article: &ArticleSummary) -> String {
    format!("{}/articles/{}", ctx.base_url, article.id)
}

pub(crate) fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%B %-d, %Y").to_string()
}
