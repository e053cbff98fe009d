use actix_web::HttpResponse;

use crate::templates::{NewsletterTemplate, TemplateDescription};

/// Lists the layouts an operator can pick for a broadcast.
#[tracing::instrument(name = "Listing newsletter templates")]
pub async fn handle_list_templates() -> HttpResponse {
    let templates: Vec<TemplateDescription> = NewsletterTemplate::all()
        .iter()
        .map(|template| template.describe())
        .collect();

    HttpResponse::Ok().json(templates)
}
