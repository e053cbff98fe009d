use actix_web::{web, HttpResponse};
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

/// The canonical 1x1 transparent GIF served on every pixel fetch.
pub static TRACKING_PIXEL_GIF: [u8; 43] = [
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, // GIF89a
    0x01, 0x00, 0x01, 0x00, // 1x1 logical screen
    0x80, 0x00, 0x00, // global color table, 2 entries
    0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, // palette: white, black
    0x21, 0xF9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, // graphic control: index 0 transparent
    0x2C, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, // image descriptor
    0x02, 0x02, 0x44, 0x01, 0x00, // image data
    0x3B, // trailer
];

/// Records that a recipient's mail client fetched their tracking pixel.
///
/// This endpoint fails open: whatever happens in the data layer, the
/// response is always the same 200 with valid image bytes, because a broken
/// image inside delivered email is worse than a lost analytics event.
#[tracing::instrument(name = "Recording a newsletter open", skip_all)]
pub async fn handle_track_open(
    path: web::Path<(Uuid, Uuid)>,
    db_pool: web::Data<PgPool>,
) -> HttpResponse {
    let (subscriber_id, send_id) = path.into_inner();

    if let Err(err) = insert_open(&db_pool, subscriber_id, send_id).await {
        tracing::warn!(
            "Failed to record newsletter open for subscriber {} and send {}: {:?}",
            subscriber_id,
            send_id,
            err
        );
    }

    HttpResponse::Ok()
        .content_type("image/gif")
        .insert_header(("Cache-Control", "no-cache, no-store, must-revalidate"))
        .body(&TRACKING_PIXEL_GIF[..])
}

/// First open wins. Mail clients re-fetch the pixel on re-render, scroll and
/// forward, so duplicate keys are expected and silently ignored. Safe under
/// concurrent pixel fetches for the same pair.
async fn insert_open(
    db_pool: &PgPool,
    subscriber_id: Uuid,
    send_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO opens (subscriber_id, send_id, opened_at)
        VALUES ($1, $2, $3)
        ON CONFLICT (subscriber_id, send_id) DO NOTHING
        "#,
    )
    .bind(subscriber_id)
    .bind(send_id)
    .bind(Utc::now())
    .execute(db_pool)
    .await?;

    Ok(())
}
