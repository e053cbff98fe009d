use super::{article_url, format_date, title, tracking_pixel, unsubscribe_url, TemplateContext};

/// Trimmed-down list layout: every article still carries its excerpt and
/// image (when it has one), just without the classic card chrome.
pub fn render(ctx: &TemplateContext) -> String {
    let mut article_rows = String::new();

    for article in ctx.articles {
        let image_block = match &article.image {
            Some(image) => format!(
                r#"
        <img src="{}" alt="{}" style="max-width:100%;border-radius:4px;margin-top:8px;"/>"#,
                image, article.title
            ),
            None => String::new(),
        };

        article_rows.push_str(&format!(
            r#"
      <li style="margin-bottom:20px;">
        <a href="{link}" style="color:#1a1a1a;font-size:16px;font-weight:bold;text-decoration:none;">{title}</a>
        <span style="color:#888;font-size:13px;"> &mdash; {category}, {date}</span>{image_block}
        <p style="color:#555;font-size:14px;line-height:1.5;margin:4px 0 0;">{excerpt}</p>
      </li>"#,
            link = article_url(ctx, article),
            title = article.title,
            category = article.category,
            date = format_date(&article.created_at),
            image_block = image_block,
            excerpt = article.excerpt,
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html>
  <body style="margin:0;padding:0;background:#ffffff;font-family:Helvetica,Arial,sans-serif;">
    <div style="max-width:560px;margin:0 auto;padding:24px;">
      <h1 style="font-size:20px;margin:0 0 20px;">{title}</h1>
      <ul style="list-style:none;margin:0;padding:0;">{article_rows}
      </ul>
      <p style="color:#999;font-size:12px;margin-top:24px;">
        <a href="{unsubscribe}" style="color:#999;">Unsubscribe</a>
      </p>
      {pixel}
    </div>
  </body>
</html>"#,
        title = title(ctx),
        article_rows = article_rows,
        unsubscribe = unsubscribe_url(ctx),
        pixel = tracking_pixel(ctx),
    )
}
