use super::{article_url, format_date, title, tracking_pixel, unsubscribe_url, TemplateContext};

/// Full article cards: image, category, excerpt and a read-more link.
pub fn render(ctx: &TemplateContext) -> String {
    let mut article_cards = String::new();

    for article in ctx.articles {
        let image_block = match &article.image {
            Some(image) => format!(
                r#"<img src="{}" alt="{}" style="width:100%;max-height:240px;object-fit:cover;border-radius:4px;"/>"#,
                image, article.title
            ),
            None => String::new(),
        };

        article_cards.push_str(&format!(
            r#"
        <div style="margin-bottom:32px;padding-bottom:24px;border-bottom:1px solid #e8e8e8;">
          {image_block}
          <p style="color:#b4654a;font-size:12px;text-transform:uppercase;letter-spacing:1px;margin:16px 0 4px;">{category} &middot; {date}</p>
          <h2 style="margin:0 0 8px;font-size:22px;"><a href="{link}" style="color:#1a1a1a;text-decoration:none;">{title}</a></h2>
          <p style="color:#555;font-size:15px;line-height:1.6;margin:0 0 12px;">{excerpt}</p>
          <a href="{link}" style="color:#b4654a;font-size:14px;">Read the full article &rarr;</a>
        </div>"#,
            image_block = image_block,
            category = article.category,
            date = format_date(&article.created_at),
            link = article_url(ctx, article),
            title = article.title,
            excerpt = article.excerpt,
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html>
  <body style="margin:0;padding:0;background:#f6f4f0;font-family:Georgia,serif;">
    <div style="max-width:600px;margin:0 auto;padding:32px 24px;background:#ffffff;">
      <h1 style="font-size:28px;margin:0 0 28px;color:#1a1a1a;">{title}</h1>
      {article_cards}
      <p style="color:#999;font-size:12px;margin-top:32px;">
        You are receiving this email because you subscribed to our newsletter.
        <a href="{unsubscribe}" style="color:#999;">Unsubscribe</a>
      </p>
      {pixel}
    </div>
  </body>
</html>"#,
        title = title(ctx),
        article_cards = article_cards,
        unsubscribe = unsubscribe_url(ctx),
        pixel = tracking_pixel(ctx),
    )
}
