pub mod article_summary;
pub mod send;
pub mod subscriber_email;
