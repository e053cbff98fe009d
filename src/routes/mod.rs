mod broadcasts;
mod health_check;
mod stats;
mod templates;
mod track;

pub use broadcasts::{handle_broadcast, BroadcastBody, BroadcastError, BroadcastOutcome};
pub use health_check::health_check;
pub use stats::{handle_list_send_stats, SendStats};
pub use templates::handle_list_templates;
pub use track::{handle_track_open, TRACKING_PIXEL_GIF};
