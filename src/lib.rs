//! Video format resolution and streaming relay service.
//!
//! Takes a user-supplied video page URL, resolves it into a direct playable
//! media URL through the yt-dlp metadata tool, and relays the media bytes
//! back to the client as a downloadable attachment without buffering them.

pub mod config;
pub mod error;
pub mod media;
pub mod normalize;
pub mod relay;
pub mod resolver;
pub mod routes;

pub use error::{ApiError, ApiResult};
pub use routes::{create_router, AppState};
