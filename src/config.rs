use std::env;
use std::time::Duration;

/// Name of the metadata extractor binary looked up on PATH.
pub const YTDLP_BIN: &str = "yt-dlp";

/// Upper bound on a single metadata extraction, subprocess included.
pub const RESOLVE_TIMEOUT: Duration = Duration::from_secs(30);

/// Connect timeout for the relay's outbound HTTP client. There is no total
/// timeout: relayed bodies are arbitrarily large.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Redirect hop limit for the relay client.
pub const MAX_REDIRECTS: usize = 10;

/// Idle connections kept per upstream host.
pub const POOL_MAX_IDLE_PER_HOST: usize = 20;

#[derive(Clone, Debug)]
pub struct Settings {
    pub port: u16,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            port: env_parse("PORT", 5000),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
