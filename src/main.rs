use std::sync::Arc;

use tracing::info;

use tuberelay::config::{Settings, CONNECT_TIMEOUT, MAX_REDIRECTS, POOL_MAX_IDLE_PER_HOST};
use tuberelay::relay::HttpStreamFetcher;
use tuberelay::resolver::YtDlpResolver;
use tuberelay::routes::{create_router, AppState};

#[tokio::main]
async fn main() {
    // Setup logging
    tracing_subscriber::fmt::init();

    let settings = Settings::from_env();
    info!("Starting server on port {}", settings.port);

    // Outbound HTTP client with connection pooling, shared by all relays
    let http_client = reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .build()
        .expect("Failed to create HTTP client");

    let resolver = YtDlpResolver::new();
    resolver.probe().await;

    let state = AppState {
        resolver: Arc::new(resolver),
        fetcher: Arc::new(HttpStreamFetcher::new(http_client)),
    };

    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", settings.port);
    info!("🚀 tuberelay listening on {addr}");
    info!("   Extraction: yt-dlp subprocess");

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
