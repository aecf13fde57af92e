use std::sync::Arc;

use axum::extract::{Json, Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::error::{ApiError, ApiResult};
use crate::media::Intent;
use crate::normalize::normalize;
use crate::relay::{self, relay_ticket, StreamFetcher};
use crate::resolver::{self, MetadataResolver};

// ============= Application State =============

#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<dyn MetadataResolver>,
    pub fetcher: Arc<dyn StreamFetcher>,
}

// ============= Request/Response Models =============

#[derive(Serialize)]
struct FormatEntry {
    format_id: String,
    ext: String,
    resolution: String,
    #[serde(rename = "isAudio")]
    is_audio: bool,
    #[serde(rename = "isVideo")]
    is_video: bool,
    url: String,
}

#[derive(Serialize)]
struct FormatsResponse {
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    formats: Option<Vec<FormatEntry>>,
}

#[derive(Serialize)]
struct AudioResponse {
    title: String,
    #[serde(rename = "downloadUrl")]
    download_url: String,
}

#[derive(Serialize)]
struct DownloadResponse {
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    thumbnail: Option<String>,
    #[serde(rename = "downloadUrl")]
    download_url: String,
}

#[derive(Deserialize)]
struct StreamQuery {
    #[serde(rename = "videoUrl")]
    video_url: Option<String>,
    title: Option<String>,
}

/// Pulls the required `url` field out of an untrusted JSON body. Anything
/// but a non-empty string is rejected before any upstream work happens.
fn required_url(body: &serde_json::Value) -> Result<&str, ApiError> {
    match body.get("url").and_then(|v| v.as_str()) {
        Some(url) if !url.is_empty() => Ok(url),
        _ => Err(ApiError::invalid_input("Missing URL")),
    }
}

// ============= Handlers =============

/// POST /api/formats - list every rendition the tool reports for a URL
async fn formats_handler(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> ApiResult<Json<FormatsResponse>> {
    let url = normalize(required_url(&body)?);

    let descriptor = resolver::resolve(state.resolver.as_ref(), &url, Intent::ListFormats).await?;

    let formats = descriptor.formats.as_ref().map(|candidates| {
        candidates
            .iter()
            .map(|f| FormatEntry {
                format_id: f.id.clone(),
                ext: f.ext.clone(),
                resolution: f.resolution.clone(),
                is_audio: f.is_audio_track(),
                is_video: f.is_video_track(),
                url: f.url.clone(),
            })
            .collect()
    });

    Ok(Json(FormatsResponse {
        title: descriptor.title,
        thumbnail: descriptor.thumbnail,
        formats,
    }))
}

/// POST /api/download-audio - resolve an audio-only rendition and hand back
/// a relay ticket for it
async fn download_audio_handler(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> ApiResult<Json<AudioResponse>> {
    let url = normalize(required_url(&body)?);

    let descriptor = resolver::resolve(state.resolver.as_ref(), &url, Intent::AudioOnly).await?;
    let download_url = relay_ticket(descriptor.select_audio(), &descriptor.title);

    Ok(Json(AudioResponse {
        title: descriptor.title,
        download_url,
    }))
}

/// POST /api/download - resolve a muxed rendition and hand back a relay
/// ticket for it
async fn download_handler(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> ApiResult<Json<DownloadResponse>> {
    let url = normalize(required_url(&body)?);

    let descriptor = resolver::resolve(state.resolver.as_ref(), &url, Intent::MuxedVideo).await?;
    let download_url = relay_ticket(descriptor.select_muxed(), &descriptor.title);

    Ok(Json(DownloadResponse {
        title: descriptor.title,
        thumbnail: descriptor.thumbnail,
        download_url,
    }))
}

/// GET /api/stream - relay the origin bytes as a named attachment
async fn stream_handler(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> ApiResult<Response> {
    let video_url = query
        .video_url
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::invalid_input("Missing videoUrl parameter"))?;
    let title = query
        .title
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "video".to_string());

    let stream = state
        .fetcher
        .fetch(&video_url)
        .await
        .map_err(|e| ApiError::UpstreamUnreachable(e.to_string()))?;

    Ok(relay::attachment_response(stream, &title))
}

/// GET /health - Health check endpoint
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        "runtime": "Rust + Tokio + yt-dlp",
    }))
}

/// 404 handler
async fn not_found_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({"error": "Route not found"})),
    )
}

// ============= Router =============

/// Builds the application router with CORS and the JSON 404 fallback.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .expose_headers([
            "Content-Disposition".parse().unwrap(),
            "Content-Length".parse().unwrap(),
        ]);

    Router::new()
        .route("/api/formats", post(formats_handler))
        .route("/api/download-audio", post(download_audio_handler))
        .route("/api/download", post(download_handler))
        .route("/api/stream", get(stream_handler))
        .route("/health", get(health_handler))
        .fallback(not_found_handler)
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_url_accepts_plain_strings() {
        let body = serde_json::json!({"url": "https://example.com/watch?v=1"});
        assert_eq!(required_url(&body).unwrap(), "https://example.com/watch?v=1");
    }

    #[test]
    fn required_url_rejects_missing_empty_and_non_string() {
        for body in [
            serde_json::json!({}),
            serde_json::json!({"url": ""}),
            serde_json::json!({"url": 42}),
            serde_json::json!({"url": null}),
            serde_json::json!({"link": "https://example.com"}),
        ] {
            assert!(
                matches!(required_url(&body), Err(ApiError::InvalidInput(_))),
                "{body}"
            );
        }
    }

    #[test]
    fn formats_response_omits_absent_fields() {
        let response = FormatsResponse {
            title: "Clip".into(),
            thumbnail: None,
            formats: None,
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value, serde_json::json!({"title": "Clip"}));
    }

    #[test]
    fn responses_use_the_wire_key_names() {
        let entry = FormatEntry {
            format_id: "22".into(),
            ext: "mp4".into(),
            resolution: "720p".into(),
            is_audio: false,
            is_video: true,
            url: "https://cdn.example/v".into(),
        };
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            serde_json::json!({
                "format_id": "22",
                "ext": "mp4",
                "resolution": "720p",
                "isAudio": false,
                "isVideo": true,
                "url": "https://cdn.example/v"
            })
        );

        let audio = AudioResponse {
            title: "Clip".into(),
            download_url: "/api/stream?videoUrl=u&title=t".into(),
        };
        assert_eq!(
            serde_json::to_value(&audio).unwrap(),
            serde_json::json!({
                "title": "Clip",
                "downloadUrl": "/api/stream?videoUrl=u&title=t"
            })
        );
    }
}
