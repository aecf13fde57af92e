use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::{RESOLVE_TIMEOUT, YTDLP_BIN};
use crate::media::{Intent, MediaDescriptor, MetadataPayload};

/// Browser-mimicking headers attached to every extraction.
const EXTRA_HEADERS: [(&str, &str); 2] = [("referer", "youtube.com"), ("user-agent", "Mozilla/5.0")];

/// Failure modes of one resolution pass.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The tool could not be spawned, timed out, or exited unsuccessfully.
    #[error("metadata tool failed: {0}")]
    Tool(String),

    /// The tool answered with something that is not a usable payload.
    #[error("malformed metadata payload: {0}")]
    Malformed(String),
}

/// The extraction options a resolution pass may enable, spelled out instead
/// of being passed around as loose tool flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Ask the tool for a single JSON summary on stdout, no download.
    pub dump_single_json: bool,
    pub no_warnings: bool,
    pub prefer_free_formats: bool,
    pub no_check_certificates: bool,
    /// Audio extraction preference, paired with the target audio format.
    pub extract_audio: bool,
    pub audio_format: Option<&'static str>,
    /// `name:value` header pairs forwarded to the tool.
    pub add_headers: Vec<(String, String)>,
}

impl ExtractOptions {
    /// Option bag for one intent. The browser headers ride along on every
    /// intent; the remaining differences follow what each endpoint needs.
    pub fn for_intent(intent: Intent) -> Self {
        let base = Self {
            dump_single_json: true,
            no_warnings: false,
            prefer_free_formats: true,
            no_check_certificates: false,
            extract_audio: false,
            audio_format: None,
            add_headers: EXTRA_HEADERS
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        };

        match intent {
            Intent::ListFormats => Self {
                no_warnings: true,
                ..base
            },
            Intent::AudioOnly => Self {
                extract_audio: true,
                audio_format: Some("mp3"),
                no_check_certificates: true,
                ..base
            },
            Intent::MuxedVideo => Self {
                no_warnings: true,
                no_check_certificates: true,
                ..base
            },
        }
    }

    /// Maps the bag to the tool's CLI flags, target URL excluded.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.dump_single_json {
            args.push("--dump-single-json".to_string());
        }
        if self.no_warnings {
            args.push("--no-warnings".to_string());
        }
        if self.prefer_free_formats {
            args.push("--prefer-free-formats".to_string());
        }
        if self.no_check_certificates {
            args.push("--no-check-certificates".to_string());
        }
        if self.extract_audio {
            args.push("--extract-audio".to_string());
            if let Some(format) = self.audio_format {
                args.push("--audio-format".to_string());
                args.push(format.to_string());
            }
        }
        for (name, value) in &self.add_headers {
            args.push("--add-header".to_string());
            args.push(format!("{name}:{value}"));
        }
        args
    }
}

/// Boundary to the external metadata tool. Injected so selection and route
/// logic can run against scripted payloads in tests.
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    async fn extract(
        &self,
        url: &str,
        options: &ExtractOptions,
    ) -> Result<MetadataPayload, ResolveError>;
}

/// Production resolver: spawns the yt-dlp binary and parses the JSON
/// summary it prints to stdout.
pub struct YtDlpResolver {
    bin: String,
    timeout: Duration,
}

impl YtDlpResolver {
    pub fn new() -> Self {
        Self {
            bin: YTDLP_BIN.to_string(),
            timeout: RESOLVE_TIMEOUT,
        }
    }

    /// Logs whether the tool is reachable. Without this a missing binary
    /// only surfaces on the first request.
    pub async fn probe(&self) {
        match Command::new(&self.bin).arg("--version").output().await {
            Ok(output) if output.status.success() => {
                let version = String::from_utf8_lossy(&output.stdout);
                info!("{} available, version {}", self.bin, version.trim());
            }
            Ok(_) => warn!("{} --version exited unsuccessfully", self.bin),
            Err(e) => warn!("{} not found on PATH: {e}", self.bin),
        }
    }
}

#[async_trait]
impl MetadataResolver for YtDlpResolver {
    async fn extract(
        &self,
        url: &str,
        options: &ExtractOptions,
    ) -> Result<MetadataPayload, ResolveError> {
        debug!("invoking {} for {url}", self.bin);

        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.bin).args(options.to_args()).arg(url).output(),
        )
        .await
        .map_err(|_| {
            ResolveError::Tool(format!("{} timed out after {:?}", self.bin, self.timeout))
        })?
        .map_err(|e| ResolveError::Tool(format!("failed to spawn {}: {e}", self.bin)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ResolveError::Tool(format!(
                "{} exited with {}: {}",
                self.bin,
                output.status,
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| ResolveError::Malformed(format!("unparseable tool output: {e}")))
    }
}

/// One full resolution pass: per-intent options, tool invocation, payload
/// validation. The URL is passed through exactly as given.
pub async fn resolve(
    tool: &dyn MetadataResolver,
    url: &str,
    intent: Intent,
) -> Result<MediaDescriptor, ResolveError> {
    let options = ExtractOptions::for_intent(intent);
    let payload = tool.extract(url, &options).await?;
    MediaDescriptor::from_payload(payload).map_err(|e| ResolveError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScriptedTool(Result<MetadataPayload, String>);

    #[async_trait]
    impl MetadataResolver for ScriptedTool {
        async fn extract(
            &self,
            _url: &str,
            _options: &ExtractOptions,
        ) -> Result<MetadataPayload, ResolveError> {
            self.0.clone().map_err(ResolveError::Tool)
        }
    }

    fn full_payload() -> MetadataPayload {
        MetadataPayload {
            title: Some("Clip".to_string()),
            thumbnail: None,
            url: Some("https://cdn.example/direct".to_string()),
            formats: None,
        }
    }

    #[test]
    fn list_formats_args_are_exact() {
        let args = ExtractOptions::for_intent(Intent::ListFormats).to_args();
        assert_eq!(
            args,
            vec![
                "--dump-single-json",
                "--no-warnings",
                "--prefer-free-formats",
                "--add-header",
                "referer:youtube.com",
                "--add-header",
                "user-agent:Mozilla/5.0",
            ]
        );
    }

    #[test]
    fn audio_intent_enables_extraction() {
        let args = ExtractOptions::for_intent(Intent::AudioOnly).to_args();
        assert!(args.contains(&"--extract-audio".to_string()));
        assert!(args.contains(&"--audio-format".to_string()));
        assert!(args.contains(&"mp3".to_string()));
        assert!(args.contains(&"--no-check-certificates".to_string()));
        assert!(!args.contains(&"--no-warnings".to_string()));
    }

    #[test]
    fn muxed_intent_skips_audio_extraction() {
        let args = ExtractOptions::for_intent(Intent::MuxedVideo).to_args();
        assert!(args.contains(&"--no-warnings".to_string()));
        assert!(args.contains(&"--no-check-certificates".to_string()));
        assert!(!args.contains(&"--extract-audio".to_string()));
    }

    #[test]
    fn every_intent_carries_browser_headers() {
        for intent in [Intent::ListFormats, Intent::AudioOnly, Intent::MuxedVideo] {
            let args = ExtractOptions::for_intent(intent).to_args();
            assert!(args.contains(&"referer:youtube.com".to_string()), "{intent:?}");
            assert!(args.contains(&"user-agent:Mozilla/5.0".to_string()), "{intent:?}");
        }
    }

    #[tokio::test]
    async fn resolve_returns_a_validated_descriptor() {
        let tool = ScriptedTool(Ok(full_payload()));
        let descriptor = resolve(&tool, "https://youtu.be/x", Intent::MuxedVideo)
            .await
            .unwrap();
        assert_eq!(descriptor.title, "Clip");
        assert_eq!(descriptor.canonical_url, "https://cdn.example/direct");
    }

    #[tokio::test]
    async fn resolve_rejects_payload_without_title() {
        let mut payload = full_payload();
        payload.title = None;
        let tool = ScriptedTool(Ok(payload));
        let err = resolve(&tool, "https://youtu.be/x", Intent::AudioOnly)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Malformed(_)));
    }

    #[tokio::test]
    async fn tool_failures_propagate() {
        let tool = ScriptedTool(Err("exit status 1".to_string()));
        let err = resolve(&tool, "https://youtu.be/x", Intent::ListFormats)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Tool(_)));
    }
}
