//! Metadata payload ingestion and per-intent format selection.

use serde::Deserialize;
use thiserror::Error;

/// Container extension the audio-only selection insists on.
pub const AUDIO_CONTAINER: &str = "m4a";

/// Container extension the muxed selection insists on.
pub const VIDEO_CONTAINER: &str = "mp4";

/// Sentinel string the metadata tool emits for a track that does not exist.
const CODEC_NONE: &str = "none";

/// What the caller wants out of a resolution pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    ListFormats,
    AudioOnly,
    MuxedVideo,
}

/// Top-level payload exactly as the metadata tool printed it. Everything is
/// optional here; required fields are enforced when the payload is turned
/// into a [`MediaDescriptor`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetadataPayload {
    pub title: Option<String>,
    pub thumbnail: Option<String>,
    pub url: Option<String>,
    pub formats: Option<Vec<RawFormat>>,
}

/// One entry of the tool's `formats` array, untrusted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFormat {
    pub format_id: Option<String>,
    pub ext: Option<String>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub format_note: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub url: Option<String>,
}

/// Codec slot for one track of a format, normalized at the ingestion
/// boundary. The tool reports a nonexistent track as the literal string
/// `"none"`, which is not the same thing as leaving the field out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackCodec {
    /// The explicit `"none"` sentinel: the track does not exist.
    Absent,
    /// A concrete codec string.
    Named(String),
    /// The field was missing from the payload.
    Unspecified,
}

impl TrackCodec {
    fn from_raw(raw: Option<String>) -> Self {
        match raw {
            None => TrackCodec::Unspecified,
            Some(s) if s == CODEC_NONE => TrackCodec::Absent,
            Some(s) => TrackCodec::Named(s),
        }
    }

    /// Whether the track exists. Only the explicit sentinel marks a missing
    /// track; an unspecified codec counts as present.
    pub fn is_present(&self) -> bool {
        !matches!(self, TrackCodec::Absent)
    }
}

/// One candidate rendition, kept in the order the tool reported it.
#[derive(Debug, Clone)]
pub struct FormatCandidate {
    pub id: String,
    pub ext: String,
    pub video: TrackCodec,
    pub audio: TrackCodec,
    pub resolution: String,
    /// Ephemeral direct media URL; empty when the tool omitted it.
    pub url: String,
}

impl FormatCandidate {
    fn from_raw(raw: RawFormat) -> Self {
        let resolution = resolution_label(&raw);
        Self {
            id: raw.format_id.unwrap_or_default(),
            ext: raw.ext.unwrap_or_default(),
            video: TrackCodec::from_raw(raw.vcodec),
            audio: TrackCodec::from_raw(raw.acodec),
            resolution,
            url: raw.url.unwrap_or_default(),
        }
    }

    /// Audio-only rendition: no video track, but an audio track.
    pub fn is_audio_track(&self) -> bool {
        !self.video.is_present() && self.audio.is_present()
    }

    /// Carries a video track, muxed audio or not.
    pub fn is_video_track(&self) -> bool {
        self.video.is_present()
    }
}

/// Human label for a rendition: the tool's own note when it gave one,
/// otherwise `{width}x{height}` with zero defaults.
fn resolution_label(raw: &RawFormat) -> String {
    match raw.format_note.as_deref() {
        Some(note) if !note.is_empty() => note.to_string(),
        _ => format!("{}x{}", raw.width.unwrap_or(0), raw.height.unwrap_or(0)),
    }
}

/// Required-field validation failure for a tool payload.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("payload is missing a usable title")]
    MissingTitle,
    #[error("payload is missing a playable url")]
    MissingUrl,
}

/// Validated snapshot of one media item, scoped to a single request.
#[derive(Debug, Clone)]
pub struct MediaDescriptor {
    pub title: String,
    pub thumbnail: Option<String>,
    /// The tool's own pick of a playable URL, the fallback when no
    /// candidate matches a selection.
    pub canonical_url: String,
    /// Candidates in upstream order; `None` when the tool sent no array.
    pub formats: Option<Vec<FormatCandidate>>,
}

impl MediaDescriptor {
    /// Enforces the required fields and normalizes the raw formats array.
    /// A payload without a non-empty title and url never becomes a
    /// descriptor.
    pub fn from_payload(payload: MetadataPayload) -> Result<Self, PayloadError> {
        let title = payload
            .title
            .filter(|t| !t.is_empty())
            .ok_or(PayloadError::MissingTitle)?;
        let canonical_url = payload
            .url
            .filter(|u| !u.is_empty())
            .ok_or(PayloadError::MissingUrl)?;

        Ok(Self {
            title,
            thumbnail: payload.thumbnail,
            canonical_url,
            formats: payload
                .formats
                .map(|list| list.into_iter().map(FormatCandidate::from_raw).collect()),
        })
    }

    fn candidates(&self) -> impl Iterator<Item = &FormatCandidate> {
        self.formats.iter().flatten()
    }

    /// First audio-only rendition in the designated audio container. Falls
    /// back to the canonical URL when nothing matches or the match carries
    /// no direct URL.
    pub fn select_audio(&self) -> &str {
        self.candidates()
            .find(|f| f.is_audio_track() && f.ext == AUDIO_CONTAINER)
            .map(|f| f.url.as_str())
            .filter(|u| !u.is_empty())
            .unwrap_or(&self.canonical_url)
    }

    /// First rendition with both tracks muxed into the designated video
    /// container and a usable direct URL, else the canonical URL.
    pub fn select_muxed(&self) -> &str {
        self.candidates()
            .find(|f| {
                f.ext == VIDEO_CONTAINER
                    && f.audio.is_present()
                    && f.video.is_present()
                    && !f.url.is_empty()
            })
            .map(|f| f.url.as_str())
            .unwrap_or(&self.canonical_url)
    }
}
