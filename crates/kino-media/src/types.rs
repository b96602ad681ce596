//! Core types for Kino Media

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for a mount (one playback surface binding)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MountId(pub Uuid);

impl MountId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MountId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of an array source descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MediaSource {
    /// Bare URI, the surface sniffs the type itself
    Uri(String),
    /// URI with an explicit MIME type
    Typed {
        src: String,
        #[serde(rename = "type")]
        mime_type: String,
    },
}

impl MediaSource {
    pub fn typed(src: impl Into<String>, mime_type: impl Into<String>) -> Self {
        MediaSource::Typed {
            src: src.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn uri(&self) -> &str {
        match self {
            MediaSource::Uri(uri) => uri,
            MediaSource::Typed { src, .. } => src,
        }
    }

    pub fn mime_type(&self) -> Option<&str> {
        match self {
            MediaSource::Uri(_) => None,
            MediaSource::Typed { mime_type, .. } => Some(mime_type),
        }
    }
}

impl From<&str> for MediaSource {
    fn from(uri: &str) -> Self {
        MediaSource::Uri(uri.to_string())
    }
}

/// What the host asked us to play
///
/// Deserializes from a JSON string, an array of strings, or an array of
/// `{ "src", "type" }` objects (mixed arrays are accepted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceDescriptor {
    /// Single URI
    Uri(String),
    /// Ordered alternatives for the surface to negotiate
    Sources(Vec<MediaSource>),
}

impl SourceDescriptor {
    /// The URI when the descriptor is a single string
    pub fn as_uri(&self) -> Option<&str> {
        match self {
            SourceDescriptor::Uri(uri) => Some(uri),
            SourceDescriptor::Sources(_) => None,
        }
    }

    /// The single URI, or the first alternative of an array
    pub fn first_uri(&self) -> Option<&str> {
        match self {
            SourceDescriptor::Uri(uri) => Some(uri),
            SourceDescriptor::Sources(sources) => sources.first().map(MediaSource::uri),
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, SourceDescriptor::Sources(_))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            SourceDescriptor::Uri(uri) => uri.trim().is_empty(),
            SourceDescriptor::Sources(sources) => sources.is_empty(),
        }
    }

    /// Parse a descriptor from its JSON form
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl std::fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceDescriptor::Uri(uri) => write!(f, "{}", uri),
            SourceDescriptor::Sources(sources) => {
                let uris: Vec<&str> = sources.iter().map(MediaSource::uri).collect();
                write!(f, "[{}]", uris.join(", "))
            }
        }
    }
}

impl From<&str> for SourceDescriptor {
    fn from(uri: &str) -> Self {
        SourceDescriptor::Uri(uri.to_string())
    }
}

impl From<String> for SourceDescriptor {
    fn from(uri: String) -> Self {
        SourceDescriptor::Uri(uri)
    }
}

impl From<Vec<MediaSource>> for SourceDescriptor {
    fn from(sources: Vec<MediaSource>) -> Self {
        SourceDescriptor::Sources(sources)
    }
}

/// Streaming engine kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    Hls,
    Dash,
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineKind::Hls => write!(f, "HLS"),
            EngineKind::Dash => write!(f, "DASH"),
        }
    }
}

/// Element kind for plain progressive media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Audio,
    Video,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// Backend chosen for a source descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum Classification {
    /// Native decode by the surface itself
    Plain { media: MediaKind },
    /// HLS engine attached to a video surface
    Hls,
    /// DASH engine attached to a video surface
    Dash,
}

impl Classification {
    /// Streaming engine this backend needs, if any
    pub fn engine(&self) -> Option<EngineKind> {
        match self {
            Classification::Plain { .. } => None,
            Classification::Hls => Some(EngineKind::Hls),
            Classification::Dash => Some(EngineKind::Dash),
        }
    }

    /// Element kind the rendering layer should create
    pub fn media_kind(&self) -> MediaKind {
        match self {
            Classification::Plain { media } => *media,
            Classification::Hls | Classification::Dash => MediaKind::Video,
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.engine().is_some()
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Classification::Plain { media } => write!(f, "plain/{}", media),
            Classification::Hls => write!(f, "hls"),
            Classification::Dash => write!(f, "dash"),
        }
    }
}

/// Native media error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaErrorCode {
    /// Fetch aborted by the user agent
    Aborted,
    /// Network failure while fetching media
    Network,
    /// Media could not be decoded
    Decode,
    /// Source format not supported
    SrcNotSupported,
    /// Play request rejected, e.g. by autoplay policy
    NotAllowed,
    Unknown,
}

impl std::fmt::Display for MediaErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaErrorCode::Aborted => write!(f, "aborted"),
            MediaErrorCode::Network => write!(f, "network"),
            MediaErrorCode::Decode => write!(f, "decode"),
            MediaErrorCode::SrcNotSupported => write!(f, "src_not_supported"),
            MediaErrorCode::NotAllowed => write!(f, "not_allowed"),
            MediaErrorCode::Unknown => write!(f, "unknown"),
        }
    }
}

/// Error reported by the playback surface, forwarded verbatim
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct MediaError {
    pub code: MediaErrorCode,
    pub message: String,
}

impl MediaError {
    pub fn new(code: MediaErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// A seek request before resolution into seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "unit", content = "value", rename_all = "snake_case")]
pub enum SeekTarget {
    /// Absolute position in seconds
    Seconds(f64),
    /// Fraction of the total duration
    Fraction(f64),
}

impl SeekTarget {
    /// Interpret a bare amount: values strictly between 0 and 1 are fractions,
    /// everything else is seconds.
    pub fn from_amount(amount: f64) -> Self {
        if amount > 0.0 && amount < 1.0 {
            SeekTarget::Fraction(amount)
        } else {
            SeekTarget::Seconds(amount)
        }
    }

    /// Resolve into seconds; fractions need a known duration
    pub fn resolve(&self, duration: Option<f64>) -> Option<f64> {
        match *self {
            SeekTarget::Seconds(seconds) => Some(seconds),
            SeekTarget::Fraction(fraction) => duration.map(|d| d * fraction),
        }
    }
}

impl From<f64> for SeekTarget {
    fn from(amount: f64) -> Self {
        SeekTarget::from_amount(amount)
    }
}
