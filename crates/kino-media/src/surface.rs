//! Playback surface abstraction
//!
//! The surface is the native audio/video element owned by the rendering
//! layer. The bridge never creates or destroys one; it only writes sources,
//! attributes and playback properties to it and listens to its signals.

use crate::types::{MediaError, MediaSource};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Buffered time ranges as `(start, end)` pairs in seconds
pub type TimeRanges = Vec<(f64, f64)>;

/// Native signals the bridge listens to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NativeEventKind {
    CanPlay,
    Play,
    Pause,
    Seeked,
    Ended,
    Error,
}

impl NativeEventKind {
    /// Every kind the lifecycle bridge subscribes to
    pub const ALL: [NativeEventKind; 6] = [
        NativeEventKind::CanPlay,
        NativeEventKind::Play,
        NativeEventKind::Pause,
        NativeEventKind::Seeked,
        NativeEventKind::Ended,
        NativeEventKind::Error,
    ];

    /// DOM event name
    pub fn event_name(&self) -> &'static str {
        match self {
            NativeEventKind::CanPlay => "canplay",
            NativeEventKind::Play => "play",
            NativeEventKind::Pause => "pause",
            NativeEventKind::Seeked => "seeked",
            NativeEventKind::Ended => "ended",
            NativeEventKind::Error => "error",
        }
    }
}

impl std::fmt::Display for NativeEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.event_name())
    }
}

/// A signal dispatched by the surface
#[derive(Debug, Clone, PartialEq)]
pub enum NativeEvent {
    CanPlay,
    Play,
    Pause,
    Seeked,
    Ended,
    Error(MediaError),
}

impl NativeEvent {
    pub fn kind(&self) -> NativeEventKind {
        match self {
            NativeEvent::CanPlay => NativeEventKind::CanPlay,
            NativeEvent::Play => NativeEventKind::Play,
            NativeEvent::Pause => NativeEventKind::Pause,
            NativeEvent::Seeked => NativeEventKind::Seeked,
            NativeEvent::Ended => NativeEventKind::Ended,
            NativeEvent::Error(_) => NativeEventKind::Error,
        }
    }
}

/// Registered listener handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// Listener callback
pub type NativeListener = Arc<dyn Fn(&NativeEvent) + Send + Sync>;

/// Native audio/video element
///
/// Implementations use interior mutability; every method takes `&self` so a
/// surface can be shared between the mount, its engine and its listeners.
#[async_trait]
pub trait PlaybackSurface: Send + Sync {
    /// Set or clear (`None`) the `src` attribute
    fn set_source(&self, uri: Option<&str>);

    /// Replace the alternative `<source>` children
    fn set_alternative_sources(&self, sources: &[MediaSource]);

    /// Write an attribute
    fn set_attribute(&self, name: &str, value: &str);

    /// Register a listener for one signal kind
    fn add_listener(&self, kind: NativeEventKind, listener: NativeListener) -> ListenerId;

    /// Remove a listener; unknown ids are ignored
    fn remove_listener(&self, id: ListenerId);

    /// Request playback; rejected requests resolve to an error
    async fn play(&self) -> std::result::Result<(), MediaError>;

    fn pause(&self);

    fn current_time(&self) -> f64;

    fn set_current_time(&self, seconds: f64);

    /// Total duration in seconds, NaN while unknown
    fn duration(&self) -> f64;

    fn set_volume(&self, fraction: f64);

    fn set_playback_rate(&self, rate: f64);

    /// Buffered ranges in timeline order
    fn buffered(&self) -> TimeRanges;
}
