//! Normalized playback events as a stream
//!
//! [`EventSink`] implements [`PlaybackCallbacks`] by pushing every event
//! into a tokio channel, for hosts that prefer consuming the contract as a
//! stream over implementing the callbacks.

use crate::{lifecycle::PlaybackCallbacks, types::MediaError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Normalized playback events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlaybackEvent {
    /// Source is ready; derived queries are meaningful from here on
    Ready,

    /// Playback started
    Play,

    /// Playback paused
    Pause,

    /// Seek completed at the settled position
    Seek { position: f64 },

    /// Playback reached the end
    Ended,

    /// Native playback error
    Error(MediaError),
}

impl std::fmt::Display for PlaybackEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackEvent::Ready => write!(f, "ready"),
            PlaybackEvent::Play => write!(f, "play"),
            PlaybackEvent::Pause => write!(f, "pause"),
            PlaybackEvent::Seek { position } => write!(f, "seek ({:.3}s)", position),
            PlaybackEvent::Ended => write!(f, "ended"),
            PlaybackEvent::Error(error) => write!(f, "error ({})", error),
        }
    }
}

/// Callbacks that forward into an unbounded channel
pub struct EventSink {
    event_tx: mpsc::UnboundedSender<PlaybackEvent>,
}

impl EventSink {
    /// Create a sink and the receiving end of its channel
    pub fn channel() -> (Arc<Self>, mpsc::UnboundedReceiver<PlaybackEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        (Arc::new(Self { event_tx }), event_rx)
    }

    fn emit(&self, event: PlaybackEvent) {
        debug!(event = %event, "Playback event");
        // A dropped receiver means nobody is listening anymore
        let _ = self.event_tx.send(event);
    }
}

impl PlaybackCallbacks for EventSink {
    fn on_ready(&self) {
        self.emit(PlaybackEvent::Ready);
    }

    fn on_play(&self) {
        self.emit(PlaybackEvent::Play);
    }

    fn on_pause(&self) {
        self.emit(PlaybackEvent::Pause);
    }

    fn on_seek(&self, seconds: f64) {
        self.emit(PlaybackEvent::Seek { position: seconds });
    }

    fn on_ended(&self) {
        self.emit(PlaybackEvent::Ended);
    }

    fn on_error(&self, error: &MediaError) {
        self.emit(PlaybackEvent::Error(error.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MediaErrorCode;

    #[test]
    fn test_sink_forwards_in_order() {
        let (sink, mut rx) = EventSink::channel();

        sink.on_ready();
        sink.on_play();
        sink.on_seek(12.5);

        assert_eq!(rx.try_recv().unwrap(), PlaybackEvent::Ready);
        assert_eq!(rx.try_recv().unwrap(), PlaybackEvent::Play);
        assert_eq!(rx.try_recv().unwrap(), PlaybackEvent::Seek { position: 12.5 });
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_sink_survives_dropped_receiver() {
        let (sink, rx) = EventSink::channel();
        drop(rx);
        sink.on_ended();
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_string(&PlaybackEvent::Seek { position: 3.0 }).unwrap();
        assert_eq!(json, r#"{"event":"seek","position":3.0}"#);

        let error = PlaybackEvent::Error(MediaError::new(MediaErrorCode::Decode, "bad"));
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["event"], "error");
        assert_eq!(json["code"], "decode");
    }
}
