//! Kino Media - Source Resolution and Engine Bridging for Kino
//!
//! This crate puts one playback-control interface over three backends:
//! - Plain progressive audio/video decoded by the surface itself
//! - HLS through an externally loaded engine
//! - DASH through an externally loaded engine
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Kino Media                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐      ┌──────────────┐      ┌──────────────┐   │
//! │  │    Source    │─────►│    Engine    │─────►│  SDK Loader  │   │
//! │  │  Classifier  │      │    Binder    │      │  (memoized)  │   │
//! │  └──────────────┘      └──────┬───────┘      └──────────────┘   │
//! │                               │                                 │
//! │                        ┌──────┴──────┐                          │
//! │                        │    Media    │                          │
//! │                        │    Mount    │                          │
//! │                        └──────┬──────┘                          │
//! │                               │                                 │
//! │  ┌──────────────┐      ┌──────┴───────┐      ┌──────────────┐   │
//! │  │  Lifecycle   │◄────►│   Playback   │─────►│   Playback   │   │
//! │  │    Bridge    │      │   Surface    │      │    Facade    │   │
//! │  └──────────────┘      └──────────────┘      └──────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The host supplies the playback surface ([`PlaybackSurface`]), the script
//! environment engines are loaded into ([`ScriptHost`]), and the callbacks
//! ([`PlaybackCallbacks`]). The [`sim`] module provides in-memory versions
//! of all three.

pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod facade;
pub mod lifecycle;
pub mod mount;
pub mod render;
pub mod sdk;
pub mod sim;
pub mod surface;
pub mod types;

pub use classify::{can_play, classify};
pub use config::{EngineSource, EngineSources, FileConfig, TrackDescriptor};
pub use engine::{BindOutcome, BoundEngine, DashEngine, DashPlayer, EngineBinder, HlsEngine, HlsInstance};
pub use error::{Error, Result, SdkError};
pub use events::{EventSink, PlaybackEvent};
pub use facade::PlaybackFacade;
pub use lifecycle::{LifecycleBridge, NoopCallbacks, PlaybackCallbacks, Readiness, Subscription};
pub use mount::{LoadOutcome, MediaMount};
pub use render::{RenderProps, SurfacePlan};
pub use sdk::{EngineCapability, ScriptHost, SdkLoader, SdkState};
pub use surface::{NativeEvent, NativeEventKind, PlaybackSurface, TimeRanges};
pub use types::*;

use std::sync::{Mutex, MutexGuard};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library with default configuration
pub fn init() {
    tracing::info!(version = VERSION, "Kino Media initialized");
}

/// Lock a std mutex, recovering the data if a holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
