//! Streaming engine interfaces and the bound-engine handle
//!
//! The HLS and DASH engines are third-party runtimes loaded at runtime by
//! the [`SdkLoader`](crate::sdk::SdkLoader). These traits are the slice of
//! their APIs the bridge drives.

mod binder;

pub use binder::{BindOutcome, EngineBinder};

use crate::{surface::PlaybackSurface, types::EngineKind, Result};
use std::sync::Arc;

/// The loaded HLS engine (its `Hls` constructor)
pub trait HlsEngine: Send + Sync {
    /// Construct a fresh engine instance
    fn create(&self) -> Result<Box<dyn HlsInstance>>;
}

/// One HLS engine instance, owned by a single mount
pub trait HlsInstance: Send + Sync {
    /// Point the instance at a playlist
    fn load_source(&self, uri: &str) -> Result<()>;

    /// Start feeding media into the surface
    fn attach_media(&self, surface: Arc<dyn PlaybackSurface>) -> Result<()>;

    /// Stop feeding the surface; the instance stays usable
    fn detach_media(&self);

    /// Tear down the instance and its network session
    fn destroy(&self);
}

/// The loaded DASH engine (its `MediaPlayer` factory)
pub trait DashEngine: Send + Sync {
    /// Create a new player
    fn create_player(&self) -> Result<Box<dyn DashPlayer>>;
}

/// One DASH player, owned by a single mount
pub trait DashPlayer: Send + Sync {
    /// Bind to the surface and start loading the manifest
    fn initialize(&self, surface: Arc<dyn PlaybackSurface>, uri: &str, autoplay: bool)
        -> Result<()>;

    /// Detach from the surface and drop the streaming session
    fn reset(&self);
}

/// Backend wired to a mount's surface
pub enum BoundEngine {
    /// The surface decodes the source natively
    Plain,
    Hls(Box<dyn HlsInstance>),
    Dash(Box<dyn DashPlayer>),
}

impl BoundEngine {
    /// Streaming engine kind, if any
    pub fn kind(&self) -> Option<EngineKind> {
        match self {
            BoundEngine::Plain => None,
            BoundEngine::Hls(_) => Some(EngineKind::Hls),
            BoundEngine::Dash(_) => Some(EngineKind::Dash),
        }
    }

    /// Detach a streaming engine from the surface, keeping the handle
    pub fn detach(&self) {
        match self {
            BoundEngine::Plain => {}
            BoundEngine::Hls(hls) => hls.detach_media(),
            BoundEngine::Dash(player) => player.reset(),
        }
    }

    /// Release the handle before unmount or re-bind
    pub fn release(&self) {
        match self {
            BoundEngine::Plain => {}
            BoundEngine::Hls(hls) => {
                hls.detach_media();
                hls.destroy();
            }
            BoundEngine::Dash(player) => player.reset(),
        }
    }
}

impl std::fmt::Debug for BoundEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind() {
            Some(kind) => write!(f, "BoundEngine({})", kind),
            None => write!(f, "BoundEngine(plain)"),
        }
    }
}
