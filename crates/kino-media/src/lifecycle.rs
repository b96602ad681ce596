//! Lifecycle bridge
//!
//! Subscribes to the surface's native signals and republishes them through
//! [`PlaybackCallbacks`]. Every listener registered by [`LifecycleBridge::attach`]
//! is recorded in the returned [`Subscription`] and removed on detach.

use crate::{
    surface::{ListenerId, NativeEvent, NativeEventKind, NativeListener, PlaybackSurface},
    types::MediaError,
};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Normalized event contract implemented by the host
///
/// All hooks default to no-ops.
pub trait PlaybackCallbacks: Send + Sync {
    /// First can-play signal of the bound source
    fn on_ready(&self) {}

    fn on_play(&self) {}

    /// Only delivered while the mount is live
    fn on_pause(&self) {}

    /// Settled position reported by the surface, in seconds
    fn on_seek(&self, _seconds: f64) {}

    fn on_ended(&self) {}

    /// Native errors, forwarded verbatim
    fn on_error(&self, _error: &MediaError) {}
}

/// Callbacks that ignore everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCallbacks;

impl PlaybackCallbacks for NoopCallbacks {}

const DISARMED: u8 = 0;
const ARMED: u8 = 1;
const READY: u8 = 2;

/// One-shot readiness flag shared by the bridge and the facade
///
/// Can-play signals only count while armed. A mount disarms the flag when a
/// load starts and re-arms it once the new source is bound, so a signal from
/// the previous media cannot mark the next one ready.
#[derive(Debug, Clone)]
pub struct Readiness(Arc<AtomicU8>);

impl Readiness {
    /// An armed, not-yet-ready flag
    pub fn new() -> Self {
        Self(Arc::new(AtomicU8::new(ARMED)))
    }

    pub fn is_ready(&self) -> bool {
        self.0.load(Ordering::Acquire) == READY
    }

    /// Flip to ready; returns true only for the call that flipped it
    pub fn mark_ready(&self) -> bool {
        self.0
            .compare_exchange(ARMED, READY, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Not ready, and deaf to can-play until [`arm`](Self::arm)
    pub fn disarm(&self) {
        self.0.store(DISARMED, Ordering::Release);
    }

    /// Not ready, waiting for the first can-play of the bound source
    pub fn arm(&self) {
        self.0.store(ARMED, Ordering::Release);
    }
}

impl Default for Readiness {
    fn default() -> Self {
        Self::new()
    }
}

/// Listeners registered on one surface
pub struct Subscription {
    surface: Arc<dyn PlaybackSurface>,
    listeners: Vec<(NativeEventKind, ListenerId)>,
}

impl Subscription {
    /// Signal kinds covered by this subscription
    pub fn kinds(&self) -> Vec<NativeEventKind> {
        self.listeners.iter().map(|(kind, _)| *kind).collect()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Remove every listener registered by attach
    pub fn detach(self) {
        for (kind, id) in &self.listeners {
            self.surface.remove_listener(*id);
            debug!(event = %kind, listener = id.0, "Listener removed");
        }
        info!(count = self.listeners.len(), "Lifecycle bridge detached");
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("listeners", &self.listeners)
            .finish()
    }
}

/// Bridges native surface signals to [`PlaybackCallbacks`]
pub struct LifecycleBridge;

impl LifecycleBridge {
    /// Register one listener per native signal
    ///
    /// `live` is the mount's liveness token; pause signals arriving after it
    /// is cancelled are dropped.
    pub fn attach(
        surface: &Arc<dyn PlaybackSurface>,
        callbacks: Arc<dyn PlaybackCallbacks>,
        readiness: Readiness,
        live: CancellationToken,
    ) -> Subscription {
        let weak_surface = Arc::downgrade(surface);
        let listeners = NativeEventKind::ALL
            .iter()
            .map(|&kind| {
                let listener =
                    listener_for(kind, callbacks.clone(), &readiness, &live, &weak_surface);
                let id = surface.add_listener(kind, listener);
                debug!(event = %kind, listener = id.0, "Listener registered");
                (kind, id)
            })
            .collect::<Vec<_>>();

        info!(count = listeners.len(), "Lifecycle bridge attached");
        Subscription {
            surface: surface.clone(),
            listeners,
        }
    }

    /// Remove every listener of a subscription
    pub fn detach(subscription: Subscription) {
        subscription.detach();
    }
}

fn listener_for(
    kind: NativeEventKind,
    callbacks: Arc<dyn PlaybackCallbacks>,
    readiness: &Readiness,
    live: &CancellationToken,
    surface: &Weak<dyn PlaybackSurface>,
) -> NativeListener {
    match kind {
        NativeEventKind::CanPlay => {
            let readiness = readiness.clone();
            Arc::new(move |_: &NativeEvent| {
                if readiness.mark_ready() {
                    info!("Surface ready");
                    callbacks.on_ready();
                }
            })
        }
        NativeEventKind::Play => Arc::new(move |_: &NativeEvent| callbacks.on_play()),
        NativeEventKind::Pause => {
            let live = live.clone();
            Arc::new(move |_: &NativeEvent| {
                if live.is_cancelled() {
                    debug!("Pause during teardown ignored");
                    return;
                }
                callbacks.on_pause();
            })
        }
        NativeEventKind::Seeked => {
            let surface = surface.clone();
            Arc::new(move |_: &NativeEvent| {
                if let Some(surface) = surface.upgrade() {
                    callbacks.on_seek(surface.current_time());
                }
            })
        }
        NativeEventKind::Ended => Arc::new(move |_: &NativeEvent| callbacks.on_ended()),
        NativeEventKind::Error => Arc::new(move |event: &NativeEvent| {
            if let NativeEvent::Error(error) = event {
                warn!(code = %error.code, message = %error.message, "Native playback error");
                callbacks.on_error(error);
            }
        }),
    }
}
