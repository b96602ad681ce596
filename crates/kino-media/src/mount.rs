//! Media mount - orchestrates one playback surface
//!
//! Coordinates:
//! - Lifecycle bridge attach/detach
//! - Classification and (re-)binding of source descriptors
//! - Engine handle ownership and release
//! - Cancellation of binds superseded by unmount or a newer load

use crate::{
    classify::classify,
    config::FileConfig,
    engine::{BindOutcome, EngineBinder},
    facade::{EngineSlot, PlaybackFacade},
    lifecycle::{LifecycleBridge, PlaybackCallbacks, Readiness, Subscription},
    lock,
    surface::PlaybackSurface,
    types::{Classification, MountId, SourceDescriptor},
    Error, Result,
};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Outcome of [`MediaMount::load`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The source is bound with this classification
    Bound(Classification),
    /// The mount was unmounted, or a newer load started, before binding finished
    Abandoned,
}

/// A playback surface bound to a source
pub struct MediaMount {
    /// Unique mount ID
    id: MountId,
    /// Surface owned by the rendering layer
    surface: Arc<dyn PlaybackSurface>,
    /// File backend configuration
    config: FileConfig,
    /// Backend builder
    binder: EngineBinder,
    /// Control/query facade
    facade: PlaybackFacade,
    /// Currently bound engine
    engine: EngineSlot,
    /// Readiness of the current source
    readiness: Readiness,
    /// Cancelled at unmount; parent of every bind token
    live: CancellationToken,
    /// Token of the most recent bind
    bind_token: Mutex<CancellationToken>,
    /// Native listeners, until unmount
    subscription: Mutex<Option<Subscription>>,
    /// Classification of the current source
    classification: Mutex<Option<Classification>>,
}

impl MediaMount {
    /// Mount on a surface: wire native events and apply surface attributes
    ///
    /// Call [`load`](Self::load) to bind a source.
    pub fn new(
        surface: Arc<dyn PlaybackSurface>,
        config: FileConfig,
        binder: EngineBinder,
        callbacks: Arc<dyn PlaybackCallbacks>,
    ) -> Self {
        let id = MountId::new();
        let readiness = Readiness::new();
        let live = CancellationToken::new();
        let engine: EngineSlot = Arc::new(Mutex::new(None));

        let subscription =
            LifecycleBridge::attach(&surface, callbacks.clone(), readiness.clone(), live.clone());
        for (name, value) in config.surface_attributes() {
            surface.set_attribute(&name, &value);
        }

        let facade =
            PlaybackFacade::new(surface.clone(), readiness.clone(), engine.clone(), callbacks);

        info!(mount_id = %id, "Mounted");

        Self {
            id,
            surface,
            config,
            binder,
            facade,
            engine,
            readiness,
            bind_token: Mutex::new(live.child_token()),
            live,
            subscription: Mutex::new(Some(subscription)),
            classification: Mutex::new(None),
        }
    }

    pub fn id(&self) -> MountId {
        self.id
    }

    pub fn config(&self) -> &FileConfig {
        &self.config
    }

    /// Control and query surface
    pub fn facade(&self) -> &PlaybackFacade {
        &self.facade
    }

    /// Classification of the current source, once a load has started
    pub fn classification(&self) -> Option<Classification> {
        *lock(&self.classification)
    }

    pub fn is_mounted(&self) -> bool {
        !self.live.is_cancelled()
    }

    /// Classify and bind a source, replacing any previous one
    ///
    /// The previous engine handle is released, the native source cleared and
    /// readiness disarmed before the new bind starts. Readiness is re-armed
    /// only once the new source is bound. Abandoned binds are not errors.
    #[instrument(skip(self, descriptor), fields(mount_id = %self.id))]
    pub async fn load(&self, descriptor: impl Into<SourceDescriptor>) -> Result<LoadOutcome> {
        let descriptor = descriptor.into();
        if !self.is_mounted() {
            warn!("Load on an unmounted surface ignored");
            return Ok(LoadOutcome::Abandoned);
        }
        if descriptor.is_empty() {
            return Err(Error::InvalidSource("empty source descriptor".to_string()));
        }

        let token = {
            let mut current = lock(&self.bind_token);
            current.cancel();
            *current = self.live.child_token();
            current.clone()
        };
        self.release_engine();
        self.readiness.disarm();
        // The old media must not keep playing or signalling while the new
        // source binds
        self.surface.set_source(None);
        self.surface.set_alternative_sources(&[]);

        let classification = classify(&descriptor, &self.config);
        *lock(&self.classification) = Some(classification);
        info!(source = %descriptor, classification = %classification, "Loading source");

        let outcome = self
            .binder
            .bind(&self.surface, &descriptor, classification, &token)
            .await?;

        match outcome {
            BindOutcome::Bound(engine) => {
                if token.is_cancelled() {
                    // Superseded after the binder's last check
                    engine.release();
                    return Ok(LoadOutcome::Abandoned);
                }
                debug!(engine = ?engine, "Engine bound");
                *lock(&self.engine) = Some(Arc::new(engine));
                self.readiness.arm();
                Ok(LoadOutcome::Bound(classification))
            }
            BindOutcome::Abandoned => Ok(LoadOutcome::Abandoned),
        }
    }

    /// Tear down: cancel pending binds, detach listeners, release the engine
    ///
    /// Idempotent. The surface itself is left to the rendering layer.
    pub fn unmount(&self) {
        if self.live.is_cancelled() {
            return;
        }
        self.live.cancel();

        if let Some(subscription) = lock(&self.subscription).take() {
            subscription.detach();
        }
        self.release_engine();

        info!(mount_id = %self.id, "Unmounted");
    }

    fn release_engine(&self) {
        let previous = lock(&self.engine).take();
        if let Some(engine) = previous {
            debug!(engine = ?engine, "Releasing engine");
            engine.release();
        }
    }
}

impl Drop for MediaMount {
    fn drop(&mut self) {
        self.unmount();
    }
}
