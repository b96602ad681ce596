//! Engine binder - wires a classified source onto a playback surface

use super::BoundEngine;
use crate::{
    config::EngineSources,
    sdk::{EngineCapability, SdkLoader},
    surface::PlaybackSurface,
    types::{Classification, EngineKind, SourceDescriptor},
    Error, Result,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Result of a bind attempt
#[derive(Debug)]
pub enum BindOutcome {
    /// The engine is wired to the surface and owned by the caller
    Bound(BoundEngine),
    /// The bind token was cancelled before the surface was touched
    Abandoned,
}

/// Builds the backend for a classification
#[derive(Clone)]
pub struct EngineBinder {
    loader: SdkLoader,
    sources: EngineSources,
}

impl EngineBinder {
    /// Create a binder using the well-known engine scripts
    pub fn new(loader: SdkLoader) -> Self {
        Self::with_sources(loader, EngineSources::default())
    }

    /// Create a binder with custom engine script locations
    pub fn with_sources(loader: SdkLoader, sources: EngineSources) -> Self {
        Self { loader, sources }
    }

    pub fn loader(&self) -> &SdkLoader {
        &self.loader
    }

    pub fn sources(&self) -> &EngineSources {
        &self.sources
    }

    /// Bind a descriptor to the surface
    ///
    /// Streaming binds suspend on SDK acquisition. If `token` is cancelled by
    /// the time acquisition resolves, nothing is constructed and the surface
    /// is left untouched.
    #[instrument(skip(self, surface, token), fields(classification = %classification))]
    pub async fn bind(
        &self,
        surface: &Arc<dyn PlaybackSurface>,
        descriptor: &SourceDescriptor,
        classification: Classification,
        token: &CancellationToken,
    ) -> Result<BindOutcome> {
        if token.is_cancelled() {
            warn!("Bind requested on a cancelled token");
            return Ok(BindOutcome::Abandoned);
        }

        match classification {
            Classification::Plain { .. } => {
                bind_plain(surface.as_ref(), descriptor);
                Ok(BindOutcome::Bound(BoundEngine::Plain))
            }
            Classification::Hls => self.bind_hls(surface, descriptor, token).await,
            Classification::Dash => self.bind_dash(surface, descriptor, token).await,
        }
    }

    async fn acquire(&self, kind: EngineKind) -> Result<EngineCapability> {
        let source = match kind {
            EngineKind::Hls => &self.sources.hls,
            EngineKind::Dash => &self.sources.dash,
        };
        self.loader
            .acquire(source, kind)
            .await
            .map_err(|err| Error::engine_init(kind, err))
    }

    async fn bind_hls(
        &self,
        surface: &Arc<dyn PlaybackSurface>,
        descriptor: &SourceDescriptor,
        token: &CancellationToken,
    ) -> Result<BindOutcome> {
        if !cfg!(feature = "hls") {
            return Err(Error::EngineUnavailable { engine: EngineKind::Hls });
        }
        let uri = streaming_uri(descriptor)?;

        let engine = match self.acquire(EngineKind::Hls).await? {
            EngineCapability::Hls(engine) => engine,
            other => {
                return Err(Error::engine_init(
                    EngineKind::Hls,
                    Error::Engine(format!("expected HLS engine, got {}", other.kind())),
                ))
            }
        };

        if token.is_cancelled() {
            warn!(uri = %uri, "Mount gone before HLS engine resolved, discarding");
            return Ok(BindOutcome::Abandoned);
        }

        let hls = engine
            .create()
            .map_err(|err| Error::engine_init(EngineKind::Hls, err))?;
        clear_native_source(surface.as_ref());

        let wired = hls
            .load_source(&uri)
            .and_then(|_| hls.attach_media(surface.clone()));
        if let Err(err) = wired {
            hls.destroy();
            return Err(Error::engine_init(EngineKind::Hls, err));
        }

        info!(uri = %uri, "HLS engine attached");
        Ok(BindOutcome::Bound(BoundEngine::Hls(hls)))
    }

    async fn bind_dash(
        &self,
        surface: &Arc<dyn PlaybackSurface>,
        descriptor: &SourceDescriptor,
        token: &CancellationToken,
    ) -> Result<BindOutcome> {
        if !cfg!(feature = "dash") {
            return Err(Error::EngineUnavailable { engine: EngineKind::Dash });
        }
        let uri = streaming_uri(descriptor)?;

        let engine = match self.acquire(EngineKind::Dash).await? {
            EngineCapability::Dash(engine) => engine,
            other => {
                return Err(Error::engine_init(
                    EngineKind::Dash,
                    Error::Engine(format!("expected DASH engine, got {}", other.kind())),
                ))
            }
        };

        if token.is_cancelled() {
            warn!(uri = %uri, "Mount gone before DASH engine resolved, discarding");
            return Ok(BindOutcome::Abandoned);
        }

        let player = engine
            .create_player()
            .map_err(|err| Error::engine_init(EngineKind::Dash, err))?;
        clear_native_source(surface.as_ref());

        if let Err(err) = player.initialize(surface.clone(), &uri, true) {
            player.reset();
            return Err(Error::engine_init(EngineKind::Dash, err));
        }

        info!(uri = %uri, "DASH player initialized");
        Ok(BindOutcome::Bound(BoundEngine::Dash(player)))
    }
}

/// Plain media: the surface is the engine
fn bind_plain(surface: &dyn PlaybackSurface, descriptor: &SourceDescriptor) {
    match descriptor {
        SourceDescriptor::Uri(uri) => {
            surface.set_alternative_sources(&[]);
            surface.set_source(Some(uri));
            debug!(uri = %uri, "Plain source set on surface");
        }
        SourceDescriptor::Sources(sources) => {
            surface.set_source(None);
            surface.set_alternative_sources(sources);
            debug!(count = sources.len(), "Alternative sources set on surface");
        }
    }
}

/// Streaming engines feed the surface themselves; drop any native source
fn clear_native_source(surface: &dyn PlaybackSurface) {
    surface.set_source(None);
    surface.set_alternative_sources(&[]);
}

fn streaming_uri(descriptor: &SourceDescriptor) -> Result<String> {
    descriptor
        .first_uri()
        .filter(|uri| !uri.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidSource("streaming source has no URI".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{MemorySurface, SimEnvironment};
    use crate::types::{MediaKind, MediaSource};

    fn surface() -> (Arc<MemorySurface>, Arc<dyn PlaybackSurface>) {
        let memory = Arc::new(MemorySurface::new());
        let dyn_surface: Arc<dyn PlaybackSurface> = memory.clone();
        (memory, dyn_surface)
    }

    #[tokio::test]
    async fn test_bind_plain_uri() {
        let env = SimEnvironment::new();
        let (memory, surface) = surface();

        let outcome = env
            .binder()
            .bind(
                &surface,
                &"clip.mp4".into(),
                Classification::Plain { media: MediaKind::Video },
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(matches!(outcome, BindOutcome::Bound(BoundEngine::Plain)));
        assert_eq!(memory.src().as_deref(), Some("clip.mp4"));
        assert_eq!(env.host.total_loads(), 0);
    }

    #[tokio::test]
    async fn test_bind_plain_array_uses_alternatives() {
        let env = SimEnvironment::new();
        let (memory, surface) = surface();
        let sources = vec![
            MediaSource::typed("a.webm", "video/webm"),
            MediaSource::from("a.mp4"),
        ];

        env.binder()
            .bind(
                &surface,
                &SourceDescriptor::Sources(sources.clone()),
                Classification::Plain { media: MediaKind::Video },
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(memory.src(), None);
        assert_eq!(memory.sources(), sources);
    }

    #[cfg(feature = "hls")]
    #[tokio::test]
    async fn test_bind_hls_loads_and_attaches() {
        let env = SimEnvironment::new();
        let (memory, surface) = surface();
        memory.set_source(Some("stale.mp4"));

        let outcome = env
            .binder()
            .bind(&surface, &"stream.m3u8".into(), Classification::Hls, &CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(outcome, BindOutcome::Bound(BoundEngine::Hls(_))));
        let log = env.hls.log();
        assert_eq!(log.created, 1);
        assert_eq!(log.loaded_sources, vec!["stream.m3u8".to_string()]);
        assert_eq!(log.attached, 1);
        assert_eq!(memory.src(), None);
        assert_eq!(env.host.load_count(&env.binder().sources().hls.url), 1);
    }

    #[cfg(feature = "dash")]
    #[tokio::test]
    async fn test_bind_dash_initializes_with_autoplay() {
        let env = SimEnvironment::new();
        let (_memory, surface) = surface();

        let outcome = env
            .binder()
            .bind(&surface, &"manifest.mpd".into(), Classification::Dash, &CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(outcome, BindOutcome::Bound(BoundEngine::Dash(_))));
        let log = env.dash.log();
        assert_eq!(log.created, 1);
        assert_eq!(log.initialized, vec![("manifest.mpd".to_string(), true)]);
    }

    #[cfg(feature = "hls")]
    #[tokio::test]
    async fn test_sdk_failure_becomes_engine_init_error() {
        let env = SimEnvironment::with_failing_scripts();
        let (_memory, surface) = surface();

        let err = env
            .binder()
            .bind(&surface, &"stream.m3u8".into(), Classification::Hls, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::EngineInit { engine: EngineKind::Hls, .. }));
        assert!(err.is_sdk_failure());
    }

    #[cfg(feature = "hls")]
    #[tokio::test]
    async fn test_construction_failure_is_engine_init_error() {
        let env = SimEnvironment::new();
        env.hls.fail_next_create("no MediaSource support");
        let (_memory, surface) = surface();

        let err = env
            .binder()
            .bind(&surface, &"stream.m3u8".into(), Classification::Hls, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::EngineInit { engine: EngineKind::Hls, .. }));
        assert!(!err.is_sdk_failure());
    }

    #[tokio::test]
    async fn test_cancelled_token_abandons_without_touching_surface() {
        let env = SimEnvironment::new();
        let (memory, surface) = surface();
        memory.set_source(Some("keep.mp4"));
        let token = CancellationToken::new();
        token.cancel();

        let outcome = env
            .binder()
            .bind(&surface, &"stream.m3u8".into(), Classification::Hls, &token)
            .await
            .unwrap();

        assert!(matches!(outcome, BindOutcome::Abandoned));
        assert_eq!(memory.src().as_deref(), Some("keep.mp4"));
        assert_eq!(env.hls.log().created, 0);
    }

    #[cfg(feature = "hls")]
    #[tokio::test]
    async fn test_forced_hls_on_array_uses_first_uri() {
        let env = SimEnvironment::new();
        let (memory, surface) = surface();
        let descriptor = SourceDescriptor::Sources(vec![
            MediaSource::from("live/main.m3u8"),
            MediaSource::typed("backup.mp4", "video/mp4"),
        ]);
        let config = crate::config::FileConfig::default().with_force_hls(true);
        let classification = crate::classify::classify(&descriptor, &config);
        assert_eq!(classification, Classification::Hls);

        let outcome = env
            .binder()
            .bind(&surface, &descriptor, classification, &CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(outcome, BindOutcome::Bound(BoundEngine::Hls(_))));
        assert_eq!(env.hls.log().loaded_sources, vec!["live/main.m3u8".to_string()]);
        assert!(memory.sources().is_empty());
    }

    #[cfg(all(feature = "hls", feature = "dash"))]
    #[tokio::test]
    async fn test_streaming_without_uri_is_invalid_source() {
        let env = SimEnvironment::new();
        let (_memory, surface) = surface();

        for (descriptor, classification) in [
            (SourceDescriptor::Sources(vec![]), Classification::Hls),
            (SourceDescriptor::from("  "), Classification::Dash),
        ] {
            let err = env
                .binder()
                .bind(&surface, &descriptor, classification, &CancellationToken::new())
                .await
                .unwrap_err();
            assert!(matches!(err, Error::InvalidSource(_)), "{:?}", descriptor);
        }
        assert_eq!(env.host.total_loads(), 0);
    }

    #[cfg(not(feature = "hls"))]
    #[tokio::test]
    async fn test_hls_unavailable_without_feature() {
        let env = SimEnvironment::new();
        let (_memory, surface) = surface();
        let descriptor = SourceDescriptor::from("stream.m3u8");
        let classification =
            crate::classify::classify(&descriptor, &crate::config::FileConfig::default());
        assert_eq!(classification, Classification::Hls);

        let err = env
            .binder()
            .bind(&surface, &descriptor, classification, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::EngineUnavailable { engine: EngineKind::Hls }));
        assert_eq!(env.host.total_loads(), 0);
    }

    #[cfg(not(feature = "dash"))]
    #[tokio::test]
    async fn test_dash_unavailable_without_feature() {
        let env = SimEnvironment::new();
        let (_memory, surface) = surface();
        let descriptor = SourceDescriptor::from("manifest.mpd");
        let classification =
            crate::classify::classify(&descriptor, &crate::config::FileConfig::default());
        assert_eq!(classification, Classification::Dash);

        let err = env
            .binder()
            .bind(&surface, &descriptor, classification, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::EngineUnavailable { engine: EngineKind::Dash }));
        assert_eq!(env.host.total_loads(), 0);
    }
}
