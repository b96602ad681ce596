//! In-memory host environment
//!
//! A playback surface, a script host and HLS/DASH engines that live
//! entirely in memory. They record what the bridge does to them and let a
//! driver fire native signals by hand, for headless runs (`kino-cli simulate`)
//! and tests.

use crate::{
    config::{EngineSource, EngineSources},
    engine::{DashEngine, DashPlayer, EngineBinder, HlsEngine, HlsInstance},
    lock,
    sdk::{EngineCapability, ScriptHost, SdkLoader},
    surface::{
        ListenerId, NativeEvent, NativeEventKind, NativeListener, PlaybackSurface, TimeRanges,
    },
    types::{MediaError, MediaSource},
    Error, Result,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::Semaphore;
use tracing::debug;

// =============================================================================
// Surface
// =============================================================================

struct SurfaceState {
    src: Option<String>,
    sources: Vec<MediaSource>,
    attributes: BTreeMap<String, String>,
    current_time: f64,
    duration: f64,
    volume: f64,
    playback_rate: f64,
    paused: bool,
    buffered: TimeRanges,
    play_error: Option<MediaError>,
    settle_override: Option<f64>,
    on_listener_removal: Option<NativeEvent>,
    listeners: BTreeMap<ListenerId, (NativeEventKind, NativeListener)>,
    next_listener: u64,
}

/// Playback surface held in memory
pub struct MemorySurface {
    state: Mutex<SurfaceState>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SurfaceState {
                src: None,
                sources: Vec::new(),
                attributes: BTreeMap::new(),
                current_time: 0.0,
                duration: f64::NAN,
                volume: 1.0,
                playback_rate: 1.0,
                paused: true,
                buffered: Vec::new(),
                play_error: None,
                settle_override: None,
                on_listener_removal: None,
                listeners: BTreeMap::new(),
                next_listener: 0,
            }),
        }
    }

    /// Fire a native signal at the registered listeners
    pub fn dispatch(&self, event: NativeEvent) {
        let kind = event.kind();
        let listeners: Vec<NativeListener> = lock(&self.state)
            .listeners
            .values()
            .filter(|(k, _)| *k == kind)
            .map(|(_, listener)| listener.clone())
            .collect();

        debug!(event = %kind, listeners = listeners.len(), "Dispatching native event");
        for listener in listeners {
            listener(&event);
        }
    }

    /// Media metadata as the decoder would report it
    pub fn set_media_duration(&self, seconds: f64) {
        lock(&self.state).duration = seconds;
    }

    pub fn set_buffered(&self, ranges: TimeRanges) {
        lock(&self.state).buffered = ranges;
    }

    /// Make the next seek settle somewhere other than requested
    pub fn settle_seek_at(&self, seconds: f64) {
        lock(&self.state).settle_override = Some(seconds);
    }

    /// Reject the next play request
    pub fn reject_play(&self, error: MediaError) {
        lock(&self.state).play_error = Some(error);
    }

    /// Fire `event` when the next listener is removed
    pub fn dispatch_on_listener_removal(&self, event: NativeEvent) {
        lock(&self.state).on_listener_removal = Some(event);
    }

    pub fn src(&self) -> Option<String> {
        lock(&self.state).src.clone()
    }

    pub fn sources(&self) -> Vec<MediaSource> {
        lock(&self.state).sources.clone()
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        lock(&self.state).attributes.get(name).cloned()
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.state).listeners.len()
    }

    pub fn volume(&self) -> f64 {
        lock(&self.state).volume
    }

    pub fn playback_rate(&self) -> f64 {
        lock(&self.state).playback_rate
    }

    pub fn is_paused(&self) -> bool {
        lock(&self.state).paused
    }
}

impl Default for MemorySurface {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlaybackSurface for MemorySurface {
    fn set_source(&self, uri: Option<&str>) {
        lock(&self.state).src = uri.map(str::to_string);
    }

    fn set_alternative_sources(&self, sources: &[MediaSource]) {
        lock(&self.state).sources = sources.to_vec();
    }

    fn set_attribute(&self, name: &str, value: &str) {
        lock(&self.state)
            .attributes
            .insert(name.to_string(), value.to_string());
    }

    fn add_listener(&self, kind: NativeEventKind, listener: NativeListener) -> ListenerId {
        let mut state = lock(&self.state);
        state.next_listener += 1;
        let id = ListenerId(state.next_listener);
        state.listeners.insert(id, (kind, listener));
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        let pending = {
            let mut state = lock(&self.state);
            state.listeners.remove(&id);
            state.on_listener_removal.take()
        };
        if let Some(event) = pending {
            self.dispatch(event);
        }
    }

    async fn play(&self) -> std::result::Result<(), MediaError> {
        let rejected = {
            let mut state = lock(&self.state);
            match state.play_error.take() {
                Some(error) => Some(error),
                None => {
                    state.paused = false;
                    None
                }
            }
        };
        match rejected {
            Some(error) => Err(error),
            None => {
                self.dispatch(NativeEvent::Play);
                Ok(())
            }
        }
    }

    fn pause(&self) {
        let was_playing = {
            let mut state = lock(&self.state);
            let was_playing = !state.paused;
            state.paused = true;
            was_playing
        };
        if was_playing {
            self.dispatch(NativeEvent::Pause);
        }
    }

    fn current_time(&self) -> f64 {
        lock(&self.state).current_time
    }

    fn set_current_time(&self, seconds: f64) {
        {
            let mut state = lock(&self.state);
            let mut settled = seconds.max(0.0);
            if state.duration.is_finite() {
                settled = settled.min(state.duration);
            }
            state.current_time = state.settle_override.take().unwrap_or(settled);
        }
        self.dispatch(NativeEvent::Seeked);
    }

    fn duration(&self) -> f64 {
        lock(&self.state).duration
    }

    fn set_volume(&self, fraction: f64) {
        lock(&self.state).volume = fraction;
    }

    fn set_playback_rate(&self, rate: f64) {
        lock(&self.state).playback_rate = rate;
    }

    fn buffered(&self) -> TimeRanges {
        lock(&self.state).buffered.clone()
    }
}

// =============================================================================
// Engines
// =============================================================================

/// What the HLS engine was asked to do
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HlsLog {
    pub created: usize,
    pub loaded_sources: Vec<String>,
    pub attached: usize,
    pub detached: usize,
    pub destroyed: usize,
}

/// HLS engine that records instead of streaming
#[derive(Default)]
pub struct MemoryHlsEngine {
    log: Arc<Mutex<HlsLog>>,
    fail_next: Mutex<Option<String>>,
}

impl MemoryHlsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> HlsLog {
        lock(&self.log).clone()
    }

    /// Make the next `create` fail
    pub fn fail_next_create(&self, reason: impl Into<String>) {
        *lock(&self.fail_next) = Some(reason.into());
    }
}

impl HlsEngine for MemoryHlsEngine {
    fn create(&self) -> Result<Box<dyn HlsInstance>> {
        if let Some(reason) = lock(&self.fail_next).take() {
            return Err(Error::Engine(reason));
        }
        lock(&self.log).created += 1;
        Ok(Box::new(MemoryHlsInstance {
            log: self.log.clone(),
            surface: Mutex::new(None),
        }))
    }
}

struct MemoryHlsInstance {
    log: Arc<Mutex<HlsLog>>,
    surface: Mutex<Option<Weak<dyn PlaybackSurface>>>,
}

impl HlsInstance for MemoryHlsInstance {
    fn load_source(&self, uri: &str) -> Result<()> {
        lock(&self.log).loaded_sources.push(uri.to_string());
        Ok(())
    }

    fn attach_media(&self, surface: Arc<dyn PlaybackSurface>) -> Result<()> {
        *lock(&self.surface) = Some(Arc::downgrade(&surface));
        lock(&self.log).attached += 1;
        Ok(())
    }

    fn detach_media(&self) {
        if lock(&self.surface).take().is_some() {
            lock(&self.log).detached += 1;
        }
    }

    fn destroy(&self) {
        lock(&self.log).destroyed += 1;
    }
}

/// What the DASH engine was asked to do
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashLog {
    pub created: usize,
    /// `(uri, autoplay)` per initialize call
    pub initialized: Vec<(String, bool)>,
    pub resets: usize,
}

/// DASH engine that records instead of streaming
#[derive(Default)]
pub struct MemoryDashEngine {
    log: Arc<Mutex<DashLog>>,
}

impl MemoryDashEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> DashLog {
        lock(&self.log).clone()
    }
}

impl DashEngine for MemoryDashEngine {
    fn create_player(&self) -> Result<Box<dyn DashPlayer>> {
        lock(&self.log).created += 1;
        Ok(Box::new(MemoryDashPlayer {
            log: self.log.clone(),
        }))
    }
}

struct MemoryDashPlayer {
    log: Arc<Mutex<DashLog>>,
}

impl DashPlayer for MemoryDashPlayer {
    fn initialize(&self, _surface: Arc<dyn PlaybackSurface>, uri: &str, autoplay: bool) -> Result<()> {
        lock(&self.log).initialized.push((uri.to_string(), autoplay));
        Ok(())
    }

    fn reset(&self) {
        lock(&self.log).resets += 1;
    }
}

// =============================================================================
// Script host
// =============================================================================

#[derive(Clone)]
enum ScriptBehavior {
    Installs {
        global: String,
        capability: EngineCapability,
    },
    Fails(String),
    Empty,
}

/// Script environment with a fixed set of known scripts
///
/// Unknown script URLs fail as a 404 would.
#[derive(Default)]
pub struct MemoryScriptHost {
    globals: Mutex<HashMap<String, EngineCapability>>,
    scripts: Mutex<HashMap<String, ScriptBehavior>>,
    loads: Mutex<HashMap<String, usize>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
}

impl MemoryScriptHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A global that is present before any script loads
    pub fn with_global(self, name: impl Into<String>, capability: EngineCapability) -> Self {
        lock(&self.globals).insert(name.into(), capability);
        self
    }

    /// A script that registers the engine under the source's global
    pub fn with_engine(self, source: &EngineSource, capability: EngineCapability) -> Self {
        lock(&self.scripts).insert(
            source.url.clone(),
            ScriptBehavior::Installs {
                global: source.global.clone(),
                capability,
            },
        );
        self
    }

    /// A script whose fetch fails
    pub fn with_failing_script(self, url: impl Into<String>) -> Self {
        lock(&self.scripts).insert(url.into(), ScriptBehavior::Fails("network error".to_string()));
        self
    }

    /// A script that loads but registers nothing
    pub fn with_empty_script(self, url: impl Into<String>) -> Self {
        lock(&self.scripts).insert(url.into(), ScriptBehavior::Empty);
        self
    }

    /// Hold every script load until [`release_loads`](Self::release_loads)
    pub fn hold_loads(&self) {
        *lock(&self.gate) = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let held and future script loads complete
    pub fn release_loads(&self) {
        if let Some(gate) = lock(&self.gate).take() {
            gate.close();
        }
    }

    /// Number of load requests issued for a URL
    pub fn load_count(&self, url: &str) -> usize {
        lock(&self.loads).get(url).copied().unwrap_or(0)
    }

    pub fn total_loads(&self) -> usize {
        lock(&self.loads).values().sum()
    }
}

#[async_trait]
impl ScriptHost for MemoryScriptHost {
    fn lookup_global(&self, name: &str) -> Option<EngineCapability> {
        lock(&self.globals).get(name).cloned()
    }

    async fn load_script(&self, url: &str) -> std::result::Result<(), String> {
        *lock(&self.loads).entry(url.to_string()).or_insert(0) += 1;

        let gate = lock(&self.gate).clone();
        if let Some(gate) = gate {
            // Closed when released
            let _ = gate.acquire().await;
        }

        let behavior = lock(&self.scripts).get(url).cloned();
        match behavior {
            Some(ScriptBehavior::Installs { global, capability }) => {
                lock(&self.globals).insert(global, capability);
                Ok(())
            }
            Some(ScriptBehavior::Empty) => Ok(()),
            Some(ScriptBehavior::Fails(reason)) => Err(reason),
            None => Err("404 Not Found".to_string()),
        }
    }
}

// =============================================================================
// Environment
// =============================================================================

/// Script host with both memory engines registered at their script URLs
pub struct SimEnvironment {
    pub host: Arc<MemoryScriptHost>,
    pub hls: Arc<MemoryHlsEngine>,
    pub dash: Arc<MemoryDashEngine>,
    loader: SdkLoader,
    sources: EngineSources,
}

impl SimEnvironment {
    /// Engines served from the well-known script URLs
    pub fn new() -> Self {
        Self::with_sources(EngineSources::default())
    }

    /// Engines served from custom script URLs
    pub fn with_sources(sources: EngineSources) -> Self {
        let hls = Arc::new(MemoryHlsEngine::new());
        let dash = Arc::new(MemoryDashEngine::new());
        let host = MemoryScriptHost::new()
            .with_engine(&sources.hls, EngineCapability::Hls(hls.clone()))
            .with_engine(&sources.dash, EngineCapability::Dash(dash.clone()));
        Self::assemble(host, hls, dash, sources)
    }

    /// Both engine scripts fail to load
    pub fn with_failing_scripts() -> Self {
        let sources = EngineSources::default();
        let host = MemoryScriptHost::new()
            .with_failing_script(sources.hls.url.clone())
            .with_failing_script(sources.dash.url.clone());
        Self::assemble(
            host,
            Arc::new(MemoryHlsEngine::new()),
            Arc::new(MemoryDashEngine::new()),
            sources,
        )
    }

    fn assemble(
        host: MemoryScriptHost,
        hls: Arc<MemoryHlsEngine>,
        dash: Arc<MemoryDashEngine>,
        sources: EngineSources,
    ) -> Self {
        let host = Arc::new(host);
        let loader = SdkLoader::new(host.clone());
        Self {
            host,
            hls,
            dash,
            loader,
            sources,
        }
    }

    /// Loader shared by every binder of this environment
    pub fn loader(&self) -> &SdkLoader {
        &self.loader
    }

    /// A binder sharing this environment's SDK cache
    pub fn binder(&self) -> EngineBinder {
        EngineBinder::with_sources(self.loader.clone(), self.sources.clone())
    }
}

impl Default for SimEnvironment {
    fn default() -> Self {
        Self::new()
    }
}
