//! Engine SDK loader
//!
//! Streaming engines ship as scripts that register a global. The loader
//! fetches each one at most once per process:
//! - a global that is already present resolves without any fetch
//! - concurrent callers share one in-flight load
//! - a completed load is cached for the loader's lifetime
//! - a failed load is dropped from the cache; callers re-trigger explicitly
//!
//! After a script loads, the expected global must be present and of the
//! expected engine kind, otherwise the load fails with
//! [`SdkError::Integrity`].

use crate::{
    config::EngineSource,
    engine::{DashEngine, HlsEngine},
    error::SdkError,
    types::EngineKind,
};
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// A loaded engine as exposed by its global
#[derive(Clone)]
pub enum EngineCapability {
    Hls(Arc<dyn HlsEngine>),
    Dash(Arc<dyn DashEngine>),
}

impl EngineCapability {
    pub fn kind(&self) -> EngineKind {
        match self {
            EngineCapability::Hls(_) => EngineKind::Hls,
            EngineCapability::Dash(_) => EngineKind::Dash,
        }
    }

    /// Both values refer to the same engine object
    pub fn same_engine(&self, other: &EngineCapability) -> bool {
        match (self, other) {
            (EngineCapability::Hls(a), EngineCapability::Hls(b)) => Arc::ptr_eq(a, b),
            (EngineCapability::Dash(a), EngineCapability::Dash(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl std::fmt::Debug for EngineCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EngineCapability({})", self.kind())
    }
}

/// Host environment the engines are loaded into
#[async_trait]
pub trait ScriptHost: Send + Sync {
    /// Look up a global registered by a loaded script
    fn lookup_global(&self, name: &str) -> Option<EngineCapability>;

    /// Inject and load a script; the error is the host's failure reason
    async fn load_script(&self, url: &str) -> std::result::Result<(), String>;
}

type SharedLoad = Shared<BoxFuture<'static, std::result::Result<EngineCapability, SdkError>>>;

enum SdkSlot {
    Pending(SharedLoad),
    Loaded(EngineCapability),
}

/// Acquisition state of one engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdkState {
    NotStarted,
    Pending,
    Loaded,
}

/// Memoizing engine loader, keyed by global name
///
/// Cloning shares the cache; create one per process and hand clones to
/// every mount.
#[derive(Clone)]
pub struct SdkLoader {
    host: Arc<dyn ScriptHost>,
    slots: Arc<Mutex<HashMap<String, SdkSlot>>>,
}

impl SdkLoader {
    /// Create a loader over a host environment
    pub fn new(host: Arc<dyn ScriptHost>) -> Self {
        Self {
            host,
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Acquisition state for a global name
    pub async fn state(&self, global: &str) -> SdkState {
        match self.slots.lock().await.get(global) {
            None => SdkState::NotStarted,
            Some(SdkSlot::Pending(_)) => SdkState::Pending,
            Some(SdkSlot::Loaded(_)) => SdkState::Loaded,
        }
    }

    /// Acquire an engine, loading its script at most once
    #[instrument(skip(self), fields(global = %source.global))]
    pub async fn acquire(
        &self,
        source: &EngineSource,
        kind: EngineKind,
    ) -> std::result::Result<EngineCapability, SdkError> {
        let load = {
            let mut slots = self.slots.lock().await;
            match slots.get(&source.global) {
                Some(SdkSlot::Loaded(capability)) => {
                    debug!("Engine SDK already loaded");
                    return Ok(capability.clone());
                }
                Some(SdkSlot::Pending(load)) => {
                    debug!("Joining in-flight engine SDK load");
                    load.clone()
                }
                None => {
                    if let Some(capability) = self.host.lookup_global(&source.global) {
                        if capability.kind() != kind {
                            warn!(found = %capability.kind(), expected = %kind, "Global has the wrong engine kind");
                            return Err(SdkError::Integrity {
                                url: source.url.clone(),
                                global: source.global.clone(),
                            });
                        }
                        debug!("Engine global already present");
                        slots.insert(source.global.clone(), SdkSlot::Loaded(capability.clone()));
                        return Ok(capability);
                    }

                    let load = load_engine(self.host.clone(), source.clone(), kind)
                        .boxed()
                        .shared();
                    slots.insert(source.global.clone(), SdkSlot::Pending(load.clone()));
                    load
                }
            }
        };

        let result = load.clone().await;

        // Only the load we waited on may settle its slot; a later acquire may
        // already have replaced a failed one.
        let mut slots = self.slots.lock().await;
        let settles = matches!(
            slots.get(&source.global),
            Some(SdkSlot::Pending(pending)) if pending.ptr_eq(&load)
        );
        if settles {
            match &result {
                Ok(capability) => {
                    slots.insert(source.global.clone(), SdkSlot::Loaded(capability.clone()));
                }
                Err(_) => {
                    slots.remove(&source.global);
                }
            }
        }

        result
    }
}

async fn load_engine(
    host: Arc<dyn ScriptHost>,
    source: EngineSource,
    kind: EngineKind,
) -> std::result::Result<EngineCapability, SdkError> {
    info!(url = %source.url, engine = %kind, "Loading engine SDK");

    if let Err(reason) = host.load_script(&source.url).await {
        warn!(url = %source.url, reason = %reason, "Engine SDK failed to load");
        return Err(SdkError::Load {
            url: source.url,
            reason,
        });
    }

    match host.lookup_global(&source.global) {
        Some(capability) if capability.kind() == kind => {
            info!(url = %source.url, engine = %kind, "Engine SDK loaded");
            Ok(capability)
        }
        _ => {
            warn!(url = %source.url, global = %source.global, "Engine SDK loaded without its global");
            Err(SdkError::Integrity {
                url: source.url,
                global: source.global,
            })
        }
    }
}
