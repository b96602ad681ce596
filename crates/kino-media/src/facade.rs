//! Playback facade - uniform control surface over whatever is bound
//!
//! Commands fail with [`Error::NotBound`] until a bind has completed.
//! Derived queries return `None` ("unknown") until the surface has signalled
//! it can play.

use crate::{
    engine::BoundEngine,
    lifecycle::{PlaybackCallbacks, Readiness},
    lock,
    surface::PlaybackSurface,
    types::SeekTarget,
    Error, Result,
};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Engine slot shared between a mount and its facade
///
/// Holders clone the engine out and drop the guard before calling into it.
pub(crate) type EngineSlot = Arc<Mutex<Option<Arc<BoundEngine>>>>;

/// Control and query surface of one mount
pub struct PlaybackFacade {
    surface: Arc<dyn PlaybackSurface>,
    readiness: Readiness,
    engine: EngineSlot,
    callbacks: Arc<dyn PlaybackCallbacks>,
}

impl PlaybackFacade {
    pub(crate) fn new(
        surface: Arc<dyn PlaybackSurface>,
        readiness: Readiness,
        engine: EngineSlot,
        callbacks: Arc<dyn PlaybackCallbacks>,
    ) -> Self {
        Self {
            surface,
            readiness,
            engine,
            callbacks,
        }
    }

    /// Has a bind completed
    pub fn is_bound(&self) -> bool {
        lock(&self.engine).is_some()
    }

    pub fn is_ready(&self) -> bool {
        self.readiness.is_ready()
    }

    fn ensure_bound(&self) -> Result<()> {
        if self.is_bound() {
            Ok(())
        } else {
            Err(Error::NotBound)
        }
    }

    /// Request playback
    ///
    /// A rejected request (autoplay policy, decode failure) is delivered to
    /// the error callback; the returned result only reports `NotBound`.
    pub async fn play(&self) -> Result<()> {
        self.ensure_bound()?;
        if let Err(error) = self.surface.play().await {
            warn!(code = %error.code, message = %error.message, "Play request rejected");
            self.callbacks.on_error(&error);
        }
        Ok(())
    }

    pub fn pause(&self) -> Result<()> {
        self.ensure_bound()?;
        self.surface.pause();
        Ok(())
    }

    /// Clear the surface source and detach any streaming engine from it
    pub fn stop(&self) -> Result<()> {
        let engine = lock(&self.engine).clone().ok_or(Error::NotBound)?;
        self.surface.set_source(None);
        engine.detach();
        debug!(engine = ?engine, "Playback stopped");
        Ok(())
    }

    /// Seek to seconds or to a fraction of the duration
    ///
    /// Returns the resolved position in seconds.
    pub fn seek_to(&self, target: impl Into<SeekTarget>) -> Result<f64> {
        self.ensure_bound()?;
        let target = target.into();
        let seconds = target
            .resolve(self.duration())
            .ok_or(Error::DurationUnknown)?;
        debug!(?target, seconds, "Seeking");
        self.surface.set_current_time(seconds);
        Ok(seconds)
    }

    pub fn set_volume(&self, fraction: f64) -> Result<()> {
        self.ensure_bound()?;
        self.surface.set_volume(fraction);
        Ok(())
    }

    pub fn set_playback_rate(&self, rate: f64) -> Result<()> {
        self.ensure_bound()?;
        self.surface.set_playback_rate(rate);
        Ok(())
    }

    /// Total duration in seconds; infinite for live streams
    ///
    /// Unknown until a bind has completed and its source is ready.
    pub fn duration(&self) -> Option<f64> {
        if !self.is_bound() || !self.readiness.is_ready() {
            return None;
        }
        let duration = self.surface.duration();
        (!duration.is_nan()).then_some(duration)
    }

    /// Position as a fraction of the duration
    pub fn fraction_played(&self) -> Option<f64> {
        let duration = self.usable_duration()?;
        Some(self.surface.current_time() / duration)
    }

    /// End of the first buffered range as a fraction of the duration
    ///
    /// Only the first contiguous range counts; later ranges are ignored.
    pub fn fraction_loaded(&self) -> Option<f64> {
        let duration = self.usable_duration()?;
        let (_, end) = self.surface.buffered().first().copied()?;
        Some(end / duration)
    }

    fn usable_duration(&self) -> Option<f64> {
        self.duration().filter(|d| *d > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventSink, PlaybackEvent};
    use crate::sim::MemorySurface;
    use crate::types::{MediaError, MediaErrorCode};

    struct Fixture {
        memory: Arc<MemorySurface>,
        readiness: Readiness,
        engine: EngineSlot,
        facade: PlaybackFacade,
        events: tokio::sync::mpsc::UnboundedReceiver<PlaybackEvent>,
    }

    fn fixture() -> Fixture {
        let memory = Arc::new(MemorySurface::new());
        let readiness = Readiness::new();
        let engine: EngineSlot = Arc::new(Mutex::new(None));
        let (sink, events) = EventSink::channel();
        let facade = PlaybackFacade::new(memory.clone(), readiness.clone(), engine.clone(), sink);
        Fixture {
            memory,
            readiness,
            engine,
            facade,
            events,
        }
    }

    fn bind_plain(fixture: &Fixture) {
        *fixture.engine.lock().unwrap() = Some(Arc::new(BoundEngine::Plain));
    }

    #[tokio::test]
    async fn test_commands_fail_before_bind() {
        let f = fixture();

        assert!(matches!(f.facade.play().await, Err(Error::NotBound)));
        assert!(matches!(f.facade.pause(), Err(Error::NotBound)));
        assert!(matches!(f.facade.stop(), Err(Error::NotBound)));
        assert!(matches!(f.facade.seek_to(10.0), Err(Error::NotBound)));
        assert!(matches!(f.facade.set_volume(0.5), Err(Error::NotBound)));
        assert!(matches!(f.facade.set_playback_rate(2.0), Err(Error::NotBound)));
    }

    #[test]
    fn test_queries_unknown_before_ready() {
        let f = fixture();
        bind_plain(&f);
        f.memory.set_media_duration(60.0);
        f.memory.set_buffered(vec![(0.0, 30.0)]);

        assert_eq!(f.facade.duration(), None);
        assert_eq!(f.facade.fraction_played(), None);
        assert_eq!(f.facade.fraction_loaded(), None);

        f.readiness.mark_ready();
        assert_eq!(f.facade.duration(), Some(60.0));
        assert_eq!(f.facade.fraction_played(), Some(0.0));
        assert_eq!(f.facade.fraction_loaded(), Some(0.5));
    }

    #[test]
    fn test_fraction_loaded_uses_first_range_only() {
        let f = fixture();
        bind_plain(&f);
        f.readiness.mark_ready();
        f.memory.set_media_duration(100.0);

        f.memory.set_buffered(vec![]);
        assert_eq!(f.facade.fraction_loaded(), None);

        f.memory.set_buffered(vec![(0.0, 10.0), (50.0, 90.0)]);
        assert_eq!(f.facade.fraction_loaded(), Some(0.1));
    }

    #[test]
    fn test_seek_resolves_fraction() {
        let f = fixture();
        bind_plain(&f);
        f.memory.set_media_duration(80.0);

        assert!(matches!(f.facade.seek_to(0.25), Err(Error::DurationUnknown)));

        f.readiness.mark_ready();
        assert_eq!(f.facade.seek_to(0.25).unwrap(), 20.0);
        assert_eq!(f.memory.current_time(), 20.0);
        assert_eq!(f.facade.seek_to(SeekTarget::Seconds(30.0)).unwrap(), 30.0);
        assert_eq!(f.facade.fraction_played(), Some(30.0 / 80.0));
    }

    #[test]
    fn test_volume_and_rate_pass_through() {
        let f = fixture();
        bind_plain(&f);

        f.facade.set_volume(0.3).unwrap();
        f.facade.set_playback_rate(1.5).unwrap();

        assert_eq!(f.memory.volume(), 0.3);
        assert_eq!(f.memory.playback_rate(), 1.5);
    }

    #[tokio::test]
    async fn test_rejected_play_goes_to_error_callback() {
        let mut f = fixture();
        bind_plain(&f);
        let error = MediaError::new(MediaErrorCode::NotAllowed, "autoplay blocked");
        f.memory.reject_play(error.clone());

        assert!(f.facade.play().await.is_ok());
        assert_eq!(f.events.try_recv().unwrap(), PlaybackEvent::Error(error));
    }

    #[test]
    fn test_stop_clears_source_and_pause_is_idempotent() {
        let f = fixture();
        bind_plain(&f);
        f.memory.set_source(Some("clip.mp4"));

        f.facade.pause().unwrap();
        f.facade.pause().unwrap();
        f.facade.stop().unwrap();

        assert_eq!(f.memory.src(), None);
        assert!(f.memory.is_paused());
        assert!(f.facade.is_bound());
    }

    #[test]
    fn test_queries_unknown_while_unbound() {
        let f = fixture();
        f.memory.set_media_duration(60.0);
        f.memory.set_buffered(vec![(0.0, 30.0)]);
        f.readiness.mark_ready();

        assert_eq!(f.facade.duration(), None);
        assert_eq!(f.facade.fraction_played(), None);
        assert_eq!(f.facade.fraction_loaded(), None);

        bind_plain(&f);
        assert_eq!(f.facade.duration(), Some(60.0));
    }

    /// HLS instance that looks at the engine slot while detaching
    struct SlotCheckingHls {
        slot: EngineSlot,
        saw_bound: Arc<std::sync::atomic::AtomicBool>,
    }

    impl crate::engine::HlsInstance for SlotCheckingHls {
        fn load_source(&self, _uri: &str) -> Result<()> {
            Ok(())
        }

        fn attach_media(&self, _surface: Arc<dyn PlaybackSurface>) -> Result<()> {
            Ok(())
        }

        fn detach_media(&self) {
            let bound = lock(&self.slot).is_some();
            self.saw_bound
                .store(bound, std::sync::atomic::Ordering::SeqCst);
        }

        fn destroy(&self) {}
    }

    #[test]
    fn test_stop_does_not_hold_slot_during_detach() {
        let f = fixture();
        let saw_bound = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let hls = SlotCheckingHls {
            slot: f.engine.clone(),
            saw_bound: saw_bound.clone(),
        };
        *f.engine.lock().unwrap() = Some(Arc::new(BoundEngine::Hls(Box::new(hls))));

        f.facade.stop().unwrap();

        assert!(saw_bound.load(std::sync::atomic::Ordering::SeqCst));
        assert!(f.facade.is_bound());
    }
}
