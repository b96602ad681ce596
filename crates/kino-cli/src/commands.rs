//! CLI command implementations

use crate::output::{format_output, or_unknown};
use crate::ConfigArgs;
use anyhow::Context;
use kino_media::sim::{MemorySurface, SimEnvironment};
use kino_media::{
    can_play, classify as classify_source, Classification, EngineKind, EventSink, FileConfig,
    LoadOutcome, MediaKind, MediaMount, NativeEvent, PlaybackEvent, RenderProps, SeekTarget,
    SourceDescriptor, SurfacePlan,
};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Load the backend configuration and apply the force flags on top
pub fn load_config(args: &ConfigArgs) -> anyhow::Result<FileConfig> {
    let config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            FileConfig::from_json(&json)?
        }
        None => FileConfig::default(),
    };

    Ok(FileConfig {
        force_audio: config.force_audio || args.force_audio,
        force_hls: config.force_hls || args.force_hls,
        force_dash: config.force_dash || args.force_dash,
        ..config
    })
}

/// A bare URI, or a descriptor written as JSON
fn parse_source(input: &str) -> anyhow::Result<SourceDescriptor> {
    let trimmed = input.trim_start();
    if trimmed.starts_with('[') || trimmed.starts_with('"') {
        Ok(SourceDescriptor::from_json(trimmed)?)
    } else {
        Ok(SourceDescriptor::from(input))
    }
}

#[derive(Serialize)]
struct ClassifyReport {
    source: SourceDescriptor,
    classification: Classification,
    element: MediaKind,
    engine: Option<EngineKind>,
    can_play: bool,
}

impl fmt::Display for ClassifyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Source: {}", self.source)?;
        writeln!(f, "  Classification: {}", self.classification)?;
        writeln!(f, "  Element: {}", self.element)?;
        match self.engine {
            Some(engine) => writeln!(f, "  Engine: {}", engine)?,
            None => writeln!(f, "  Engine: none (native decode)")?,
        }
        write!(f, "  Playable: {}", self.can_play)
    }
}

/// Classify a source descriptor
pub fn classify(source: &str, config: &FileConfig, format: &str) -> anyhow::Result<()> {
    let descriptor = parse_source(source)?;
    let classification = classify_source(&descriptor, config);
    debug!(source = %descriptor, classification = %classification, "Classified");

    let report = ClassifyReport {
        can_play: can_play(&descriptor),
        element: classification.media_kind(),
        engine: classification.engine(),
        classification,
        source: descriptor,
    };
    println!("{}", format_output(&report, format)?);
    Ok(())
}

#[derive(Serialize)]
#[serde(transparent)]
struct PlanReport(SurfacePlan);

impl fmt::Display for PlanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plan = &self.0;
        writeln!(f, "Surface Plan:")?;
        writeln!(f, "  Element: <{}>", plan.element)?;
        writeln!(f, "  src: {}", plan.src.as_deref().unwrap_or("(none)"))?;
        writeln!(f, "  preload: {}", plan.preload)?;
        writeln!(f, "  controls: {}  loop: {}", plan.controls, plan.loop_playback)?;
        writeln!(
            f,
            "  style: width={} height={} display={:?}",
            plan.style.width.as_deref().unwrap_or("-"),
            plan.style.height.as_deref().unwrap_or("-"),
            plan.style.display,
        )?;

        if !plan.sources.is_empty() {
            writeln!(f, "\nSources:")?;
            for (i, source) in plan.sources.iter().enumerate() {
                writeln!(
                    f,
                    "  {}. {} {}",
                    i + 1,
                    source.uri(),
                    source.mime_type().unwrap_or("")
                )?;
            }
        }
        if !plan.tracks.is_empty() {
            writeln!(f, "\nTracks:")?;
            for track in &plan.tracks {
                writeln!(
                    f,
                    "  {} {} [{}]{}",
                    track.kind,
                    track.src,
                    track.srclang.as_deref().unwrap_or("-"),
                    if track.is_default { " default" } else { "" }
                )?;
            }
        }
        if !plan.attributes.is_empty() {
            writeln!(f, "\nAttributes:")?;
            for (name, value) in &plan.attributes {
                writeln!(f, "  {}=\"{}\"", name, value)?;
            }
        }
        Ok(())
    }
}

/// Show the surface plan for a source
pub fn plan(
    source: &str,
    config: &FileConfig,
    props: &RenderProps,
    format: &str,
) -> anyhow::Result<()> {
    let descriptor = parse_source(source)?;
    let report = PlanReport(SurfacePlan::build(&descriptor, config, props));
    println!("{}", format_output(&report, format)?);
    Ok(())
}

/// Knobs for a simulated session
pub struct SimulateOptions {
    pub duration: f64,
    pub buffered: f64,
    pub fail_sdk: bool,
    pub unmount_early: bool,
}

#[derive(Serialize)]
struct SimulationReport {
    source: SourceDescriptor,
    outcome: String,
    classification: Option<Classification>,
    sdk_loads: usize,
    duration: Option<f64>,
    fraction_played: Option<f64>,
    fraction_loaded: Option<f64>,
    events: Vec<PlaybackEvent>,
    error: Option<String>,
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Simulation: {}", self.source)?;
        writeln!(f, "  Outcome: {}", self.outcome)?;
        if let Some(classification) = self.classification {
            writeln!(f, "  Classification: {}", classification)?;
        }
        writeln!(f, "  SDK loads: {}", self.sdk_loads)?;
        writeln!(f, "  Duration: {}", or_unknown(self.duration))?;
        writeln!(f, "  Played: {}", or_unknown(self.fraction_played))?;
        writeln!(f, "  Loaded: {}", or_unknown(self.fraction_loaded))?;
        if let Some(error) = &self.error {
            writeln!(f, "  Error: {}", error)?;
        }

        writeln!(f, "\nEvents:")?;
        if self.events.is_empty() {
            write!(f, "  (none)")?;
        }
        for (i, event) in self.events.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  {}. {}", i + 1, event)?;
        }
        Ok(())
    }
}

/// Mount a source on an in-memory surface and drive a short session
pub async fn simulate(
    source: &str,
    config: FileConfig,
    options: SimulateOptions,
    format: &str,
) -> anyhow::Result<()> {
    let descriptor = parse_source(source)?;
    let env = if options.fail_sdk {
        SimEnvironment::with_failing_scripts()
    } else {
        SimEnvironment::new()
    };

    let surface = Arc::new(MemorySurface::new());
    let (sink, mut events) = EventSink::channel();
    let mount = MediaMount::new(surface.clone(), config, env.binder(), sink);
    info!(mount_id = %mount.id(), source = %descriptor, "Simulating");

    let mut report = SimulationReport {
        source: descriptor.clone(),
        outcome: String::new(),
        classification: None,
        sdk_loads: 0,
        duration: None,
        fraction_played: None,
        fraction_loaded: None,
        events: Vec::new(),
        error: None,
    };

    let loaded = if options.unmount_early {
        env.host.hold_loads();
        let (loaded, _) = tokio::join!(mount.load(descriptor), async {
            tokio::task::yield_now().await;
            mount.unmount();
            env.host.release_loads();
        });
        loaded
    } else {
        mount.load(descriptor).await
    };

    match loaded {
        Ok(LoadOutcome::Bound(classification)) => {
            report.outcome = "bound".to_string();
            report.classification = Some(classification);
            if mount.is_mounted() {
                drive_session(&mount, &surface, &options, &mut report).await?;
            }
        }
        Ok(LoadOutcome::Abandoned) => {
            report.outcome = "abandoned".to_string();
            report.classification = mount.classification();
        }
        Err(err) => {
            report.outcome = "failed".to_string();
            report.classification = mount.classification();
            report.error = Some(format!("[{}] {}", err.error_code(), err));
        }
    }

    mount.unmount();
    report.sdk_loads = env.host.total_loads();
    report.events = std::iter::from_fn(|| events.try_recv().ok()).collect();

    println!("{}", format_output(&report, format)?);

    if report.error.is_some() {
        std::process::exit(1);
    }

    Ok(())
}

/// Ready, play, seek halfway, pause, end
async fn drive_session(
    mount: &MediaMount,
    surface: &MemorySurface,
    options: &SimulateOptions,
    report: &mut SimulationReport,
) -> anyhow::Result<()> {
    let facade = mount.facade();

    surface.set_media_duration(options.duration);
    surface.set_buffered(vec![(0.0, options.buffered)]);
    surface.dispatch(NativeEvent::CanPlay);

    facade.play().await?;
    facade.seek_to(SeekTarget::Fraction(0.5))?;

    report.duration = facade.duration();
    report.fraction_played = facade.fraction_played();
    report.fraction_loaded = facade.fraction_loaded();

    facade.pause()?;
    surface.dispatch(NativeEvent::Ended);
    Ok(())
}
