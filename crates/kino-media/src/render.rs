//! Surface plan - what the rendering layer should build for a source
//!
//! The bridge does not render markup. It describes the element the
//! rendering layer must create so that binding finds the surface it expects:
//! the element kind, the native `src` (plain single URIs only), alternative
//! sources, caption tracks, and passthrough attributes.

use crate::{
    classify::classify,
    config::{FileConfig, TrackDescriptor},
    types::{MediaKind, MediaSource, SourceDescriptor},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Size keyword that is passed through as-is
const AUTO: &str = "auto";
/// Size used for any explicit width or height
const FILL: &str = "100%";

/// Presentation properties from the host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderProps {
    pub controls: bool,
    #[serde(rename = "loop")]
    pub loop_playback: bool,
    pub width: Option<String>,
    pub height: Option<String>,
}

/// CSS display of the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Display {
    Block,
    None,
}

/// Inline style of the surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceStyle {
    pub width: Option<String>,
    pub height: Option<String>,
    pub display: Display,
}

/// Element description handed to the rendering layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfacePlan {
    /// `audio` or `video`
    pub element: MediaKind,
    /// Native `src`, absent for arrays and streaming sources
    pub src: Option<String>,
    /// `<source>` children, in order
    pub sources: Vec<MediaSource>,
    /// `<track>` children, in order
    pub tracks: Vec<TrackDescriptor>,
    pub preload: String,
    pub controls: bool,
    #[serde(rename = "loop")]
    pub loop_playback: bool,
    pub attributes: BTreeMap<String, String>,
    pub style: SurfaceStyle,
}

impl SurfacePlan {
    /// Describe the surface for a descriptor
    pub fn build(descriptor: &SourceDescriptor, config: &FileConfig, props: &RenderProps) -> Self {
        let classification = classify(descriptor, config);

        let src = match descriptor {
            SourceDescriptor::Uri(uri) if !classification.is_streaming() => Some(uri.clone()),
            _ => None,
        };
        let sources = match descriptor {
            SourceDescriptor::Sources(sources) => sources.clone(),
            SourceDescriptor::Uri(_) => Vec::new(),
        };
        // Only an empty string hides the surface; arrays always show it
        let display = match descriptor {
            SourceDescriptor::Uri(uri) if uri.is_empty() => Display::None,
            _ => Display::Block,
        };

        Self {
            element: classification.media_kind(),
            src,
            sources,
            tracks: config.tracks.clone(),
            preload: AUTO.to_string(),
            controls: props.controls,
            loop_playback: props.loop_playback,
            attributes: config.attributes.clone(),
            style: SurfaceStyle {
                width: size(props.width.as_deref()),
                height: size(props.height.as_deref()),
                display,
            },
        }
    }
}

/// Unset and `auto` pass through; any explicit size fills the container
fn size(value: Option<&str>) -> Option<String> {
    match value {
        None | Some("") => None,
        Some(AUTO) => Some(AUTO.to_string()),
        Some(_) => Some(FILL.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_video_plan() {
        let plan = SurfacePlan::build(
            &"clip.mp4".into(),
            &FileConfig::default(),
            &RenderProps::default(),
        );

        assert_eq!(plan.element, MediaKind::Video);
        assert_eq!(plan.src.as_deref(), Some("clip.mp4"));
        assert!(plan.sources.is_empty());
        assert_eq!(plan.preload, "auto");
        assert_eq!(plan.style.display, Display::Block);
    }

    #[test]
    fn test_audio_plan() {
        let plan = SurfacePlan::build(
            &"song.mp3".into(),
            &FileConfig::default(),
            &RenderProps::default(),
        );
        assert_eq!(plan.element, MediaKind::Audio);
    }

    #[test]
    fn test_streaming_plan_has_no_src() {
        let plan = SurfacePlan::build(
            &"live.m3u8".into(),
            &FileConfig::default(),
            &RenderProps::default(),
        );
        assert_eq!(plan.element, MediaKind::Video);
        assert_eq!(plan.src, None);
    }

    #[test]
    fn test_array_plan_lists_sources_and_tracks() {
        let config = FileConfig {
            tracks: vec![TrackDescriptor::new("captions", "en.vtt")],
            ..Default::default()
        };
        let sources = vec![MediaSource::typed("a.webm", "video/webm"), MediaSource::from("a.mp4")];

        let plan = SurfacePlan::build(
            &SourceDescriptor::Sources(sources.clone()),
            &config,
            &RenderProps::default(),
        );

        assert_eq!(plan.src, None);
        assert_eq!(plan.sources, sources);
        assert_eq!(plan.tracks.len(), 1);
        assert_eq!(plan.tracks[0].src, "en.vtt");
    }

    #[test]
    fn test_style_rules() {
        let props = RenderProps {
            width: Some("640px".to_string()),
            height: Some("auto".to_string()),
            ..Default::default()
        };
        let plan = SurfacePlan::build(&"".into(), &FileConfig::default(), &props);

        assert_eq!(plan.style.width.as_deref(), Some("100%"));
        assert_eq!(plan.style.height.as_deref(), Some("auto"));
        assert_eq!(plan.style.display, Display::None);
    }

    #[test]
    fn test_display_hidden_only_for_empty_string() {
        let config = FileConfig::default();
        let props = RenderProps::default();

        let blank = SurfacePlan::build(&"  ".into(), &config, &props);
        assert_eq!(blank.style.display, Display::Block);

        let no_sources = SurfacePlan::build(&SourceDescriptor::Sources(vec![]), &config, &props);
        assert_eq!(no_sources.style.display, Display::Block);

        let empty = SurfacePlan::build(&"".into(), &config, &props);
        assert_eq!(empty.style.display, Display::None);
    }
}
