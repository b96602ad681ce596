//! Mount configuration supplied by the rendering layer

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known HLS engine script
pub const HLS_SDK_URL: &str = "//assets/hls.min.js";
/// Global the HLS engine registers
pub const HLS_GLOBAL: &str = "Hls";
/// Well-known DASH engine script
pub const DASH_SDK_URL: &str = "//assets/dash.all.min.js";
/// Global the DASH engine registers
pub const DASH_GLOBAL: &str = "dashjs";

/// Caption/subtitle track rendered as a child of the surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    /// Track kind: subtitles, captions, descriptions, chapters, metadata
    #[serde(default = "default_track_kind")]
    pub kind: String,
    /// URI of the track file
    pub src: String,
    /// Language code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub srclang: Option<String>,
    /// Human-readable label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Enabled unless the user picks another
    #[serde(default, rename = "default")]
    pub is_default: bool,
}

fn default_track_kind() -> String {
    "subtitles".to_string()
}

impl TrackDescriptor {
    pub fn new(kind: impl Into<String>, src: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            src: src.into(),
            srclang: None,
            label: None,
            is_default: false,
        }
    }
}

/// File backend configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FileConfig {
    /// Render an audio surface regardless of extension
    pub force_audio: bool,
    /// Bind the HLS engine regardless of extension
    #[serde(rename = "forceHLS")]
    pub force_hls: bool,
    /// Bind the DASH engine regardless of extension
    #[serde(rename = "forceDASH")]
    pub force_dash: bool,
    /// Opaque attributes applied to the surface
    pub attributes: BTreeMap<String, String>,
    /// Caption/subtitle tracks, in order
    pub tracks: Vec<TrackDescriptor>,
    /// Request inline playback on mobile browsers
    pub playsinline: bool,
}

impl FileConfig {
    /// Parse from the rendering layer's JSON shape
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builder-style force flag setters
    pub fn with_force_audio(mut self, force: bool) -> Self {
        self.force_audio = force;
        self
    }

    pub fn with_force_hls(mut self, force: bool) -> Self {
        self.force_hls = force;
        self
    }

    pub fn with_force_dash(mut self, force: bool) -> Self {
        self.force_dash = force;
        self
    }

    /// Attributes to write on the surface at mount, playsinline ones included
    pub fn surface_attributes(&self) -> Vec<(String, String)> {
        let mut attributes = Vec::with_capacity(self.attributes.len() + 2);
        if self.playsinline {
            attributes.push(("playsinline".to_string(), String::new()));
            attributes.push(("webkit-playsinline".to_string(), String::new()));
        }
        attributes.extend(self.attributes.iter().map(|(k, v)| (k.clone(), v.clone())));
        attributes
    }
}

/// Where to fetch an engine and which global it registers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EngineSource {
    /// Script URL
    pub url: String,
    /// Global name checked before and after loading
    pub global: String,
}

impl EngineSource {
    pub fn new(url: impl Into<String>, global: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            global: global.into(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(Error::InvalidConfig(format!(
                "engine `{}` has an empty script URL",
                self.global
            )));
        }
        if self.global.trim().is_empty() {
            return Err(Error::InvalidConfig(format!(
                "engine script {} has an empty global name",
                self.url
            )));
        }
        Ok(())
    }
}

/// Script locations for both streaming engines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSources {
    pub hls: EngineSource,
    pub dash: EngineSource,
}

impl Default for EngineSources {
    fn default() -> Self {
        Self {
            hls: EngineSource::new(HLS_SDK_URL, HLS_GLOBAL),
            dash: EngineSource::new(DASH_SDK_URL, DASH_GLOBAL),
        }
    }
}

impl EngineSources {
    /// Reject empty URLs or global names
    pub fn validate(&self) -> Result<()> {
        self.hls.validate()?;
        self.dash.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_config_defaults() {
        let config = FileConfig::default();
        assert!(!config.force_audio);
        assert!(!config.force_hls);
        assert!(!config.force_dash);
        assert!(config.attributes.is_empty());
        assert!(config.tracks.is_empty());
    }

    #[test]
    fn test_file_config_from_json() {
        let config = FileConfig::from_json(
            r#"{
                "forceHLS": true,
                "attributes": {"crossorigin": "anonymous"},
                "tracks": [{"kind": "captions", "src": "en.vtt", "srclang": "en", "default": true}]
            }"#,
        )
        .unwrap();

        assert!(config.force_hls);
        assert!(!config.force_dash);
        assert_eq!(config.attributes["crossorigin"], "anonymous");
        assert_eq!(config.tracks.len(), 1);
        assert!(config.tracks[0].is_default);
        assert_eq!(config.tracks[0].srclang.as_deref(), Some("en"));
    }

    #[test]
    fn test_surface_attributes_with_playsinline() {
        let mut config = FileConfig {
            playsinline: true,
            ..Default::default()
        };
        config.attributes.insert("poster".to_string(), "p.jpg".to_string());

        let attributes = config.surface_attributes();
        assert_eq!(attributes[0], ("playsinline".to_string(), String::new()));
        assert_eq!(attributes[1], ("webkit-playsinline".to_string(), String::new()));
        assert_eq!(attributes[2], ("poster".to_string(), "p.jpg".to_string()));
    }

    #[test]
    fn test_engine_sources_defaults_validate() {
        let sources = EngineSources::default();
        assert_eq!(sources.hls.global, "Hls");
        assert_eq!(sources.dash.global, "dashjs");
        assert!(sources.validate().is_ok());

        let broken = EngineSources {
            hls: EngineSource::new("", "Hls"),
            ..Default::default()
        };
        assert!(matches!(broken.validate(), Err(Error::InvalidConfig(_))));
    }
}
