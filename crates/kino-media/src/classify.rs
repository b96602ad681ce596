//! Source classification
//!
//! Decides which backend a descriptor needs from its extension and the
//! caller's force flags. Precedence is HLS, then DASH, then plain media.
//! Only single-URI descriptors are sniffed; arrays are left to the surface
//! to negotiate and only force flags can move them off the plain backend.

use crate::{
    config::FileConfig,
    types::{Classification, MediaKind, SourceDescriptor},
};
use once_cell::sync::Lazy;
use regex::Regex;

static AUDIO_EXTENSIONS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.(m4a|mp4a|mpga|mp2|mp2a|mp3|m2a|m3a|wav|weba|aac|oga|spx)($|\?)")
        .expect("audio extension pattern")
});
static HLS_EXTENSIONS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(m3u8)($|\?)").expect("HLS extension pattern"));
static DASH_EXTENSIONS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(mpd)($|\?)").expect("DASH extension pattern"));

/// Does the descriptor need the HLS engine
pub fn should_use_hls(descriptor: &SourceDescriptor, config: &FileConfig) -> bool {
    config.force_hls || descriptor.as_uri().is_some_and(|uri| HLS_EXTENSIONS.is_match(uri))
}

/// Does the descriptor need the DASH engine
pub fn should_use_dash(descriptor: &SourceDescriptor, config: &FileConfig) -> bool {
    config.force_dash || descriptor.as_uri().is_some_and(|uri| DASH_EXTENSIONS.is_match(uri))
}

/// Should a plain descriptor render into an audio surface
pub fn is_audio(descriptor: &SourceDescriptor, config: &FileConfig) -> bool {
    config.force_audio || descriptor.as_uri().is_some_and(|uri| AUDIO_EXTENSIONS.is_match(uri))
}

/// Classify a descriptor
///
/// A descriptor matching both streaming patterns (or with both force flags
/// set) is HLS.
pub fn classify(descriptor: &SourceDescriptor, config: &FileConfig) -> Classification {
    if should_use_hls(descriptor, config) {
        return Classification::Hls;
    }
    if should_use_dash(descriptor, config) {
        return Classification::Dash;
    }

    let media = if is_audio(descriptor, config) {
        MediaKind::Audio
    } else {
        MediaKind::Video
    };
    Classification::Plain { media }
}

/// The file backend accepts anything that names at least one URI
pub fn can_play(descriptor: &SourceDescriptor) -> bool {
    !descriptor.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MediaSource;

    fn plain(media: MediaKind) -> Classification {
        Classification::Plain { media }
    }

    #[test]
    fn test_detect_hls() {
        let config = FileConfig::default();
        for uri in [
            "https://example.com/master.m3u8",
            "stream.M3U8",
            "https://cdn.example.com/live/index.m3u8?token=abc",
        ] {
            assert_eq!(classify(&uri.into(), &config), Classification::Hls, "{}", uri);
        }
    }

    #[test]
    fn test_detect_dash() {
        let config = FileConfig::default();
        for uri in ["https://example.com/manifest.mpd", "manifest.mpd?t=1", "A.MPD"] {
            assert_eq!(classify(&uri.into(), &config), Classification::Dash, "{}", uri);
        }
    }

    #[test]
    fn test_extension_must_end_path() {
        let config = FileConfig::default();
        assert_eq!(
            classify(&"https://example.com/playlist.m3u8.mp4".into(), &config),
            plain(MediaKind::Video)
        );
        assert_eq!(
            classify(&"https://example.com/not-mpd/file.webm".into(), &config),
            plain(MediaKind::Video)
        );
    }

    #[test]
    fn test_audio_extensions() {
        let config = FileConfig::default();
        for uri in ["song.mp3", "voice.WAV", "a.m4a?x=1", "clip.oga", "speech.spx"] {
            assert_eq!(classify(&uri.into(), &config), plain(MediaKind::Audio), "{}", uri);
        }
        for uri in ["clip.mp4", "clip.webm", "clip.ogv", "https://example.com/video"] {
            assert_eq!(classify(&uri.into(), &config), plain(MediaKind::Video), "{}", uri);
        }
    }

    #[test]
    fn test_force_flags() {
        let descriptor: SourceDescriptor = "https://example.com/video".into();

        let hls = FileConfig::default().with_force_hls(true);
        assert_eq!(classify(&descriptor, &hls), Classification::Hls);

        let dash = FileConfig::default().with_force_dash(true);
        assert_eq!(classify(&descriptor, &dash), Classification::Dash);

        let audio = FileConfig::default().with_force_audio(true);
        assert_eq!(classify(&descriptor, &audio), plain(MediaKind::Audio));
    }

    #[test]
    fn test_hls_wins_over_dash() {
        let both = FileConfig::default().with_force_hls(true).with_force_dash(true);
        assert_eq!(classify(&"clip.mp4".into(), &both), Classification::Hls);

        let dash_flag = FileConfig::default().with_force_dash(true);
        assert_eq!(classify(&"live.m3u8".into(), &dash_flag), Classification::Hls);
    }

    #[test]
    fn test_arrays_never_sniffed() {
        let config = FileConfig::default();
        let descriptor = SourceDescriptor::Sources(vec![
            MediaSource::from("song.mp3"),
            MediaSource::from("live.m3u8"),
        ]);
        assert_eq!(classify(&descriptor, &config), plain(MediaKind::Video));

        let forced = FileConfig::default().with_force_audio(true);
        assert_eq!(classify(&descriptor, &forced), plain(MediaKind::Audio));
    }

    #[test]
    fn test_can_play() {
        assert!(can_play(&"anything".into()));
        assert!(!can_play(&"".into()));
        assert!(!can_play(&SourceDescriptor::Sources(vec![])));
    }
}
