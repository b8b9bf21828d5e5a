use serde_json::{json, Value};
use tracing::debug;

use crate::ladder::{Codec, RenditionConfig};

use super::{GenerateError, GenerateResult};

pub const TRICKPLAY_MODE: &str = "ADVANCED";

/// The frame-capture rendition a thumbnail track is derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameCaptureSource {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TrickplayCache {
    #[default]
    Empty,
    Captured(FrameCaptureSource),
}

impl TrickplayCache {
    pub fn capture(&mut self, rendition: &RenditionConfig) -> GenerateResult<()> {
        let video = match (rendition.codec, rendition.video()) {
            (Codec::FrameCapture, Some(video)) => video,
            _ => {
                return Err(GenerateError::UnsupportedCodec {
                    rendition: rendition.name.clone(),
                    codec: rendition.codec.to_string(),
                    schema: "trickplay".to_string(),
                })
            }
        };
        if let TrickplayCache::Captured(first) = self {
            return Err(GenerateError::MultipleFrameCaptureRenditions {
                first: first.name.clone(),
                second: rendition.name.clone(),
            });
        }
        debug!(
            target: "profilegen.trickplay",
            rendition = %rendition.name,
            width = video.width,
            height = video.height,
            "frame capture cached for trickplay"
        );
        *self = TrickplayCache::Captured(FrameCaptureSource {
            name: rendition.name.clone(),
            width: video.width,
            height: video.height,
        });
        Ok(())
    }

    pub fn reset(&mut self) {
        *self = TrickplayCache::Empty;
    }

    pub fn image_based_trickplay(&self) -> Option<ImageBasedTrickplay> {
        match self {
            TrickplayCache::Empty => None,
            TrickplayCache::Captured(source) => Some(ImageBasedTrickplay {
                thumbnail_width: source.width,
                thumbnail_height: source.height,
            }),
        }
    }
}

/// Single-tile thumbnails sized after the frame-capture rendition, one per
/// I-frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageBasedTrickplay {
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
}

impl ImageBasedTrickplay {
    pub fn mode(&self) -> &'static str {
        TRICKPLAY_MODE
    }

    pub fn settings(&self) -> Value {
        json!({
            "ThumbnailHeight": self.thumbnail_height,
            "ThumbnailWidth": self.thumbnail_width,
            "TileHeight": 1,
            "TileWidth": 1,
            "IntervalCadence": "FOLLOW_IFRAME"
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ladder::{RenditionKind, VideoRendition};

    fn frame_capture(name: &str, width: u32, height: u32) -> RenditionConfig {
        RenditionConfig {
            name: name.to_string(),
            codec: Codec::FrameCapture,
            kind: RenditionKind::Video(VideoRendition {
                width,
                height,
                max_bitrate: None,
                gop_size: None,
                codec_profile: None,
                tier: None,
                framerate: None,
                look_ahead_rate_control: None,
                buf_size: None,
            }),
        }
    }

    #[test]
    fn empty_cache_has_no_trickplay() {
        assert_eq!(TrickplayCache::default().image_based_trickplay(), None);
    }

    #[test]
    fn capture_produces_settings_block() {
        let mut cache = TrickplayCache::default();
        cache.capture(&frame_capture("thumbs", 320, 180)).unwrap();
        let trickplay = cache.image_based_trickplay().expect("captured");
        assert_eq!(trickplay.mode(), "ADVANCED");
        let settings = trickplay.settings();
        assert_eq!(settings["ThumbnailHeight"], 180);
        assert_eq!(settings["ThumbnailWidth"], 320);
        assert_eq!(settings["TileHeight"], 1);
        assert_eq!(settings["IntervalCadence"], "FOLLOW_IFRAME");
    }

    #[test]
    fn second_capture_fails_until_reset() {
        let mut cache = TrickplayCache::default();
        cache.capture(&frame_capture("a", 320, 180)).unwrap();
        let err = cache.capture(&frame_capture("b", 640, 360)).unwrap_err();
        assert!(matches!(
            err,
            GenerateError::MultipleFrameCaptureRenditions { ref first, ref second }
                if first == "a" && second == "b"
        ));

        cache.reset();
        cache.capture(&frame_capture("b", 640, 360)).unwrap();
        assert_eq!(
            cache.image_based_trickplay().map(|t| t.thumbnail_width),
            Some(640)
        );
    }
}
