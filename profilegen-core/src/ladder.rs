//! Typed ladder model.
//!
//! A ladder file is deserialized into [`LadderDocument`] (every rendition field
//! optional) and then validated into [`LadderConfig`], whose renditions are a
//! tagged union keyed by [`Codec`]. Later stages never re-check key presence.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::generator::{GenerateError, GenerateResult};
use crate::language;

pub const COMMON_SCOPE: &str = "common";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Codec {
    #[serde(rename = "H_264")]
    H264,
    #[serde(rename = "H_265")]
    H265,
    #[serde(rename = "FRAME_CAPTURE")]
    FrameCapture,
    #[serde(rename = "AAC")]
    Aac,
    #[serde(rename = "AC3")]
    Ac3,
    #[serde(rename = "EAC3")]
    Eac3,
    #[serde(rename = "CAPTIONS")]
    Captions,
}

impl Codec {
    pub const ALL: [Codec; 7] = [
        Codec::H264,
        Codec::H265,
        Codec::FrameCapture,
        Codec::Aac,
        Codec::Ac3,
        Codec::Eac3,
        Codec::Captions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Codec::H264 => "H_264",
            Codec::H265 => "H_265",
            Codec::FrameCapture => "FRAME_CAPTURE",
            Codec::Aac => "AAC",
            Codec::Ac3 => "AC3",
            Codec::Eac3 => "EAC3",
            Codec::Captions => "CAPTIONS",
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            Codec::H264 | Codec::H265 | Codec::FrameCapture => MediaKind::Video,
            Codec::Aac | Codec::Ac3 | Codec::Eac3 => MediaKind::Audio,
            Codec::Captions => MediaKind::Caption,
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Codec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Codec::ALL
            .iter()
            .copied()
            .find(|codec| codec.as_str() == s)
            .ok_or_else(|| format!("unknown codec: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Video,
    Audio,
    Caption,
}

/// Frame rate as a numerator/denominator pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawFramerate")]
pub struct Framerate {
    pub numerator: u64,
    pub denominator: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawFramerate {
    Integer(i64),
    Decimal(f64),
    Text(String),
}

impl Framerate {
    pub fn new(numerator: u64, denominator: u64) -> Result<Self, String> {
        if numerator == 0 || denominator == 0 {
            return Err(format!(
                "framerate {numerator}/{denominator} must be positive"
            ));
        }
        let divisor = gcd(numerator, denominator);
        Ok(Self {
            numerator: numerator / divisor,
            denominator: denominator / divisor,
        })
    }

    /// Decimal rates close to an NTSC rate use the 1001 timescale, the rest
    /// are scaled by 1000 and reduced.
    pub fn from_decimal(value: f64) -> Result<Self, String> {
        if !value.is_finite() || value <= 0.0 {
            return Err(format!("framerate {value} must be positive"));
        }
        if value.fract() != 0.0 {
            let nominal = (value * 1001.0 / 1000.0).round();
            if (nominal * 1000.0 / 1001.0 - value).abs() < 0.005 {
                return Ok(Self {
                    numerator: nominal as u64 * 1000,
                    denominator: 1001,
                });
            }
        }
        Self::new((value * 1000.0).round() as u64, 1000)
    }
}

impl TryFrom<RawFramerate> for Framerate {
    type Error = String;

    fn try_from(raw: RawFramerate) -> Result<Self, Self::Error> {
        match raw {
            RawFramerate::Integer(value) if value > 0 => Self::new(value as u64, 1),
            RawFramerate::Integer(value) => Err(format!("framerate {value} must be positive")),
            RawFramerate::Decimal(value) => Self::from_decimal(value),
            RawFramerate::Text(text) => text.parse(),
        }
    }
}

impl FromStr for Framerate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.split_once('/') {
            Some((numerator, denominator)) => {
                let numerator = numerator
                    .trim()
                    .parse::<u64>()
                    .map_err(|err| format!("invalid framerate {trimmed:?}: {err}"))?;
                let denominator = denominator
                    .trim()
                    .parse::<u64>()
                    .map_err(|err| format!("invalid framerate {trimmed:?}: {err}"))?;
                Self::new(numerator, denominator)
            }
            None => {
                let value = trimmed
                    .parse::<f64>()
                    .map_err(|err| format!("invalid framerate {trimmed:?}: {err}"))?;
                Self::from_decimal(value)
            }
        }
    }
}

impl fmt::Display for Framerate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let rem = a % b;
        a = b;
        b = rem;
    }
    a
}

fn default_gop_size_units() -> String {
    "FRAMES".to_string()
}

fn default_segment_length() -> u32 {
    6
}

fn default_fragment_length() -> u32 {
    2
}

fn default_scte35_behavior() -> String {
    "PASSTHROUGH".to_string()
}

fn default_dial_norm() -> u32 {
    24
}

/// Ladder-wide defaults a rendition may override.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonConfig {
    #[serde(default)]
    pub gop_size: Option<Number>,
    #[serde(default = "default_gop_size_units")]
    pub gop_size_units: String,
    #[serde(default)]
    pub framerate: Option<Framerate>,
    #[serde(default)]
    pub video_codec_profile: Option<String>,
    #[serde(default)]
    pub video_codec_tier: Option<String>,
    #[serde(default)]
    pub video_look_ahead_rate_control: Option<String>,
    #[serde(default = "default_segment_length")]
    pub segment_length: u32,
    #[serde(default = "default_fragment_length")]
    pub fragment_length: u32,
    #[serde(default)]
    pub min_segment_length: u32,
    #[serde(default)]
    pub ad_markers: Option<String>,
    #[serde(default = "default_scte35_behavior")]
    pub scte35_behavior: String,
    /// Sidecar caption file referenced by transcode caption selectors.
    #[serde(default)]
    pub caption_source_file: Option<String>,
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            gop_size: None,
            gop_size_units: default_gop_size_units(),
            framerate: None,
            video_codec_profile: None,
            video_codec_tier: None,
            video_look_ahead_rate_control: None,
            segment_length: default_segment_length(),
            fragment_length: default_fragment_length(),
            min_segment_length: 0,
            ad_markers: None,
            scte35_behavior: default_scte35_behavior(),
            caption_source_file: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAudioNormalization {
    pub algorithm: Option<String>,
    pub algorithm_control: Option<String>,
    pub target_lkfs: Option<Number>,
}

/// One ladder row as written in the file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRendition {
    pub name: Option<String>,
    pub codec: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub max_bitrate: Option<u64>,
    pub gop_size: Option<Number>,
    pub codec_profile: Option<String>,
    pub tier: Option<String>,
    pub framerate: Option<Framerate>,
    pub look_ahead_rate_control: Option<String>,
    pub buf_size: Option<u64>,
    pub bitrate: Option<u64>,
    pub coding_mode: Option<String>,
    pub coding_profile: Option<String>,
    pub sample_rate: Option<u32>,
    pub stream_name: Option<String>,
    pub language_code: Option<String>,
    pub dial_norm: Option<u32>,
    #[serde(alias = "audioNormalIzationSettings")]
    pub audio_normalization_settings: Option<RawAudioNormalization>,
    pub language_description: Option<String>,
    pub captions_selector_name: Option<String>,
    pub accessibility: Option<String>,
    pub style_control: Option<String>,
}

/// A ladder file before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct LadderDocument {
    #[serde(default)]
    pub common: CommonConfig,
    #[serde(default)]
    pub outputs: Vec<RawRendition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoRendition {
    pub width: u32,
    pub height: u32,
    pub max_bitrate: Option<u64>,
    pub gop_size: Option<Number>,
    pub codec_profile: Option<String>,
    pub tier: Option<String>,
    pub framerate: Option<Framerate>,
    pub look_ahead_rate_control: Option<String>,
    pub buf_size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioNormalization {
    pub algorithm: String,
    pub algorithm_control: String,
    pub target_lkfs: Number,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioRendition {
    pub bitrate: u64,
    pub coding_mode: String,
    pub coding_profile: Option<String>,
    pub sample_rate: Option<u32>,
    pub stream_name: String,
    /// Lowercase three-character code.
    pub language_code: String,
    pub dial_norm: u32,
    pub normalization: Option<AudioNormalization>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptionRendition {
    /// Lowercase three-character code.
    pub language_code: String,
    pub language_description: String,
    pub captions_selector_name: String,
    pub accessibility: String,
    pub style_control: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenditionKind {
    Video(VideoRendition),
    Audio(AudioRendition),
    Caption(CaptionRendition),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenditionConfig {
    pub name: String,
    pub codec: Codec,
    pub kind: RenditionKind,
}

impl RenditionConfig {
    pub fn video(&self) -> Option<&VideoRendition> {
        match &self.kind {
            RenditionKind::Video(video) => Some(video),
            _ => None,
        }
    }

    pub fn audio(&self) -> Option<&AudioRendition> {
        match &self.kind {
            RenditionKind::Audio(audio) => Some(audio),
            _ => None,
        }
    }

    pub fn caption(&self) -> Option<&CaptionRendition> {
        match &self.kind {
            RenditionKind::Caption(caption) => Some(caption),
            _ => None,
        }
    }

    pub fn media_kind(&self) -> MediaKind {
        self.codec.kind()
    }

    fn missing(&self, field: &'static str) -> GenerateError {
        GenerateError::MissingRequiredField {
            rendition: self.name.clone(),
            field,
        }
    }
}

/// Encoder parameters of a video rendition after applying common defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedVideo {
    pub max_bitrate: u64,
    pub gop_size: Number,
    pub gop_size_units: String,
    pub framerate: Framerate,
    pub codec_profile: String,
    pub look_ahead_rate_control: String,
    /// Only resolved for H_265.
    pub tier: Option<String>,
}

impl ResolvedVideo {
    pub fn resolve(rendition: &RenditionConfig, common: &CommonConfig) -> GenerateResult<Self> {
        let video = rendition
            .video()
            .ok_or_else(|| GenerateError::UnsupportedCodec {
                rendition: rendition.name.clone(),
                codec: rendition.codec.to_string(),
                schema: "video encoder".to_string(),
            })?;

        let max_bitrate = video
            .max_bitrate
            .ok_or_else(|| rendition.missing("maxBitrate"))?;
        let gop_size = video
            .gop_size
            .clone()
            .or_else(|| common.gop_size.clone())
            .ok_or_else(|| rendition.missing("gopSize"))?;
        let framerate = video
            .framerate
            .or(common.framerate)
            .ok_or_else(|| rendition.missing("framerate"))?;
        let codec_profile = video
            .codec_profile
            .clone()
            .or_else(|| common.video_codec_profile.clone())
            .ok_or_else(|| rendition.missing("codecProfile"))?;
        let look_ahead_rate_control = video
            .look_ahead_rate_control
            .clone()
            .or_else(|| common.video_look_ahead_rate_control.clone())
            .ok_or_else(|| rendition.missing("lookAheadRateControl"))?;
        let tier = match rendition.codec {
            Codec::H265 => Some(
                video
                    .tier
                    .clone()
                    .or_else(|| common.video_codec_tier.clone())
                    .ok_or_else(|| rendition.missing("tier"))?,
            ),
            _ => None,
        };

        Ok(Self {
            max_bitrate,
            gop_size,
            gop_size_units: common.gop_size_units.clone(),
            framerate,
            codec_profile,
            look_ahead_rate_control,
            tier,
        })
    }
}

/// A validated ladder. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct LadderConfig {
    /// Profile-set name, taken from the ladder file name.
    pub name: String,
    pub common: CommonConfig,
    pub outputs: Vec<RenditionConfig>,
}

impl LadderConfig {
    pub fn from_document(name: impl Into<String>, document: LadderDocument) -> GenerateResult<Self> {
        let mut seen = HashSet::new();
        let mut frame_capture: Option<String> = None;
        let mut outputs = Vec::with_capacity(document.outputs.len());

        for (index, raw) in document.outputs.into_iter().enumerate() {
            let rendition = validate_rendition(index, raw)?;
            if !seen.insert(rendition.name.clone()) {
                return Err(GenerateError::DuplicateRenditionName {
                    name: rendition.name,
                });
            }
            if rendition.codec == Codec::FrameCapture {
                if let Some(first) = &frame_capture {
                    return Err(GenerateError::MultipleFrameCaptureRenditions {
                        first: first.clone(),
                        second: rendition.name,
                    });
                }
                frame_capture = Some(rendition.name.clone());
            }
            if matches!(rendition.codec, Codec::H264 | Codec::H265) {
                ResolvedVideo::resolve(&rendition, &document.common)?;
            }
            outputs.push(rendition);
        }

        Ok(Self {
            name: name.into(),
            common: document.common,
            outputs,
        })
    }

    pub fn from_yaml_str(name: impl Into<String>, yaml: &str) -> Result<Self, LadderParseError> {
        let document: LadderDocument = serde_yaml::from_str(yaml)?;
        Ok(Self::from_document(name, document)?)
    }

    pub fn count(&self, kind: MediaKind) -> usize {
        self.outputs
            .iter()
            .filter(|rendition| rendition.media_kind() == kind)
            .count()
    }

    pub fn frame_capture(&self) -> Option<&RenditionConfig> {
        self.outputs
            .iter()
            .find(|rendition| rendition.codec == Codec::FrameCapture)
    }
}

/// Error from [`LadderConfig::from_yaml_str`], for callers without a file path.
#[derive(Debug, thiserror::Error)]
pub enum LadderParseError {
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Invalid(#[from] GenerateError),
}

fn validate_rendition(index: usize, raw: RawRendition) -> GenerateResult<RenditionConfig> {
    let name = raw
        .name
        .clone()
        .ok_or_else(|| GenerateError::MissingRequiredField {
            rendition: format!("outputs[{index}]"),
            field: "name",
        })?;
    let missing = |field: &'static str| GenerateError::MissingRequiredField {
        rendition: name.clone(),
        field,
    };
    let codec_name = raw.codec.clone().ok_or_else(|| missing("codec"))?;
    let codec = codec_name
        .parse::<Codec>()
        .map_err(|_| GenerateError::UnsupportedCodec {
            rendition: name.clone(),
            codec: codec_name.clone(),
            schema: "any target".to_string(),
        })?;
    let language = |code: Option<String>| -> GenerateResult<String> {
        let code = code.ok_or_else(|| missing("languageCode"))?;
        language::to_lowercase_code(&code).map_err(|source| GenerateError::InvalidLanguageCode {
            rendition: name.clone(),
            source,
        })
    };

    let kind = match codec.kind() {
        MediaKind::Video => {
            let width = raw.width.ok_or_else(|| missing("width"))?;
            let height = raw.height.ok_or_else(|| missing("height"))?;
            if width == 0 || height == 0 {
                return Err(GenerateError::InvalidValue {
                    rendition: name.clone(),
                    field: "resolution",
                    reason: format!("{width}x{height} must be non-zero"),
                });
            }
            if codec != Codec::FrameCapture && raw.max_bitrate.is_none() {
                return Err(missing("maxBitrate"));
            }
            RenditionKind::Video(VideoRendition {
                width,
                height,
                max_bitrate: raw.max_bitrate,
                gop_size: raw.gop_size,
                codec_profile: raw.codec_profile,
                tier: raw.tier,
                framerate: raw.framerate,
                look_ahead_rate_control: raw.look_ahead_rate_control,
                buf_size: raw.buf_size,
            })
        }
        MediaKind::Audio => {
            let bitrate = raw.bitrate.ok_or_else(|| missing("bitrate"))?;
            let coding_mode = raw.coding_mode.clone().ok_or_else(|| missing("codingMode"))?;
            let stream_name = raw.stream_name.clone().ok_or_else(|| missing("streamName"))?;
            if codec == Codec::Aac {
                if raw.coding_profile.is_none() {
                    return Err(missing("codingProfile"));
                }
                if raw.sample_rate.is_none() {
                    return Err(missing("sampleRate"));
                }
            }
            let normalization = match raw.audio_normalization_settings {
                Some(settings) => Some(AudioNormalization {
                    algorithm: settings.algorithm.ok_or_else(|| missing("algorithm"))?,
                    algorithm_control: settings
                        .algorithm_control
                        .ok_or_else(|| missing("algorithmControl"))?,
                    target_lkfs: settings.target_lkfs.ok_or_else(|| missing("targetLkfs"))?,
                }),
                None => None,
            };
            RenditionKind::Audio(AudioRendition {
                bitrate,
                coding_mode,
                coding_profile: raw.coding_profile,
                sample_rate: raw.sample_rate,
                stream_name,
                language_code: language(raw.language_code)?,
                dial_norm: raw.dial_norm.unwrap_or_else(default_dial_norm),
                normalization,
            })
        }
        MediaKind::Caption => RenditionKind::Caption(CaptionRendition {
            language_code: language(raw.language_code)?,
            language_description: raw
                .language_description
                .ok_or_else(|| missing("languageDescription"))?,
            captions_selector_name: raw
                .captions_selector_name
                .ok_or_else(|| missing("captionsSelectorName"))?,
            accessibility: raw
                .accessibility
                .unwrap_or_else(|| "DOES_NOT_IMPLEMENT_ACCESSIBILITY_FEATURES".to_string()),
            style_control: raw
                .style_control
                .unwrap_or_else(|| "PASSTHROUGH".to_string()),
        }),
    };

    Ok(RenditionConfig { name, codec, kind })
}
