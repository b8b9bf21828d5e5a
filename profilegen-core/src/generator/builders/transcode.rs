//! Codec blocks for custom transcode profiles (PascalCase grammar).

use serde_json::{json, Map, Value};

use crate::language;
use crate::ladder::{AudioRendition, RenditionConfig, ResolvedVideo};

use super::{missing, wrong_kind, BuildContext};
use crate::generator::{GenerateError, GenerateResult};

pub fn h264_video_description(
    rendition: &RenditionConfig,
    ctx: &BuildContext<'_>,
) -> GenerateResult<Value> {
    let video = rendition.video().ok_or_else(|| wrong_kind(rendition, ctx))?;
    let resolved = ResolvedVideo::resolve(rendition, ctx.common)?;

    let h264_settings = json!({
        "InterlaceMode": "PROGRESSIVE",
        "ParNumerator": 1,
        "NumberReferenceFrames": 3,
        "Syntax": "DEFAULT",
        "Softness": 0,
        "FramerateDenominator": resolved.framerate.denominator,
        "GopClosedCadence": 1,
        "GopSize": resolved.gop_size,
        "Slices": 1,
        "GopBReference": "ENABLED",
        "MaxBitrate": resolved.max_bitrate,
        "SlowPal": "DISABLED",
        "ParDenominator": 1,
        "EntropyEncoding": "CABAC",
        "FramerateControl": "SPECIFIED",
        "RateControlMode": "QVBR",
        "CodecProfile": resolved.codec_profile,
        "FramerateNumerator": resolved.framerate.numerator,
        "MinIInterval": 0,
        "AdaptiveQuantization": "AUTO",
        "CodecLevel": "AUTO",
        "FieldEncoding": "PAFF",
        "SceneChangeDetect": "DISABLED",
        "QualityTuningLevel": "SINGLE_PASS",
        "FramerateConversionAlgorithm": "DUPLICATE_DROP",
        "UnregisteredSeiTimecode": "DISABLED",
        "GopSizeUnits": resolved.gop_size_units,
        "ParControl": "SPECIFIED",
        "NumberBFramesBetweenReferenceFrames": 3,
        "RepeatPps": "DISABLED",
        "DynamicSubGop": "ADAPTIVE"
    });

    Ok(json!({
        "Width": video.width,
        "ScalingBehavior": "DEFAULT",
        "Height": video.height,
        "VideoPreprocessors": {
            "Deinterlacer": {}
        },
        "TimecodeInsertion": "DISABLED",
        "AntiAlias": "ENABLED",
        "Sharpness": 50,
        "CodecSettings": {
            "Codec": "H_264",
            "H264Settings": h264_settings
        },
        "AfdSignaling": "NONE",
        "DropFrameTimecode": "ENABLED",
        "RespondToAfd": "NONE",
        "ColorMetadata": "IGNORE"
    }))
}

pub fn h265_video_description(
    rendition: &RenditionConfig,
    ctx: &BuildContext<'_>,
) -> GenerateResult<Value> {
    let video = rendition.video().ok_or_else(|| wrong_kind(rendition, ctx))?;
    let resolved = ResolvedVideo::resolve(rendition, ctx.common)?;
    let tier = resolved
        .tier
        .as_deref()
        .ok_or_else(|| missing(rendition, "tier"))?;

    Ok(json!({
        "Width": video.width,
        "Height": video.height,
        "VideoPreprocessors": {
            "TimecodeBurnin": {}
        },
        "CodecSettings": {
            "Codec": "H_265",
            "H265Settings": {
                "FramerateDenominator": resolved.framerate.denominator,
                "FramerateControl": "SPECIFIED",
                "FramerateNumerator": resolved.framerate.numerator,
                "GopSize": resolved.gop_size,
                "MaxBitrate": resolved.max_bitrate,
                "RateControlMode": "QVBR",
                "CodecProfile": format!("{}_{}", resolved.codec_profile, tier),
                "SceneChangeDetect": "TRANSITION_DETECTION",
                "GopSizeUnits": resolved.gop_size_units
            }
        }
    }))
}

pub fn aac_audio_description(
    rendition: &RenditionConfig,
    ctx: &BuildContext<'_>,
) -> GenerateResult<Value> {
    let audio = rendition.audio().ok_or_else(|| wrong_kind(rendition, ctx))?;
    let codec_profile = audio
        .coding_profile
        .as_deref()
        .ok_or_else(|| missing(rendition, "codingProfile"))?;
    let sample_rate = audio
        .sample_rate
        .ok_or_else(|| missing(rendition, "sampleRate"))?;
    let codec_settings = json!({
        "Codec": "AAC",
        "AacSettings": {
            "Bitrate": audio.bitrate,
            "CodecProfile": codec_profile,
            "CodingMode": audio.coding_mode,
            "SampleRate": sample_rate
        }
    });
    audio_description(rendition, audio, codec_settings)
}

pub fn ac3_audio_description(
    rendition: &RenditionConfig,
    ctx: &BuildContext<'_>,
) -> GenerateResult<Value> {
    let audio = rendition.audio().ok_or_else(|| wrong_kind(rendition, ctx))?;
    let codec_settings = json!({
        "Codec": "AC3",
        "Ac3Settings": {
            "Bitrate": audio.bitrate,
            "CodingMode": audio.coding_mode,
            "Dialnorm": audio.dial_norm
        }
    });
    audio_description(rendition, audio, codec_settings)
}

pub fn eac3_audio_description(
    rendition: &RenditionConfig,
    ctx: &BuildContext<'_>,
) -> GenerateResult<Value> {
    let audio = rendition.audio().ok_or_else(|| wrong_kind(rendition, ctx))?;
    let codec_settings = json!({
        "Codec": "EAC3",
        "Eac3Settings": {
            "Dialnorm": audio.dial_norm,
            "Bitrate": audio.bitrate,
            "CodingMode": audio.coding_mode
        }
    });
    audio_description(rendition, audio, codec_settings)
}

fn audio_description(
    rendition: &RenditionConfig,
    audio: &AudioRendition,
    codec_settings: Value,
) -> GenerateResult<Value> {
    let language = language::to_rfc5646(&audio.language_code).map_err(|source| {
        GenerateError::InvalidLanguageCode {
            rendition: rendition.name.clone(),
            source,
        }
    })?;

    let mut description = Map::new();
    description.insert("AudioTypeControl".into(), json!("USE_CONFIGURED"));
    description.insert("AudioSourceName".into(), json!("Audio Selector 1"));
    if let Some(normalization) = &audio.normalization {
        description.insert(
            "AudioNormalizationSettings".into(),
            json!({
                "Algorithm": normalization.algorithm,
                "AlgorithmControl": normalization.algorithm_control,
                "LoudnessLogging": "DONT_LOG",
                "TargetLkfs": normalization.target_lkfs,
                "PeakCalculation": "NONE"
            }),
        );
    }
    description.insert("CodecSettings".into(), codec_settings);
    description.insert("StreamName".into(), json!(audio.stream_name));
    description.insert("LanguageCodeControl".into(), json!("USE_CONFIGURED"));
    description.insert("CustomLanguageCode".into(), json!(language));
    Ok(Value::Object(description))
}

pub fn caption_description(
    rendition: &RenditionConfig,
    ctx: &BuildContext<'_>,
) -> GenerateResult<Value> {
    let caption = rendition
        .caption()
        .ok_or_else(|| wrong_kind(rendition, ctx))?;
    let language = language::to_iso639_2(&caption.language_code).map_err(|source| {
        GenerateError::InvalidLanguageCode {
            rendition: rendition.name.clone(),
            source,
        }
    })?;

    Ok(json!({
        "CaptionSelectorName": caption.captions_selector_name,
        "DestinationSettings": {
            "DestinationType": "TTML",
            "TtmlDestinationSettings": {}
        },
        "LanguageCode": language,
        "LanguageDescription": caption.language_description
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::TargetSchema;
    use crate::ladder::LadderConfig;

    const LADDER: &str = r#"
common:
  gopSize: 2
  gopSizeUnits: SECONDS
  framerate: 29.97
  videoCodecProfile: MAIN
  videoCodecTier: HIGH
  videoLookAheadRateControl: MEDIUM
outputs:
  - { name: hevc_720p, codec: H_265, width: 1280, height: 720, maxBitrate: 3000000 }
  - name: surround
    codec: EAC3
    bitrate: 384000
    codingMode: CODING_MODE_3_2
    languageCode: GER
    streamName: Deutsch
  - { name: subs, codec: CAPTIONS, languageCode: fre, languageDescription: French, captionsSelectorName: cs1 }
  - { name: numeric, codec: AC3, bitrate: 192000, codingMode: CODING_MODE_2_0, languageCode: "123", streamName: x }
"#;

    fn context(ladder: &LadderConfig) -> BuildContext<'_> {
        BuildContext {
            common: &ladder.common,
            schema: TargetSchema::MediaTailorDash,
        }
    }

    #[test]
    fn h265_profile_joins_profile_and_tier() {
        let ladder = LadderConfig::from_yaml_str("t", LADDER).unwrap();
        let description = h265_video_description(&ladder.outputs[0], &context(&ladder)).unwrap();
        let settings = &description["CodecSettings"]["H265Settings"];
        assert_eq!(settings["CodecProfile"], "MAIN_HIGH");
        assert_eq!(settings["FramerateNumerator"], 30000);
        assert_eq!(settings["FramerateDenominator"], 1001);
        assert_eq!(settings["GopSizeUnits"], "SECONDS");
    }

    #[test]
    fn audio_uses_rfc5646_and_omits_absent_normalization() {
        let ladder = LadderConfig::from_yaml_str("t", LADDER).unwrap();
        let description = eac3_audio_description(&ladder.outputs[1], &context(&ladder)).unwrap();
        assert_eq!(description["CustomLanguageCode"], "de");
        assert_eq!(description["CodecSettings"]["Eac3Settings"]["Dialnorm"], 24);
        assert!(description.get("AudioNormalizationSettings").is_none());
    }

    #[test]
    fn captions_use_uppercase_iso639_2() {
        let ladder = LadderConfig::from_yaml_str("t", LADDER).unwrap();
        let description = caption_description(&ladder.outputs[2], &context(&ladder)).unwrap();
        assert_eq!(description["LanguageCode"], "FRE");
        assert_eq!(description["DestinationSettings"]["DestinationType"], "TTML");
    }

    #[test]
    fn unmapped_language_fails_explicitly() {
        let ladder = LadderConfig::from_yaml_str("t", LADDER).unwrap();
        let err = ac3_audio_description(&ladder.outputs[3], &context(&ladder)).unwrap_err();
        assert!(matches!(err, GenerateError::InvalidLanguageCode { .. }));
    }
}
