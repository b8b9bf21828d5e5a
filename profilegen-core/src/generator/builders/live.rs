//! Codec blocks for live encoder profiles (camelCase grammar).

use serde_json::{json, Map, Value};

use crate::generator::naming::{
    audio_description_name, caption_description_name, timecode_burnin_font_size,
};
use crate::generator::{CaptionFormat, GenerateResult};
use crate::ladder::{AudioRendition, RenditionConfig, ResolvedVideo, VideoRendition};

use super::{missing, wrong_kind, BuildContext};

pub fn h264_video_description(
    rendition: &RenditionConfig,
    ctx: &BuildContext<'_>,
) -> GenerateResult<Value> {
    let video = rendition.video().ok_or_else(|| wrong_kind(rendition, ctx))?;
    let resolved = ResolvedVideo::resolve(rendition, ctx.common)?;

    let mut settings = json!({
        "afdSignaling": "NONE",
        "colorMetadata": "INSERT",
        "adaptiveQuantization": "AUTO",
        "entropyEncoding": "CABAC",
        "flickerAq": "ENABLED",
        "framerateControl": "SPECIFIED",
        "framerateNumerator": resolved.framerate.numerator,
        "framerateDenominator": resolved.framerate.denominator,
        "gopBReference": "ENABLED",
        "gopClosedCadence": 1,
        "gopNumBFrames": 3,
        "gopSize": resolved.gop_size,
        "gopSizeUnits": resolved.gop_size_units,
        "subgopLength": "DYNAMIC",
        "scanType": "PROGRESSIVE",
        "level": "H264_LEVEL_AUTO",
        "lookAheadRateControl": resolved.look_ahead_rate_control,
        "maxBitrate": resolved.max_bitrate,
        "numRefFrames": 3,
        "parControl": "SPECIFIED",
        "parDenominator": 1,
        "parNumerator": 1,
        "profile": resolved.codec_profile,
        "rateControlMode": "QVBR",
        "syntax": "DEFAULT",
        "sceneChangeDetect": "ENABLED",
        "spatialAq": "ENABLED",
        "temporalAq": "ENABLED",
        "timecodeBurninSettings": {
            "fontSize": timecode_burnin_font_size(video.height),
            "position": "TOP_LEFT",
            "prefix": ""
        },
        "timecodeInsertion": "DISABLED"
    });
    insert_buf_size(&mut settings, video);

    Ok(video_description(
        rendition,
        video,
        json!({ "h264Settings": settings }),
    ))
}

pub fn h265_video_description(
    rendition: &RenditionConfig,
    ctx: &BuildContext<'_>,
) -> GenerateResult<Value> {
    let video = rendition.video().ok_or_else(|| wrong_kind(rendition, ctx))?;
    let resolved = ResolvedVideo::resolve(rendition, ctx.common)?;
    let tier = resolved
        .tier
        .clone()
        .ok_or_else(|| missing(rendition, "tier"))?;

    let mut settings = json!({
        "adaptiveQuantization": "AUTO",
        "afdSignaling": "NONE",
        "alternativeTransferFunction": "OMIT",
        "colorMetadata": "INSERT",
        "flickerAq": "ENABLED",
        "framerateDenominator": resolved.framerate.denominator,
        "framerateNumerator": resolved.framerate.numerator,
        "gopClosedCadence": 1,
        "gopSize": resolved.gop_size,
        "gopSizeUnits": resolved.gop_size_units,
        "level": "H265_LEVEL_AUTO",
        "lookAheadRateControl": resolved.look_ahead_rate_control,
        "maxBitrate": resolved.max_bitrate,
        "mvOverPictureBoundaries": "ENABLED",
        "mvTemporalPredictor": "ENABLED",
        "parDenominator": 1,
        "parNumerator": 1,
        "profile": resolved.codec_profile,
        "rateControlMode": "QVBR",
        "scanType": "PROGRESSIVE",
        "sceneChangeDetect": "ENABLED",
        "tier": tier,
        "tilePadding": "NONE",
        "timecodeBurninSettings": {
            "fontSize": timecode_burnin_font_size(video.height),
            "position": "TOP_LEFT"
        },
        "timecodeInsertion": "DISABLED",
        "treeblockSize": "AUTO"
    });
    insert_buf_size(&mut settings, video);

    Ok(video_description(
        rendition,
        video,
        json!({ "h265Settings": settings }),
    ))
}

pub fn frame_capture_video_description(
    rendition: &RenditionConfig,
    ctx: &BuildContext<'_>,
) -> GenerateResult<Value> {
    let video = rendition.video().ok_or_else(|| wrong_kind(rendition, ctx))?;
    Ok(json!({
        "codecSettings": {
            "frameCaptureSettings": {}
        },
        "height": video.height,
        "name": rendition.name,
        "respondToAfd": "NONE",
        "scalingBehavior": "DEFAULT",
        "sharpness": 50,
        "width": video.width
    }))
}

fn insert_buf_size(settings: &mut Value, video: &VideoRendition) {
    if let (Some(buf_size), Value::Object(map)) = (video.buf_size, settings) {
        map.insert("bufSize".into(), json!(buf_size));
    }
}

fn video_description(
    rendition: &RenditionConfig,
    video: &VideoRendition,
    codec_settings: Value,
) -> Value {
    json!({
        "codecSettings": codec_settings,
        "height": video.height,
        "name": rendition.name,
        "respondToAfd": "NONE",
        "sharpness": 100,
        "scalingBehavior": "DEFAULT",
        "width": video.width
    })
}

pub fn aac_audio_description(
    rendition: &RenditionConfig,
    ctx: &BuildContext<'_>,
) -> GenerateResult<Value> {
    let audio = rendition.audio().ok_or_else(|| wrong_kind(rendition, ctx))?;
    let profile = audio
        .coding_profile
        .as_deref()
        .ok_or_else(|| missing(rendition, "codingProfile"))?;
    let sample_rate = audio
        .sample_rate
        .ok_or_else(|| missing(rendition, "sampleRate"))?;
    Ok(audio_description(
        rendition,
        audio,
        json!({
            "aacSettings": {
                "inputType": "NORMAL",
                "bitrate": audio.bitrate,
                "codingMode": audio.coding_mode,
                "rawFormat": "NONE",
                "spec": "MPEG4",
                "profile": profile,
                "rateControlMode": "CBR",
                "sampleRate": sample_rate
            }
        }),
    ))
}

pub fn ac3_audio_description(
    rendition: &RenditionConfig,
    ctx: &BuildContext<'_>,
) -> GenerateResult<Value> {
    let audio = rendition.audio().ok_or_else(|| wrong_kind(rendition, ctx))?;
    Ok(audio_description(
        rendition,
        audio,
        json!({
            "ac3Settings": {
                "bitrate": audio.bitrate,
                "bitstreamMode": "COMPLETE_MAIN",
                "codingMode": audio.coding_mode,
                "dialnorm": audio.dial_norm,
                "drcProfile": "NONE",
                "lfeFilter": "ENABLED",
                "metadataControl": "USE_CONFIGURED"
            }
        }),
    ))
}

pub fn eac3_audio_description(
    rendition: &RenditionConfig,
    ctx: &BuildContext<'_>,
) -> GenerateResult<Value> {
    let audio = rendition.audio().ok_or_else(|| wrong_kind(rendition, ctx))?;
    Ok(audio_description(
        rendition,
        audio,
        json!({
            "eac3Settings": {
                "attenuationControl": "NONE",
                "bitrate": audio.bitrate,
                "bitstreamMode": "COMPLETE_MAIN",
                "codingMode": audio.coding_mode,
                "dcFilter": "ENABLED",
                "dialnorm": audio.dial_norm,
                "drcLine": "NONE",
                "drcRf": "NONE",
                "lfeControl": "LFE",
                "lfeFilter": "ENABLED",
                "loRoCenterMixLevel": -3,
                "loRoSurroundMixLevel": -3,
                "ltRtCenterMixLevel": -3,
                "ltRtSurroundMixLevel": -3,
                "metadataControl": "FOLLOW_INPUT",
                "passthroughControl": "NO_PASSTHROUGH",
                "phaseControl": "SHIFT_90_DEGREES",
                "stereoDownmix": "NOT_INDICATED",
                "surroundExMode": "DISABLED",
                "surroundMode": "NOT_INDICATED"
            }
        }),
    ))
}

fn audio_description(
    rendition: &RenditionConfig,
    audio: &AudioRendition,
    codec_settings: Value,
) -> Value {
    json!({
        "codecSettings": codec_settings,
        "audioTypeControl": "FOLLOW_INPUT",
        "languageCode": audio.language_code,
        "languageCodeControl": "USE_CONFIGURED",
        "audioSelectorName": "default",
        "name": audio_description_name(rendition.codec, audio.bitrate, &audio.language_code),
        "streamName": audio.stream_name
    })
}

pub fn caption_description(
    rendition: &RenditionConfig,
    ctx: &BuildContext<'_>,
) -> GenerateResult<Value> {
    let caption = rendition
        .caption()
        .ok_or_else(|| wrong_kind(rendition, ctx))?;
    let capabilities = ctx.schema.capabilities();

    let mut description = Map::new();
    description.insert(
        "name".into(),
        json!(caption_description_name(&caption.language_code)),
    );
    description.insert("languageCode".into(), json!(caption.language_code));
    description.insert(
        "languageDescription".into(),
        json!(caption.language_description),
    );
    match capabilities.captions {
        Some(CaptionFormat::WebVtt) => {
            description.insert(
                "captionSelectorName".into(),
                json!(caption.captions_selector_name),
            );
            description.insert(
                "destinationSettings".into(),
                json!({ "webvttDestinationSettings": {} }),
            );
        }
        Some(CaptionFormat::Ttml) => {
            description.insert("accessibility".into(), json!(caption.accessibility));
            if capabilities.dash_roles {
                description.insert("captionDashRoles".into(), json!(["MAIN"]));
            }
            description.insert(
                "captionSelectorName".into(),
                json!(caption.captions_selector_name),
            );
            description.insert(
                "destinationSettings".into(),
                json!({
                    "ttmlDestinationSettings": {
                        "styleControl": caption.style_control
                    }
                }),
            );
        }
        Some(CaptionFormat::TranscodeTtml) | None => return Err(wrong_kind(rendition, ctx)),
    }
    Ok(Value::Object(description))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{GenerateError, TargetSchema};
    use crate::ladder::LadderConfig;

    const LADDER: &str = r#"
common:
  gopSize: 60
  framerate: 30
  videoCodecProfile: MAIN
  videoCodecTier: HIGH
  videoLookAheadRateControl: HIGH
  gopSizeUnits: SECONDS
outputs:
  - { name: avc_360, codec: H_264, width: 640, height: 360, maxBitrate: 1000000, bufSize: 2000000, codecProfile: HIGH }
  - { name: hevc_1080, codec: H_265, width: 1920, height: 1080, maxBitrate: 6000000 }
  - { name: thumbs, codec: FRAME_CAPTURE, width: 320, height: 180 }
  - { name: stereo, codec: AAC, bitrate: 96000, codingMode: CODING_MODE_2_0, codingProfile: LC, sampleRate: 48000, languageCode: SPA, streamName: Espanol }
  - { name: subs, codec: CAPTIONS, languageCode: spa, languageDescription: Spanish, captionsSelectorName: cs1 }
"#;

    fn context(ladder: &LadderConfig, schema: TargetSchema) -> BuildContext<'_> {
        BuildContext {
            common: &ladder.common,
            schema,
        }
    }

    #[test]
    fn h264_carries_font_size_and_optional_buffer() {
        let ladder = LadderConfig::from_yaml_str("l", LADDER).unwrap();
        let ctx = context(&ladder, TargetSchema::MediaLiveHlsTs);
        let description = h264_video_description(&ladder.outputs[0], &ctx).unwrap();
        let settings = &description["codecSettings"]["h264Settings"];
        assert_eq!(settings["timecodeBurninSettings"]["fontSize"], "SMALL_16");
        assert_eq!(settings["bufSize"], 2_000_000);
        assert_eq!(settings["profile"], "HIGH");
        assert_eq!(description["name"], "avc_360");
        assert_eq!(description["sharpness"], 100);
    }

    #[test]
    fn h265_uses_resolved_gop_units_and_no_buffer_by_default() {
        let ladder = LadderConfig::from_yaml_str("l", LADDER).unwrap();
        let ctx = context(&ladder, TargetSchema::MediaLiveCmafIngest);
        let description = h265_video_description(&ladder.outputs[1], &ctx).unwrap();
        let settings = &description["codecSettings"]["h265Settings"];
        assert_eq!(settings["gopSizeUnits"], "SECONDS");
        assert_eq!(settings["tier"], "HIGH");
        assert_eq!(settings["timecodeBurninSettings"]["fontSize"], "LARGE_48");
        assert!(settings.get("bufSize").is_none());
    }

    #[test]
    fn audio_name_and_language_are_lowercase() {
        let ladder = LadderConfig::from_yaml_str("l", LADDER).unwrap();
        let ctx = context(&ladder, TargetSchema::MediaLiveHlsTs);
        let description = aac_audio_description(&ladder.outputs[3], &ctx).unwrap();
        assert_eq!(description["name"], "audio_aac_96000_spa");
        assert_eq!(description["languageCode"], "spa");
        assert_eq!(description["audioSelectorName"], "default");
    }

    #[test]
    fn caption_destination_follows_schema() {
        let ladder = LadderConfig::from_yaml_str("l", LADDER).unwrap();
        let subs = &ladder.outputs[4];

        let webvtt = caption_description(subs, &context(&ladder, TargetSchema::MediaLiveHlsTs))
            .unwrap();
        assert!(webvtt["destinationSettings"]["webvttDestinationSettings"].is_object());
        assert!(webvtt.get("captionDashRoles").is_none());

        let ttml = caption_description(
            subs,
            &context(&ladder, TargetSchema::MediaLiveMediaPackage),
        )
        .unwrap();
        assert_eq!(
            ttml["destinationSettings"]["ttmlDestinationSettings"]["styleControl"],
            "PASSTHROUGH"
        );
        assert_eq!(ttml["captionDashRoles"], json!(["MAIN"]));

        let err = caption_description(subs, &context(&ladder, TargetSchema::MediaTailorHlsCmaf))
            .unwrap_err();
        assert!(matches!(err, GenerateError::UnsupportedCodec { .. }));
    }
}
