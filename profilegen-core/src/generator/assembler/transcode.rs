//! Custom transcode profile documents: one CMAF or DASH ISO output group.

use serde_json::{json, Map, Value};

use crate::generator::builders::{self, BuildContext};
use crate::generator::classifier::ClassifiedLadder;
use crate::generator::trickplay::TrickplayCache;
use crate::generator::{GenerateError, GenerateResult, TargetSchema};
use crate::ladder::{MediaKind, RenditionConfig};

const PLACEHOLDER_DESTINATION: &str = "s3://bucket/main";
const AUDIO_SELECTOR: &str = "Audio Selector 1";

struct Containers {
    video: Value,
    audio: Value,
    caption: Option<Value>,
}

impl Containers {
    fn for_schema(schema: TargetSchema) -> Self {
        match schema {
            TargetSchema::MediaTailorDash => Self {
                video: json!({
                    "Container": "MPD",
                    "MpdSettings": {
                        "CaptionContainerType": "RAW",
                        "Scte35Source": "NONE",
                        "Scte35Esam": "NONE",
                        "AudioDuration": "MATCH_VIDEO_DURATION"
                    }
                }),
                audio: json!({
                    "Container": "MPD",
                    "MpdSettings": {
                        "AudioDuration": "MATCH_VIDEO_DURATION"
                    }
                }),
                caption: Some(json!({
                    "Container": "MPD",
                    "MpdSettings": {
                        "CaptionContainerType": "FRAGMENTED_MP4"
                    }
                })),
            },
            _ => {
                let cmaf = json!({
                    "Container": "CMFC",
                    "CmfcSettings": {
                        "AudioDuration": "MATCH_VIDEO_DURATION"
                    }
                });
                Self {
                    video: cmaf.clone(),
                    audio: cmaf,
                    caption: None,
                }
            }
        }
    }
}

pub fn assemble(
    ctx: &BuildContext<'_>,
    classified: &ClassifiedLadder<'_>,
    trickplay: &TrickplayCache,
) -> GenerateResult<Value> {
    let containers = Containers::for_schema(ctx.schema);
    let mut outputs = Vec::with_capacity(classified.ordered.len());
    for rendition in &classified.ordered {
        outputs.push(output(rendition, ctx, &containers)?);
    }

    let group = match ctx.schema {
        TargetSchema::MediaTailorDash => dash_output_group(ctx, outputs, trickplay),
        _ => cmaf_output_group(ctx, outputs, trickplay),
    };

    Ok(json!({
        "TimecodeConfig": {
            "Source": "ZEROBASED"
        },
        "OutputGroups": [group],
        "AdAvailOffset": 0,
        "Inputs": [inputs(ctx, &classified.caption)]
    }))
}

fn output(
    rendition: &RenditionConfig,
    ctx: &BuildContext<'_>,
    containers: &Containers,
) -> GenerateResult<Value> {
    let description = builders::build(rendition, ctx)?;
    let output = match rendition.media_kind() {
        MediaKind::Video => json!({
            "ContainerSettings": containers.video,
            "VideoDescription": description,
            "NameModifier": rendition.name
        }),
        MediaKind::Audio => json!({
            "ContainerSettings": containers.audio,
            "AudioDescriptions": [description],
            "NameModifier": rendition.name
        }),
        MediaKind::Caption => {
            let container = containers.caption.as_ref().ok_or_else(|| {
                GenerateError::UnsupportedCodec {
                    rendition: rendition.name.clone(),
                    codec: rendition.codec.to_string(),
                    schema: ctx.schema.to_string(),
                }
            })?;
            json!({
                "ContainerSettings": container,
                "NameModifier": rendition.name,
                "CaptionDescriptions": [description]
            })
        }
    };
    Ok(output)
}

fn dash_output_group(
    ctx: &BuildContext<'_>,
    outputs: Vec<Value>,
    trickplay: &TrickplayCache,
) -> Value {
    let mut settings = json!({
        "SegmentLength": ctx.common.segment_length,
        "SegmentLengthControl": "GOP_MULTIPLE",
        "MinFinalSegmentLength": 1,
        "Destination": PLACEHOLDER_DESTINATION,
        "FragmentLength": ctx.common.fragment_length,
        "SegmentControl": "SEGMENTED_FILES",
        "MpdProfile": "MAIN_PROFILE",
        "HbbtvCompliance": "NONE",
        "WriteSegmentTimelineInRepresentation": "ENABLED",
        "DashIFrameTrickPlayNameModifier": "_iframe",
        "DashManifestStyle": "BASIC"
    });
    apply_trickplay(&mut settings, trickplay);
    json!({
        "Name": "DASH ISO",
        "Outputs": outputs,
        "OutputGroupSettings": {
            "Type": "DASH_ISO_GROUP_SETTINGS",
            "DashIsoGroupSettings": settings
        }
    })
}

fn cmaf_output_group(
    ctx: &BuildContext<'_>,
    outputs: Vec<Value>,
    trickplay: &TrickplayCache,
) -> Value {
    let mut settings = json!({
        "WriteHlsManifest": "ENABLED",
        "WriteDashManifest": "ENABLED",
        "SegmentLength": ctx.common.segment_length,
        "SegmentLengthControl": "GOP_MULTIPLE",
        "MinFinalSegmentLength": 1,
        "Destination": PLACEHOLDER_DESTINATION,
        "FragmentLength": ctx.common.fragment_length,
        "SegmentControl": "SEGMENTED_FILES",
        "MpdProfile": "MAIN_PROFILE",
        "ManifestDurationFormat": "FLOATING_POINT",
        "StreamInfResolution": "INCLUDE",
        "ClientCache": "ENABLED",
        "ManifestCompression": "NONE",
        "CodecSpecification": "RFC_4281"
    });
    apply_trickplay(&mut settings, trickplay);
    json!({
        "Name": "CMAF",
        "Outputs": outputs,
        "OutputGroupSettings": {
            "Type": "CMAF_GROUP_SETTINGS",
            "CmafGroupSettings": settings
        }
    })
}

fn apply_trickplay(settings: &mut Value, trickplay: &TrickplayCache) {
    if let (Some(trickplay), Value::Object(map)) = (trickplay.image_based_trickplay(), settings) {
        map.insert("ImageBasedTrickPlay".into(), json!(trickplay.mode()));
        map.insert("ImageBasedTrickPlaySettings".into(), trickplay.settings());
    }
}

fn inputs(ctx: &BuildContext<'_>, captions: &[&RenditionConfig]) -> Value {
    let mut input = json!({
        "AudioSelectors": {
            AUDIO_SELECTOR: {
                "Offset": 0,
                "DefaultSelection": "DEFAULT",
                "ProgramSelection": 1
            }
        },
        "VideoSelector": {
            "ColorSpace": "FOLLOW",
            "Rotate": "DEGREE_0",
            "AlphaBehavior": "DISCARD"
        },
        "FilterEnable": "AUTO",
        "PsiControl": "USE_PSI",
        "FilterStrength": 0,
        "DeblockFilter": "DISABLED",
        "DenoiseFilter": "DISABLED",
        "TimecodeSource": "EMBEDDED"
    });

    let mut selectors = Map::new();
    for caption in captions.iter().filter_map(|rendition| rendition.caption()) {
        if selectors.contains_key(&caption.captions_selector_name) {
            continue;
        }
        selectors.insert(
            caption.captions_selector_name.clone(),
            json!({ "SourceSettings": caption_source(ctx) }),
        );
    }
    if !selectors.is_empty() {
        if let Value::Object(map) = &mut input {
            map.insert("CaptionSelectors".into(), Value::Object(selectors));
        }
    }
    input
}

fn caption_source(ctx: &BuildContext<'_>) -> Value {
    match &ctx.common.caption_source_file {
        Some(file) => json!({
            "SourceType": "SCC",
            "FileSourceSettings": {
                "SourceFile": file
            }
        }),
        None => json!({
            "SourceType": "EMBEDDED"
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::generate_profile;
    use crate::ladder::LadderConfig;

    const LADDER: &str = r#"
common:
  gopSize: 2
  gopSizeUnits: SECONDS
  framerate: 25
  videoCodecProfile: HIGH
  videoLookAheadRateControl: HIGH
  segmentLength: 4
  captionSourceFile: https://example.com/captions.scc
outputs:
  - { name: video_720p, codec: H_264, width: 1280, height: 720, maxBitrate: 4000000 }
  - { name: audio_eng, codec: AAC, bitrate: 128000, codingMode: CODING_MODE_2_0, codingProfile: LC, sampleRate: 48000, languageCode: eng, streamName: English }
  - { name: captions_eng, codec: CAPTIONS, languageCode: eng, languageDescription: English, captionsSelectorName: Captions Selector 1 }
  - { name: captions_fra, codec: CAPTIONS, languageCode: fra, languageDescription: French, captionsSelectorName: Captions Selector 1 }
"#;

    #[test]
    fn dash_profile_carries_captions_and_selector() {
        let ladder = LadderConfig::from_yaml_str("ladder", LADDER).unwrap();
        let output = generate_profile(&ladder, TargetSchema::MediaTailorDash, "1").unwrap();
        let document = output.profile.document;

        let keys: Vec<&str> = document
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(
            keys,
            vec!["TimecodeConfig", "OutputGroups", "AdAvailOffset", "Inputs"]
        );

        let group = &document["OutputGroups"][0];
        assert_eq!(group["Name"], "DASH ISO");
        assert_eq!(group["OutputGroupSettings"]["DashIsoGroupSettings"]["SegmentLength"], 4);
        let outputs = group["Outputs"].as_array().unwrap();
        assert_eq!(outputs.len(), 4);
        assert_eq!(
            outputs[2]["ContainerSettings"]["MpdSettings"]["CaptionContainerType"],
            "FRAGMENTED_MP4"
        );
        assert_eq!(outputs[2]["CaptionDescriptions"][0]["LanguageCode"], "ENG");

        let selectors = document["Inputs"][0]["CaptionSelectors"].as_object().unwrap();
        assert_eq!(selectors.len(), 1);
        assert_eq!(
            selectors["Captions Selector 1"]["SourceSettings"]["SourceType"],
            "SCC"
        );
    }

    #[test]
    fn cmaf_profile_has_no_caption_selector() {
        let ladder = LadderConfig::from_yaml_str("ladder", LADDER).unwrap();
        let output = generate_profile(&ladder, TargetSchema::MediaTailorHlsCmaf, "1").unwrap();
        let document = output.profile.document;
        assert!(document["Inputs"][0].get("CaptionSelectors").is_none());
        assert_eq!(output.skipped.len(), 2);
        let outputs = document["OutputGroups"][0]["Outputs"].as_array().unwrap();
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[1]["ContainerSettings"]["Container"], "CMFC");
        assert_eq!(outputs[1]["NameModifier"], "audio_eng");
    }
}
