//! Live encoder documents: descriptions plus a single output group whose
//! entries reference them by name.

use serde_json::{json, Value};

use crate::generator::builders::{self, BuildContext};
use crate::generator::classifier::ClassifiedLadder;
use crate::generator::naming;
use crate::generator::{GenerateResult, TargetSchema};
use crate::ladder::{Codec, RenditionConfig, RenditionKind};

use super::{ensure_unique, DESTINATION_REF_ID};

pub fn assemble(ctx: &BuildContext<'_>, classified: &ClassifiedLadder<'_>) -> GenerateResult<Value> {
    let capabilities = ctx.schema.capabilities();

    let mut audio_descriptions = build_all(&classified.audio, ctx)?;
    if capabilities.dash_roles {
        if let Some(Value::Object(first)) = audio_descriptions.first_mut() {
            first.insert("audioDashRoles".into(), json!(["MAIN"]));
        }
    }
    let caption_descriptions = build_all(&classified.caption, ctx)?;
    let video_descriptions = build_all(&classified.video, ctx)?;

    ensure_unique(description_names(&audio_descriptions), ctx.schema)?;
    ensure_unique(description_names(&caption_descriptions), ctx.schema)?;

    let output_group = match ctx.schema {
        TargetSchema::MediaLiveCmafIngest => cmaf_ingest_output_group(ctx, classified)?,
        TargetSchema::MediaLiveMediaPackage => media_package_output_group(classified),
        _ => hls_output_group(ctx, classified)?,
    };

    Ok(json!({
        "audioDescriptions": audio_descriptions,
        "captionDescriptions": caption_descriptions,
        "globalConfiguration": {
            "inputEndAction": "NONE",
            "outputLockingMode": "PIPELINE_LOCKING",
            "outputTimingSource": "SYSTEM_CLOCK",
            "supportLowFramerateInputs": "DISABLED"
        },
        "outputGroups": [output_group],
        "timecodeConfig": {
            "source": "SYSTEMCLOCK"
        },
        "videoDescriptions": video_descriptions,
        "availConfiguration": {
            "availSettings": {
                "scte35SpliceInsert": {
                    "webDeliveryAllowedFlag": "FOLLOW",
                    "noRegionalBlackoutFlag": "FOLLOW"
                }
            }
        }
    }))
}

fn build_all(renditions: &[&RenditionConfig], ctx: &BuildContext<'_>) -> GenerateResult<Vec<Value>> {
    renditions
        .iter()
        .map(|rendition| builders::build(rendition, ctx))
        .collect()
}

fn description_names(descriptions: &[Value]) -> impl Iterator<Item = &str> {
    descriptions
        .iter()
        .filter_map(|description| description["name"].as_str())
}

/// Name an output-group entry is registered under, derived from codec
/// parameters rather than the ladder row name.
fn derived_name(rendition: &RenditionConfig) -> String {
    match &rendition.kind {
        RenditionKind::Video(video) if rendition.codec == Codec::FrameCapture => {
            naming::frame_capture_description_name(video.height)
        }
        RenditionKind::Video(video) => {
            naming::video_description_name(rendition.codec, video.max_bitrate.unwrap_or_default())
        }
        RenditionKind::Audio(audio) => {
            naming::audio_description_name(rendition.codec, audio.bitrate, &audio.language_code)
        }
        RenditionKind::Caption(caption) => naming::caption_description_name(&caption.language_code),
    }
}

fn output_entry(rendition: &RenditionConfig, output_settings: Value) -> Value {
    match &rendition.kind {
        RenditionKind::Video(_) => json!({
            "captionDescriptionNames": [],
            "outputName": rendition.name,
            "outputSettings": output_settings,
            "videoDescriptionName": rendition.name
        }),
        RenditionKind::Audio(_) => json!({
            "outputName": rendition.name,
            "captionDescriptionNames": [],
            "outputSettings": output_settings,
            "audioDescriptionNames": [derived_name(rendition)]
        }),
        RenditionKind::Caption(_) => json!({
            "outputName": rendition.name,
            "captionDescriptionNames": [derived_name(rendition)],
            "outputSettings": output_settings,
            "audioDescriptionNames": []
        }),
    }
}

fn cmaf_ingest_output_group(
    ctx: &BuildContext<'_>,
    classified: &ClassifiedLadder<'_>,
) -> GenerateResult<Value> {
    let modifiers: Vec<String> = classified.ordered.iter().map(|r| derived_name(r)).collect();
    ensure_unique(modifiers.iter().map(String::as_str), ctx.schema)?;

    let outputs: Vec<Value> = classified
        .ordered
        .iter()
        .zip(&modifiers)
        .map(|(rendition, modifier)| {
            output_entry(
                rendition,
                json!({
                    "cmafIngestOutputSettings": {
                        "nameModifier": modifier
                    }
                }),
            )
        })
        .collect();

    Ok(json!({
        "outputGroupSettings": {
            "cmafIngestGroupSettings": {
                "destination": {
                    "destinationRefId": DESTINATION_REF_ID
                },
                "nielsenId3Behavior": "NO_PASSTHROUGH",
                "scte35Type": "SCTE_35_WITHOUT_SEGMENTATION",
                "segmentLength": ctx.common.segment_length,
                "segmentLengthUnits": "SECONDS"
            }
        },
        "name": "CMAFIngest",
        "outputs": outputs
    }))
}

fn media_package_output_group(classified: &ClassifiedLadder<'_>) -> Value {
    let outputs: Vec<Value> = classified
        .ordered
        .iter()
        .map(|rendition| {
            output_entry(
                rendition,
                json!({
                    "mediaPackageOutputSettings": {}
                }),
            )
        })
        .collect();

    json!({
        "outputGroupSettings": {
            "mediaPackageGroupSettings": {
                "destination": {
                    "destinationRefId": DESTINATION_REF_ID
                }
            }
        },
        "name": "MediaPackage",
        "outputs": outputs
    })
}

fn hls_output_group(
    ctx: &BuildContext<'_>,
    classified: &ClassifiedLadder<'_>,
) -> GenerateResult<Value> {
    let modifiers: Vec<String> = classified
        .ordered
        .iter()
        .map(|r| format!("_{}", derived_name(r)))
        .collect();
    ensure_unique(modifiers.iter().map(String::as_str), ctx.schema)?;

    // One alternate-audio group per codec, in first-seen order.
    let mut audio_groups: Vec<&'static str> = Vec::new();
    for rendition in &classified.audio {
        let group = naming::audio_group_id(rendition.codec);
        if !audio_groups.contains(&group) {
            audio_groups.push(group);
        }
    }
    let standard_settings = json!({
        "standardHlsSettings": {
            "audioRenditionSets": audio_groups.join(","),
            "m3U8Settings": {
                "scte35Behavior": ctx.common.scte35_behavior,
                "scte35Pid": "500"
            }
        }
    });

    let mut default_audio_assigned = false;
    let mut outputs = Vec::with_capacity(classified.ordered.len());
    for (rendition, modifier) in classified.ordered.iter().zip(&modifiers) {
        let hls_settings = match rendition.codec {
            Codec::FrameCapture => json!({ "frameCaptureHlsSettings": {} }),
            Codec::Aac | Codec::Ac3 | Codec::Eac3 => {
                let track_type = if default_audio_assigned {
                    "ALTERNATE_AUDIO_AUTO_SELECT"
                } else {
                    default_audio_assigned = true;
                    "ALTERNATE_AUDIO_AUTO_SELECT_DEFAULT"
                };
                json!({
                    "audioOnlyHlsSettings": {
                        "audioGroupId": naming::audio_group_id(rendition.codec),
                        "audioTrackType": track_type,
                        "segmentType": "AAC"
                    }
                })
            }
            _ => standard_settings.clone(),
        };
        outputs.push(output_entry(
            rendition,
            json!({
                "hlsOutputSettings": {
                    "hlsSettings": hls_settings,
                    "nameModifier": modifier
                }
            }),
        ));
    }

    let ad_markers: Vec<&str> = ctx
        .common
        .ad_markers
        .as_deref()
        .filter(|marker| !marker.is_empty())
        .into_iter()
        .collect();

    Ok(json!({
        "outputGroupSettings": {
            "hlsGroupSettings": {
                "adMarkers": ad_markers,
                "destination": {
                    "destinationRefId": DESTINATION_REF_ID
                },
                "hlsCdnSettings": {
                    "hlsBasicPutSettings": {
                        "connectionRetryInterval": 1,
                        "filecacheDuration": 300,
                        "numRetries": 10,
                        "restartDelay": 15
                    }
                },
                "hlsId3SegmentTagging": "ENABLED",
                "inputLossAction": "PAUSE_OUTPUT",
                "segmentLength": ctx.common.segment_length,
                "minSegmentLength": ctx.common.min_segment_length,
                "programDateTime": "INCLUDE",
                "programDateTimeClock": "SYSTEM_CLOCK",
                "programDateTimePeriod": ctx.common.segment_length
            }
        },
        "name": "HLS",
        "outputs": outputs
    }))
}
