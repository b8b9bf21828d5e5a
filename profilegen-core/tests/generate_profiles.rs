use std::fs;
use std::path::Path;

use profilegen_core::generator::naming::timecode_burnin_font_size;
use profilegen_core::{
    generate_profile, generate_profile_set, load_ladder_config, GenerateError, LadderConfig,
    ProfileEmitter, TargetSchema,
};
use serde_json::Value;
use tempfile::tempdir;

const SINGLE_VIDEO: &str = r#"
common:
  gopSize: 2
  gopSizeUnits: SECONDS
  framerate: 25
  videoCodecProfile: HIGH
  videoLookAheadRateControl: HIGH
outputs:
  - name: video_1080p
    codec: H_264
    width: 1920
    height: 1080
    maxBitrate: 8000000
  - name: audio_eng
    codec: AAC
    bitrate: 128000
    codingMode: CODING_MODE_2_0
    codingProfile: LC
    sampleRate: 48000
    streamName: English
    languageCode: eng
"#;

const FRAME_CAPTURE: &str = r#"
  - name: thumbnails
    codec: FRAME_CAPTURE
    width: 320
    height: 180
"#;

fn ladder(yaml: &str) -> LadderConfig {
    LadderConfig::from_yaml_str("scenario", yaml).expect("ladder should validate")
}

fn cmaf_settings(document: &Value) -> &Value {
    &document["OutputGroups"][0]["OutputGroupSettings"]["CmafGroupSettings"]
}

#[test]
fn h264_and_aac_on_cmaf() {
    let output = generate_profile(&ladder(SINGLE_VIDEO), TargetSchema::MediaTailorHlsCmaf, "1")
        .expect("profile should assemble");
    let document = &output.profile.document;
    let outputs = document["OutputGroups"][0]["Outputs"]
        .as_array()
        .expect("outputs array");
    assert_eq!(outputs.len(), 2);

    let video = &outputs[0]["VideoDescription"];
    assert_eq!(video["Width"], 1920);
    assert_eq!(video["Height"], 1080);
    assert_eq!(video["CodecSettings"]["Codec"], "H_264");

    let audio = &outputs[1]["AudioDescriptions"][0];
    assert_eq!(audio["CustomLanguageCode"], "en");

    assert!(outputs.iter().all(|o| o.get("CaptionDescriptions").is_none()));
    assert!(document["Inputs"][0].get("CaptionSelectors").is_none());
    assert!(cmaf_settings(document).get("ImageBasedTrickPlay").is_none());
    assert!(output.skipped.is_empty());
}

#[test]
fn frame_capture_becomes_trickplay() {
    let yaml = format!("{SINGLE_VIDEO}{FRAME_CAPTURE}");
    let ladder = ladder(&yaml);

    for schema in [TargetSchema::MediaTailorHlsCmaf, TargetSchema::MediaTailorDash] {
        let output = generate_profile(&ladder, schema, "1").unwrap();
        let group = &output.profile.document["OutputGroups"][0]["OutputGroupSettings"];
        let settings = match schema {
            TargetSchema::MediaTailorDash => &group["DashIsoGroupSettings"],
            _ => &group["CmafGroupSettings"],
        };
        assert_eq!(settings["ImageBasedTrickPlay"], "ADVANCED");
        assert_eq!(settings["ImageBasedTrickPlaySettings"]["ThumbnailHeight"], 180);
        assert_eq!(settings["ImageBasedTrickPlaySettings"]["ThumbnailWidth"], 320);
        // The capture rendition is not an output of its own.
        assert_eq!(
            output.profile.document["OutputGroups"][0]["Outputs"]
                .as_array()
                .unwrap()
                .len(),
            2
        );
    }

    for schema in [
        TargetSchema::MediaLiveCmafIngest,
        TargetSchema::MediaLiveMediaPackage,
    ] {
        let output = generate_profile(&ladder, schema, "1").unwrap();
        assert_eq!(output.skipped.len(), 1);
        assert_eq!(output.skipped[0].name, "thumbnails");
        let names: Vec<&str> = output.profile.document["videoDescriptions"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|d| d["name"].as_str())
            .collect();
        assert_eq!(names, vec!["video_1080p"]);
    }

    let hls = generate_profile(&ladder, TargetSchema::MediaLiveHlsTs, "1").unwrap();
    assert!(hls.skipped.is_empty());
    assert_eq!(
        hls.profile.document["videoDescriptions"]
            .as_array()
            .unwrap()
            .len(),
        2
    );
}

#[test]
fn no_frame_capture_means_no_trickplay_anywhere() {
    let set = generate_profile_set(&ladder(SINGLE_VIDEO), &TargetSchema::ALL, "1").unwrap();
    assert_eq!(set.profiles.len(), TargetSchema::ALL.len());
    for profile in &set.profiles {
        let text = profile.canonical_string();
        assert!(!text.contains("ImageBasedTrickPlay"), "{}", profile.schema);
        assert!(!text.contains("frameCaptureSettings"), "{}", profile.schema);
    }
}

#[test]
fn generation_is_deterministic() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sports.yaml");
    fs::write(&path, format!("{SINGLE_VIDEO}{FRAME_CAPTURE}")).unwrap();

    let first = generate_profile_set(&load_ladder_config(&path).unwrap(), &TargetSchema::ALL, "4")
        .unwrap();
    let second = generate_profile_set(&load_ladder_config(&path).unwrap(), &TargetSchema::ALL, "4")
        .unwrap();
    for (a, b) in first.profiles.iter().zip(&second.profiles) {
        assert_eq!(a.to_pretty_string().unwrap(), b.to_pretty_string().unwrap());
    }
}

#[test]
fn two_frame_captures_fail_before_writing() {
    let yaml = format!(
        "{SINGLE_VIDEO}{FRAME_CAPTURE}  - name: thumbnails_hd\n    codec: FRAME_CAPTURE\n    width: 640\n    height: 360\n"
    );
    let dir = tempdir().unwrap();
    let ladder_path = dir.path().join("double.yaml");
    fs::write(&ladder_path, yaml).unwrap();

    let error = load_ladder_config(&ladder_path).unwrap_err();
    assert!(matches!(
        error,
        profilegen_core::ConfigError::Invalid {
            source: GenerateError::MultipleFrameCaptureRenditions { .. },
            ..
        }
    ));
    let output = dir.path().join("generated-profiles");
    assert!(!output.exists());
}

#[test]
fn burn_in_font_size_boundaries() {
    let sizes: Vec<&str> = [270, 271, 360, 361, 720, 721]
        .into_iter()
        .map(timecode_burnin_font_size)
        .collect();
    assert_eq!(
        sizes,
        vec![
            "EXTRA_SMALL_10",
            "SMALL_16",
            "SMALL_16",
            "MEDIUM_32",
            "MEDIUM_32",
            "LARGE_48"
        ]
    );
}

#[test]
fn sample_ladder_emits_full_profile_set() {
    let fixture = Path::new(env!("CARGO_MANIFEST_DIR")).join("../configs/ladders/sports-1080p.yaml");
    let ladder = load_ladder_config(&fixture).unwrap();
    let set = generate_profile_set(&ladder, &TargetSchema::ALL, "1").unwrap();

    let dir = tempdir().unwrap();
    let report = ProfileEmitter::new(dir.path()).write_all(&set.profiles);
    assert!(report.is_success());
    assert_eq!(report.written.len(), 5);

    let dash = dir.path().join("sports-1080p/mediatailor-dash-v1.json");
    let content = fs::read_to_string(&dash).unwrap();
    assert!(content.starts_with("{\n    \"TimecodeConfig\""));
    let live = dir.path().join("sports-1080p/medialive-hls-ts-v1.json");
    let content = fs::read_to_string(&live).unwrap();
    assert!(content.starts_with("{\n  \"audioDescriptions\""));

    let reparsed: Value = serde_json::from_str(&fs::read_to_string(&dash).unwrap()).unwrap();
    let written = set
        .profiles
        .iter()
        .find(|p| p.schema == TargetSchema::MediaTailorDash)
        .unwrap();
    assert_eq!(reparsed, written.document);
}
