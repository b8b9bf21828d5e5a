pub mod assembler;
pub mod builders;
pub mod classifier;
mod error;
pub mod naming;
pub mod trickplay;

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use tracing::info;

use crate::ladder::LadderConfig;

pub use classifier::{ClassifiedLadder, SkippedRendition};
pub use error::{GenerateError, GenerateResult};
pub use trickplay::{FrameCaptureSource, ImageBasedTrickplay, TrickplayCache};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetSchema {
    MediaTailorHlsCmaf,
    MediaTailorDash,
    MediaLiveHlsTs,
    MediaLiveCmafIngest,
    MediaLiveMediaPackage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaFamily {
    /// Custom transcode profiles for ad insertion.
    Transcode,
    /// Live encoder channel settings.
    Live,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameCaptureHandling {
    Trickplay,
    VideoOutput,
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionFormat {
    /// TTML in fragmented MP4, referenced by an input caption selector.
    TranscodeTtml,
    WebVtt,
    /// TTML with style control.
    Ttml,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaCapabilities {
    pub frame_capture: FrameCaptureHandling,
    pub captions: Option<CaptionFormat>,
    pub dash_roles: bool,
    pub indent: usize,
}

impl TargetSchema {
    pub const ALL: [TargetSchema; 5] = [
        TargetSchema::MediaTailorHlsCmaf,
        TargetSchema::MediaTailorDash,
        TargetSchema::MediaLiveHlsTs,
        TargetSchema::MediaLiveCmafIngest,
        TargetSchema::MediaLiveMediaPackage,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            TargetSchema::MediaTailorHlsCmaf => "mediatailor-hls-cmaf",
            TargetSchema::MediaTailorDash => "mediatailor-dash",
            TargetSchema::MediaLiveHlsTs => "medialive-hls-ts",
            TargetSchema::MediaLiveCmafIngest => "medialive-cmaf-ingest",
            TargetSchema::MediaLiveMediaPackage => "medialive-mediapackage",
        }
    }

    pub fn family(&self) -> SchemaFamily {
        match self {
            TargetSchema::MediaTailorHlsCmaf | TargetSchema::MediaTailorDash => {
                SchemaFamily::Transcode
            }
            TargetSchema::MediaLiveHlsTs
            | TargetSchema::MediaLiveCmafIngest
            | TargetSchema::MediaLiveMediaPackage => SchemaFamily::Live,
        }
    }

    pub fn capabilities(&self) -> SchemaCapabilities {
        match self {
            TargetSchema::MediaTailorHlsCmaf => SchemaCapabilities {
                frame_capture: FrameCaptureHandling::Trickplay,
                captions: None,
                dash_roles: false,
                indent: 4,
            },
            TargetSchema::MediaTailorDash => SchemaCapabilities {
                frame_capture: FrameCaptureHandling::Trickplay,
                captions: Some(CaptionFormat::TranscodeTtml),
                dash_roles: false,
                indent: 4,
            },
            TargetSchema::MediaLiveHlsTs => SchemaCapabilities {
                frame_capture: FrameCaptureHandling::VideoOutput,
                captions: Some(CaptionFormat::WebVtt),
                dash_roles: false,
                indent: 2,
            },
            TargetSchema::MediaLiveCmafIngest | TargetSchema::MediaLiveMediaPackage => {
                SchemaCapabilities {
                    frame_capture: FrameCaptureHandling::Unsupported,
                    captions: Some(CaptionFormat::Ttml),
                    dash_roles: true,
                    indent: 2,
                }
            }
        }
    }

    pub fn file_name(&self, version: &str) -> String {
        format!("{}-v{version}.json", self.id())
    }
}

impl fmt::Display for TargetSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for TargetSchema {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TargetSchema::ALL
            .iter()
            .copied()
            .find(|schema| schema.id() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = TargetSchema::ALL.iter().map(|s| s.id()).collect();
                format!("unknown target schema {s:?} (expected one of {})", known.join(", "))
            })
    }
}

impl Serialize for TargetSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.id())
    }
}

/// One assembled profile document, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedProfile {
    pub schema: TargetSchema,
    pub profile_set: String,
    pub version: String,
    pub document: Value,
}

impl GeneratedProfile {
    pub fn file_name(&self) -> String {
        self.schema.file_name(&self.version)
    }

    /// Insertion-ordered pretty print using the schema's indentation.
    pub fn to_pretty_string(&self) -> GenerateResult<String> {
        let indent = " ".repeat(self.schema.capabilities().indent);
        let mut buffer = Vec::new();
        let formatter = PrettyFormatter::with_indent(indent.as_bytes());
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.document.serialize(&mut serializer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    pub fn canonical_string(&self) -> String {
        canonical_json(&self.document)
    }
}

/// Compact rendering with object keys sorted at every depth, used for
/// content comparison only.
pub fn canonical_json(value: &Value) -> String {
    sort_keys(value).to_string()
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut sorted = Map::with_capacity(entries.len());
            for (key, value) in entries {
                sorted.insert(key.clone(), sort_keys(value));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// State for generating one schema from one ladder.
///
/// The trickplay cache lives here, so every (ladder, schema) pair starts from
/// an empty cache.
#[derive(Debug)]
pub struct ProfileRun<'a> {
    ladder: &'a LadderConfig,
    schema: TargetSchema,
    trickplay: TrickplayCache,
    skipped: Vec<SkippedRendition>,
}

impl<'a> ProfileRun<'a> {
    pub fn new(ladder: &'a LadderConfig, schema: TargetSchema) -> Self {
        Self {
            ladder,
            schema,
            trickplay: TrickplayCache::default(),
            skipped: Vec::new(),
        }
    }

    pub fn ladder(&self) -> &'a LadderConfig {
        self.ladder
    }

    pub fn schema(&self) -> TargetSchema {
        self.schema
    }

    pub fn trickplay(&self) -> &TrickplayCache {
        &self.trickplay
    }

    pub fn skipped(&self) -> &[SkippedRendition] {
        &self.skipped
    }

    pub fn classify(&mut self) -> GenerateResult<ClassifiedLadder<'a>> {
        classifier::classify(
            self.ladder,
            self.schema,
            &mut self.trickplay,
            &mut self.skipped,
        )
    }

    pub fn assemble(mut self, version: &str) -> GenerateResult<ProfileOutput> {
        let classified = self.classify()?;
        let document = assembler::assemble(&self, &classified)?;
        Ok(ProfileOutput {
            profile: GeneratedProfile {
                schema: self.schema,
                profile_set: self.ladder.name.clone(),
                version: version.to_string(),
                document,
            },
            skipped: self.skipped,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ProfileOutput {
    pub profile: GeneratedProfile,
    pub skipped: Vec<SkippedRendition>,
}

/// Every requested profile for one ladder, built in memory.
#[derive(Debug, Clone, Default)]
pub struct ProfileSet {
    pub profiles: Vec<GeneratedProfile>,
    pub skipped: Vec<SkippedRendition>,
}

pub fn generate_profile(
    ladder: &LadderConfig,
    schema: TargetSchema,
    version: &str,
) -> GenerateResult<ProfileOutput> {
    ProfileRun::new(ladder, schema).assemble(version)
}

/// Builds all requested schemas; any validation failure aborts the whole set
/// so nothing is handed to the emitter.
pub fn generate_profile_set(
    ladder: &LadderConfig,
    schemas: &[TargetSchema],
    version: &str,
) -> GenerateResult<ProfileSet> {
    let mut set = ProfileSet::default();
    for schema in schemas {
        let output = generate_profile(ladder, *schema, version)?;
        info!(
            target: "profilegen.generator",
            profile_set = %ladder.name,
            schema = %schema,
            skipped = output.skipped.len(),
            "profile assembled"
        );
        set.profiles.push(output.profile);
        set.skipped.extend(output.skipped);
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn schema_ids_round_trip() {
        for schema in TargetSchema::ALL {
            assert_eq!(schema.id().parse::<TargetSchema>().unwrap(), schema);
        }
        assert!("medialive-rtmp".parse::<TargetSchema>().is_err());
        assert_eq!(
            TargetSchema::MediaTailorDash.file_name("3"),
            "mediatailor-dash-v3.json"
        );
    }

    #[test]
    fn canonical_json_ignores_key_order() {
        let a = json!({"b": 1, "a": {"y": [ {"k": 2, "j": 1} ], "x": null}});
        let b = json!({"a": {"x": null, "y": [ {"j": 1, "k": 2} ]}, "b": 1});
        assert_eq!(canonical_json(&a), canonical_json(&b));
        assert_eq!(
            canonical_json(&a),
            r#"{"a":{"x":null,"y":[{"j":1,"k":2}]},"b":1}"#
        );
    }

    #[test]
    fn pretty_string_keeps_insertion_order_and_indent() {
        let profile = GeneratedProfile {
            schema: TargetSchema::MediaLiveHlsTs,
            profile_set: "set".into(),
            version: "1".into(),
            document: json!({"zeta": 1, "alpha": {"beta": true}}),
        };
        assert_eq!(
            profile.to_pretty_string().unwrap(),
            "{\n  \"zeta\": 1,\n  \"alpha\": {\n    \"beta\": true\n  }\n}"
        );

        let transcode = GeneratedProfile {
            schema: TargetSchema::MediaTailorHlsCmaf,
            ..profile
        };
        assert!(transcode
            .to_pretty_string()
            .unwrap()
            .starts_with("{\n    \"zeta\""));
    }
}
