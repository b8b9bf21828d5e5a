#![recursion_limit = "256"]

pub mod config;
pub mod emitter;
pub mod error;
pub mod generator;
pub mod ladder;
pub mod language;
pub mod upload;

pub use config::{
    load_ladder_config, load_settings, profile_set_name, GeneratorSection, ProfilegenSettings,
    UploadSection,
};
pub use emitter::{EmitFailure, EmitReport, OutputLayout, ProfileEmitter};
pub use error::{ConfigError, Result};
pub use generator::{
    canonical_json, generate_profile, generate_profile_set, GenerateError, GenerateResult,
    GeneratedProfile, ProfileRun, ProfileSet, SchemaFamily, SkippedRendition, TargetSchema,
};
pub use ladder::{Codec, CommonConfig, Framerate, LadderConfig, MediaKind, RenditionConfig};
pub use language::{LanguageError, LanguageResult};
pub use upload::{
    collect_profile_paths, derive_profile_name, load_sdk_config, read_profile, schema_for_path,
    sync_profile, sync_profile_paths, AlwaysConfirm, Confirm, Credentials, MediaTailorClient,
    MediaTailorConfig, ProfileStore, ProfileSyncRecord, UploadError, UploadOutcome, UploadResult,
};
