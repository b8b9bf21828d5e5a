use std::path::PathBuf;

use thiserror::Error;

use crate::language::LanguageError;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("rendition {rendition}: invalid language code: {source}")]
    InvalidLanguageCode {
        rendition: String,
        source: LanguageError,
    },
    #[error("rendition {rendition}: missing required field {field}")]
    MissingRequiredField {
        rendition: String,
        field: &'static str,
    },
    #[error("rendition {rendition}: invalid {field}: {reason}")]
    InvalidValue {
        rendition: String,
        field: &'static str,
        reason: String,
    },
    #[error("rendition {rendition}: codec {codec} not supported for {schema}")]
    UnsupportedCodec {
        rendition: String,
        codec: String,
        schema: String,
    },
    #[error("only a single frame capture rendition is supported ({first}, {second})")]
    MultipleFrameCaptureRenditions { first: String, second: String },
    #[error("rendition name {name} is used more than once")]
    DuplicateRenditionName { name: String },
    #[error("description name {name} is produced by more than one rendition in {schema}")]
    DuplicateDescriptionName { name: String, schema: String },
    #[error("failed to write profile {path}: {source}")]
    ProfileWrite {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type GenerateResult<T> = std::result::Result<T, GenerateError>;
