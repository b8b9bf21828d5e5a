use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::generator::GenerateError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io { source: io::Error, path: PathBuf },
    #[error("failed to parse ladder {path}: {source}")]
    Yaml {
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("failed to parse settings {path}: {source}")]
    Toml {
        source: toml::de::Error,
        path: PathBuf,
    },
    #[error("invalid ladder {path}: {source}")]
    Invalid {
        source: GenerateError,
        path: PathBuf,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
