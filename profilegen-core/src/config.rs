use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::emitter::OutputLayout;
use crate::error::{ConfigError, Result};
use crate::generator::TargetSchema;
use crate::ladder::{LadderConfig, LadderDocument};

pub const DEFAULT_OUTPUT_PATH: &str = "generated-profiles";
pub const DEFAULT_API_HOST: &str = "api.mediatailor.{region}.amazonaws.com";
pub const DEFAULT_SERVICE: &str = "mediatailor";

/// Optional `profilegen.toml` settings. Command-line flags take precedence.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProfilegenSettings {
    #[serde(default)]
    pub generator: GeneratorSection,
    #[serde(default)]
    pub upload: UploadSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorSection {
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    #[serde(default)]
    pub layout: OutputLayout,
    #[serde(default)]
    pub schemas: Vec<String>,
}

impl Default for GeneratorSection {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
            layout: OutputLayout::default(),
            schemas: Vec::new(),
        }
    }
}

impl GeneratorSection {
    /// Configured schemas, or every schema when none are listed.
    pub fn target_schemas(&self) -> std::result::Result<Vec<TargetSchema>, String> {
        if self.schemas.is_empty() {
            return Ok(TargetSchema::ALL.to_vec());
        }
        self.schemas.iter().map(|id| id.parse()).collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadSection {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default = "default_api_host")]
    pub api_host: String,
    #[serde(default = "default_service")]
    pub service: String,
}

impl Default for UploadSection {
    fn default() -> Self {
        Self {
            region: None,
            api_host: default_api_host(),
            service: default_service(),
        }
    }
}

fn default_output_path() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_PATH)
}

fn default_api_host() -> String {
    DEFAULT_API_HOST.to_string()
}

fn default_service() -> String {
    DEFAULT_SERVICE.to_string()
}

pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<ProfilegenSettings> {
    load_toml(path)
}

/// Loads and validates a ladder file. The profile-set name is the file name
/// without its extension.
pub fn load_ladder_config<P: AsRef<Path>>(path: P) -> Result<LadderConfig> {
    let path = path.as_ref();
    let content = read(path)?;
    let document: LadderDocument =
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
            source,
            path: path.to_path_buf(),
        })?;
    let name = profile_set_name(path);
    LadderConfig::from_document(name, document).map_err(|source| ConfigError::Invalid {
        source,
        path: path.to_path_buf(),
    })
}

pub fn profile_set_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        source,
        path: path.to_path_buf(),
    })
}

fn load_toml<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = read(path)?;
    toml::from_str(&content).map_err(|source| ConfigError::Toml {
        source,
        path: path.to_path_buf(),
    })
}
