use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::generator::{GenerateError, GenerateResult, GeneratedProfile, TargetSchema};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputLayout {
    /// `<output>/<profile-set>/<schema>-v<version>.json`
    #[default]
    ProfileSet,
    /// `<output>/<schema>-v<version>.json`
    Flat,
}

#[derive(Debug, Clone)]
pub struct ProfileEmitter {
    output_path: PathBuf,
    layout: OutputLayout,
}

#[derive(Debug)]
pub struct EmitFailure {
    pub schema: TargetSchema,
    pub path: PathBuf,
    pub error: GenerateError,
}

#[derive(Debug, Default)]
pub struct EmitReport {
    pub written: Vec<PathBuf>,
    pub failed: Vec<EmitFailure>,
}

impl EmitReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

impl ProfileEmitter {
    pub fn new<P: Into<PathBuf>>(output_path: P) -> Self {
        Self {
            output_path: output_path.into(),
            layout: OutputLayout::default(),
        }
    }

    pub fn with_layout(mut self, layout: OutputLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn path_for(&self, profile: &GeneratedProfile) -> PathBuf {
        match self.layout {
            OutputLayout::ProfileSet => self
                .output_path
                .join(&profile.profile_set)
                .join(profile.file_name()),
            OutputLayout::Flat => self.output_path.join(profile.file_name()),
        }
    }

    pub fn write(&self, profile: &GeneratedProfile) -> GenerateResult<PathBuf> {
        let path = self.path_for(profile);
        let content = profile.to_pretty_string()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| GenerateError::ProfileWrite {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, content).map_err(|source| GenerateError::ProfileWrite {
            path: path.clone(),
            source,
        })?;
        info!(
            target: "profilegen.emitter",
            schema = %profile.schema,
            path = %path.display(),
            "profile written"
        );
        Ok(path)
    }

    /// Writes every profile; a failed write is recorded and the remaining
    /// profiles are still attempted.
    pub fn write_all(&self, profiles: &[GeneratedProfile]) -> EmitReport {
        let mut report = EmitReport::default();
        for profile in profiles {
            match self.write(profile) {
                Ok(path) => report.written.push(path),
                Err(error) => {
                    let path = self.path_for(profile);
                    warn!(
                        target: "profilegen.emitter",
                        schema = %profile.schema,
                        path = %path.display(),
                        "failed to write profile: {error}"
                    );
                    report.failed.push(EmitFailure {
                        schema: profile.schema,
                        path,
                        error,
                    });
                }
            }
        }
        report
    }
}
