//! Pushing generated transcode profiles to the ad-insertion service.
//!
//! The remote store sits behind [`ProfileStore`] so the compare-then-upload
//! flow in [`sync_profile`] can run against any transport.

mod mediatailor;
pub mod sigv4;

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::generator::{canonical_json, SchemaFamily, TargetSchema};

pub use mediatailor::{load_sdk_config, Credentials, MediaTailorClient, MediaTailorConfig};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unexpected status {status} from {operation}: {body}")]
    UnexpectedStatus {
        operation: &'static str,
        status: u16,
        body: String,
    },
    #[error("no AWS credentials provider configured")]
    MissingCredentials,
    #[error("credentials error: {0}")]
    Credentials(#[from] aws_credential_types::provider::error::CredentialsError),
    #[error("failed to compute request signature")]
    Signing,
    #[error("no AWS region configured")]
    MissingRegion,
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
    #[error("invalid profile path {path}: {reason}")]
    InvalidProfilePath { path: PathBuf, reason: String },
}

pub type UploadResult<T> = std::result::Result<T, UploadError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadOutcome {
    pub applied: bool,
    pub reason: String,
}

impl UploadOutcome {
    pub fn applied(reason: impl Into<String>) -> Self {
        Self {
            applied: true,
            reason: reason.into(),
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            applied: false,
            reason: reason.into(),
        }
    }
}

pub const UP_TO_DATE: &str = "already up to date";
pub const OVERWRITE_DECLINED: &str = "overwrite declined";

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// `None` when the profile does not exist or is not visible.
    async fn fetch_existing(&self, name: &str) -> UploadResult<Option<Value>>;
    async fn upload(&self, name: &str, document: &Value) -> UploadResult<UploadOutcome>;
    /// Whether custom transcode profiles are enabled for the account.
    async fn account_enabled(&self) -> UploadResult<bool>;
}

/// Yes/no decision before replacing a remote profile with different content.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

/// Compares against the remote copy and uploads only when content differs
/// and the caller agrees to replace it.
pub async fn sync_profile<S>(
    store: &S,
    name: &str,
    document: &Value,
    confirm: &dyn Confirm,
) -> UploadResult<UploadOutcome>
where
    S: ProfileStore + ?Sized,
{
    if let Some(existing) = store.fetch_existing(name).await? {
        let local = canonical_json(document);
        let remote = canonical_json(&existing);
        debug!(target: "profilegen.upload", profile = name, %local, %remote, "comparing profiles");
        if local == remote {
            info!(target: "profilegen.upload", profile = name, "profile already up to date");
            return Ok(UploadOutcome::skipped(UP_TO_DATE));
        }
        warn!(
            target: "profilegen.upload",
            profile = name,
            "profile exists with different content; updating it will not re-transcode existing ads, prefer a new versioned profile name"
        );
        if !confirm.confirm(&format!("Overwrite existing profile {name}?")) {
            return Ok(UploadOutcome::skipped(OVERWRITE_DECLINED));
        }
    }
    let outcome = store.upload(name, document).await?;
    info!(
        target: "profilegen.upload",
        profile = name,
        applied = outcome.applied,
        reason = %outcome.reason,
        "upload finished"
    );
    Ok(outcome)
}

/// `<parent-dir>-<file-stem>` for a `.json` profile path.
pub fn derive_profile_name(path: &Path) -> UploadResult<String> {
    let invalid = |reason: &str| UploadError::InvalidProfilePath {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };
    if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
        return Err(invalid("profile files must have a .json extension"));
    }
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| invalid("missing file name"))?;
    let parent = path
        .parent()
        .and_then(|parent| parent.file_name())
        .and_then(|name| name.to_str());
    Ok(match parent {
        Some(parent) => format!("{parent}-{stem}"),
        None => stem.to_string(),
    })
}

/// Schema named by a generated file, matched on the `<schema-id>-v` prefix
/// every emitted file name starts with.
pub fn schema_for_path(path: &Path) -> Option<TargetSchema> {
    let stem = path.file_stem()?.to_str()?;
    TargetSchema::ALL
        .into_iter()
        .find(|schema| stem.starts_with(&format!("{}-v", schema.id())))
}

/// The path itself when it is a file, otherwise every transcode profile
/// below it in sorted order. Live encoder documents are never returned.
pub fn collect_profile_paths(root: &Path) -> UploadResult<Vec<PathBuf>> {
    if root.is_file() {
        if let Some(schema) = schema_for_path(root) {
            if schema.family() != SchemaFamily::Transcode {
                return Err(UploadError::InvalidProfilePath {
                    path: root.to_path_buf(),
                    reason: format!("{schema} is a live encoder profile, not a transcode profile"),
                });
            }
        }
        return Ok(vec![root.to_path_buf()]);
    }
    let mut paths = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|err| UploadError::Io {
            path: err
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf()),
            source: err.into(),
        })?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        match schema_for_path(path) {
            Some(schema) if schema.family() == SchemaFamily::Transcode => {
                paths.push(path.to_path_buf())
            }
            other => debug!(
                target: "profilegen.upload",
                path = %path.display(),
                schema = other.map(|schema| schema.id()).unwrap_or("unknown"),
                "skipping non-transcode file"
            ),
        }
    }
    Ok(paths)
}

/// Reads a profile and checks it has the transcode document shape.
pub fn read_profile(path: &Path) -> UploadResult<Value> {
    let content = fs::read_to_string(path).map_err(|source| UploadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let document: Value = serde_json::from_str(&content)?;
    if document.get("OutputGroups").is_none() {
        return Err(UploadError::InvalidProfilePath {
            path: path.to_path_buf(),
            reason: "document has no OutputGroups, not a transcode profile".to_string(),
        });
    }
    Ok(document)
}

/// Result of syncing one file. Exactly one of `outcome` and `error` is set.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileSyncRecord {
    pub path: PathBuf,
    pub profile_name: String,
    pub outcome: Option<UploadOutcome>,
    pub error: Option<String>,
}

impl ProfileSyncRecord {
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Syncs every path in order. A failing profile is recorded and the rest
/// still run.
pub async fn sync_profile_paths<S>(
    store: &S,
    paths: &[PathBuf],
    name_override: Option<&str>,
    confirm: &dyn Confirm,
) -> Vec<ProfileSyncRecord>
where
    S: ProfileStore + ?Sized,
{
    let mut records = Vec::with_capacity(paths.len());
    for path in paths {
        let name = match name_override {
            Some(name) => Ok(name.to_string()),
            None => derive_profile_name(path),
        };
        let (profile_name, result) = match name {
            Ok(name) => {
                let result = sync_path(store, path, &name, confirm).await;
                (name, result)
            }
            Err(err) => (path.display().to_string(), Err(err)),
        };
        let record = match result {
            Ok(outcome) => ProfileSyncRecord {
                path: path.clone(),
                profile_name,
                outcome: Some(outcome),
                error: None,
            },
            Err(err) => {
                error!(
                    target: "profilegen.upload",
                    profile = %profile_name,
                    path = %path.display(),
                    error = %err,
                    "profile sync failed"
                );
                ProfileSyncRecord {
                    path: path.clone(),
                    profile_name,
                    outcome: None,
                    error: Some(err.to_string()),
                }
            }
        };
        records.push(record);
    }
    records
}

async fn sync_path<S>(
    store: &S,
    path: &Path,
    name: &str,
    confirm: &dyn Confirm,
) -> UploadResult<UploadOutcome>
where
    S: ProfileStore + ?Sized,
{
    let document = read_profile(path)?;
    sync_profile(store, name, &document, confirm).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn profile_name_uses_parent_directory() {
        assert_eq!(
            derive_profile_name(Path::new("out/sports/mediatailor-dash-v1.json")).unwrap(),
            "sports-mediatailor-dash-v1"
        );
        assert_eq!(
            derive_profile_name(Path::new("mediatailor-dash-v1.json")).unwrap(),
            "mediatailor-dash-v1"
        );
        assert!(matches!(
            derive_profile_name(Path::new("sports/profile.yaml")),
            Err(UploadError::InvalidProfilePath { .. })
        ));
    }

    #[test]
    fn collects_only_transcode_profiles() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("set-a")).unwrap();
        for name in [
            "mediatailor-dash-v1.json",
            "mediatailor-hls-cmaf-v1.json",
            "medialive-hls-ts-v1.json",
            "medialive-cmaf-ingest-v1.json",
            "medialive-mediapackage-v1.json",
            "settings.json",
        ] {
            fs::write(dir.path().join("set-a").join(name), "{}").unwrap();
        }
        fs::write(dir.path().join("set-a/notes.txt"), "x").unwrap();

        let paths = collect_profile_paths(dir.path()).unwrap();
        let names: Vec<String> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["mediatailor-dash-v1.json", "mediatailor-hls-cmaf-v1.json"]);

        let single = dir.path().join("set-a/mediatailor-dash-v1.json");
        assert_eq!(collect_profile_paths(&single).unwrap(), vec![single]);
    }

    #[test]
    fn single_live_profile_is_rejected() {
        let dir = tempdir().unwrap();
        let live = dir.path().join("medialive-hls-ts-v1.json");
        fs::write(&live, "{}").unwrap();
        assert!(matches!(
            collect_profile_paths(&live),
            Err(UploadError::InvalidProfilePath { .. })
        ));

        let renamed = dir.path().join("custom.json");
        fs::write(&renamed, "{}").unwrap();
        assert_eq!(collect_profile_paths(&renamed).unwrap(), vec![renamed]);
    }

    #[test]
    fn schema_is_read_from_file_prefix() {
        assert_eq!(
            schema_for_path(Path::new("out/x/mediatailor-hls-cmaf-v2.json")),
            Some(TargetSchema::MediaTailorHlsCmaf)
        );
        assert_eq!(
            schema_for_path(Path::new("medialive-mediapackage-v1.json")),
            Some(TargetSchema::MediaLiveMediaPackage)
        );
        assert_eq!(schema_for_path(Path::new("mediatailor.json")), None);
    }

    #[test]
    fn read_profile_requires_transcode_shape() {
        let dir = tempdir().unwrap();
        let transcode = dir.path().join("mediatailor-dash-v1.json");
        fs::write(&transcode, r#"{"OutputGroups": []}"#).unwrap();
        assert!(read_profile(&transcode).is_ok());

        let live = dir.path().join("custom.json");
        fs::write(&live, r#"{"outputGroups": []}"#).unwrap();
        assert!(matches!(
            read_profile(&live),
            Err(UploadError::InvalidProfilePath { .. })
        ));
    }
}
