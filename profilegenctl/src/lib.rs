use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use profilegen_core::ladder::MediaKind;
use profilegen_core::{
    canonical_json, collect_profile_paths, derive_profile_name, generate_profile_set,
    load_ladder_config, load_settings, read_profile, sync_profile_paths, AlwaysConfirm, Confirm,
    MediaTailorClient, OutputLayout, ProfileEmitter, ProfileStore, ProfileSyncRecord,
    ProfilegenSettings, SkippedRendition, TargetSchema,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] profilegen_core::ConfigError),
    #[error("generation error: {0}")]
    Generate(#[from] profilegen_core::GenerateError),
    #[error("upload error: {0}")]
    Upload(#[from] profilegen_core::UploadError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("{failed} of {total} ladder(s) failed")]
    LaddersFailed { failed: usize, total: usize },
    #[error("{failed} of {total} profile upload(s) failed")]
    UploadsFailed { failed: usize, total: usize },
    #[error("custom transcode profiles are not enabled for this account")]
    AccountNotEnabled,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Encoding profile generator and uploader", long_about = None)]
pub struct Cli {
    /// Path to profilegen.toml
    #[arg(long)]
    pub settings: Option<PathBuf>,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate profiles for one or more ladder files
    Generate(GenerateArgs),
    /// Load and validate ladder files without writing anything
    Validate(ValidateArgs),
    /// Compare a local profile with the remote copy
    Diff(DiffArgs),
    /// Upload profiles to the ad-insertion service
    Upload(UploadArgs),
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Ladder YAML files
    #[arg(long = "config", required = true, num_args = 1..)]
    pub configs: Vec<PathBuf>,
    /// Version suffix for generated file names
    #[arg(long)]
    pub version: String,
    /// Output directory (overrides settings)
    #[arg(long)]
    pub output_path: Option<PathBuf>,
    /// Restrict generation to these schemas
    #[arg(long = "schema")]
    pub schemas: Vec<TargetSchema>,
    /// Write files directly into the output directory
    #[arg(long, default_value_t = false)]
    pub flat: bool,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Ladder YAML files
    #[arg(long = "config", required = true, num_args = 1..)]
    pub configs: Vec<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Generated profile JSON file
    #[arg(long)]
    pub profile_path: PathBuf,
    /// Remote profile name (derived from the path when omitted)
    #[arg(long)]
    pub profile_name: Option<String>,
    /// AWS region
    #[arg(long)]
    pub region: Option<String>,
    /// Named profile from the shared AWS config and credentials files
    #[arg(long)]
    pub profile: Option<String>,
}

#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Profile JSON file or directory of profiles
    #[arg(long)]
    pub profile_path: PathBuf,
    /// Remote profile name, only for a single file
    #[arg(long)]
    pub profile_name: Option<String>,
    /// AWS region
    #[arg(long)]
    pub region: Option<String>,
    /// Named profile from the shared AWS config and credentials files
    #[arg(long)]
    pub profile: Option<String>,
    /// Overwrite differing remote profiles without asking
    #[arg(long, default_value_t = false)]
    pub yes: bool,
}

pub fn run(cli: Cli) -> Result<()> {
    let context = AppContext::new(&cli)?;

    match &cli.command {
        Commands::Generate(args) => {
            let report = context.generate(args)?;
            render(&report, cli.format)?;
            report.ensure_success()?;
        }
        Commands::Validate(args) => {
            let report = context.validate(args);
            render(&report, cli.format)?;
            report.ensure_success()?;
        }
        Commands::Diff(args) => {
            let report = block_on(context.diff(args))??;
            render(&report, cli.format)?;
        }
        Commands::Upload(args) => {
            let confirm: Box<dyn Confirm> = if args.yes {
                Box::new(AlwaysConfirm)
            } else {
                Box::new(StdinConfirm)
            };
            let report = block_on(context.upload(args, confirm.as_ref()))??;
            render(&report, cli.format)?;
            report.ensure_success()?;
        }
    }

    Ok(())
}

fn block_on<F: std::future::Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(future))
}

fn render<T>(value: &T, format: OutputFormat) -> Result<()>
where
    T: Serialize + DisplayFallback,
{
    match format {
        OutputFormat::Text => {
            println!("{}", value.display());
            Ok(())
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{}", json);
            Ok(())
        }
    }
}

trait DisplayFallback {
    fn display(&self) -> String;
}

/// Asks on stderr and reads the answer from stdin.
struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        let mut stderr = io::stderr();
        if write!(stderr, "{prompt} [y/N] ").and_then(|_| stderr.flush()).is_err() {
            return false;
        }
        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => is_affirmative(&answer),
            Err(_) => false,
        }
    }
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[derive(Debug)]
struct AppContext {
    settings: ProfilegenSettings,
}

impl AppContext {
    fn new(cli: &Cli) -> Result<Self> {
        let settings = match &cli.settings {
            Some(path) => load_settings(path)?,
            None => ProfilegenSettings::default(),
        };
        Ok(Self { settings })
    }

    fn target_schemas(&self, requested: &[TargetSchema]) -> Result<Vec<TargetSchema>> {
        if !requested.is_empty() {
            return Ok(requested.to_vec());
        }
        self.settings
            .generator
            .target_schemas()
            .map_err(AppError::InvalidArgument)
    }

    fn generate(&self, args: &GenerateArgs) -> Result<GenerateReport> {
        let schemas = self.target_schemas(&args.schemas)?;
        let output_path = args
            .output_path
            .clone()
            .unwrap_or_else(|| self.settings.generator.output_path.clone());
        let layout = if args.flat {
            OutputLayout::Flat
        } else {
            self.settings.generator.layout
        };
        let emitter = ProfileEmitter::new(output_path).with_layout(layout);

        let mut report = GenerateReport::default();
        for config in &args.configs {
            let entry = generate_ladder(config, &schemas, &args.version, &emitter);
            if let Some(err) = &entry.error {
                error!(target: "profilegen.generator", config = %config.display(), "{err}");
            }
            report.ladders.push(entry);
        }
        Ok(report)
    }

    fn validate(&self, args: &ValidateArgs) -> ValidateReport {
        let ladders = args
            .configs
            .iter()
            .map(|config| match load_ladder_config(config) {
                Ok(ladder) => ValidateEntry {
                    config: config.clone(),
                    profile_set: Some(ladder.name.clone()),
                    video: ladder.count(MediaKind::Video),
                    audio: ladder.count(MediaKind::Audio),
                    caption: ladder.count(MediaKind::Caption),
                    frame_capture: ladder.frame_capture().map(|r| r.name.clone()),
                    error: None,
                },
                Err(err) => ValidateEntry {
                    config: config.clone(),
                    profile_set: None,
                    video: 0,
                    audio: 0,
                    caption: 0,
                    frame_capture: None,
                    error: Some(err.to_string()),
                },
            })
            .collect();
        ValidateReport { ladders }
    }

    async fn client(
        &self,
        region: Option<&str>,
        profile: Option<&str>,
    ) -> Result<MediaTailorClient> {
        Ok(MediaTailorClient::load(region, profile, &self.settings.upload).await?)
    }

    async fn diff(&self, args: &DiffArgs) -> Result<DiffReport> {
        let profile_name = match &args.profile_name {
            Some(name) => name.clone(),
            None => derive_profile_name(&args.profile_path)?,
        };
        let local = read_profile(&args.profile_path)?;
        let client = self
            .client(args.region.as_deref(), args.profile.as_deref())
            .await?;
        let status = match client.fetch_existing(&profile_name).await? {
            None => DiffStatus::Missing,
            Some(remote) if canonical_json(&remote) == canonical_json(&local) => {
                DiffStatus::UpToDate
            }
            Some(_) => DiffStatus::Differs,
        };
        Ok(DiffReport {
            profile_name,
            path: args.profile_path.clone(),
            status,
        })
    }

    async fn upload(&self, args: &UploadArgs, confirm: &dyn Confirm) -> Result<UploadReport> {
        let paths = collect_profile_paths(&args.profile_path)?;
        if args.profile_name.is_some() && paths.len() != 1 {
            return Err(AppError::InvalidArgument(
                "--profile-name requires a single profile file".to_string(),
            ));
        }

        if paths.is_empty() {
            return Ok(UploadReport::default());
        }

        let client = self
            .client(args.region.as_deref(), args.profile.as_deref())
            .await?;
        if !client.account_enabled().await? {
            return Err(AppError::AccountNotEnabled);
        }

        let profiles =
            sync_profile_paths(&client, &paths, args.profile_name.as_deref(), confirm).await;
        let report = UploadReport { profiles };
        info!(
            target: "profilegen.upload",
            uploaded = report.uploaded(),
            failed = report.failed(),
            total = report.profiles.len(),
            "upload run finished"
        );
        Ok(report)
    }
}

fn generate_ladder(
    config: &Path,
    schemas: &[TargetSchema],
    version: &str,
    emitter: &ProfileEmitter,
) -> LadderReport {
    let mut entry = LadderReport {
        config: config.to_path_buf(),
        ..LadderReport::default()
    };
    let ladder = match load_ladder_config(config) {
        Ok(ladder) => ladder,
        Err(err) => {
            entry.error = Some(err.to_string());
            return entry;
        }
    };
    entry.profile_set = Some(ladder.name.clone());

    let set = match generate_profile_set(&ladder, schemas, version) {
        Ok(set) => set,
        Err(err) => {
            entry.error = Some(err.to_string());
            return entry;
        }
    };
    entry.skipped = set.skipped;

    let emitted = emitter.write_all(&set.profiles);
    entry.written = emitted.written;
    entry.failed = emitted
        .failed
        .into_iter()
        .map(|failure| format!("{}: {}", failure.schema, failure.error))
        .collect();
    if !entry.failed.is_empty() {
        entry.error = Some(format!("{} profile(s) could not be written", entry.failed.len()));
    }
    entry
}

#[derive(Debug, Default, Serialize)]
struct GenerateReport {
    ladders: Vec<LadderReport>,
}

impl GenerateReport {
    fn ensure_success(&self) -> Result<()> {
        let failed = self.ladders.iter().filter(|l| l.error.is_some()).count();
        if failed > 0 {
            return Err(AppError::LaddersFailed {
                failed,
                total: self.ladders.len(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Default, Serialize)]
struct LadderReport {
    config: PathBuf,
    profile_set: Option<String>,
    written: Vec<PathBuf>,
    skipped: Vec<SkippedRendition>,
    failed: Vec<String>,
    error: Option<String>,
}

impl DisplayFallback for GenerateReport {
    fn display(&self) -> String {
        let mut lines = Vec::new();
        for ladder in &self.ladders {
            let name = ladder.profile_set.as_deref().unwrap_or("<invalid>");
            lines.push(format!("{} ({})", name, ladder.config.display()));
            for path in &ladder.written {
                lines.push(format!("  + {}", path.display()));
            }
            for skipped in &ladder.skipped {
                lines.push(format!(
                    "  ~ {} [{}] skipped for {}: {}",
                    skipped.name, skipped.codec, skipped.schema, skipped.reason
                ));
            }
            for failure in &ladder.failed {
                lines.push(format!("  ! {failure}"));
            }
            if let Some(err) = &ladder.error {
                lines.push(format!("  error: {err}"));
            }
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
struct ValidateReport {
    ladders: Vec<ValidateEntry>,
}

impl ValidateReport {
    fn ensure_success(&self) -> Result<()> {
        let failed = self.ladders.iter().filter(|l| l.error.is_some()).count();
        if failed > 0 {
            return Err(AppError::LaddersFailed {
                failed,
                total: self.ladders.len(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct ValidateEntry {
    config: PathBuf,
    profile_set: Option<String>,
    video: usize,
    audio: usize,
    caption: usize,
    frame_capture: Option<String>,
    error: Option<String>,
}

impl DisplayFallback for ValidateReport {
    fn display(&self) -> String {
        self.ladders
            .iter()
            .map(|entry| match &entry.error {
                Some(err) => format!("{}: invalid: {err}", entry.config.display()),
                None => format!(
                    "{}: ok video={} audio={} caption={} frame_capture={}",
                    entry.config.display(),
                    entry.video,
                    entry.audio,
                    entry.caption,
                    entry.frame_capture.as_deref().unwrap_or("-")
                ),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum DiffStatus {
    Missing,
    UpToDate,
    Differs,
}

impl fmt::Display for DiffStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DiffStatus::Missing => "not present remotely",
            DiffStatus::UpToDate => "up to date",
            DiffStatus::Differs => "differs from remote",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Serialize)]
struct DiffReport {
    profile_name: String,
    path: PathBuf,
    status: DiffStatus,
}

impl DisplayFallback for DiffReport {
    fn display(&self) -> String {
        format!(
            "{} ({}): {}",
            self.profile_name,
            self.path.display(),
            self.status
        )
    }
}

#[derive(Debug, Default, Serialize)]
struct UploadReport {
    profiles: Vec<ProfileSyncRecord>,
}

impl UploadReport {
    fn uploaded(&self) -> usize {
        self.profiles
            .iter()
            .filter(|record| record.outcome.as_ref().is_some_and(|outcome| outcome.applied))
            .count()
    }

    fn failed(&self) -> usize {
        self.profiles.iter().filter(|record| record.failed()).count()
    }

    fn ensure_success(&self) -> Result<()> {
        match self.failed() {
            0 => Ok(()),
            failed => Err(AppError::UploadsFailed {
                failed,
                total: self.profiles.len(),
            }),
        }
    }
}

impl DisplayFallback for UploadReport {
    fn display(&self) -> String {
        if self.profiles.is_empty() {
            return "No transcode profiles found".to_string();
        }
        self.profiles
            .iter()
            .map(|record| match (&record.outcome, &record.error) {
                (Some(outcome), _) => {
                    let marker = if outcome.applied { "uploaded" } else { "skipped" };
                    format!("{} {marker}: {}", record.profile_name, outcome.reason)
                }
                (None, Some(error)) => format!("{} failed: {error}", record.profile_name),
                (None, None) => format!("{} failed", record.profile_name),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
