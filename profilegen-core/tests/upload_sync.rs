use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use profilegen_core::upload::{sync_profile_paths, OVERWRITE_DECLINED, UP_TO_DATE};
use profilegen_core::{
    collect_profile_paths, generate_profile_set, load_ladder_config, sync_profile, AlwaysConfirm,
    Confirm, ProfileEmitter, ProfileStore, TargetSchema, UploadError, UploadOutcome, UploadResult,
};
use serde_json::{json, Value};
use tempfile::tempdir;

#[derive(Default)]
struct MemoryStore {
    profiles: Mutex<HashMap<String, Value>>,
    puts: AtomicUsize,
    rejects: Option<String>,
}

impl MemoryStore {
    fn with_profile(name: &str, document: Value) -> Self {
        let store = Self::default();
        store
            .profiles
            .lock()
            .unwrap()
            .insert(name.to_string(), document);
        store
    }

    fn rejecting(name: &str) -> Self {
        Self {
            rejects: Some(name.to_string()),
            ..Self::default()
        }
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.profiles.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn fetch_existing(&self, name: &str) -> UploadResult<Option<Value>> {
        Ok(self.profiles.lock().unwrap().get(name).cloned())
    }

    async fn upload(&self, name: &str, document: &Value) -> UploadResult<UploadOutcome> {
        if self.rejects.as_deref() == Some(name) {
            return Err(UploadError::UnexpectedStatus {
                operation: "PutTranscodeProfile",
                status: 400,
                body: "invalid profile".to_string(),
            });
        }
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.profiles
            .lock()
            .unwrap()
            .insert(name.to_string(), document.clone());
        Ok(UploadOutcome::applied("uploaded"))
    }

    async fn account_enabled(&self) -> UploadResult<bool> {
        Ok(true)
    }
}

struct Decline {
    asked: AtomicUsize,
}

impl Confirm for Decline {
    fn confirm(&self, _prompt: &str) -> bool {
        self.asked.fetch_add(1, Ordering::SeqCst);
        false
    }
}

fn profile(bitrate: u64) -> Value {
    json!({
        "TimecodeConfig": { "Source": "ZEROBASED" },
        "OutputGroups": [{ "Name": "CMAF", "Bitrate": bitrate }],
        "AdAvailOffset": 0
    })
}

#[tokio::test]
async fn equal_profiles_are_not_uploaded() {
    // Same content with a different key order is still equal.
    let remote = json!({
        "AdAvailOffset": 0,
        "OutputGroups": [{ "Bitrate": 100, "Name": "CMAF" }],
        "TimecodeConfig": { "Source": "ZEROBASED" }
    });
    let store = MemoryStore::with_profile("sports-mediatailor-hls-cmaf-v1", remote);

    let outcome = sync_profile(&store, "sports-mediatailor-hls-cmaf-v1", &profile(100), &AlwaysConfirm)
        .await
        .unwrap();
    assert_eq!(outcome, UploadOutcome::skipped(UP_TO_DATE));
    assert_eq!(store.puts(), 0);
}

#[tokio::test]
async fn differing_profile_is_uploaded_after_confirmation() {
    let store = MemoryStore::with_profile("sports-mediatailor-dash-v1", profile(100));

    let outcome = sync_profile(&store, "sports-mediatailor-dash-v1", &profile(200), &AlwaysConfirm)
        .await
        .unwrap();
    assert!(outcome.applied);
    assert_eq!(store.puts(), 1);
    assert_eq!(
        store.fetch_existing("sports-mediatailor-dash-v1").await.unwrap(),
        Some(profile(200))
    );
}

#[tokio::test]
async fn declined_overwrite_leaves_remote_untouched() {
    let store = MemoryStore::with_profile("sports-mediatailor-dash-v1", profile(100));
    let decline = Decline {
        asked: AtomicUsize::new(0),
    };

    let outcome = sync_profile(&store, "sports-mediatailor-dash-v1", &profile(200), &decline)
        .await
        .unwrap();
    assert_eq!(outcome, UploadOutcome::skipped(OVERWRITE_DECLINED));
    assert_eq!(decline.asked.load(Ordering::SeqCst), 1);
    assert_eq!(store.puts(), 0);
}

#[tokio::test]
async fn new_profile_is_uploaded_without_prompt() {
    let store = MemoryStore::default();
    let decline = Decline {
        asked: AtomicUsize::new(0),
    };

    let outcome = sync_profile(&store, "news-mediatailor-dash-v1", &profile(100), &decline)
        .await
        .unwrap();
    assert!(outcome.applied);
    assert_eq!(decline.asked.load(Ordering::SeqCst), 0);
    assert!(store.account_enabled().await.unwrap());
}

fn emit_sample_set(root: &Path) {
    let fixture = Path::new(env!("CARGO_MANIFEST_DIR")).join("../configs/ladders/sports-1080p.yaml");
    let ladder = load_ladder_config(&fixture).unwrap();
    let set = generate_profile_set(&ladder, &TargetSchema::ALL, "1").unwrap();
    let report = ProfileEmitter::new(root).write_all(&set.profiles);
    assert_eq!(report.written.len(), 5);
}

#[tokio::test]
async fn mixed_directory_uploads_only_transcode_profiles() {
    let dir = tempdir().unwrap();
    emit_sample_set(dir.path());

    let paths = collect_profile_paths(dir.path()).unwrap();
    let store = MemoryStore::default();
    let records = sync_profile_paths(&store, &paths, None, &AlwaysConfirm).await;

    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|record| !record.failed()));
    assert_eq!(store.puts(), 2);
    assert_eq!(
        store.names(),
        vec![
            "sports-1080p-mediatailor-dash-v1",
            "sports-1080p-mediatailor-hls-cmaf-v1"
        ]
    );
    assert!(store
        .names()
        .iter()
        .all(|name| !name.contains("medialive")));
}

#[tokio::test]
async fn failing_profile_does_not_stop_the_rest() {
    let dir = tempdir().unwrap();
    let set = dir.path().join("news");
    fs::create_dir_all(&set).unwrap();
    for (file, bitrate) in [
        ("mediatailor-dash-v1.json", 100),
        ("mediatailor-dash-v2.json", 200),
        ("mediatailor-hls-cmaf-v1.json", 300),
    ] {
        fs::write(set.join(file), profile(bitrate).to_string()).unwrap();
    }

    let paths = collect_profile_paths(dir.path()).unwrap();
    let store = MemoryStore::rejecting("news-mediatailor-dash-v2");
    let records = sync_profile_paths(&store, &paths, None, &AlwaysConfirm).await;

    assert_eq!(records.len(), 3);
    let failed: Vec<&str> = records
        .iter()
        .filter(|record| record.failed())
        .map(|record| record.profile_name.as_str())
        .collect();
    assert_eq!(failed, vec!["news-mediatailor-dash-v2"]);
    assert!(records[1].outcome.is_none());
    assert!(records[1].error.as_deref().unwrap().contains("400"));
    assert_eq!(store.puts(), 2);
    assert_eq!(
        store.names(),
        vec!["news-mediatailor-dash-v1", "news-mediatailor-hls-cmaf-v1"]
    );
}

#[tokio::test]
async fn unreadable_profile_is_recorded_and_skipped() {
    let dir = tempdir().unwrap();
    let broken = dir.path().join("mediatailor-dash-v1.json");
    let good = dir.path().join("mediatailor-dash-v2.json");
    fs::write(&broken, "{ not json").unwrap();
    fs::write(&good, profile(100).to_string()).unwrap();

    let store = MemoryStore::default();
    let records =
        sync_profile_paths(&store, &[broken, good], None, &AlwaysConfirm).await;

    assert!(records[0].failed());
    assert_eq!(records[1].outcome, Some(UploadOutcome::applied("uploaded")));
    assert_eq!(store.puts(), 1);
}
