//! End-to-end orchestrator scenarios driven entirely through in-memory fakes.

use std::sync::Arc;

use vaultsync_core::changelog::MemoryChangeLogClient;
use vaultsync_core::fileops::{FileOps, MemoryFileOps};
use vaultsync_core::history::{History, HistoryConfig};
use vaultsync_core::metadata_store::MetadataStore;
use vaultsync_core::model::SyncSettings;
use vaultsync_core::orchestrator::Orchestrator;
use vaultsync_core::persistence::InMemoryPersistence;
use vaultsync_core::RelativePath;

async fn setup() -> (Orchestrator<MemoryFileOps, MemoryChangeLogClient>, MemoryFileOps, MemoryChangeLogClient, Arc<MetadataStore>) {
    let fs = MemoryFileOps::new();
    let changelog = MemoryChangeLogClient::new();
    let metadata = Arc::new(MetadataStore::load(Arc::new(InMemoryPersistence::new())).await.unwrap());
    metadata.update_settings(SyncSettings { upload_concurrency: 4, ..Default::default() }).await.unwrap();
    let history = Arc::new(History::new(HistoryConfig::default()));
    let orchestrator = Orchestrator::new(Arc::new(fs.clone()), Arc::new(changelog.clone()), metadata.clone(), history);
    (orchestrator, fs, changelog, metadata)
}

fn path(s: &str) -> RelativePath {
    RelativePath::new(s).unwrap()
}

#[tokio::test]
async fn create_then_push_is_idempotent_on_second_identical_create() {
    let (orch, fs, changelog, _metadata) = setup().await;
    fs.create(&path("a.md"), b"hello").await.unwrap();
    fs.create(&path("a.md"), b"hello").await.unwrap();
    orch.push(path("a.md")).await;
    let changes = changelog.get_changes_since(None).await.unwrap();
    assert_eq!(changes.latest_documents.len(), 1);
}

#[tokio::test]
async fn applying_the_same_pull_entry_twice_is_idempotent() {
    let (orch, fs, changelog, metadata) = setup().await;
    let doc_id = vaultsync_core::model::DocumentId::new();
    changelog.seed_remote_change(doc_id, path("remote.md"), b"remote content".to_vec());

    orch.run_pull_cycle().await;
    let after_first = fs.contents(&path("remote.md")).unwrap();
    let meta_after_first = metadata.get(&path("remote.md")).unwrap();

    // Re-seeding the exact same version and re-running is a no-op in effect: the
    // cursor already covers it, so a second cycle finds nothing new.
    orch.run_pull_cycle().await;
    let after_second = fs.contents(&path("remote.md")).unwrap();
    let meta_after_second = metadata.get(&path("remote.md")).unwrap();

    assert_eq!(after_first, after_second);
    assert_eq!(meta_after_first, meta_after_second);
}

#[tokio::test]
async fn pull_applies_remote_update_when_local_is_unchanged() {
    let (orch, fs, changelog, metadata) = setup().await;
    fs.create(&path("story.md"), b"The cat sat on the mat.").await.unwrap();
    orch.push(path("story.md")).await;
    let doc_id = metadata.get(&path("story.md")).unwrap().document_id;

    changelog.seed_remote_change(doc_id, path("story.md"), b"The big cat sat on the mat.".to_vec());
    orch.run_pull_cycle().await;

    let final_content = fs.contents(&path("story.md")).unwrap();
    assert_eq!(String::from_utf8(final_content).unwrap(), "The big cat sat on the mat.");
}

#[tokio::test]
async fn empty_file_round_trips() {
    let (orch, fs, changelog, _metadata) = setup().await;
    fs.create(&path("empty.md"), b"").await.unwrap();
    orch.push(path("empty.md")).await;
    let changes = changelog.get_changes_since(None).await.unwrap();
    assert_eq!(changes.latest_documents[0].content_bytes, Some(Vec::new()));
}
