use super::*;
use ghost_core::ProcessType;
use std::collections::HashMap;

fn record(id: &str) -> ProcessRecord {
    ProcessRecord {
        id: id.to_string(),
        name: id.to_string(),
        process_type: ProcessType::OneShot,
        version: "1.0.0".to_string(),
        executable_path: PathBuf::from("/bin/true"),
        arguments: Vec::new(),
        working_directory: None,
        environment: HashMap::new(),
        configuration: HashMap::new(),
        status: ProcessStatus::Registered,
        pid: None,
        started_at: None,
        updated_at: 0,
        restart_count: 0,
    }
}

#[tokio::test]
async fn open_on_fresh_directory_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path().join("store.bin")).unwrap();
    assert!(store.load_active().await.unwrap().is_empty());
}

#[tokio::test]
async fn save_process_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.bin");

    let store = FileStore::open(path.clone()).unwrap();
    store.save_process(&record("app1")).await.unwrap();
    drop(store);

    let reopened = FileStore::open(path).unwrap();
    let states = reopened.get_status(Some("app1")).await.unwrap();
    assert_eq!(states.len(), 1);
}

#[tokio::test]
async fn second_write_creates_a_bak_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.bin");

    let store = FileStore::open(path.clone()).unwrap();
    store.save_process(&record("app1")).await.unwrap();
    store.update_status("app1", ProcessStatus::Stopped).await.unwrap();

    assert!(path.with_extension("bak").exists());
}
