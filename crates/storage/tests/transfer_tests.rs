//! Upload/download helper tests against the filesystem backend.

use assetcat_storage::{
    FilesystemBackend, ObjectStore, StorageError, download_file, download_json, upload_json,
    upload_object,
};
use std::collections::BTreeMap;
use tempfile::tempdir;

#[tokio::test]
async fn upload_object_keys_by_base_name_under_folder() {
    let temp = tempdir().unwrap();
    let local = temp.path().join("staging").join("report.csv");
    std::fs::create_dir_all(local.parent().unwrap()).unwrap();
    std::fs::write(&local, b"id,value\n1,2\n").unwrap();

    let store = FilesystemBackend::new(temp.path().join("landing"))
        .await
        .unwrap();

    let key = upload_object(&store, &local, Some("/feeds/")).await.unwrap();
    assert_eq!(key.full_name, "feeds/report.csv");
    assert_eq!(key.object_name, "report.csv");
    assert_eq!(key.uri(), "s3://landing/feeds/report.csv");
    assert!(store.exists("feeds/report.csv").await.unwrap());

    let unfoldered = upload_object(&store, &local, None).await.unwrap();
    assert_eq!(unfoldered.full_name, "report.csv");
}

#[tokio::test]
async fn upload_object_missing_local_file_is_io_error() {
    let temp = tempdir().unwrap();
    let store = FilesystemBackend::new(temp.path().join("landing"))
        .await
        .unwrap();

    let result = upload_object(&store, temp.path().join("nope.csv"), None).await;
    assert!(matches!(result, Err(StorageError::Io(_))));
}

#[tokio::test]
async fn download_file_and_json_round_trip() {
    let temp = tempdir().unwrap();
    let store = FilesystemBackend::new(temp.path().join("landing"))
        .await
        .unwrap();

    let mut doc = BTreeMap::new();
    doc.insert("feed_id".to_string(), "f-1".to_string());
    upload_json(&store, &doc, "meta/feed.json").await.unwrap();

    let parsed: BTreeMap<String, String> = download_json(&store, "meta/feed.json").await.unwrap();
    assert_eq!(parsed, doc);

    let dest = temp.path().join("out").join("feed.json");
    download_file(&store, "meta/feed.json", &dest).await.unwrap();
    assert!(dest.exists());

    let missing = download_json::<BTreeMap<String, String>>(&store, "meta/none.json").await;
    assert!(matches!(missing, Err(StorageError::NotFound(_))));
}

#[tokio::test]
async fn download_json_rejects_non_json() {
    let temp = tempdir().unwrap();
    let store = FilesystemBackend::new(temp.path().join("landing"))
        .await
        .unwrap();
    store
        .put("raw.txt", bytes_of("not json"))
        .await
        .unwrap();

    let result = download_json::<serde_json::Value>(&store, "raw.txt").await;
    assert!(matches!(result, Err(StorageError::InvalidJson { .. })));
}

fn bytes_of(s: &'static str) -> bytes::Bytes {
    bytes::Bytes::from_static(s.as_bytes())
}
