use coub_backup::backup::{Backup, BlobFetcher, Phase, ProgressState};
use coub_backup::remote::{HeaderTemplate, TimelineClient};
use coub_backup::storage::{BlobStore, FsBlobStore, MetadataStore, RunStatus, SqliteStorage};
use coub_backup::{BackupError, Feed};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn item_json(base: &str, id: i64) -> String {
    format!(
        r#"{{"id": {id}, "type": "Coub::Simple", "permalink": "p{id}", "title": "Loop {id}",
            "channel": {{"id": 1, "permalink": "alice", "title": "Alice"}},
            "published_at": "2022-05-0{id}T10:00:00Z",
            "file_versions": {{"html5": {{
                "video": {{
                    "med": {{"url": "{base}/cdn/{id}_med.mp4", "size": 10}},
                    "higher": {{"url": "{base}/cdn/{id}_higher.mp4", "size": 50}}
                }},
                "audio": {{"high": {{"url": "{base}/cdn/{id}.mp3", "size": 5}}}}
            }}}}}}"#,
        id = id,
        base = base
    )
}

fn page_json(page: u32, total_pages: u32, items: &[String]) -> String {
    format!(
        r#"{{"page": {}, "per_page": 2, "total_pages": {}, "coubs": [{}]}}"#,
        page,
        total_pages,
        items.join(",")
    )
}

/// Mounts a channel timeline of two pages (items 1, 2 and 3) for "alice"
async fn mount_channel(server: &MockServer) {
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path("/api/v2/timeline/channel/alice"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page_json(
            1,
            2,
            &[item_json(&base, 1), item_json(&base, 2)],
        )))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/timeline/channel/alice"))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(page_json(2, 2, &[item_json(&base, 3)])),
        )
        .mount(server)
        .await;
}

/// Mounts the CDN; every rendition answers with its own path as the body
async fn mount_cdn(server: &MockServer) {
    for id in 1..=3 {
        for file in [format!("{}_higher.mp4", id), format!("{}.mp3", id)] {
            Mock::given(method("GET"))
                .and(path(format!("/cdn/{}", file)))
                .respond_with(ResponseTemplate::new(200).set_body_string(file.clone()))
                .mount(server)
                .await;
        }
    }
    Mock::given(method("GET"))
        .and(path("/cdn/1_med.mp4"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(server)
        .await;
}

async fn build_backup(
    server: &MockServer,
    dir: &Path,
    session: HeaderTemplate,
) -> (Backup, Arc<FsBlobStore>, Arc<ProgressState>) {
    let client = reqwest::Client::new();
    let pages = TimelineClient::new(client.clone(), &server.uri(), Arc::new(session)).unwrap();
    let blobs = Arc::new(FsBlobStore::open(dir.join("blobs")).await.unwrap());
    let storage = SqliteStorage::new(&dir.join("backup.db")).unwrap();
    let progress = Arc::new(ProgressState::new());

    let backup = Backup::new(
        Arc::new(pages),
        BlobFetcher::new(client, blobs.clone()),
        storage,
        Arc::clone(&progress),
    )
    .with_config_hash("test-hash");

    (backup, blobs, progress)
}

#[tokio::test]
async fn test_channel_backup_end_to_end() {
    let server = MockServer::start().await;
    mount_channel(&server).await;
    mount_cdn(&server).await;

    let dir = TempDir::new().unwrap();
    let (mut backup, blobs, progress) =
        build_backup(&server, dir.path(), HeaderTemplate::empty()).await;

    let summary = backup.run_profile("alice").await.unwrap();

    assert_eq!(summary.pages_fetched, 2);
    assert_eq!(summary.items_saved, 3);
    assert_eq!(summary.items_skipped, 0);

    let video = blobs.get("1_video.mp4").await.unwrap();
    assert_eq!(video.data, b"1_higher.mp4");
    assert_eq!(video.content_type.as_deref(), Some("video/mp4"));
    assert_eq!(blobs.get("3_audio.mp3").await.unwrap().data, b"3.mp3");

    let record = backup
        .storage()
        .get_record(Feed::Channel, "alice", 2)
        .unwrap()
        .unwrap();
    assert!(!record.no_audio);
    assert_eq!(record.published_at.to_rfc3339(), "2022-05-02T10:00:00+00:00");
    let raw: serde_json::Value = serde_json::from_slice(&record.raw_payload).unwrap();
    assert_eq!(raw["title"], "Loop 2");

    let snapshot = progress.snapshot();
    assert_eq!(snapshot.phase, Phase::Finished);
    assert_eq!(snapshot.page, 2);
    assert_eq!(snapshot.total_pages, 2);
    assert_eq!(snapshot.item.unwrap().id, 3);

    let runs = backup.storage().recent_runs(5).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Completed);
    assert_eq!(runs[0].config_hash, "test-hash");
    assert_eq!(runs[0].items_saved, 3);
}

#[tokio::test]
async fn test_rerun_downloads_nothing_new() {
    let server = MockServer::start().await;
    mount_channel(&server).await;
    mount_cdn(&server).await;

    let dir = TempDir::new().unwrap();
    {
        let (mut backup, _, _) = build_backup(&server, dir.path(), HeaderTemplate::empty()).await;
        backup.run_profile("alice").await.unwrap();
    }

    let cdn_requests = |requests: &[wiremock::Request]| {
        requests
            .iter()
            .filter(|r| r.url.path().starts_with("/cdn/"))
            .count()
    };
    let after_first = cdn_requests(&server.received_requests().await.unwrap());
    assert_eq!(after_first, 6);

    let (mut backup, _, _) = build_backup(&server, dir.path(), HeaderTemplate::empty()).await;
    let summary = backup.run_profile("alice").await.unwrap();

    assert_eq!(summary.items_saved, 0);
    assert_eq!(summary.items_skipped, 3);
    assert_eq!(
        cdn_requests(&server.received_requests().await.unwrap()),
        after_first
    );
    assert_eq!(
        backup
            .storage()
            .count_records(Feed::Channel, Some("alice"))
            .unwrap(),
        3
    );
}

#[tokio::test]
async fn test_likes_backup_uses_session_headers() {
    let server = MockServer::start().await;
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path("/api/v2/timeline/likes"))
        .and(query_param("page", "1"))
        .and(query_param("all", "true"))
        .and(header("cookie", "remember_token=abc"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(page_json(1, 1, &[item_json(&base, 2)])),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_cdn(&server).await;

    let dir = TempDir::new().unwrap();
    let session = HeaderTemplate::parse("Cookie: remember_token=abc\n").unwrap();
    let (mut backup, blobs, _) = build_backup(&server, dir.path(), session).await;

    let summary = backup.run_likes("alice").await.unwrap();

    assert_eq!(summary.items_saved, 1);
    assert!(blobs.exists("2_video.mp4").await.unwrap());
    assert_eq!(backup.storage().count_records(Feed::Likes, None).unwrap(), 1);
    assert_eq!(backup.storage().count_records(Feed::Channel, None).unwrap(), 0);
}

#[tokio::test]
async fn test_failed_page_records_failed_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/timeline/channel/alice"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (mut backup, _, progress) =
        build_backup(&server, dir.path(), HeaderTemplate::empty()).await;

    let err = backup.run_profile("alice").await.unwrap_err();
    assert!(matches!(err, BackupError::Status { status: 503, .. }));

    let snapshot = progress.snapshot();
    assert_eq!(snapshot.phase, Phase::Failed);
    assert_eq!(snapshot.page, 1);

    let runs = backup.storage().recent_runs(1).unwrap();
    assert_eq!(runs[0].status, RunStatus::Failed);
    assert!(runs[0].error_message.as_deref().unwrap().contains("503"));
}

#[tokio::test]
async fn test_stale_runs_become_interrupted() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("backup.db");

    let run_id = {
        let mut storage = SqliteStorage::new(&db_path).unwrap();
        storage.create_run(Feed::Channel, "alice", "hash").unwrap()
    };

    let mut storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.interrupt_stale_runs().unwrap(), 1);
    assert_eq!(
        storage.get_run(run_id).unwrap().status,
        RunStatus::Interrupted
    );
}
