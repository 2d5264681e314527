//! 集成测试 - 与本地假服务端交互
//!
//! 用 axum 搭建接口相同的服务端，验证上传、推送同步和批量删除的完整流程。

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, Sse},
    routing::{delete, get, post},
};
use filedock_core::{
    ApiClient, Error, FileBrowser, HostingApi, HttpPushSource, HttpTransferChannel,
    LiveRosterSync, Notice, PipelineEvent, PushSource, Roster, RosterEntry, SyncState,
    TransferOutcome, UploadPipeline, UploadSource,
};
use futures_util::stream;
use serde_json::{Value, json};
use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// 文件名含 `too-large` 时拒绝，含 `crash` 时返回纯文本错误
async fn upload(body: Bytes) -> (StatusCode, String) {
    if contains(&body, b"too-large") {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({"detail": "too large"}).to_string(),
        )
    } else if contains(&body, b"crash") {
        (StatusCode::INTERNAL_SERVER_ERROR, "disk full".to_string())
    } else {
        (StatusCode::OK, json!({"url": "/d/abc"}).to_string())
    }
}

async fn collect(mut rx: mpsc::UnboundedReceiver<PipelineEvent>) -> Vec<PipelineEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

fn outcomes(events: &[PipelineEvent]) -> Vec<(String, TransferOutcome)> {
    events
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::Finished { name, outcome, .. } => Some((name.clone(), outcome.clone())),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_upload_outcomes_follow_server_responses() {
    let origin = serve(Router::new().route("/api/upload", post(upload))).await;
    let api = ApiClient::new(&origin).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let photo = dir.path().join("photo.png");
    std::fs::write(&photo, vec![7u8; 10 * 1024]).unwrap();
    let big = dir.path().join("too-large.bin");
    std::fs::write(&big, b"0123456789").unwrap();

    let channel = HttpTransferChannel::new(api).with_chunk_size(1024);
    let (handle, rx) = UploadPipeline::spawn(channel);
    handle
        .enqueue(vec![
            UploadSource::path(&photo),
            UploadSource::path(&big),
            UploadSource::memory("crash.txt", b"x".to_vec()),
            UploadSource::path(dir.path().join("missing.png")),
        ])
        .unwrap();
    handle.shutdown();

    let events = collect(rx).await;
    let results = outcomes(&events);

    assert_eq!(results.len(), 4);
    assert_eq!(results[0], ("photo.png".into(), TransferOutcome::success("/d/abc")));
    assert_eq!(results[1], ("too-large.bin".into(), TransferOutcome::failure("too large")));
    assert_eq!(results[2], ("crash.txt".into(), TransferOutcome::failure("disk full")));
    match &results[3].1 {
        TransferOutcome::Failure { message } => assert!(message.starts_with("Cannot read missing.png")),
        other => panic!("unexpected outcome {:?}", other),
    }

    // 进度单调且不超过 100
    let photo_id = events
        .iter()
        .find_map(|e| match e {
            PipelineEvent::Started { id, name } if name == "photo.png" => Some(id.clone()),
            _ => None,
        })
        .unwrap();
    let percents: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::Progress { id, progress, .. } if *id == photo_id => {
                Some(progress.percent())
            }
            _ => None,
        })
        .collect();
    assert!(percents.len() >= 10);
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(percents.last(), Some(&100));
}

#[tokio::test]
async fn test_unreachable_server_gives_generic_failure() {
    // 绑定后立即释放，得到一个无人监听的端口
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = ApiClient::new(&format!("http://{}", addr)).unwrap();
    let (handle, rx) = UploadPipeline::spawn(HttpTransferChannel::new(api));
    handle
        .enqueue(vec![UploadSource::memory("a.png", b"data".to_vec())])
        .unwrap();
    handle.shutdown();

    let results = outcomes(&collect(rx).await);
    assert_eq!(results, vec![("a.png".into(), TransferOutcome::failure("Upload Failed"))]);
}

/// 每次连接推送两条消息后关闭
async fn file_updates(
    State(connections): State<Arc<AtomicUsize>>,
) -> Sse<impl futures_util::Stream<Item = Result<Event, Infallible>>> {
    let n = connections.fetch_add(1, Ordering::SeqCst);
    let first = json!({"file_id": format!("{}:a", n), "filename": "a.png", "filesize": 1, "upload_date": "2024-05-01T00:00:00"});
    let second = json!({"file_id": format!("{}:b", n), "filename": "b.png", "filesize": 2, "upload_date": "2024-05-01T00:00:00"});

    let events = vec![
        Ok(Event::default().comment("keepalive")),
        Ok(Event::default().data(first.to_string())),
        Ok(Event::default().event("ping").data("ignored")),
        Ok(Event::default().data("not json")),
        Ok(Event::default().data(second.to_string())),
    ];
    Sse::new(stream::iter(events))
}

#[tokio::test]
async fn test_push_stream_reconnects_and_feeds_browser() {
    let connections = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/api/file-updates", get(file_updates))
        .with_state(connections.clone());
    let origin = serve(app).await;
    let api = ApiClient::new(&origin).unwrap();

    let sync = LiveRosterSync::new(HttpPushSource::new(api))
        .with_retry_delay(Duration::from_millis(50));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(sync.run(tx));

    let mut browser = FileBrowser::new(&origin);
    browser.set_all_checked(true);
    for _ in 0..3 {
        let entry = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        browser.on_push(entry);
    }

    let ids: Vec<&str> = browser
        .roster()
        .rows()
        .iter()
        .map(|r| r.entry.file_id.as_str())
        .collect();
    assert_eq!(ids, vec!["1:a", "0:b", "0:a"]);
    assert!(connections.load(Ordering::SeqCst) >= 2);

    drop(rx);
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap();
}

async fn batch_delete(Json(body): Json<Value>) -> Json<Value> {
    let ids: Vec<String> = serde_json::from_value(body["file_ids"].clone()).unwrap_or_default();
    let mut deleted = Vec::new();
    let mut failed = Vec::new();
    for id in ids {
        if id == "1:a" {
            deleted.push(json!({"status": "ok", "file_id": id}));
        } else {
            failed.push(json!({"file_id": id, "detail": "File not found"}));
        }
    }
    Json(json!({"status": "partial_success", "deleted": deleted, "failed": failed}))
}

async fn list_files() -> Json<Vec<RosterEntry>> {
    Json(vec![RosterEntry {
        file_id: "2:b".into(),
        filename: "b.png".into(),
        filesize: 2048,
        upload_date: "2024-05-02T08:00:00".into(),
    }])
}

async fn delete_one(Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    if id == "2:b" {
        (
            StatusCode::OK,
            Json(json!({"status": "ok", "message": format!("File {} deleted", id)})),
        )
    } else {
        (StatusCode::NOT_FOUND, Json(json!({"detail": "File not found"})))
    }
}

#[tokio::test]
async fn test_batch_delete_against_server() {
    let app = Router::new()
        .route("/api/batch_delete", post(batch_delete))
        .route("/api/files", get(list_files))
        .route("/api/files/:id", delete(delete_one));
    let origin = serve(app).await;
    let api = ApiClient::new(&origin).unwrap();

    let entries = vec![
        RosterEntry {
            file_id: "1:a".into(),
            filename: "a.png".into(),
            filesize: 1,
            upload_date: String::new(),
        },
        RosterEntry {
            file_id: "2:b".into(),
            filename: "b.png".into(),
            filesize: 1,
            upload_date: String::new(),
        },
    ];
    let mut browser = FileBrowser::with_roster(&origin, Roster::from_entries(entries));
    browser.set_all_checked(true);

    let report = browser.batch_delete(&api, |_| true).await.unwrap();
    assert_eq!(report.removed, vec!["1:a"]);
    assert_eq!(report.failed, vec!["2:b"]);
    assert_eq!(report.notices[1], Notice::error("Failed to delete: 2:b"));
    assert_eq!(browser.roster().len(), 1);
    assert_eq!(browser.roster().rows()[0].entry.formatted_size(), "2 KB");

    // 单个删除：404 也返回 JSON
    let missing = api.delete_file("9:z").await.unwrap();
    assert!(!missing.is_deleted());
    assert_eq!(missing.detail_text(), "File not found");

    let notice = browser.delete_file(&api, "2:b", |_| true).await;
    assert_eq!(notice, Some(None));
    assert!(browser.roster().is_empty());
}

fn entry(id: &str) -> RosterEntry {
    RosterEntry {
        file_id: id.into(),
        filename: format!("{}.png", id),
        filesize: 1,
        upload_date: String::new(),
    }
}

async fn unavailable(State(hits): State<Arc<AtomicUsize>>) -> (StatusCode, &'static str) {
    hits.fetch_add(1, Ordering::SeqCst);
    (StatusCode::SERVICE_UNAVAILABLE, "maintenance")
}

#[tokio::test]
async fn test_push_stream_error_status_keeps_retrying() {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/api/file-updates", get(unavailable))
        .with_state(hits.clone());
    let origin = serve(app).await;
    let api = ApiClient::new(&origin).unwrap();

    match HttpPushSource::new(api.clone()).connect().await {
        Err(Error::Status { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        Err(other) => panic!("unexpected error {:?}", other),
        Ok(_) => panic!("503 should not open a stream"),
    }

    let sync = LiveRosterSync::new(HttpPushSource::new(api))
        .with_retry_delay(Duration::from_millis(20));
    let state = sync.subscribe_state();
    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(sync.run(tx));

    tokio::time::timeout(Duration::from_secs(5), async {
        while hits.load(Ordering::SeqCst) < 4 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    assert_ne!(*state.borrow(), SyncState::Connected);

    drop(rx);
    task.abort();
}

/// 批量删除接口出错；记录文件列表被请求的次数
async fn batch_delete_broken() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
}

async fn counted_list(State(hits): State<Arc<AtomicUsize>>) -> Json<Vec<RosterEntry>> {
    hits.fetch_add(1, Ordering::SeqCst);
    Json(Vec::new())
}

async fn delete_broken(Path(_id): Path<String>) -> (StatusCode, &'static str) {
    (StatusCode::BAD_GATEWAY, "<html>bad gateway</html>")
}

#[tokio::test]
async fn test_delete_error_statuses_leave_roster_alone() {
    let list_hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/api/batch_delete", post(batch_delete_broken))
        .route("/api/files", get(counted_list))
        .route("/api/files/:id", delete(delete_broken))
        .with_state(list_hits.clone());
    let origin = serve(app).await;
    let api = ApiClient::new(&origin).unwrap();

    let mut browser =
        FileBrowser::with_roster(&origin, Roster::from_entries(vec![entry("a"), entry("b")]));
    browser.set_all_checked(true);

    let report = browser.batch_delete(&api, |_| true).await.unwrap();
    assert_eq!(
        report.notices,
        vec![Notice::error("An error occurred while deleting files.")]
    );
    assert!(!report.reload_required);
    assert_eq!(list_hits.load(Ordering::SeqCst), 0);
    assert_eq!(browser.roster().len(), 2);
    assert_eq!(browser.selected_ids(), vec!["a", "b"]);

    // 非 JSON 的错误响应
    match api.delete_file("a").await {
        Err(Error::Status { status, body }) => {
            assert_eq!(status, 502);
            assert!(body.contains("bad gateway"));
        }
        other => panic!("unexpected result {:?}", other),
    }
    let notice = browser.delete_file(&api, "a", |_| true).await;
    assert_eq!(
        notice,
        Some(Some(Notice::error("An error occurred while deleting the file.")))
    );
    assert_eq!(browser.roster().len(), 2);
}
