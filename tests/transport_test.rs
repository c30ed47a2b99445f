use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use upload_orchestrator::orchestrator::build_transport;
use upload_orchestrator::utils::logging;
use upload_orchestrator::{
    App, CandidateFile, Config, HttpTransport, LocalDirTransport, PolicyTable,
    TaskStatus, TransportKind, UploadNotice, UploadOrchestrator,
};
use wiremock::matchers::{header, method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// 每个测试使用独立的临时目录
fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "upload-orchestrator-{}-{}",
        name,
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("创建临时目录失败");
    dir
}

#[tokio::test]
async fn test_local_transport_writes_files_and_reports_progress() {
    logging::init();
    let root = temp_dir("local");
    let transport = LocalDirTransport::new(&root, 4);
    let (mut orchestrator, mut notices) =
        UploadOrchestrator::new(PolicyTable::builtin(), Arc::new(transport), 10);

    let created = orchestrator
        .submit(
            vec![
                CandidateFile::from_bytes("a.png", "image/png", b"0123456789".to_vec()),
                CandidateFile::from_bytes("b c.jpg", "image/jpeg", b"abc".to_vec()),
            ],
            "images",
        )
        .expect("提交失败");
    assert_eq!(created.len(), 2);

    tokio::time::timeout(Duration::from_secs(10), orchestrator.run_until_idle())
        .await
        .expect("上传超时");

    for task in orchestrator.all_tasks() {
        assert_eq!(task.status, TaskStatus::Completed, "{:?}", task.error_message);
        assert_eq!(task.progress_percent, 100);
        let location = task.result_location.expect("缺少结果位置");
        assert!(location.remote_path.starts_with("images/"));
        assert!(location.remote_url.starts_with("file://"));
        assert!(root.join(&location.remote_path).exists());
    }

    let a = orchestrator.all_tasks()[0].clone();
    let stored = std::fs::read(root.join(a.result_location.unwrap().remote_path)).unwrap();
    assert_eq!(stored, b"0123456789");

    // 每个任务的进度通知单调不减
    let mut last = std::collections::HashMap::new();
    while let Ok(notice) = notices.try_recv() {
        if let UploadNotice::Progress { id, percent } = notice {
            let previous = last.insert(id, percent).unwrap_or(0);
            assert!(percent > previous);
        }
    }

    let _ = std::fs::remove_dir_all(&root);
}

/// 目录下的条目数，目录不存在时为 0
fn entry_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

#[tokio::test]
async fn test_local_transport_keeps_same_named_files_apart() {
    logging::init();
    let root = temp_dir("same-name");
    let transport = LocalDirTransport::new(&root, 1);
    let (mut orchestrator, _notices) =
        UploadOrchestrator::new(PolicyTable::builtin(), Arc::new(transport), 10);

    let created = orchestrator
        .submit(
            vec![
                CandidateFile::from_bytes("photo.png", "image/png", b"AAAAAAAA".to_vec()),
                CandidateFile::from_bytes("photo.png", "image/png", b"BB".to_vec()),
                // 清理后同名
                CandidateFile::from_bytes("a b.png", "image/png", b"CCC".to_vec()),
                CandidateFile::from_bytes("a_b.png", "image/png", b"D".to_vec()),
            ],
            "images",
        )
        .expect("提交失败");
    assert_eq!(created.len(), 4);

    tokio::time::timeout(Duration::from_secs(10), orchestrator.run_until_idle())
        .await
        .expect("上传超时");

    let expected: [&[u8]; 4] = [b"AAAAAAAA", b"BB", b"CCC", b"D"];
    let mut paths = std::collections::HashSet::new();
    for (task, expected) in orchestrator.all_tasks().iter().zip(expected) {
        assert_eq!(task.status, TaskStatus::Completed, "{:?}", task.error_message);
        let location = task.result_location.clone().expect("缺少结果位置");
        assert!(paths.insert(location.remote_path.clone()));
        let stored = std::fs::read(root.join(&location.remote_path)).unwrap();
        assert_eq!(stored, expected);
    }
    assert_eq!(entry_count(&root.join("images")), 4);

    let _ = std::fs::remove_dir_all(&root);
}

#[tokio::test]
async fn test_local_transport_rejects_body_size_mismatch() {
    logging::init();
    let root = temp_dir("size-mismatch");
    let transport = LocalDirTransport::new(&root, 1024);
    let (mut orchestrator, _notices) =
        UploadOrchestrator::new(PolicyTable::builtin(), Arc::new(transport), 10);

    let id = orchestrator
        .submit(
            vec![CandidateFile::declared("big.png", 2 * 1024 * 1024, "image/png")],
            "images",
        )
        .expect("提交失败")[0]
        .id;

    tokio::time::timeout(Duration::from_secs(10), orchestrator.run_until_idle())
        .await
        .expect("上传超时");

    let task = orchestrator.task(id).expect("任务丢失");
    assert_eq!(task.status, TaskStatus::Failed);
    assert!(task.result_location.is_none());
    assert!(task.error_message.expect("缺少错误信息").contains("不一致"));
    assert_eq!(entry_count(&root.join("images")), 0);

    let _ = std::fs::remove_dir_all(&root);
}

#[tokio::test]
async fn test_removing_local_upload_mid_flight_cancels_and_cleans_up() {
    logging::init();
    let root = temp_dir("local-cancel");
    let transport = LocalDirTransport::new(&root, 64);
    let (mut orchestrator, mut notices) =
        UploadOrchestrator::new(PolicyTable::builtin(), Arc::new(transport), 10);

    let id = orchestrator
        .submit(
            vec![CandidateFile::from_bytes("big.png", "image/png", vec![7u8; 256 * 1024])],
            "images",
        )
        .expect("提交失败")[0]
        .id;

    // 等到确实写入了一部分
    tokio::time::timeout(Duration::from_secs(10), async {
        while orchestrator.task(id).map(|t| t.progress_percent).unwrap_or(0) == 0 {
            assert!(orchestrator.process_next().await);
        }
    })
    .await
    .expect("等待进度超时");
    assert!(orchestrator.task(id).unwrap().progress_percent < 100);

    let removed = orchestrator.remove_task(id).expect("移除失败");
    assert_eq!(removed.status, TaskStatus::InProgress);

    // 取消后写了一半的文件被删除
    let bucket = root.join("images");
    tokio::time::timeout(Duration::from_secs(10), async {
        while entry_count(&bucket) > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("残留文件未被清理");

    // 迟到的 Cancelled 回调被丢弃，登记表保持不变
    tokio::time::sleep(Duration::from_millis(50)).await;
    orchestrator.drain_pending();
    assert_eq!(orchestrator.tracked_count(), 0);
    assert!(orchestrator.task(id).is_none());

    while let Ok(notice) = notices.try_recv() {
        assert!(
            !matches!(
                notice,
                UploadNotice::Completed { .. } | UploadNotice::Failed { .. }
            ),
            "{:?}",
            notice
        );
    }

    let _ = std::fs::remove_dir_all(&root);
}

#[tokio::test]
async fn test_removing_http_upload_mid_flight_cancels_request() {
    logging::init();
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri(), 2, Some(Duration::from_secs(60)))
        .expect("构建 HTTP 客户端失败");
    let (mut orchestrator, mut notices) =
        UploadOrchestrator::new(PolicyTable::builtin(), Arc::new(transport), 10);

    let id = orchestrator
        .submit(
            vec![CandidateFile::from_bytes("a.png", "image/png", b"pngdata".to_vec())],
            "images",
        )
        .expect("提交失败")[0]
        .id;

    // 请求体发送完毕，正在等待服务端响应
    tokio::time::timeout(Duration::from_secs(10), async {
        while orchestrator.task(id).map(|t| t.progress_percent).unwrap_or(0) < 100 {
            assert!(orchestrator.process_next().await);
        }
    })
    .await
    .expect("等待进度超时");

    orchestrator.remove_task(id).expect("移除失败");

    // 取消生效时结果回调远早于服务端的延迟响应到达
    tokio::time::timeout(Duration::from_secs(5), async {
        while orchestrator.drain_pending() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("取消未生效");

    assert_eq!(orchestrator.tracked_count(), 0);
    while let Ok(notice) = notices.try_recv() {
        assert!(
            !matches!(
                notice,
                UploadNotice::Completed { .. } | UploadNotice::Failed { .. }
            ),
            "{:?}",
            notice
        );
    }
}

#[test]
fn test_build_transport_for_each_kind() {
    let local = Config {
        transport: TransportKind::Local,
        ..Config::default()
    };
    assert!(build_transport(&local).is_ok());

    let http = Config {
        transport: TransportKind::Http,
        http_timeout_secs: 0,
        ..Config::default()
    };
    assert!(build_transport(&http).is_ok());
}

#[tokio::test]
async fn test_http_transport_success_uses_server_location() {
    logging::init();
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/images/\d+-\d+-1-a\.png$"))
        .and(header("content-type", "image/png"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "url": "https://cdn.example.com/images/a.png",
            "path": "images/a.png"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri(), 2, Some(Duration::from_secs(5)))
        .expect("构建 HTTP 客户端失败");
    let (mut orchestrator, _notices) =
        UploadOrchestrator::new(PolicyTable::builtin(), Arc::new(transport), 10);

    let id = orchestrator
        .submit(
            vec![CandidateFile::from_bytes("a.png", "image/png", b"pngdata".to_vec())],
            "images",
        )
        .expect("提交失败")[0]
        .id;

    tokio::time::timeout(Duration::from_secs(10), orchestrator.run_until_idle())
        .await
        .expect("上传超时");

    let task = orchestrator.task(id).expect("任务丢失");
    assert_eq!(task.status, TaskStatus::Completed, "{:?}", task.error_message);
    let location = task.result_location.expect("缺少结果位置");
    assert_eq!(location.remote_url, "https://cdn.example.com/images/a.png");
    assert_eq!(location.remote_path, "images/a.png");
}

#[tokio::test]
async fn test_http_transport_server_rejection_fails_task() {
    logging::init();
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(413).set_body_string("payload too large"))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri(), 1024, None).expect("构建 HTTP 客户端失败");
    let (mut orchestrator, _notices) =
        UploadOrchestrator::new(PolicyTable::builtin(), Arc::new(transport), 10);

    let id = orchestrator
        .submit(
            vec![CandidateFile::from_bytes("a.png", "image/png", b"pngdata".to_vec())],
            "images",
        )
        .expect("提交失败")[0]
        .id;

    tokio::time::timeout(Duration::from_secs(10), orchestrator.run_until_idle())
        .await
        .expect("上传超时");

    let task = orchestrator.task(id).expect("任务丢失");
    assert_eq!(task.status, TaskStatus::Failed);
    assert!(task.result_location.is_none());
    let message = task.error_message.expect("缺少错误信息");
    assert!(message.contains("413"));
    assert!(message.contains("payload too large"));
}

#[tokio::test]
async fn test_app_uploads_folder_in_batches() {
    logging::init();
    let workspace = temp_dir("app");
    let uploads = workspace.join("uploads");
    std::fs::create_dir_all(&uploads).unwrap();
    std::fs::write(uploads.join("a.png"), b"small").unwrap();
    std::fs::write(uploads.join("b.png"), b"tiny").unwrap();
    std::fs::write(uploads.join("c.png"), vec![0u8; 200]).unwrap();
    std::fs::write(uploads.join("notes.txt"), b"hello").unwrap();

    let policy_file = workspace.join("policies.toml");
    std::fs::write(
        &policy_file,
        r#"
[categories.images]
max_size_bytes = 100
allowed_content_types = ["image/png"]
destination = "pictures"
"#,
    )
    .unwrap();

    let report_file = workspace.join("report.txt");
    let config = Config {
        max_batch_size: 2,
        policy_file: policy_file.to_string_lossy().to_string(),
        upload_folder: uploads.to_string_lossy().to_string(),
        category: "images".to_string(),
        report_file: report_file.to_string_lossy().to_string(),
        transport: TransportKind::Local,
        bucket_root: workspace.join("bucket").to_string_lossy().to_string(),
        chunk_size: 2,
        ..Config::default()
    };

    let mut app = App::initialize(config).await.expect("初始化失败");
    let stats = tokio::time::timeout(Duration::from_secs(10), app.run())
        .await
        .expect("运行超时")
        .expect("运行失败");

    assert_eq!(stats.total, 4);
    assert_eq!(stats.success, 2);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.rejected, 2);

    let stored = std::fs::read_dir(workspace.join("bucket").join("pictures"))
        .unwrap()
        .count();
    assert_eq!(stored, 2);

    let report = std::fs::read_to_string(&report_file).unwrap();
    assert!(report.contains(r#""file_name":"a.png""#));
    assert!(report.contains("已拒绝 | 文件 c.png"));
    assert!(report.contains("已拒绝 | 文件 notes.txt"));

    let _ = std::fs::remove_dir_all(&workspace);
}

#[tokio::test]
async fn test_app_rejects_unknown_category_at_startup() {
    let workspace = temp_dir("unknown-category");
    let config = Config {
        policy_file: workspace.join("missing.toml").to_string_lossy().to_string(),
        category: "spreadsheets".to_string(),
        report_file: workspace.join("report.txt").to_string_lossy().to_string(),
        ..Config::default()
    };

    assert!(App::initialize(config).await.is_err());
    let _ = std::fs::remove_dir_all(&workspace);
}
