//! 传输层接口 - 基础设施层
//!
//! 存储后端客户端实现 `Transport`，编排层只通过 `TransferReporter`
//! 接收进度和结果回调。

use regex::Regex;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::error::TransferError;
use crate::models::{BodyStream, BucketId, CandidateFile, RemoteLocation, TaskId};

/// 存储后端客户端
///
/// `send` 必须立即返回，实际传输在后台进行，通过 `reporter` 回报进度和结果。
/// 超时策略完全由实现方负责。
pub trait Transport: Send + Sync {
    /// 发起一次传输
    fn send(
        &self,
        bucket: &BucketId,
        file: &CandidateFile,
        reporter: TransferReporter,
    ) -> CancelHandle;

    /// 尽力取消，不保证传输一定停止
    fn cancel(&self, handle: &CancelHandle) {
        handle.cancel();
    }
}

/// 取消句柄
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// 传输实现用来监听取消
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// 传输回调事件
#[derive(Debug, Clone)]
pub struct TransportEvent {
    pub task_id: TaskId,
    /// 第几次传输，用于丢弃旧传输的迟到回调
    pub attempt: u32,
    pub kind: TransportEventKind,
}

#[derive(Debug, Clone)]
pub enum TransportEventKind {
    /// 原始进度值，可能越界，由任务负责截断
    Progress(i64),
    Finished(Result<RemoteLocation, TransferError>),
}

/// 传输回调入口
///
/// 每次 `send` 对应一个 reporter；`complete` 消耗自身，保证结果只回报一次。
#[derive(Debug, Clone)]
pub struct TransferReporter {
    task_id: TaskId,
    attempt: u32,
    events: UnboundedSender<TransportEvent>,
}

impl TransferReporter {
    pub fn new(task_id: TaskId, attempt: u32, events: UnboundedSender<TransportEvent>) -> Self {
        Self {
            task_id,
            attempt,
            events,
        }
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// 回报进度百分比
    pub fn progress(&self, percent: i64) {
        self.emit(TransportEventKind::Progress(percent));
    }

    /// 回报最终结果
    pub fn complete(self, result: Result<RemoteLocation, TransferError>) {
        self.emit(TransportEventKind::Finished(result));
    }

    fn emit(&self, kind: TransportEventKind) {
        let event = TransportEvent {
            task_id: self.task_id,
            attempt: self.attempt,
            kind,
        };
        // 编排器已销毁时接收端关闭，回调直接丢弃
        if self.events.send(event).is_err() {
            tracing::debug!("任务 {} 的回调无人接收，已丢弃", self.task_id);
        }
    }
}

/// 按已发送字节数计算百分比
pub fn percent_of(sent: u64, total: u64) -> i64 {
    if total == 0 {
        return 100;
    }
    (sent.saturating_mul(100) / total) as i64
}

/// 生成远端对象名：`<时间戳>-<任务 id>-<第几次传输>-<清理后的文件名>`
///
/// 同名文件、或清理后同名的文件在同一毫秒内提交也不会冲突。
pub fn object_key(task_id: TaskId, attempt: u32, file_name: &str) -> String {
    let mut sanitized = file_name.to_string();
    if let Ok(re) = Regex::new(r"[^A-Za-z0-9._-]") {
        sanitized = re.replace_all(file_name, "_").into_owned();
    }
    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        sanitized = "file".to_string();
    }

    format!(
        "{}-{}-{}-{}",
        chrono::Local::now().format("%Y%m%d%H%M%S%3f"),
        task_id.as_u64(),
        attempt,
        sanitized
    )
}

/// 打开文件内容流，并确认内容长度与声明的 `size_bytes` 一致
///
/// 校验只看 `size_bytes`，长度不符的内容不能上传。
pub async fn open_checked_body(
    file: &CandidateFile,
    chunk_size: usize,
) -> Result<BodyStream, TransferError> {
    let actual = file
        .body
        .byte_len()
        .await
        .map_err(|e| TransferError::Network(format!("读取文件失败: {}", e)))?;
    if actual != file.size_bytes {
        return Err(size_mismatch(actual, file.size_bytes));
    }

    file.body
        .open_stream(chunk_size)
        .await
        .map_err(|e| TransferError::Network(format!("读取文件失败: {}", e)))
}

pub(crate) fn size_mismatch(actual: u64, declared: u64) -> TransferError {
    TransferError::ServerRejected {
        status: None,
        message: format!("内容长度 {} 与声明的大小 {} 不一致", actual, declared),
    }
}
