//! 上传任务 - 流程层
//!
//! 核心职责：定义"一个文件"的完整上传生命周期
//!
//! 状态流转：
//! 1. Queued → InProgress（`start`）
//! 2. InProgress → Completed | Failed（传输回调）
//! 3. Failed → InProgress（`retry`，不会回到 Queued）

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::error::{AppResult, TransferError, UploadError};
use crate::infrastructure::{CancelHandle, TransferReporter, Transport, TransportEvent};
use crate::models::{BucketId, CandidateFile, RemoteLocation, TaskId, TaskSnapshot, TaskStatus};

/// 任务状态
///
/// 结果位置和错误信息挂在各自的变体上，二者不可能同时存在。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Queued,
    InProgress,
    Completed(RemoteLocation),
    Failed(TransferError),
}

impl TaskState {
    pub fn status(&self) -> TaskStatus {
        match self {
            TaskState::Queued => TaskStatus::Queued,
            TaskState::InProgress => TaskStatus::InProgress,
            TaskState::Completed(_) => TaskStatus::Completed,
            TaskState::Failed(_) => TaskStatus::Failed,
        }
    }
}

/// 单个文件的上传任务
///
/// - 只有任务自己修改自己的字段
/// - 同一时刻只会被编排器的一次回调修改
/// - id 在重试之间保持不变
#[derive(Debug)]
pub struct UploadTask {
    id: TaskId,
    file: CandidateFile,
    destination: BucketId,
    state: TaskState,
    progress: u8,
    attempt: u32,
    cancel_handle: Option<CancelHandle>,
}

impl UploadTask {
    /// 创建排队中的任务
    pub fn new(id: TaskId, file: CandidateFile, destination: BucketId) -> Self {
        Self {
            id,
            file,
            destination,
            state: TaskState::Queued,
            progress: 0,
            attempt: 0,
            cancel_handle: None,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn file(&self) -> &CandidateFile {
        &self.file
    }

    pub fn destination(&self) -> &BucketId {
        &self.destination
    }

    pub fn state(&self) -> &TaskState {
        &self.state
    }

    pub fn status(&self) -> TaskStatus {
        self.state.status()
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress
    }

    /// 已发起的传输次数
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    pub fn result_location(&self) -> Option<&RemoteLocation> {
        match &self.state {
            TaskState::Completed(location) => Some(location),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<String> {
        match &self.state {
            TaskState::Failed(error) => Some(error.to_string()),
            _ => None,
        }
    }

    /// 启动传输
    ///
    /// 只允许在 Queued 或 Failed 状态调用，否则返回 `AlreadyStarted`
    pub fn start(
        &mut self,
        transport: &dyn Transport,
        events: &UnboundedSender<TransportEvent>,
    ) -> AppResult<()> {
        match self.state {
            TaskState::Queued | TaskState::Failed(_) => {
                self.begin_attempt(transport, events);
                Ok(())
            }
            _ => Err(UploadError::AlreadyStarted {
                id: self.id,
                state: self.status(),
            }),
        }
    }

    /// 重试失败的任务
    ///
    /// 只允许在 Failed 状态调用，否则返回 `InvalidState` 且不修改任何字段
    pub fn retry(
        &mut self,
        transport: &dyn Transport,
        events: &UnboundedSender<TransportEvent>,
    ) -> AppResult<()> {
        if !matches!(self.state, TaskState::Failed(_)) {
            return Err(UploadError::InvalidState {
                id: self.id,
                state: self.status(),
            });
        }

        info!("[任务 {}] 🔁 重试上传: {}", self.id, self.file.name);
        self.begin_attempt(transport, events);
        Ok(())
    }

    fn begin_attempt(
        &mut self,
        transport: &dyn Transport,
        events: &UnboundedSender<TransportEvent>,
    ) {
        self.attempt += 1;
        self.progress = 0;
        self.state = TaskState::InProgress;

        debug!(
            "[任务 {}] 第 {} 次传输 → {}",
            self.id, self.attempt, self.destination
        );

        let reporter = TransferReporter::new(self.id, self.attempt, events.clone());
        self.cancel_handle = Some(transport.send(&self.destination, &self.file, reporter));
    }

    /// 处理进度回调
    ///
    /// 越界的值被截断到 [0, 100]，比当前小的值被忽略。
    /// 返回新的进度（没有变化时返回 `None`）
    pub fn on_progress(&mut self, attempt: u32, raw_percent: i64) -> Option<u8> {
        if !self.accepts(attempt) {
            return None;
        }

        let percent = raw_percent.clamp(0, 100) as u8;
        if percent <= self.progress {
            return None;
        }

        self.progress = percent;
        Some(percent)
    }

    /// 处理完成回调，返回是否改变了状态
    pub fn on_finished(
        &mut self,
        attempt: u32,
        result: Result<RemoteLocation, TransferError>,
    ) -> bool {
        if !self.accepts(attempt) {
            return false;
        }

        self.cancel_handle = None;
        match result {
            Ok(location) => {
                info!(
                    "[任务 {}] ✓ 上传完成: {} → {}",
                    self.id, self.file.name, location.remote_path
                );
                self.progress = 100;
                self.state = TaskState::Completed(location);
            }
            Err(error) => {
                warn!("[任务 {}] ❌ 上传失败: {} ({})", self.id, self.file.name, error);
                self.state = TaskState::Failed(error);
            }
        }
        true
    }

    /// 尽力取消正在进行的传输，返回是否发出了取消请求
    pub fn cancel(&self, transport: &dyn Transport) -> bool {
        match (&self.state, &self.cancel_handle) {
            (TaskState::InProgress, Some(handle)) => {
                transport.cancel(handle);
                true
            }
            _ => false,
        }
    }

    /// 只接受当前这次传输、且仍在进行中的回调
    fn accepts(&self, attempt: u32) -> bool {
        if attempt != self.attempt {
            debug!(
                "[任务 {}] 丢弃旧传输 (第 {} 次) 的回调，当前为第 {} 次",
                self.id, attempt, self.attempt
            );
            return false;
        }
        matches!(self.state, TaskState::InProgress)
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            id: self.id,
            file_name: self.file.name.clone(),
            size_bytes: self.file.size_bytes,
            content_type: self.file.content_type.clone(),
            status: self.status(),
            progress_percent: self.progress,
            attempts: self.attempt,
            result_location: self.result_location().cloned(),
            error_message: self.error_message(),
        }
    }
}
