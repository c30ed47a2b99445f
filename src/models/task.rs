//! 上传任务的只读视图类型

use std::fmt::Display;

use serde::Serialize;

/// 任务标识
///
/// 由编排器单调分配，重试时保持不变。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 任务状态（不含数据）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TaskStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
}

impl TaskStatus {
    /// 是否已离开进行中状态
    pub fn is_settled(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            TaskStatus::Queued => "排队中",
            TaskStatus::InProgress => "上传中",
            TaskStatus::Completed => "已完成",
            TaskStatus::Failed => "失败",
        };
        f.write_str(text)
    }
}

/// 上传成功后的远端位置
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteLocation {
    pub remote_url: String,
    pub remote_path: String,
}

/// 任务快照，供渲染使用
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub file_name: String,
    pub size_bytes: u64,
    pub content_type: String,
    pub status: TaskStatus,
    pub progress_percent: u8,
    /// 已发起的传输次数（首次 + 重试）
    pub attempts: u32,
    pub result_location: Option<RemoteLocation>,
    pub error_message: Option<String>,
}
