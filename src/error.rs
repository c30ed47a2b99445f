use serde::Serialize;
use thiserror::Error;

use crate::models::{TaskId, TaskStatus};

/// 调用方误用 API 时返回的错误
///
/// 这些错误不是数据相关的失败，而是调用约定被破坏，
/// 因此直接作为 `Err` 抛给调用方，不会记录在任务上。
#[derive(Debug, Error)]
pub enum UploadError {
    /// 类别未在策略表中注册
    #[error("未知的上传类别: {0}")]
    UnknownCategory(String),

    /// 任务不存在（可能已被移除）
    #[error("任务不存在: {0}")]
    TaskNotFound(TaskId),

    /// 当前状态不允许该操作（如对非失败任务重试）
    #[error("任务 {id} 当前状态为 {state}，不允许该操作")]
    InvalidState { id: TaskId, state: TaskStatus },

    /// 任务已经启动
    #[error("任务 {id} 已启动 (状态: {state})")]
    AlreadyStarted { id: TaskId, state: TaskStatus },

    /// 策略表加载或校验失败
    #[error("策略表加载失败: {0}")]
    PolicyLoad(String),
}

/// 传输阶段的失败原因
///
/// 记录在所属任务上，不会中断同批次的其他任务。
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum TransferError {
    /// 网络错误
    #[error("网络错误: {0}")]
    Network(String),

    /// 服务端拒绝（包括服务端再次校验大小/类型失败）
    #[error("服务端拒绝 (状态码: {status:?}): {message}")]
    ServerRejected {
        status: Option<u16>,
        message: String,
    },

    /// 上传被取消
    #[error("上传已取消")]
    Cancelled,
}

/// 校验阶段的拒绝原因，不会创建任务
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RejectionReason {
    FileTooLarge,
    UnsupportedType,
    BatchLimitExceeded,
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            RejectionReason::FileTooLarge => "文件超过大小限制",
            RejectionReason::UnsupportedType => "不支持的文件类型",
            RejectionReason::BatchLimitExceeded => "超过批量上传数量上限",
        };
        write!(f, "{}", text)
    }
}

// ========== Result 类型别名 ==========

/// 上传编排结果类型
pub type AppResult<T> = Result<T, UploadError>;
