//! # Upload Orchestrator
//!
//! 客户端多文件上传编排：校验 → 传输 → 逐文件跟踪结果
//!
//! ## 架构设计
//!
//! 本系统采用严格的分层架构：
//!
//! ### ① 数据层（Models）
//! - `models/` - 策略表、候选文件、任务快照
//! - `load_policy_table` - 启动时加载一次的类别策略
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 无状态能力
//! - `validate` - 按策略划分接受 / 拒绝（纯函数）
//! - `ReportWriter` - 写上传报告
//!
//! ### ③ 基础设施层（Infrastructure）
//! - `infrastructure/` - 与存储后端通信，只暴露 send / cancel
//! - `LocalDirTransport` / `HttpTransport` / `ManualTransport`
//!
//! ### ④ 流程层（Workflow）
//! - `workflow/` - 定义"一个文件"的上传生命周期
//! - `UploadTask` - 状态机（Queued → InProgress → Completed | Failed）
//!
//! ### ⑤ 编排层（Orchestration）
//! - `orchestrator/upload_orchestrator` - 任务登记表，唯一修改任务状态的地方
//! - `orchestrator/upload_runner` - 目录批量上传程序
//!
//! ## 错误约定
//!
//! - 校验失败：不创建任务，发布 `UploadNotice::Rejected`
//! - 传输失败：记录在任务上（`error_message`），不影响其他任务
//! - API 误用：返回 `UploadError`

pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{Config, TransportKind};
pub use error::{AppResult, RejectionReason, TransferError, UploadError};
pub use infrastructure::{
    CancelHandle, HttpTransport, LocalDirTransport, ManualTransport, TransferReporter, Transport,
};
pub use models::{CandidateFile, Policy, PolicyTable, RemoteLocation, TaskId, TaskSnapshot, TaskStatus};
pub use orchestrator::{batch_settled, App, UploadNotice, UploadOrchestrator};
pub use workflow::{TaskState, UploadTask};
