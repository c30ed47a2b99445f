//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责任务登记和批量调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `upload_orchestrator` - 上传编排器
//! - 按类别查策略、调用校验、为通过的文件创建任务
//! - 持有任务登记表，唯一能修改任务的地方
//! - 把传输回调逐个应用到任务上
//! - 重试 / 移除 / 快照
//!
//! ### `upload_runner` - 目录批量上传
//! - 管理应用生命周期（初始化、运行、报告）
//! - 扫描目录，按批量上限分批提交
//! - 等待每批结束，按配置重试失败任务
//! - 输出全局统计信息
//!
//! ## 层次关系
//!
//! ```text
//! upload_runner (处理整个目录)
//!     ↓
//! upload_orchestrator (处理 Vec<CandidateFile>)
//!     ↓
//! workflow::UploadTask (处理单个文件)
//!     ↓
//! services (能力层：validate / report)
//!     ↓
//! infrastructure (基础设施：Transport)
//! ```

pub mod upload_orchestrator;
pub mod upload_runner;

// 重新导出主要类型
pub use upload_orchestrator::{batch_settled, UploadNotice, UploadOrchestrator};
pub use upload_runner::{build_transport, App, RunStats};
