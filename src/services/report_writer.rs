//! 上传报告写入服务 - 业务能力层
//!
//! 只负责"写报告文件"能力，不关心流程

use anyhow::Result;
use std::fs::{self, OpenOptions};
use std::io::Write;
use tracing::debug;

use crate::models::TaskSnapshot;

/// 上传报告写入服务
///
/// 职责：
/// - 运行开始时写入报告头
/// - 每个任务写一行 JSON 快照
/// - 不关心任务是如何产生的
pub struct ReportWriter {
    report_file_path: String,
}

impl ReportWriter {
    /// 使用默认文件路径创建
    pub fn new() -> Self {
        Self {
            report_file_path: "upload_report.txt".to_string(),
        }
    }

    /// 使用自定义文件路径创建
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            report_file_path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.report_file_path
    }

    /// 初始化报告文件（覆盖旧内容）
    pub fn init(&self) -> Result<()> {
        let header = format!(
            "{}\n上传报告 - {}\n{}\n\n",
            "=".repeat(60),
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            "=".repeat(60)
        );
        fs::write(&self.report_file_path, header)?;
        Ok(())
    }

    /// 追加一个任务快照
    pub fn write(&self, snapshot: &TaskSnapshot) -> Result<()> {
        debug!(
            "写入报告: 任务 {} | 文件 {} | 状态 {}",
            snapshot.id, snapshot.file_name, snapshot.status
        );

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.report_file_path)?;

        let line = serde_json::to_string(snapshot)?;
        writeln!(file, "{}", line)?;

        Ok(())
    }

    /// 追加一条被拒绝文件的记录
    pub fn write_rejection(&self, file_name: &str, reason: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.report_file_path)?;

        writeln!(file, "已拒绝 | 文件 {} | 原因: {}", file_name, reason)?;

        Ok(())
    }
}

impl Default for ReportWriter {
    fn default() -> Self {
        Self::new()
    }
}
