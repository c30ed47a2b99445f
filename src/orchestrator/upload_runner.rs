//! 目录批量上传 - 编排层
//!
//! ## 职责
//!
//! 本模块是命令行程序的入口，负责把一个目录里的文件全部上传。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：写报告头、加载策略表、构建传输层
//! 2. **批量加载**：扫描待上传目录（`Vec<CandidateFile>`）
//! 3. **分批提交**：每批不超过批量上限，整批结束后再开始下一批
//! 4. **失败重试**：按 `max_retries` 重试失败任务
//! 5. **全局统计**：汇总成功 / 失败 / 拒绝数量并写入报告

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{error, info, warn};

use crate::config::{Config, TransportKind};
use crate::infrastructure::{HttpTransport, LocalDirTransport, Transport};
use crate::models::{self, CandidateFile, TaskId, TaskStatus};
use crate::orchestrator::upload_orchestrator::{batch_settled, UploadNotice, UploadOrchestrator};
use crate::services::ReportWriter;
use crate::utils::logging;

/// 应用主结构
pub struct App {
    config: Config,
    orchestrator: UploadOrchestrator,
    notices: UnboundedReceiver<UploadNotice>,
    report: ReportWriter,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        let report = ReportWriter::with_path(&config.report_file);
        report.init()?;

        logging::log_startup(&config);

        let policies = models::load_policy_table(Path::new(&config.policy_file)).await?;
        // 提前发现类别配置错误，而不是扫描完目录之后
        policies.policy_for(&config.category)?;

        let transport = build_transport(&config)?;
        let (orchestrator, notices) =
            UploadOrchestrator::new(policies, transport, config.max_batch_size);

        Ok(Self {
            config,
            orchestrator,
            notices,
            report,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&mut self) -> Result<RunStats> {
        info!("\n📁 正在扫描待上传目录: {}", self.config.upload_folder);
        let files = models::scan_upload_folder(&self.config.upload_folder).await?;

        if files.is_empty() {
            warn!("⚠️ 没有找到待上传的文件，程序结束");
            return Ok(RunStats::default());
        }

        let batch_size = self.config.max_batch_size.max(1);
        logging::log_files_loaded(files.len(), batch_size);

        let mut stats = RunStats {
            total: files.len(),
            ..Default::default()
        };
        let total_batches = files.len().div_ceil(batch_size);

        for (index, batch) in files.chunks(batch_size).enumerate() {
            let batch_num = index + 1;
            logging::log_batch_start(batch_num, total_batches, batch.len());

            let result = self.process_batch(batch.to_vec()).await?;
            logging::log_batch_settled(batch_num, result.success, result.failed, result.rejected);

            stats.success += result.success;
            stats.failed += result.failed;
            stats.rejected += result.rejected;
        }

        logging::print_final_stats(
            stats.success,
            stats.failed,
            stats.rejected,
            stats.total,
            self.report.path(),
        );

        Ok(stats)
    }

    /// 处理单个批次：提交 → 等待结束 → 重试 → 写报告 → 移除
    async fn process_batch(&mut self, files: Vec<CandidateFile>) -> Result<BatchResult> {
        let created = self.orchestrator.submit(files, &self.config.category)?;
        let ids: Vec<TaskId> = created.iter().map(|task| task.id).collect();

        let mut result = BatchResult::default();
        self.wait_settled(&ids, &mut result).await;

        for round in 1..=self.config.max_retries {
            let failed: Vec<TaskId> = self
                .orchestrator
                .all_tasks()
                .into_iter()
                .filter(|task| ids.contains(&task.id) && task.status == TaskStatus::Failed)
                .map(|task| task.id)
                .collect();
            if failed.is_empty() {
                break;
            }

            info!("🔁 第 {} 轮重试: {} 个失败任务", round, failed.len());
            for id in failed {
                if let Err(e) = self.orchestrator.retry_task(id) {
                    error!("[任务 {}] 重试失败: {}", id, e);
                }
            }
            self.wait_settled(&ids, &mut result).await;
        }

        for id in &ids {
            // 写入报告后移除，登记表不会跨批次增长
            let snapshot = self.orchestrator.remove_task(*id)?;
            match snapshot.status {
                TaskStatus::Completed => result.success += 1,
                _ => result.failed += 1,
            }
            self.report.write(&snapshot)?;
        }
        self.drain_notices(&mut result);

        Ok(result)
    }

    async fn wait_settled(&mut self, ids: &[TaskId], result: &mut BatchResult) {
        while !batch_settled(ids, &self.orchestrator.all_tasks()) {
            if !self.orchestrator.process_next().await {
                break;
            }
            self.drain_notices(result);
        }
        self.drain_notices(result);
    }

    fn drain_notices(&mut self, result: &mut BatchResult) {
        while let Ok(notice) = self.notices.try_recv() {
            match notice {
                UploadNotice::Rejected { file_name, reason } => {
                    result.rejected += 1;
                    info!(
                        "🚫 已拒绝: {} ({})",
                        logging::truncate_text(&file_name, 40),
                        reason
                    );
                    if let Err(e) = self.report.write_rejection(&file_name, &reason.to_string()) {
                        error!("写入报告失败: {}", e);
                    }
                }
                UploadNotice::Progress { id, percent } if self.config.verbose_logging => {
                    info!("[任务 {}] 进度 {}%", id, percent);
                }
                _ => {}
            }
        }
    }
}

/// 根据配置构建传输层
pub fn build_transport(config: &Config) -> Result<Arc<dyn Transport>> {
    match config.transport {
        TransportKind::Local => {
            info!("🗂️ 使用本地目录传输: {}", config.bucket_root);
            Ok(Arc::new(LocalDirTransport::new(
                &config.bucket_root,
                config.chunk_size,
            )))
        }
        TransportKind::Http => {
            info!("🌐 使用 HTTP 传输: {}", config.http_base_url);
            let timeout = (config.http_timeout_secs > 0)
                .then(|| Duration::from_secs(config.http_timeout_secs));
            let transport =
                HttpTransport::new(config.http_base_url.clone(), config.chunk_size, timeout)
                    .context("构建 HTTP 客户端失败")?;
            Ok(Arc::new(transport))
        }
    }
}

/// 运行统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub rejected: usize,
}

/// 批次处理结果
#[derive(Debug, Default)]
struct BatchResult {
    success: usize,
    failed: usize,
    rejected: usize,
}
