//! 日志工具模块
//!
//! 提供日志初始化和运行摘要输出的辅助函数

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// 初始化日志
///
/// 默认级别 info，可通过 `RUST_LOG` 覆盖；重复调用不会报错
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批量上传模式");
    info!("📂 类别: {} | 传输方式: {:?}", config.category, config.transport);
    info!(
        "📊 批量上限: {} | 重试轮数: {}",
        config.max_batch_size, config.max_retries
    );
    info!("{}", "=".repeat(60));
}

/// 记录文件加载信息
///
/// # 参数
/// - `total`: 文件总数
/// - `batch_size`: 每批数量
pub fn log_files_loaded(total: usize, batch_size: usize) {
    info!("✓ 找到 {} 个待上传的文件", total);
    info!("📋 将以每批 {} 个的方式上传", batch_size);
    info!("💡 每批完成后再开始下一批\n");
}

/// 记录批次开始信息
pub fn log_batch_start(batch_num: usize, total_batches: usize, files: usize) {
    info!("\n{}", "=".repeat(60));
    info!(
        "📦 开始上传第 {}/{} 批 ({} 个文件)",
        batch_num, total_batches, files
    );
    info!("{}", "=".repeat(60));
}

/// 记录批次结束信息
pub fn log_batch_settled(batch_num: usize, success: usize, failed: usize, rejected: usize) {
    info!("\n{}", "─".repeat(60));
    info!(
        "✓ 第 {} 批完成: 成功 {} | 失败 {} | 拒绝 {}",
        batch_num, success, failed, rejected
    );
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `success`: 成功数量
/// - `failed`: 失败数量
/// - `rejected`: 校验未通过的数量
/// - `total`: 总数
/// - `report_file_path`: 报告文件路径
pub fn print_final_stats(
    success: usize,
    failed: usize,
    rejected: usize,
    total: usize,
    report_file_path: &str,
) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部上传完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", success, total);
    info!("❌ 失败: {}", failed);
    info!("🚫 拒绝: {}", rejected);
    info!("{}", "=".repeat(60));
    info!("\n报告已保存至: {}", report_file_path);
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("短文件名.png", 20), "短文件名.png");
        assert_eq!(truncate_text("一二三四五", 3), "一二三...");
    }
}
