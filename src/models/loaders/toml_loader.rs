use crate::models::policy::PolicyTable;
use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

/// 从 TOML 文件加载策略表
///
/// 文件格式：
///
/// ```toml
/// [categories.images]
/// max_size_bytes = 10485760
/// allowed_content_types = ["image/png", "image/jpeg"]
/// destination = "images"
/// ```
///
/// 文件不存在时返回内置策略表。
pub async fn load_policy_table(toml_file_path: &Path) -> Result<PolicyTable> {
    if !fs::try_exists(toml_file_path).await.unwrap_or(false) {
        tracing::info!(
            "策略文件 {} 不存在，使用内置策略",
            toml_file_path.display()
        );
        return Ok(PolicyTable::builtin());
    }

    let content = fs::read_to_string(toml_file_path)
        .await
        .with_context(|| format!("无法读取策略文件: {}", toml_file_path.display()))?;

    let table = parse_policy_table(&content)
        .with_context(|| format!("无法解析策略文件: {}", toml_file_path.display()))?;

    tracing::info!(
        "成功加载 {} 个上传类别: {:?}",
        table.categories().len(),
        table.categories()
    );

    Ok(table)
}

/// 解析并校验策略表文本
pub fn parse_policy_table(content: &str) -> Result<PolicyTable> {
    let table: PolicyTable = toml::from_str(content)?;
    table.check()?;
    Ok(table)
}
