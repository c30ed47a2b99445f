use crate::models::file::CandidateFile;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::fs;

/// 扫描文件夹中的所有普通文件，按文件名排序后转换为候选文件
///
/// 无法读取的单个文件只记录警告并跳过。
pub async fn scan_upload_folder(folder_path: &str) -> Result<Vec<CandidateFile>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        anyhow::bail!("文件夹不存在: {}", folder_path);
    }

    let mut paths = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .with_context(|| format!("无法读取文件夹: {}", folder_path))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await?.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        match CandidateFile::from_path(&path).await {
            Ok(file) => {
                tracing::debug!(
                    "发现文件: {} ({} 字节, {})",
                    file.name,
                    file.size_bytes,
                    file.content_type
                );
                files.push(file);
            }
            Err(e) => {
                tracing::warn!("读取文件失败 {}: {}", path.display(), e);
            }
        }
    }

    Ok(files)
}
