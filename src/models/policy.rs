//! 上传策略表
//!
//! 类别 → { 最大文件大小, 允许的 MIME 类型, 目标存储桶 }
//! 进程启动时加载一次，之后只读。

use std::collections::HashMap;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::error::{AppResult, UploadError};

/// 存储桶标识（对编排层不透明）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BucketId(String);

impl BucketId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for BucketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 单个类别的上传策略
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// 最大文件大小（字节）
    pub max_size_bytes: u64,
    /// 允许的 MIME 类型，保持配置中的顺序
    pub allowed_content_types: Vec<String>,
    /// 目标存储桶
    pub destination: BucketId,
}

impl Policy {
    pub fn new(
        max_size_bytes: u64,
        allowed_content_types: &[&str],
        destination: impl Into<String>,
    ) -> Self {
        Self {
            max_size_bytes,
            allowed_content_types: allowed_content_types
                .iter()
                .map(|s| s.to_string())
                .collect(),
            destination: BucketId::new(destination),
        }
    }

    /// 判断内容类型是否被允许（忽略大小写和 MIME 参数）
    pub fn allows(&self, content_type: &str) -> bool {
        let normalized = normalize_content_type(content_type);
        self.allowed_content_types
            .iter()
            .any(|allowed| normalize_content_type(allowed) == normalized)
    }
}

/// 去掉 `; charset=...` 之类的参数并转为小写
pub fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// 策略表
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyTable {
    categories: HashMap<String, Policy>,
}

impl PolicyTable {
    /// 从已有映射构建，同时校验每个策略
    pub fn from_map(categories: HashMap<String, Policy>) -> AppResult<Self> {
        let table = Self { categories };
        table.check()?;
        Ok(table)
    }

    /// 内置默认策略
    pub fn builtin() -> Self {
        let mut categories = HashMap::new();
        categories.insert(
            "images".to_string(),
            Policy::new(
                10 * 1024 * 1024,
                &["image/png", "image/jpeg", "image/gif", "image/webp"],
                "images",
            ),
        );
        categories.insert(
            "videos".to_string(),
            Policy::new(
                500 * 1024 * 1024,
                &["video/mp4", "video/webm", "video/quicktime"],
                "videos",
            ),
        );
        categories.insert(
            "documents".to_string(),
            Policy::new(
                25 * 1024 * 1024,
                &["application/pdf", "text/plain", "application/zip"],
                "documents",
            ),
        );
        Self { categories }
    }

    /// 查找类别对应的策略
    pub fn policy_for(&self, category: &str) -> AppResult<&Policy> {
        self.categories
            .get(category)
            .ok_or_else(|| UploadError::UnknownCategory(category.to_string()))
    }

    /// 已注册的类别（排序后）
    pub fn categories(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.categories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub(crate) fn check(&self) -> AppResult<()> {
        for (name, policy) in &self.categories {
            if policy.max_size_bytes == 0 {
                return Err(UploadError::PolicyLoad(format!(
                    "类别 {} 的 max_size_bytes 必须大于 0",
                    name
                )));
            }
            if policy.allowed_content_types.is_empty() {
                return Err(UploadError::PolicyLoad(format!(
                    "类别 {} 未配置任何允许的内容类型",
                    name
                )));
            }
        }
        Ok(())
    }
}
