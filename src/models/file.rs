//! 候选文件
//!
//! 由调用方（文件选择器、拖拽事件、目录扫描）创建，本子系统只读。

use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use anyhow::{Context, Result};
use bytes::Bytes;
use futures::stream::{self, Stream};
use tokio::fs;
use tokio_util::io::ReaderStream;

/// 按块读取的文件内容
pub type BodyStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send + Sync>>;

/// 文件内容的句柄
#[derive(Debug, Clone)]
pub enum FileBody {
    /// 已在内存中的内容
    Memory(Bytes),
    /// 磁盘上的文件，由传输层按需读取
    Disk(PathBuf),
}

impl FileBody {
    /// 内容的实际长度，磁盘文件读取元数据
    pub async fn byte_len(&self) -> io::Result<u64> {
        match self {
            FileBody::Memory(bytes) => Ok(bytes.len() as u64),
            FileBody::Disk(path) => fs::metadata(path).await.map(|m| m.len()),
        }
    }

    /// 以 `chunk_size` 为单位流式读取内容
    ///
    /// 磁盘文件经 `ReaderStream` 边读边发，不会整体载入内存。
    pub async fn open_stream(&self, chunk_size: usize) -> io::Result<BodyStream> {
        let chunk_size = chunk_size.max(1);
        match self {
            FileBody::Memory(bytes) => {
                let chunks: Vec<io::Result<Bytes>> = (0..bytes.len())
                    .step_by(chunk_size)
                    .map(|start| Ok(bytes.slice(start..(start + chunk_size).min(bytes.len()))))
                    .collect();
                Ok(Box::pin(stream::iter(chunks)))
            }
            FileBody::Disk(path) => {
                let file = fs::File::open(path).await?;
                Ok(Box::pin(ReaderStream::with_capacity(file, chunk_size)))
            }
        }
    }
}

/// 候选上传文件
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub name: String,
    pub size_bytes: u64,
    pub content_type: String,
    pub body: FileBody,
}

impl CandidateFile {
    /// 使用内存中的内容创建
    pub fn from_bytes(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            size_bytes: bytes.len() as u64,
            content_type: content_type.into(),
            body: FileBody::Memory(bytes),
        }
    }

    /// 只有元数据、内容为空的文件（大小由调用方声明）
    ///
    /// 仅用于校验阶段描述大文件，校验只看 `size_bytes`。
    /// 内容与声明的大小不一致，真正交给传输层时会以 `ServerRejected` 失败。
    pub fn declared(
        name: impl Into<String>,
        size_bytes: u64,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            size_bytes,
            content_type: content_type.into(),
            body: FileBody::Memory(Bytes::new()),
        }
    }

    /// 从磁盘路径创建，内容类型根据扩展名推断
    pub async fn from_path(path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path)
            .await
            .with_context(|| format!("无法读取文件信息: {}", path.display()))?;

        let name = path
            .file_name()
            .context("无效的文件名")?
            .to_string_lossy()
            .to_string();

        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string();

        Ok(Self {
            name,
            size_bytes: metadata.len(),
            content_type,
            body: FileBody::Disk(path.to_path_buf()),
        })
    }
}
