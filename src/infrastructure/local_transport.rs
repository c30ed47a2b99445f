//! 本地目录传输 - 基础设施层
//!
//! 把文件分块写入 `<root>/<bucket>/<object_key>`，每写完一块回报一次进度

use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::TransferError;
use crate::infrastructure::transport::{
    object_key, open_checked_body, percent_of, size_mismatch, CancelHandle, TransferReporter,
    Transport,
};
use crate::models::{BodyStream, BucketId, CandidateFile, RemoteLocation};

/// 本地目录传输
///
/// 把存储桶映射为 `root` 下的子目录，适合离线运行和测试。
#[derive(Debug, Clone)]
pub struct LocalDirTransport {
    root: PathBuf,
    chunk_size: usize,
}

impl LocalDirTransport {
    pub fn new(root: impl Into<PathBuf>, chunk_size: usize) -> Self {
        Self {
            root: root.into(),
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Transport for LocalDirTransport {
    fn send(
        &self,
        bucket: &BucketId,
        file: &CandidateFile,
        reporter: TransferReporter,
    ) -> CancelHandle {
        let handle = CancelHandle::new();
        let token = handle.token().clone();
        let key = object_key(reporter.task_id(), reporter.attempt(), &file.name);
        let remote_path = format!("{}/{}", bucket, key);
        let job = StoreJob {
            bucket_dir: self.root.join(bucket.as_str()),
            target: self.root.join(&remote_path),
            remote_path,
            file: file.clone(),
            chunk_size: self.chunk_size,
        };

        tokio::spawn(async move {
            let result = job.run(&token, &reporter).await;
            reporter.complete(result);
        });

        handle
    }
}

struct StoreJob {
    bucket_dir: PathBuf,
    target: PathBuf,
    remote_path: String,
    file: CandidateFile,
    chunk_size: usize,
}

impl StoreJob {
    async fn run(
        self,
        token: &CancellationToken,
        reporter: &TransferReporter,
    ) -> Result<RemoteLocation, TransferError> {
        let body = open_checked_body(&self.file, self.chunk_size).await?;
        fs::create_dir_all(&self.bucket_dir)
            .await
            .map_err(|e| TransferError::Network(format!("创建目录失败: {}", e)))?;

        // create_new: 目标已存在时失败，绝不覆盖别的任务写入的文件
        let out = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.target)
            .await
            .map_err(|e| TransferError::Network(format!("创建文件失败: {}", e)))?;

        // 文件是本次创建的，失败时删除写了一半的内容
        if let Err(e) = write_chunks(out, body, self.file.size_bytes, token, reporter).await {
            let _ = fs::remove_file(&self.target).await;
            return Err(e);
        }

        let absolute = fs::canonicalize(&self.target)
            .await
            .unwrap_or_else(|_| self.target.clone());
        Ok(RemoteLocation {
            remote_url: format!("file://{}", absolute.display()),
            remote_path: self.remote_path,
        })
    }
}

async fn write_chunks(
    mut out: fs::File,
    mut body: BodyStream,
    total: u64,
    token: &CancellationToken,
    reporter: &TransferReporter,
) -> Result<(), TransferError> {
    let mut written = 0u64;
    reporter.progress(0);

    while let Some(chunk) = body.next().await {
        if token.is_cancelled() {
            debug!("任务 {} 在写入 {} 字节后被取消", reporter.task_id(), written);
            return Err(TransferError::Cancelled);
        }
        let chunk = chunk.map_err(|e| TransferError::Network(format!("读取文件失败: {}", e)))?;
        written += chunk.len() as u64;
        // 读取过程中文件变大
        if written > total {
            return Err(size_mismatch(written, total));
        }
        out.write_all(&chunk)
            .await
            .map_err(|e| TransferError::Network(format!("写入失败: {}", e)))?;
        reporter.progress(percent_of(written, total));
        tokio::task::yield_now().await;
    }

    if written != total {
        return Err(size_mismatch(written, total));
    }
    out.flush()
        .await
        .map_err(|e| TransferError::Network(format!("写入失败: {}", e)))?;
    if total == 0 {
        reporter.progress(100);
    }
    Ok(())
}
