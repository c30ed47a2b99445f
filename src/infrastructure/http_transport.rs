//! HTTP 传输 - 基础设施层
//!
//! 以 `PUT <base_url>/<bucket>/<key>` 上传，请求体按块流式发送，
//! 每块被读取时回报进度

use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use serde::Deserialize;
use tracing::debug;

use crate::error::TransferError;
use crate::infrastructure::transport::{
    object_key, open_checked_body, percent_of, CancelHandle, TransferReporter, Transport,
};
use crate::models::{BodyStream, BucketId, CandidateFile, RemoteLocation};

/// 服务端可选返回的位置信息
#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: Option<String>,
    path: Option<String>,
}

/// HTTP 存储后端客户端
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    chunk_size: usize,
}

impl HttpTransport {
    /// 创建 HTTP 传输
    ///
    /// `timeout` 为整个请求的超时，超时后任务以网络错误失败
    pub fn new(
        base_url: impl Into<String>,
        chunk_size: usize,
        timeout: Option<Duration>,
    ) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            chunk_size: chunk_size.max(1),
        })
    }

    fn endpoint(&self, remote_path: &str) -> String {
        format!("{}/{}", self.base_url, remote_path)
    }
}

impl Transport for HttpTransport {
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
        let request = PutRequest {
            client: self.client.clone(),
            url: self.endpoint(&remote_path),
            remote_path,
            file: file.clone(),
            chunk_size: self.chunk_size,
        };

        tokio::spawn(async move {
            let result = tokio::select! {
                _ = token.cancelled() => Err(TransferError::Cancelled),
                result = request.execute(&reporter) => result,
            };
            reporter.complete(result);
        });

        handle
    }
}

struct PutRequest {
    client: reqwest::Client,
    url: String,
    remote_path: String,
    file: CandidateFile,
    chunk_size: usize,
}

impl PutRequest {
    async fn execute(self, reporter: &TransferReporter) -> Result<RemoteLocation, TransferError> {
        let body = open_checked_body(&self.file, self.chunk_size).await?;
        let total = self.file.size_bytes;

        debug!("PUT {} ({} 字节)", self.url, total);
        reporter.progress(0);

        let response = self
            .client
            .put(&self.url)
            .header(reqwest::header::CONTENT_TYPE, &self.file.content_type)
            .header(reqwest::header::CONTENT_LENGTH, total)
            .body(reqwest::Body::wrap_stream(progress_stream(
                body,
                total,
                reporter.clone(),
            )))
            .send()
            .await
            .map_err(|e| TransferError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TransferError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(TransferError::ServerRejected {
                status: Some(status.as_u16()),
                message: if text.is_empty() {
                    status.to_string()
                } else {
                    text
                },
            });
        }

        let parsed: Option<UploadResponse> = serde_json::from_str(&text).ok();
        let (url, path) = match parsed {
            Some(UploadResponse { url, path }) => (url, path),
            None => (None, None),
        };

        Ok(RemoteLocation {
            remote_url: url.unwrap_or(self.url),
            remote_path: path.unwrap_or(self.remote_path),
        })
    }
}

/// 内容流每被 HTTP 客户端拉取一块，按实际读取的字节数回报累计进度
fn progress_stream(
    body: BodyStream,
    total: u64,
    reporter: TransferReporter,
) -> impl futures::Stream<Item = Result<Bytes, std::io::Error>> + Send + Sync + 'static {
    let mut sent = 0u64;
    body.map(move |chunk| {
        let chunk = chunk?;
        sent += chunk.len() as u64;
        reporter.progress(percent_of(sent, total));
        Ok(chunk)
    })
}
