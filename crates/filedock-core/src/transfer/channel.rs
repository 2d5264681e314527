//! 单文件上传通道
//!
//! 一次 `open` 对应一次 multipart `POST /api/upload`：
//! 流式发送文件内容并汇报进度，最终得到 [`TransferOutcome`]。
//!
//! 通道不会向外返回错误，成功和失败都汇入同一个结果，
//! 上传队列因此总能继续处理下一个文件。

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use log::{debug, error, info, warn};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::io;
use std::sync::Arc;
use tokio_util::bytes::Bytes;
use tokio_util::io::ReaderStream;

use super::{ProgressEvent, Transfer, TransferOutcome, UploadSource};
use crate::api::{ApiClient, UploadResponse};

/// 无法得到具体错误信息时的通用提示
pub const GENERIC_FAILURE: &str = "Upload Failed";

/// 短于该长度的非 JSON 响应体会原样作为错误信息
const MAX_RAW_MESSAGE_CHARS: usize = 100;

const CHUNK_SIZE: usize = 64 * 1024;

/// 进度回调
#[derive(Clone)]
pub struct ProgressSink {
    inner: Arc<dyn Fn(ProgressEvent) + Send + Sync>,
}

impl ProgressSink {
    pub fn new(f: impl Fn(ProgressEvent) + Send + Sync + 'static) -> Self {
        Self { inner: Arc::new(f) }
    }

    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    pub fn report(&self, event: ProgressEvent) {
        (self.inner)(event)
    }
}

impl std::fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ProgressSink")
    }
}

/// 上传通道
#[async_trait]
pub trait TransferChannel: Send + Sync + 'static {
    /// 上传一个文件，期间通过 `progress` 汇报零次或多次进度
    async fn open(&self, transfer: &Transfer, progress: ProgressSink) -> TransferOutcome;
}

/// 基于 HTTP multipart 的上传通道
#[derive(Debug, Clone)]
pub struct HttpTransferChannel {
    api: ApiClient,
    chunk_size: usize,
}

impl HttpTransferChannel {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            chunk_size: CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// 打开数据源并包装为计数的字节流
    async fn counted_body(
        &self,
        source: &UploadSource,
        progress: ProgressSink,
    ) -> io::Result<(reqwest::Body, u64)> {
        let (chunks, total): (BoxStream<'static, io::Result<Bytes>>, u64) = match source {
            UploadSource::Path(path) => {
                let file = tokio::fs::File::open(path).await?;
                let total = file.metadata().await?.len();
                (
                    ReaderStream::with_capacity(file, self.chunk_size).boxed(),
                    total,
                )
            }
            UploadSource::Memory { data, .. } => {
                let pieces: Vec<io::Result<Bytes>> = data
                    .chunks(self.chunk_size)
                    .map(|c| Ok(Bytes::copy_from_slice(c)))
                    .collect();
                (stream::iter(pieces).boxed(), data.len() as u64)
            }
        };

        // 累计值单调递增
        let mut sent: u64 = 0;
        let counted = chunks.map(move |chunk| {
            if let Ok(bytes) = &chunk {
                sent += bytes.len() as u64;
                progress.report(ProgressEvent::new(sent, total));
            }
            chunk
        });

        Ok((reqwest::Body::wrap_stream(counted), total))
    }
}

#[async_trait]
impl TransferChannel for HttpTransferChannel {
    async fn open(&self, transfer: &Transfer, progress: ProgressSink) -> TransferOutcome {
        let name = &transfer.display_name;

        let (body, total) = match self.counted_body(&transfer.source, progress).await {
            Ok(v) => v,
            Err(e) => {
                warn!("Cannot read upload source {}: {}", name, e);
                return TransferOutcome::failure(format!("Cannot read {}: {}", name, e));
            }
        };

        let mime = mime_guess::from_path(name).first_or_octet_stream();
        let part = match Part::stream_with_length(body, total)
            .file_name(name.clone())
            .mime_str(mime.as_ref())
        {
            Ok(part) => part,
            Err(e) => {
                error!("Invalid MIME type {} for {}: {}", mime, name, e);
                return TransferOutcome::failure(GENERIC_FAILURE);
            }
        };
        let form = Form::new().part("file", part);

        info!("Uploading {} ({} bytes) as {}", name, total, transfer.id);

        match self
            .api
            .http()
            .post(self.api.upload_url())
            .multipart(form)
            .send()
            .await
        {
            Ok(response) => {
                let status = response.status().as_u16();
                let body = response.text().await.ok();
                debug!("Upload {} finished with status {}", transfer.id, status);
                derive_outcome(Some(status), body.as_deref())
            }
            Err(e) => {
                warn!("Upload {} failed before a response arrived: {}", transfer.id, e);
                derive_outcome(None, None)
            }
        }
    }
}

/// 由状态码和响应体推导上传结果
///
/// `status` 为 `None` 表示传输层失败、未收到响应。
pub fn derive_outcome(status: Option<u16>, body: Option<&str>) -> TransferOutcome {
    let text = body.unwrap_or_default();

    if status == Some(200) {
        return match serde_json::from_str::<UploadResponse>(text) {
            Ok(response) => TransferOutcome::success(response.url),
            Err(e) => {
                error!("Malformed upload response: {}. Body: {}", e, text);
                TransferOutcome::failure(GENERIC_FAILURE)
            }
        };
    }

    TransferOutcome::failure(error_message(text))
}

fn error_message(text: &str) -> String {
    if text.trim().is_empty() {
        return GENERIC_FAILURE.to_string();
    }

    match serde_json::from_str::<Value>(text) {
        Ok(json) => match json.get("detail") {
            Some(Value::String(detail)) if !detail.is_empty() => detail.clone(),
            Some(Value::Object(detail)) => detail
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| GENERIC_FAILURE.to_string()),
            _ => GENERIC_FAILURE.to_string(),
        },
        Err(_) if text.chars().count() < MAX_RAW_MESSAGE_CHARS => text.to_string(),
        Err(_) => GENERIC_FAILURE.to_string(),
    }
}
