//! 服务端 HTTP 接口客户端
//!
//! 对应服务端的以下接口：
//! - `POST /api/upload` (multipart，见 [`crate::transfer::HttpTransferChannel`])
//! - `GET /api/files`
//! - `DELETE /api/files/{id}`
//! - `POST /api/batch_delete`
//! - `GET /api/file-updates` (SSE)

mod types;

pub use types::{
    BatchDeleteRequest, BatchDeleteResponse, DeleteResponse, DeletedItem, FailedDeletion,
    UploadResponse,
};

use async_trait::async_trait;
use log::debug;
use std::time::Duration;

use crate::config::ClientSettings;
use crate::error::{Error, Result};
use crate::roster::RosterEntry;

/// 批量操作所依赖的服务端能力
#[async_trait]
pub trait HostingApi: Send + Sync {
    /// 获取完整文件列表
    async fn list_files(&self) -> Result<Vec<RosterEntry>>;

    /// 删除单个文件
    async fn delete_file(&self, file_id: &str) -> Result<DeleteResponse>;

    /// 批量删除
    async fn batch_delete(&self, file_ids: &[String]) -> Result<BatchDeleteResponse>;
}

/// 服务端 HTTP 客户端
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    origin: String,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(server_url: &str) -> Result<Self> {
        Self::with_timeout(server_url, Duration::from_secs(30))
    }

    pub fn from_settings(settings: &ClientSettings) -> Result<Self> {
        Self::with_timeout(settings.origin(), settings.request_timeout())
    }

    pub fn with_timeout(server_url: &str, timeout: Duration) -> Result<Self> {
        // 不设置全局超时：上传和推送流都是长连接
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            origin: server_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// 服务器地址，用于拼接绝对链接
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.origin, path)
    }

    pub fn upload_url(&self) -> String {
        self.endpoint("/api/upload")
    }

    /// 打开 SSE 推送流
    pub async fn file_updates(&self) -> Result<reqwest::Response> {
        let url = self.endpoint("/api/file-updates");
        debug!("Opening push stream: {}", url);
        let response = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status { status, body });
        }
        Ok(response)
    }
}

#[async_trait]
impl HostingApi for ApiClient {
    async fn list_files(&self) -> Result<Vec<RosterEntry>> {
        let response = self
            .http
            .get(self.endpoint("/api/files"))
            .timeout(self.timeout)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn delete_file(&self, file_id: &str) -> Result<DeleteResponse> {
        let url = self.endpoint(&format!("/api/files/{}", file_id));
        debug!("DELETE {}", url);
        let response = self.http.delete(&url).timeout(self.timeout).send().await?;
        let status = response.status();
        let body = response.text().await?;

        // 失败时服务端同样返回 JSON（`{detail}`），由调用方根据 status 字段判断
        match serde_json::from_str(&body) {
            Ok(parsed) => Ok(parsed),
            Err(_) if !status.is_success() => Err(Error::Status {
                status: status.as_u16(),
                body,
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn batch_delete(&self, file_ids: &[String]) -> Result<BatchDeleteResponse> {
        let url = self.endpoint("/api/batch_delete");
        debug!("POST {} ({} ids)", url, file_ids.len());
        let response = self
            .http
            .post(&url)
            .timeout(self.timeout)
            .json(&BatchDeleteRequest { file_ids })
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}
