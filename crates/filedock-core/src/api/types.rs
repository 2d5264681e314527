//! 服务端接口的 JSON 载荷

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `POST /api/upload` 成功响应
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub url: String,
}

/// `DELETE /api/files/{id}` 响应
///
/// 成功时为 `{status, message}`，失败时服务端返回 `{detail}`，
/// 其中 `detail` 可能是字符串也可能是 `{message, details}` 对象。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<Value>,
}

impl DeleteResponse {
    /// `ok` 与 `partial_success` 都视为已删除
    pub fn is_deleted(&self) -> bool {
        matches!(self.status.as_deref(), Some("ok") | Some("partial_success"))
    }

    pub fn detail_text(&self) -> String {
        match &self.detail {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Object(obj)) => obj
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| Value::Object(obj.clone()).to_string()),
            Some(other) => other.to_string(),
            None => "unknown error".to_string(),
        }
    }
}

/// `POST /api/batch_delete` 请求体
#[derive(Debug, Clone, Serialize)]
pub struct BatchDeleteRequest<'a> {
    pub file_ids: &'a [String],
}

/// `deleted` 列表中的一项：文件 ID，或服务端返回的单项删除结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeletedItem {
    Id(String),
    Record(Value),
}

impl DeletedItem {
    pub fn file_id(&self) -> Option<&str> {
        match self {
            DeletedItem::Id(id) => Some(id),
            DeletedItem::Record(record) => record.get("file_id").and_then(Value::as_str),
        }
    }
}

/// `failed` 列表中的一项
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FailedDeletion {
    #[serde(default)]
    pub file_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl FailedDeletion {
    /// 用于失败提示的标识
    pub fn label(&self) -> &str {
        self.file_id
            .as_deref()
            .or(self.message.as_deref())
            .unwrap_or("unknown")
    }
}

/// `POST /api/batch_delete` 响应
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchDeleteResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub deleted: Vec<DeletedItem>,
    #[serde(default)]
    pub failed: Vec<FailedDeletion>,
}
