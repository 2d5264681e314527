//! 错误类型

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// 未收到响应（连接失败、传输中断等）
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// 服务端返回非成功状态码
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("clipboard error: {0}")]
    Clipboard(String),

    /// 推送流错误
    #[error("push stream error: {0}")]
    Stream(String),

    /// 后台任务已退出
    #[error("{0} is no longer running")]
    Closed(&'static str),
}
