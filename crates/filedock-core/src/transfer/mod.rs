//! 文件上传模块
//!
//! 包含:
//! - 单文件上传通道 (multipart POST，带进度)
//! - 串行上传队列：任意时刻最多只有一个上传在进行
//! - 驱动队列的异步任务

pub mod channel;
pub mod pipeline;
pub mod sequencer;

pub use channel::{
    GENERIC_FAILURE, HttpTransferChannel, ProgressSink, TransferChannel, derive_outcome,
};
pub use pipeline::{PipelineEvent, PipelineHandle, UploadPipeline};
pub use sequencer::UploadSequencer;

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// 上传任务 ID：`file-{毫秒时间戳}-{7 位随机后缀}`
///
/// 入队时在客户端生成，用于把进度行和结果行对应起来。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransferId(String);

impl TransferId {
    pub fn generate() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let mut rng = rand::thread_rng();
        let suffix: String = (0..7)
            .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
            .collect();
        Self(format!("file-{}-{}", millis, suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransferId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// 待上传的数据来源
#[derive(Debug, Clone)]
pub enum UploadSource {
    /// 本地文件
    Path(PathBuf),
    /// 内存数据（例如标准输入）
    Memory { name: String, data: Vec<u8> },
}

impl UploadSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        UploadSource::Path(path.into())
    }

    pub fn memory(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        UploadSource::Memory {
            name: name.into(),
            data: data.into(),
        }
    }

    /// 上传时使用的文件名
    pub fn display_name(&self) -> String {
        match self {
            UploadSource::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            UploadSource::Memory { name, .. } => name.clone(),
        }
    }
}

/// 单个文件的上传单元
#[derive(Debug, Clone)]
pub struct Transfer {
    pub id: TransferId,
    pub source: UploadSource,
    pub display_name: String,
}

impl Transfer {
    pub fn new(source: UploadSource) -> Self {
        Self {
            id: TransferId::generate(),
            display_name: source.display_name(),
            source,
        }
    }
}

/// 上传进度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub bytes_sent: u64,
    pub bytes_total: u64,
}

impl ProgressEvent {
    pub fn new(bytes_sent: u64, bytes_total: u64) -> Self {
        Self {
            bytes_sent,
            bytes_total,
        }
    }

    /// 已发送比例，限制在 [0, 1]
    pub fn fraction(&self) -> f64 {
        if self.bytes_total == 0 {
            return 0.0;
        }
        (self.bytes_sent as f64 / self.bytes_total as f64).clamp(0.0, 1.0)
    }

    /// 向下取整的整数百分比 (0..=100)
    pub fn percent(&self) -> u8 {
        (self.fraction() * 100.0).floor() as u8
    }
}

/// 上传结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Success { reference_url: String },
    Failure { message: String },
}

impl TransferOutcome {
    pub fn success(reference_url: impl Into<String>) -> Self {
        TransferOutcome::Success {
            reference_url: reference_url.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        TransferOutcome::Failure {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TransferOutcome::Success { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_id_format() {
        let id = TransferId::generate();
        let parts: Vec<&str> = id.as_str().splitn(3, '-').collect();
        assert_eq!(parts[0], "file");
        assert!(parts[1].parse::<u128>().is_ok(), "{}", id);
        assert_eq!(parts[2].len(), 7);
        assert!(parts[2].bytes().all(|b| ID_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_transfer_ids_are_distinct() {
        let a = Transfer::new(UploadSource::memory("a.txt", b"x".to_vec()));
        let b = Transfer::new(UploadSource::memory("a.txt", b"x".to_vec()));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_display_name() {
        assert_eq!(
            UploadSource::path("/tmp/photos/cat.png").display_name(),
            "cat.png"
        );
        assert_eq!(UploadSource::memory("stdin.txt", vec![]).display_name(), "stdin.txt");
    }

    #[test]
    fn test_percent_is_floored_and_clamped() {
        assert_eq!(ProgressEvent::new(0, 200).percent(), 0);
        assert_eq!(ProgressEvent::new(199, 200).percent(), 99);
        assert_eq!(ProgressEvent::new(200, 200).percent(), 100);
        assert_eq!(ProgressEvent::new(500, 200).percent(), 100);
        assert_eq!(ProgressEvent::new(10, 0).percent(), 0);
    }
}
