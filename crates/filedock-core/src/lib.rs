//! Filedock Core Library
//!
//! 自托管文件服务的客户端核心库：上传队列、进度汇报、实时文件列表与批量操作。
//!
//! # 模块
//!
//! - **transfer**: 单文件上传通道与串行上传队列
//! - **report**: 上传进度行与完成结果行
//! - **roster**: 文件列表模型、SSE 解码与实时同步
//! - **selection**: 勾选状态、批量删除与批量复制链接
//! - **api**: 服务端 HTTP 接口客户端
//! - **notify** / **nav** / **clipboard**: 提示、导航与图片弹窗状态、剪贴板
//! - **config** / **logging**: 客户端配置、日志面板条目
//!
//! # 使用示例
//!
//! ## 上传文件
//!
//! ```ignore
//! use filedock_core::{ApiClient, CompletionReporter, HttpTransferChannel, UploadPipeline, UploadSource};
//!
//! let api = ApiClient::new("http://127.0.0.1:8000")?;
//! let (pipeline, mut events) = UploadPipeline::spawn(HttpTransferChannel::new(api));
//! pipeline.enqueue(vec![UploadSource::path("photo.png")])?;
//!
//! let mut reporter = CompletionReporter::new();
//! while let Some(event) = events.recv().await {
//!     reporter.apply(&event);
//! }
//! ```
//!
//! ## 实时文件列表
//!
//! ```ignore
//! use filedock_core::{FileBrowser, HttpPushSource, LiveRosterSync};
//!
//! let sync = LiveRosterSync::new(HttpPushSource::new(api.clone()));
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! tokio::spawn(sync.run(tx));
//!
//! while let Some(entry) = rx.recv().await {
//!     browser.on_push(entry);
//! }
//! ```

pub mod api;
pub mod clipboard;
pub mod config;
pub mod error;
pub mod logging;
pub mod nav;
pub mod notify;
pub mod report;
pub mod roster;
pub mod selection;
pub mod transfer;

pub use error::{Error, Result};

// API re-exports
pub use api::{
    ApiClient, BatchDeleteResponse, DeleteResponse, DeletedItem, FailedDeletion, HostingApi,
};

// Config re-exports
pub use config::ClientSettings;

// Transfer re-exports
pub use transfer::{
    HttpTransferChannel, PipelineEvent, PipelineHandle, ProgressEvent, ProgressSink, Transfer,
    TransferChannel, TransferId, TransferOutcome, UploadPipeline, UploadSequencer, UploadSource,
};

// Report re-exports
pub use report::{CompletedRow, CompletionReporter, ProgressRow};

// Roster re-exports
pub use roster::{
    HttpPushSource, LiveRosterSync, PushSource, Roster, RosterEntry, RosterRow, SyncState,
};

// Selection re-exports
pub use selection::{BatchControls, BatchDeleteReport, FileBrowser, LinkFormat};

pub use clipboard::{ClipboardSink, SystemClipboard};
pub use nav::{ImageModal, NavMenu};
pub use notify::{Notice, NoticeBoard, NoticeLevel};
