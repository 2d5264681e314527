//! 上传队列驱动任务
//!
//! 后台任务独占 [`UploadSequencer`]，通过命令通道接收入队请求，
//! 一次只打开一个 [`TransferChannel`]，并把进度和结果以 [`PipelineEvent`] 发出。

use log::{debug, error, info};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::channel::{GENERIC_FAILURE, ProgressSink, TransferChannel};
use super::{ProgressEvent, Transfer, TransferId, TransferOutcome, UploadSequencer, UploadSource};
use crate::error::{Error, Result};

/// 上传过程事件
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// 开始上传，此时插入进度占位行
    Started { id: TransferId, name: String },
    Progress {
        id: TransferId,
        name: String,
        progress: ProgressEvent,
    },
    Finished {
        id: TransferId,
        name: String,
        outcome: TransferOutcome,
    },
}

impl PipelineEvent {
    pub fn id(&self) -> &TransferId {
        match self {
            PipelineEvent::Started { id, .. }
            | PipelineEvent::Progress { id, .. }
            | PipelineEvent::Finished { id, .. } => id,
        }
    }
}

enum Command {
    Enqueue(Vec<Transfer>),
    Shutdown,
}

/// 上传队列句柄
#[derive(Debug, Clone)]
pub struct PipelineHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl PipelineHandle {
    /// 按顺序入队，返回各文件的任务 ID
    pub fn enqueue<I>(&self, sources: I) -> Result<Vec<TransferId>>
    where
        I: IntoIterator<Item = UploadSource>,
    {
        let transfers: Vec<Transfer> = sources.into_iter().map(Transfer::new).collect();
        let ids = transfers.iter().map(|t| t.id.clone()).collect();
        self.tx
            .send(Command::Enqueue(transfers))
            .map_err(|_| Error::Closed("upload pipeline"))?;
        Ok(ids)
    }

    /// 处理完已入队的文件后退出
    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Enqueue(t) => write!(f, "Enqueue({})", t.len()),
            Command::Shutdown => f.write_str("Shutdown"),
        }
    }
}

/// 串行上传管线
pub struct UploadPipeline;

impl UploadPipeline {
    /// 启动驱动任务
    ///
    /// 返回的事件接收端在驱动任务退出后关闭。
    pub fn spawn<C: TransferChannel>(
        channel: C,
    ) -> (PipelineHandle, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        tokio::spawn(drive(Arc::new(channel), cmd_rx, event_tx));

        (PipelineHandle { tx: cmd_tx }, event_rx)
    }
}

struct Finished {
    id: TransferId,
    name: String,
    outcome: TransferOutcome,
}

async fn drive<C: TransferChannel>(
    channel: Arc<C>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<PipelineEvent>,
) {
    let mut sequencer = UploadSequencer::new();
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Finished>();
    let mut accepting = true;

    loop {
        // 空闲时尝试开始下一个上传
        if let Some(transfer) = sequencer.dispatch() {
            open(channel.clone(), transfer, events.clone(), done_tx.clone());
        }

        if !accepting && sequencer.is_idle() {
            break;
        }

        tokio::select! {
            cmd = commands.recv(), if accepting => match cmd {
                Some(Command::Enqueue(transfers)) => {
                    debug!("Enqueued {} file(s)", transfers.len());
                    sequencer.enqueue_transfers(transfers);
                }
                Some(Command::Shutdown) | None => {
                    debug!("Upload pipeline draining {} queued file(s)", sequencer.backlog_len());
                    accepting = false;
                }
            },
            Some(finished) = done_rx.recv() => {
                let _ = events.send(PipelineEvent::Finished {
                    id: finished.id,
                    name: finished.name,
                    outcome: finished.outcome,
                });
                if let Some(transfer) = sequencer.complete() {
                    open(channel.clone(), transfer, events.clone(), done_tx.clone());
                }
            }
        }
    }

    info!("Upload pipeline stopped");
}

/// 在独立任务中打开上传通道
fn open<C: TransferChannel>(
    channel: Arc<C>,
    transfer: Transfer,
    events: mpsc::UnboundedSender<PipelineEvent>,
    done: mpsc::UnboundedSender<Finished>,
) {
    let id = transfer.id.clone();
    let name = transfer.display_name.clone();

    let _ = events.send(PipelineEvent::Started {
        id: id.clone(),
        name: name.clone(),
    });

    let sink = {
        let id = id.clone();
        let name = name.clone();
        ProgressSink::new(move |progress| {
            let _ = events.send(PipelineEvent::Progress {
                id: id.clone(),
                name: name.clone(),
                progress,
            });
        })
    };

    tokio::spawn(async move {
        let task = tokio::spawn(async move { channel.open(&transfer, sink).await });

        // 通道任务异常退出时仍然要产生结果，否则队列会停住
        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Transfer task for {} aborted: {}", id, e);
                TransferOutcome::failure(GENERIC_FAILURE)
            }
        };

        let _ = done.send(Finished { id, name, outcome });
    });
}
