//! 上传结果汇报
//!
//! 维护两个区域：
//! - 进度区：每个上传中的文件一行，按任务 ID 定位
//! - 完成区：按完成顺序追加的结果行
//!
//! 与传输方式无关，只消费 [`PipelineEvent`]。

use std::collections::{HashMap, VecDeque};

use crate::transfer::{PipelineEvent, ProgressEvent, TransferId, TransferOutcome};

/// 进度区中的一行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressRow {
    pub id: TransferId,
    pub name: String,
    /// 尚未收到进度时为 `None`（占位行）
    pub percent: Option<u8>,
}

impl ProgressRow {
    fn placeholder(id: TransferId, name: String) -> Self {
        Self {
            id,
            name,
            percent: None,
        }
    }

    pub fn percent_or_zero(&self) -> u8 {
        self.percent.unwrap_or(0)
    }

    /// 文本进度条，已完成部分的宽度与百分比成正比
    pub fn bar(&self, width: usize) -> String {
        let percent = self.percent_or_zero().min(100) as usize;
        let filled = width * percent / 100;
        format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
    }
}

/// 完成区中的一行
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletedRow {
    /// 带可复制链接的成功行
    Success { id: TransferId, name: String, url: String },
    /// 带错误信息的失败行
    Failure {
        id: TransferId,
        name: String,
        message: String,
    },
}

impl CompletedRow {
    pub fn id(&self) -> &TransferId {
        match self {
            CompletedRow::Success { id, .. } | CompletedRow::Failure { id, .. } => id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CompletedRow::Success { name, .. } | CompletedRow::Failure { name, .. } => name,
        }
    }

    /// 成功行的链接（相对路径）
    pub fn link(&self) -> Option<&str> {
        match self {
            CompletedRow::Success { url, .. } => Some(url),
            CompletedRow::Failure { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RowHandle(usize);

/// 记住最近移出进度区的任务数，迟到的进度事件据此丢弃
const RETIRED_CAPACITY: usize = 64;

#[derive(Debug, Default)]
pub struct CompletionReporter {
    slots: Vec<Option<ProgressRow>>,
    handles: HashMap<TransferId, RowHandle>,
    retired: VecDeque<TransferId>,
    completed: Vec<CompletedRow>,
}

impl CompletionReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: &PipelineEvent) {
        match event {
            PipelineEvent::Started { id, name } => self.on_started(id, name),
            PipelineEvent::Progress { id, name, progress } => {
                self.on_progress(id, name, *progress)
            }
            PipelineEvent::Finished { id, name, outcome } => self.on_finished(id, name, outcome),
        }
    }

    /// 插入占位行
    pub fn on_started(&mut self, id: &TransferId, name: &str) {
        self.row_mut(id, name);
    }

    /// 更新进度；首次收到某 ID 的进度时插入行，已移出进度区的 ID 不再插入
    pub fn on_progress(&mut self, id: &TransferId, name: &str, progress: ProgressEvent) {
        let percent = progress.percent();
        if let Some(row) = self.row_mut(id, name) {
            // 同一行内百分比不回退
            row.percent = Some(row.percent.map_or(percent, |p| p.max(percent)));
        }
    }

    /// 移除进度行并追加结果行
    pub fn on_finished(&mut self, id: &TransferId, name: &str, outcome: &TransferOutcome) {
        if let Some(RowHandle(slot)) = self.handles.remove(id) {
            self.slots[slot] = None;
        }
        self.retire(id.clone());

        let row = match outcome {
            TransferOutcome::Success { reference_url } => CompletedRow::Success {
                id: id.clone(),
                name: name.to_string(),
                url: reference_url.clone(),
            },
            TransferOutcome::Failure { message } => CompletedRow::Failure {
                id: id.clone(),
                name: name.to_string(),
                message: message.clone(),
            },
        };
        self.completed.push(row);
    }

    /// 清空两个区域（选择了一批新文件时）
    ///
    /// 仍在上传中的任务也一并移出，之后的进度事件被忽略。
    pub fn clear(&mut self) {
        let in_flight: Vec<TransferId> = self.handles.drain().map(|(id, _)| id).collect();
        for id in in_flight {
            self.retire(id);
        }
        self.slots.clear();
        self.completed.clear();
    }

    /// 进度区中的行，按插入顺序
    pub fn in_progress(&self) -> impl Iterator<Item = &ProgressRow> {
        self.slots.iter().flatten()
    }

    pub fn completed(&self) -> &[CompletedRow] {
        &self.completed
    }

    pub fn progress_row(&self, id: &TransferId) -> Option<&ProgressRow> {
        let RowHandle(slot) = self.handles.get(id)?;
        self.slots.get(*slot)?.as_ref()
    }

    fn row_mut(&mut self, id: &TransferId, name: &str) -> Option<&mut ProgressRow> {
        if self.retired.contains(id) {
            return None;
        }
        let slot = match self.handles.get(id) {
            Some(RowHandle(slot)) => *slot,
            None => {
                self.slots
                    .push(Some(ProgressRow::placeholder(id.clone(), name.to_string())));
                let slot = self.slots.len() - 1;
                self.handles.insert(id.clone(), RowHandle(slot));
                slot
            }
        };
        self.slots[slot].as_mut()
    }

    fn retire(&mut self, id: TransferId) {
        if self.retired.contains(&id) {
            return;
        }
        if self.retired.len() == RETIRED_CAPACITY {
            self.retired.pop_front();
        }
        self.retired.push_back(id);
    }
}
