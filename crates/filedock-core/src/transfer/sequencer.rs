//! 串行上传队列
//!
//! 维护按入队顺序排列的待上传列表和一个 `processing` 标志。
//! 任意时刻最多只有一个文件处于上传中；上传期间继续入队只会延长队列。

use std::collections::VecDeque;

use super::{Transfer, TransferId, UploadSource};

#[derive(Debug, Default)]
pub struct UploadSequencer {
    backlog: VecDeque<Transfer>,
    processing: bool,
}

impl UploadSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按给定顺序入队，返回生成的任务 ID
    ///
    /// 不去重，也不限制队列长度。
    pub fn enqueue<I>(&mut self, sources: I) -> Vec<TransferId>
    where
        I: IntoIterator<Item = UploadSource>,
    {
        let transfers: Vec<Transfer> = sources.into_iter().map(Transfer::new).collect();
        let ids = transfers.iter().map(|t| t.id.clone()).collect();
        self.enqueue_transfers(transfers);
        ids
    }

    /// 入队已创建好的任务
    pub fn enqueue_transfers<I>(&mut self, transfers: I)
    where
        I: IntoIterator<Item = Transfer>,
    {
        self.backlog.extend(transfers);
    }

    /// 取出下一个待上传任务
    ///
    /// 正在上传或队列为空时返回 `None`。
    pub fn dispatch(&mut self) -> Option<Transfer> {
        if self.processing {
            return None;
        }
        let next = self.backlog.pop_front()?;
        self.processing = true;
        Some(next)
    }

    /// 当前上传结束（无论成功失败），继续取下一个
    pub fn complete(&mut self) -> Option<Transfer> {
        self.processing = false;
        self.dispatch()
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    /// 没有正在上传的任务且队列为空
    pub fn is_idle(&self) -> bool {
        !self.processing && self.backlog.is_empty()
    }
}
