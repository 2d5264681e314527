//! 文件列表模块
//!
//! 包含:
//! - 文件列表模型（最新的在最前）
//! - `text/event-stream` 增量解码
//! - 带自动重连的实时同步

pub mod sse;
pub mod sync;

pub use sse::{SseDecoder, SseEvent};
pub use sync::{HttpPushSource, LiveRosterSync, PushSource, PushStream, SyncState};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

const SIZE_UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

/// 服务端推送或列出的文件元数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub file_id: String,
    pub filename: String,
    #[serde(default)]
    pub filesize: u64,
    #[serde(default)]
    pub upload_date: String,
}

impl RosterEntry {
    /// 下载路径（相对）
    pub fn download_path(&self) -> String {
        format!("/d/{}", self.file_id)
    }

    /// 行标识：ID 中的第一个 `:` 替换为 `-`
    pub fn row_key(&self) -> String {
        format!("file-item-{}", self.file_id.replacen(':', "-", 1))
    }

    pub fn formatted_size(&self) -> String {
        format_file_size(self.filesize)
    }

    pub fn formatted_date(&self) -> String {
        format_upload_date(&self.upload_date)
    }
}

/// 1024 进制的文件大小，保留两位小数并去掉末尾的 0
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut i = 0;
    let mut unit: u64 = 1;
    while i < SIZE_UNITS.len() - 1 && bytes >= unit * 1024 {
        unit *= 1024;
        i += 1;
    }
    let scaled = format!("{:.2}", bytes as f64 / unit as f64);
    let trimmed = scaled.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, SIZE_UNITS[i])
}

/// 上传日期格式化为 UTC `YYYY-MM-DD`
pub fn format_upload_date(raw: &str) -> String {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Utc).format("%Y-%m-%d").to_string();
    }
    for pattern in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, pattern) {
            return dt.format("%Y-%m-%d").to_string();
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format("%Y-%m-%d").to_string();
    }
    raw.chars().take(10).collect()
}

/// 列表中的一行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterRow {
    pub entry: RosterEntry,
    /// 勾选状态
    pub checked: bool,
    /// 通过推送新加入（用于高亮）
    pub fresh: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    rows: Vec<RosterRow>,
    /// "暂无文件"占位符
    empty_placeholder: bool,
}

impl Default for Roster {
    fn default() -> Self {
        Self::new()
    }
}

impl Roster {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            empty_placeholder: true,
        }
    }

    pub fn from_entries(entries: Vec<RosterEntry>) -> Self {
        let mut roster = Self::new();
        roster.replace_all(entries);
        roster
    }

    /// 推送的新文件插入到最前面
    pub fn prepend(&mut self, entry: RosterEntry) {
        self.empty_placeholder = false;
        self.rows.insert(
            0,
            RosterRow {
                entry,
                checked: false,
                fresh: true,
            },
        );
    }

    pub fn remove(&mut self, file_id: &str) -> bool {
        let before = self.rows.len();
        self.rows.retain(|row| row.entry.file_id != file_id);
        self.rows.len() != before
    }

    /// 整体重新加载，勾选状态清空
    pub fn replace_all(&mut self, entries: Vec<RosterEntry>) {
        self.empty_placeholder = entries.is_empty();
        self.rows = entries
            .into_iter()
            .map(|entry| RosterRow {
                entry,
                checked: false,
                fresh: false,
            })
            .collect();
    }

    pub fn set_checked(&mut self, file_id: &str, checked: bool) -> bool {
        match self.rows.iter_mut().find(|r| r.entry.file_id == file_id) {
            Some(row) => {
                row.checked = checked;
                true
            }
            None => false,
        }
    }

    pub fn toggle(&mut self, index: usize) {
        if let Some(row) = self.rows.get_mut(index) {
            row.checked = !row.checked;
        }
    }

    pub fn set_all_checked(&mut self, checked: bool) {
        for row in &mut self.rows {
            row.checked = checked;
        }
    }

    pub fn rows(&self) -> &[RosterRow] {
        &self.rows
    }

    pub fn get(&self, index: usize) -> Option<&RosterRow> {
        self.rows.get(index)
    }

    pub fn find(&self, file_id: &str) -> Option<&RosterRow> {
        self.rows.iter().find(|r| r.entry.file_id == file_id)
    }

    pub fn checked(&self) -> impl Iterator<Item = &RosterRow> {
        self.rows.iter().filter(|r| r.checked)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn shows_empty_placeholder(&self) -> bool {
        self.empty_placeholder
    }
}
