//! 选择与批量操作
//!
//! [`FileBrowser`] 持有文件列表、批量操作控件状态和当前链接格式。
//! 控件状态在每次勾选变化后根据列表整体重新计算。
//!
//! 需要用户确认的操作拆成三步，方便界面在中间弹出确认框：
//!
//! ```ignore
//! let ids = match browser.begin_batch_delete() {
//!     Ok(ids) => ids,
//!     Err(notice) => return show(notice),
//! };
//! if confirm(&batch_delete_prompt(ids.len())) {
//!     let report = browser.apply_batch_delete(api.batch_delete(&ids).await);
//!     if report.reload_required {
//!         browser.reload(api.list_files().await?);
//!     }
//! }
//! ```

mod links;

pub use links::LinkFormat;

use log::{error, info, warn};

use crate::api::{BatchDeleteResponse, DeleteResponse, HostingApi};
use crate::clipboard::ClipboardSink;
use crate::error::Result;
use crate::notify::Notice;
use crate::roster::{Roster, RosterEntry};

pub const SINGLE_DELETE_PROMPT: &str =
    "Are you sure you want to delete this file? This action cannot be undone.";

pub fn batch_delete_prompt(count: usize) -> String {
    format!(
        "Are you sure you want to delete {} selected file(s)? This action cannot be undone.",
        count
    )
}

/// 批量操作控件状态
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchControls {
    pub delete_enabled: bool,
    pub copy_enabled: bool,
    /// 未选择时为空
    pub counter_label: String,
    pub select_all_checked: bool,
}

impl BatchControls {
    pub fn from_roster(roster: &Roster) -> Self {
        let selected = roster.checked().count();
        let total = roster.len();
        let has_selection = selected > 0;

        Self {
            delete_enabled: has_selection,
            copy_enabled: has_selection,
            counter_label: if has_selection {
                format!("{} item(s) selected", selected)
            } else {
                String::new()
            },
            select_all_checked: has_selection && selected == total,
        }
    }
}

/// 批量删除的处理结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchDeleteReport {
    /// 已从列表移除的文件 ID
    pub removed: Vec<String>,
    /// 删除失败的文件 ID
    pub failed: Vec<String>,
    pub notices: Vec<Notice>,
    /// 需要重新获取完整列表
    pub reload_required: bool,
}

impl BatchDeleteReport {
    fn notice(notice: Notice) -> Self {
        Self {
            notices: vec![notice],
            ..Default::default()
        }
    }
}

#[derive(Debug)]
pub struct FileBrowser {
    origin: String,
    roster: Roster,
    controls: BatchControls,
    link_format: LinkFormat,
}

impl FileBrowser {
    /// `origin` 为服务器地址，用于拼接绝对链接
    pub fn new(origin: impl Into<String>) -> Self {
        Self::with_roster(origin, Roster::new())
    }

    pub fn with_roster(origin: impl Into<String>, roster: Roster) -> Self {
        let controls = BatchControls::from_roster(&roster);
        Self {
            origin: origin.into().trim_end_matches('/').to_string(),
            roster,
            controls,
            link_format: LinkFormat::default(),
        }
    }

    pub fn with_link_format(mut self, format: LinkFormat) -> Self {
        self.link_format = format;
        self
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn controls(&self) -> &BatchControls {
        &self.controls
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn link_format(&self) -> LinkFormat {
        self.link_format
    }

    pub fn set_link_format(&mut self, format: LinkFormat) {
        self.link_format = format;
    }

    pub fn cycle_link_format(&mut self) -> LinkFormat {
        self.link_format = self.link_format.next();
        self.link_format
    }

    pub fn absolute_url(&self, path: &str) -> String {
        format!("{}{}", self.origin, path)
    }

    // ========================================================================
    // 勾选
    // ========================================================================

    pub fn toggle(&mut self, index: usize) {
        self.roster.toggle(index);
        self.refresh_controls();
    }

    pub fn set_checked(&mut self, file_id: &str, checked: bool) -> bool {
        let found = self.roster.set_checked(file_id, checked);
        self.refresh_controls();
        found
    }

    /// 全选复选框
    pub fn set_all_checked(&mut self, checked: bool) {
        self.roster.set_all_checked(checked);
        self.refresh_controls();
    }

    /// 全选与取消全选之间切换
    pub fn toggle_all(&mut self) {
        let checked = !self.controls.select_all_checked;
        self.set_all_checked(checked);
    }

    pub fn selected_ids(&self) -> Vec<String> {
        self.roster
            .checked()
            .map(|row| row.entry.file_id.clone())
            .collect()
    }

    // ========================================================================
    // 列表变化
    // ========================================================================

    /// 推送的新文件插入最前面，并立即参与全选和批量操作
    pub fn on_push(&mut self, entry: RosterEntry) {
        self.roster.prepend(entry);
        self.refresh_controls();
    }

    /// 用服务端完整列表替换当前列表
    pub fn reload(&mut self, entries: Vec<RosterEntry>) {
        self.roster.replace_all(entries);
        self.refresh_controls();
    }

    fn refresh_controls(&mut self) {
        self.controls = BatchControls::from_roster(&self.roster);
    }

    // ========================================================================
    // 批量删除
    // ========================================================================

    /// 取出已勾选的 ID；未勾选时返回提示
    pub fn begin_batch_delete(&self) -> std::result::Result<Vec<String>, Notice> {
        let ids = self.selected_ids();
        if ids.is_empty() {
            return Err(Notice::error("Please select files to delete."));
        }
        Ok(ids)
    }

    pub fn apply_batch_delete(&mut self, result: Result<BatchDeleteResponse>) -> BatchDeleteReport {
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                error!("Batch delete failed: {}", e);
                return BatchDeleteReport::notice(Notice::error(
                    "An error occurred while deleting files.",
                ));
            }
        };

        let mut report = BatchDeleteReport {
            reload_required: true,
            ..Default::default()
        };

        for item in &response.deleted {
            match item.file_id() {
                Some(id) => {
                    self.roster.remove(id);
                    report.removed.push(id.to_string());
                }
                None => warn!("Deleted item without file_id: {:?}", item),
            }
        }
        report.notices.push(Notice::success(format!(
            "Successfully deleted {} file(s).",
            response.deleted.len()
        )));

        if !response.failed.is_empty() {
            report.failed = response
                .failed
                .iter()
                .map(|f| f.label().to_string())
                .collect();
            report.notices.push(Notice::error(format!(
                "Failed to delete: {}",
                report.failed.join(", ")
            )));
        }

        self.refresh_controls();
        info!(
            "Batch delete: {} removed, {} failed",
            report.removed.len(),
            report.failed.len()
        );
        report
    }

    /// 完整的批量删除流程；用户取消时返回 `None` 且不做任何改动
    pub async fn batch_delete(
        &mut self,
        api: &dyn HostingApi,
        confirm: impl FnOnce(&str) -> bool,
    ) -> Option<BatchDeleteReport> {
        let ids = match self.begin_batch_delete() {
            Ok(ids) => ids,
            Err(notice) => return Some(BatchDeleteReport::notice(notice)),
        };
        if !confirm(&batch_delete_prompt(ids.len())) {
            return None;
        }

        let report = self.apply_batch_delete(api.batch_delete(&ids).await);
        if report.reload_required {
            match api.list_files().await {
                Ok(entries) => self.reload(entries),
                Err(e) => warn!("Failed to reload file list: {}", e),
            }
        }
        Some(report)
    }

    // ========================================================================
    // 单个删除
    // ========================================================================

    /// 成功时移除行并返回 `None`，失败时返回提示
    pub fn apply_delete(&mut self, file_id: &str, result: Result<DeleteResponse>) -> Option<Notice> {
        match result {
            Ok(response) if response.is_deleted() => {
                info!(
                    "{}",
                    response.message.as_deref().unwrap_or("File deleted")
                );
                self.roster.remove(file_id);
                self.refresh_controls();
                None
            }
            Ok(response) => Some(Notice::error(format!(
                "Error deleting file: {}",
                response.detail_text()
            ))),
            Err(e) => {
                error!("Delete of {} failed: {}", file_id, e);
                Some(Notice::error("An error occurred while deleting the file."))
            }
        }
    }

    /// 用户取消时返回 `None`
    pub async fn delete_file(
        &mut self,
        api: &dyn HostingApi,
        file_id: &str,
        confirm: impl FnOnce(&str) -> bool,
    ) -> Option<Option<Notice>> {
        if !confirm(SINGLE_DELETE_PROMPT) {
            return None;
        }
        let result = api.delete_file(file_id).await;
        Some(self.apply_delete(file_id, result))
    }

    // ========================================================================
    // 复制链接
    // ========================================================================

    /// 按当前格式生成已勾选文件的链接，每行一个
    pub fn selected_links(&self) -> Vec<String> {
        self.roster
            .checked()
            .map(|row| {
                let url = self.absolute_url(&row.entry.download_path());
                self.link_format.format(&row.entry.filename, &url)
            })
            .collect()
    }

    pub fn copy_selected_links(&self, clipboard: &mut dyn ClipboardSink) -> Notice {
        let links = self.selected_links();
        if links.is_empty() {
            return Notice::error("Please select files to copy links.");
        }

        match clipboard.write_text(&links.join("\n")) {
            Ok(()) => Notice::success(format!(
                "{} link(s) copied in {} format!",
                links.len(),
                self.link_format.label()
            )),
            Err(e) => {
                error!("Failed to copy links: {}", e);
                Notice::error("Failed to copy links.")
            }
        }
    }

    /// 复制单个文件的绝对链接，`path` 为 `/d/{id}` 形式
    pub fn copy_link(&self, path: &str, clipboard: &mut dyn ClipboardSink) -> Notice {
        match clipboard.write_text(&self.absolute_url(path)) {
            Ok(()) => Notice::success("Link copied to clipboard!"),
            Err(e) => {
                error!("Failed to copy link: {}", e);
                Notice::error("Failed to copy link.")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{DeletedItem, FailedDeletion};
    use crate::error::Error;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const ORIGIN: &str = "http://files.local";

    fn entry(id: &str, name: &str) -> RosterEntry {
        RosterEntry {
            file_id: id.to_string(),
            filename: name.to_string(),
            filesize: 1,
            upload_date: "2024-05-01".to_string(),
        }
    }

    fn browser(ids: &[&str]) -> FileBrowser {
        let entries = ids.iter().map(|id| entry(id, &format!("{}.png", id))).collect();
        FileBrowser::with_roster(ORIGIN, Roster::from_entries(entries))
    }

    /// 删除 `a`、拒绝其余文件的假服务端
    struct FakeApi {
        listing: Vec<RosterEntry>,
        requested: Mutex<Vec<String>>,
        fail_request: bool,
    }

    impl FakeApi {
        fn new(listing: Vec<RosterEntry>) -> Self {
            Self {
                listing,
                requested: Mutex::new(Vec::new()),
                fail_request: false,
            }
        }
    }

    #[async_trait]
    impl HostingApi for FakeApi {
        async fn list_files(&self) -> Result<Vec<RosterEntry>> {
            Ok(self.listing.clone())
        }

        async fn delete_file(&self, file_id: &str) -> Result<DeleteResponse> {
            let json = if file_id == "a" {
                r#"{"status":"ok","message":"deleted"}"#
            } else {
                r#"{"detail":"File not found"}"#
            };
            Ok(serde_json::from_str(json)?)
        }

        async fn batch_delete(&self, file_ids: &[String]) -> Result<BatchDeleteResponse> {
            if self.fail_request {
                return Err(Error::Stream("connection reset".into()));
            }
            self.requested.lock().unwrap().extend_from_slice(file_ids);
            let mut response = BatchDeleteResponse::default();
            for id in file_ids {
                if id == "a" {
                    response.deleted.push(DeletedItem::Id(id.clone()));
                } else {
                    response.failed.push(FailedDeletion {
                        file_id: Some(id.clone()),
                        message: Some("not found".into()),
                        extra: Default::default(),
                    });
                }
            }
            Ok(response)
        }
    }

    #[test]
    fn test_controls_follow_checkbox_state() {
        let mut b = browser(&["a", "b"]);
        assert_eq!(*b.controls(), BatchControls::default());

        b.toggle(0);
        assert!(b.controls().delete_enabled);
        assert!(b.controls().copy_enabled);
        assert_eq!(b.controls().counter_label, "1 item(s) selected");
        assert!(!b.controls().select_all_checked);

        b.toggle(1);
        assert!(b.controls().select_all_checked);

        b.toggle_all();
        assert_eq!(b.controls().counter_label, "");
        assert!(!b.controls().delete_enabled);
    }

    #[test]
    fn test_empty_roster_never_shows_select_all() {
        let mut b = FileBrowser::new(ORIGIN);
        b.set_all_checked(true);
        assert!(!b.controls().select_all_checked);
    }

    #[test]
    fn test_pushed_row_joins_select_all() {
        let mut b = browser(&["a"]);
        b.set_all_checked(true);
        assert!(b.controls().select_all_checked);

        b.on_push(entry("new", "new.png"));
        assert!(!b.controls().select_all_checked);
        assert_eq!(b.controls().counter_label, "1 item(s) selected");

        b.toggle_all();
        assert_eq!(b.selected_ids(), vec!["new", "a"]);
    }

    #[tokio::test]
    async fn test_batch_delete_removes_only_deleted() {
        let mut b = browser(&["a", "b"]);
        b.set_all_checked(true);
        let api = FakeApi::new(vec![entry("b", "b.png")]);

        let mut prompt = String::new();
        let report = b
            .batch_delete(&api, |p| {
                prompt = p.to_string();
                true
            })
            .await
            .unwrap();

        assert_eq!(
            prompt,
            "Are you sure you want to delete 2 selected file(s)? This action cannot be undone."
        );
        assert_eq!(report.removed, vec!["a"]);
        assert_eq!(report.failed, vec!["b"]);
        assert_eq!(
            report.notices,
            vec![
                Notice::success("Successfully deleted 1 file(s)."),
                Notice::error("Failed to delete: b"),
            ]
        );
        assert!(report.reload_required);

        // 重新加载后的列表只剩服务端返回的文件
        let ids: Vec<&str> = b.roster().rows().iter().map(|r| r.entry.file_id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
        assert!(!b.controls().delete_enabled);
    }

    #[test]
    fn test_apply_batch_delete_without_reload() {
        let mut b = browser(&["a", "b"]);
        let response: BatchDeleteResponse = serde_json::from_str(
            r#"{"status":"partial_success","deleted":[{"status":"ok","file_id":"a"}],"failed":[{"file_id":"b","detail":"gone"}]}"#,
        )
        .unwrap();

        let report = b.apply_batch_delete(Ok(response));
        assert_eq!(report.removed, vec!["a"]);
        assert!(b.roster().find("a").is_none());
        assert!(b.roster().find("b").is_some());
    }

    #[tokio::test]
    async fn test_batch_delete_empty_selection_and_cancel() {
        let mut b = browser(&["a"]);
        let api = FakeApi::new(vec![]);

        let report = b.batch_delete(&api, |_| true).await.unwrap();
        assert_eq!(report.notices, vec![Notice::error("Please select files to delete.")]);
        assert!(!report.reload_required);

        b.toggle(0);
        assert!(b.batch_delete(&api, |_| false).await.is_none());
        assert!(api.requested.lock().unwrap().is_empty());
        assert_eq!(b.roster().len(), 1);
    }

    #[tokio::test]
    async fn test_batch_delete_request_error() {
        let mut b = browser(&["a"]);
        b.toggle(0);
        let mut api = FakeApi::new(vec![]);
        api.fail_request = true;

        let report = b.batch_delete(&api, |_| true).await.unwrap();
        assert_eq!(
            report.notices,
            vec![Notice::error("An error occurred while deleting files.")]
        );
        assert!(!report.reload_required);
        assert_eq!(b.roster().len(), 1);
    }

    #[tokio::test]
    async fn test_single_delete() {
        let mut b = browser(&["a", "b"]);
        let api = FakeApi::new(vec![]);

        let mut prompt = String::new();
        let result = b
            .delete_file(&api, "a", |p| {
                prompt = p.to_string();
                true
            })
            .await;
        assert_eq!(result, Some(None));
        assert_eq!(prompt, SINGLE_DELETE_PROMPT);
        assert!(b.roster().find("a").is_none());

        let result = b.delete_file(&api, "b", |_| true).await;
        assert_eq!(
            result,
            Some(Some(Notice::error("Error deleting file: File not found")))
        );
        assert!(b.roster().find("b").is_some());

        assert_eq!(b.delete_file(&api, "b", |_| false).await, None);
    }

    #[test]
    fn test_single_delete_transport_error() {
        let mut b = browser(&["a"]);
        let notice = b.apply_delete("a", Err(Error::Stream("reset".into())));
        assert_eq!(
            notice,
            Some(Notice::error("An error occurred while deleting the file."))
        );
        assert_eq!(b.roster().len(), 1);
    }

    #[test]
    fn test_copy_selected_links_in_markdown() {
        let mut b = FileBrowser::with_roster(
            ORIGIN,
            Roster::from_entries(vec![entry("1:x.png", "x.png"), entry("2:y.png", "y.png")]),
        )
        .with_link_format(LinkFormat::Markdown);
        b.set_all_checked(true);

        let mut copied = String::new();
        let mut clipboard = |text: &str| -> Result<()> {
            copied = text.to_string();
            Ok(())
        };
        let notice = b.copy_selected_links(&mut clipboard);

        assert_eq!(notice, Notice::success("2 link(s) copied in MARKDOWN format!"));
        assert_eq!(
            copied,
            "![x.png](http://files.local/d/1:x.png)\n![y.png](http://files.local/d/2:y.png)"
        );
    }

    #[test]
    fn test_copy_failures() {
        let mut b = browser(&["a"]);
        let mut broken = |_: &str| -> Result<()> { Err(Error::Clipboard("no display".into())) };

        assert_eq!(
            b.copy_selected_links(&mut broken),
            Notice::error("Please select files to copy links.")
        );

        b.toggle(0);
        assert_eq!(
            b.copy_selected_links(&mut broken),
            Notice::error("Failed to copy links.")
        );
        assert_eq!(
            b.copy_link("/d/a", &mut broken),
            Notice::error("Failed to copy link.")
        );
    }

    #[test]
    fn test_copy_single_link() {
        let b = FileBrowser::new("http://files.local/");
        let mut copied = String::new();
        let notice = b.copy_link("/d/1:a", &mut |text: &str| -> Result<()> {
            copied = text.to_string();
            Ok(())
        });
        assert_eq!(notice, Notice::success("Link copied to clipboard!"));
        assert_eq!(copied, "http://files.local/d/1:a");
    }
}
