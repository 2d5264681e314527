//! Application state

use crossterm::event::KeyCode;
use filedock_core::logging::{LogEntry, LogLevel};
use filedock_core::selection::{SINGLE_DELETE_PROMPT, batch_delete_prompt};
use filedock_core::{
    ApiClient, BatchDeleteResponse, ClientSettings, CompletionReporter, DeleteResponse,
    FileBrowser, HostingApi, HttpPushSource, HttpTransferChannel, ImageModal, LiveRosterSync,
    NavMenu, NoticeBoard, PipelineEvent, PipelineHandle, RosterEntry, SyncState,
    SystemClipboard, UploadPipeline, UploadSource,
};
use std::time::Instant;
use tokio::sync::{mpsc, watch};

const MAX_LOGS: usize = 500;

/// 后台任务发给界面的事件
pub enum AppEvent {
    Log(LogEntry),
    Pipeline(PipelineEvent),
    Pushed(RosterEntry),
    Reloaded(filedock_core::Result<Vec<RosterEntry>>),
    BatchDeleted(filedock_core::Result<BatchDeleteResponse>),
    Deleted {
        file_id: String,
        result: filedock_core::Result<DeleteResponse>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Upload,
    Files,
    Log,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Upload, Tab::Files, Tab::Log];

    /// 导航菜单中的链接
    pub fn link(&self) -> &'static str {
        match self {
            Tab::Upload => "/",
            Tab::Files => "/files",
            Tab::Log => "/log",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Upload => "上传 [1]",
            Tab::Files => "文件 [2]",
            Tab::Log => "日志 [3]",
        }
    }
}

/// 等待确认的删除操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    Delete(String),
    BatchDelete(Vec<String>),
}

impl PendingAction {
    pub fn prompt(&self) -> String {
        match self {
            PendingAction::Delete(_) => SINGLE_DELETE_PROMPT.to_string(),
            PendingAction::BatchDelete(ids) => batch_delete_prompt(ids.len()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppMode {
    Normal,
    /// 输入上传路径
    Input,
    Confirm(PendingAction),
}

pub struct App {
    pub mode: AppMode,
    pub tab: Tab,
    pub nav: NavMenu,
    pub settings: ClientSettings,
    pub input_buffer: String,

    pub reporter: CompletionReporter,
    pub browser: FileBrowser,
    pub selected_row: usize,
    pub modal: ImageModal,
    pub notices: NoticeBoard,
    pub sync_state: watch::Receiver<SyncState>,

    pub logs: Vec<LogEntry>,
    pub log_level: LogLevel,

    pub event_tx: mpsc::Sender<AppEvent>,
    event_rx: mpsc::Receiver<AppEvent>,
    api: ApiClient,
    pipeline: PipelineHandle,
    clipboard: SystemClipboard,
}

pub fn event_channel() -> (mpsc::Sender<AppEvent>, mpsc::Receiver<AppEvent>) {
    mpsc::channel(1000)
}

impl App {
    #[cfg(test)]
    pub fn new(settings: ClientSettings) -> anyhow::Result<Self> {
        let (event_tx, event_rx) = event_channel();
        Self::with_events(settings, event_tx, event_rx)
    }

    /// 启动上传管线和推送同步，并加载初始文件列表
    ///
    /// 事件通道由调用方创建，日志层可以在加载设置之前就拿到发送端。
    pub fn with_events(
        settings: ClientSettings,
        event_tx: mpsc::Sender<AppEvent>,
        event_rx: mpsc::Receiver<AppEvent>,
    ) -> anyhow::Result<Self> {
        let api = ApiClient::from_settings(&settings)?;

        let (pipeline, mut pipeline_rx) =
            UploadPipeline::spawn(HttpTransferChannel::new(api.clone()));
        let tx = event_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = pipeline_rx.recv().await {
                if tx.send(AppEvent::Pipeline(event)).await.is_err() {
                    break;
                }
            }
        });

        let sync = LiveRosterSync::new(HttpPushSource::new(api.clone()))
            .with_retry_delay(settings.reconnect_delay());
        let sync_state = sync.subscribe_state();
        let (push_tx, mut push_rx) = mpsc::unbounded_channel();
        tokio::spawn(sync.run(push_tx));
        let tx = event_tx.clone();
        tokio::spawn(async move {
            while let Some(entry) = push_rx.recv().await {
                if tx.send(AppEvent::Pushed(entry)).await.is_err() {
                    break;
                }
            }
        });

        let browser =
            FileBrowser::new(settings.origin()).with_link_format(settings.link_format);
        let mut nav = NavMenu::new();
        nav.set_active(Tab::Upload.link(), Tab::ALL.iter().map(Tab::link));

        let app = Self {
            mode: AppMode::Normal,
            tab: Tab::Upload,
            nav,
            settings,
            input_buffer: String::new(),
            reporter: CompletionReporter::new(),
            browser,
            selected_row: 0,
            modal: ImageModal::new(),
            notices: NoticeBoard::new(),
            sync_state,
            logs: vec![
                LogEntry::new(LogLevel::Info, "Filedock TUI 启动"),
                LogEntry::new(LogLevel::Info, "按 'i' 输入上传路径, Tab 切换标签, 'q' 退出"),
            ],
            log_level: LogLevel::Info,
            event_tx,
            event_rx,
            api,
            pipeline,
            clipboard: SystemClipboard::new(),
        };
        app.reload();
        Ok(app)
    }

    pub fn add_log(&mut self, level: LogLevel, message: impl Into<String>) {
        self.logs.push(LogEntry::new(level, message));
        self.trim_logs();
    }

    fn trim_logs(&mut self) {
        if self.logs.len() > MAX_LOGS {
            let excess = self.logs.len() - MAX_LOGS;
            self.logs.drain(..excess);
        }
    }

    pub fn visible_logs(&self) -> impl DoubleEndedIterator<Item = &LogEntry> {
        self.logs.iter().filter(|e| e.visible_at(self.log_level))
    }

    pub fn sync_state(&self) -> SyncState {
        *self.sync_state.borrow()
    }

    // ========================================================================
    // 导航
    // ========================================================================

    pub fn set_tab(&mut self, tab: Tab) {
        self.tab = tab;
        self.nav
            .set_active(tab.link(), Tab::ALL.iter().map(Tab::link));
    }

    pub fn next_tab(&mut self) {
        let next = match self.tab {
            Tab::Upload => Tab::Files,
            Tab::Files => Tab::Log,
            Tab::Log => Tab::Upload,
        };
        self.set_tab(next);
    }

    pub fn next_row(&mut self) {
        let len = self.browser.roster().len();
        if len > 0 {
            self.selected_row = (self.selected_row + 1) % len;
        }
    }

    pub fn previous_row(&mut self) {
        let len = self.browser.roster().len();
        if len > 0 {
            self.selected_row = self.selected_row.checked_sub(1).unwrap_or(len - 1);
        }
    }

    fn clamp_row(&mut self) {
        let len = self.browser.roster().len();
        if self.selected_row >= len {
            self.selected_row = len.saturating_sub(1);
        }
    }

    fn current_entry(&self) -> Option<RosterEntry> {
        self.browser
            .roster()
            .get(self.selected_row)
            .map(|row| row.entry.clone())
    }

    // ========================================================================
    // 上传
    // ========================================================================

    /// 按顺序入队；新的一批会清空进度区和完成区
    pub fn enqueue_paths(&mut self, paths: Vec<String>) {
        if paths.is_empty() {
            return;
        }
        self.reporter.clear();
        let sources: Vec<UploadSource> = paths.into_iter().map(UploadSource::path).collect();
        match self.pipeline.enqueue(sources) {
            Ok(ids) => self.add_log(LogLevel::Info, format!("已加入上传队列: {} 个文件", ids.len())),
            Err(e) => self.add_log(LogLevel::Error, format!("无法加入上传队列: {}", e)),
        }
    }

    fn submit_input(&mut self) {
        let paths = split_paths(&self.input_buffer);
        self.input_buffer.clear();
        self.mode = AppMode::Normal;
        self.enqueue_paths(paths);
    }

    // ========================================================================
    // 文件列表
    // ========================================================================

    pub fn reload(&self) {
        let api = self.api.clone();
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let result = api.list_files().await;
            let _ = tx.send(AppEvent::Reloaded(result)).await;
        });
    }

    fn request_delete(&mut self) {
        let Some(entry) = self.current_entry() else {
            return;
        };
        self.confirm_or_run(PendingAction::Delete(entry.file_id));
    }

    fn request_batch_delete(&mut self) {
        match self.browser.begin_batch_delete() {
            Ok(ids) => self.confirm_or_run(PendingAction::BatchDelete(ids)),
            Err(notice) => self.notices.push(notice),
        }
    }

    fn confirm_or_run(&mut self, action: PendingAction) {
        if self.settings.confirm_deletes {
            self.mode = AppMode::Confirm(action);
        } else {
            self.run(action);
        }
    }

    fn run(&mut self, action: PendingAction) {
        let api = self.api.clone();
        let tx = self.event_tx.clone();
        match action {
            PendingAction::Delete(file_id) => {
                tokio::spawn(async move {
                    let result = api.delete_file(&file_id).await;
                    let _ = tx.send(AppEvent::Deleted { file_id, result }).await;
                });
            }
            PendingAction::BatchDelete(ids) => {
                tokio::spawn(async move {
                    let result = api.batch_delete(&ids).await;
                    let _ = tx.send(AppEvent::BatchDeleted(result)).await;
                });
            }
        }
    }

    fn copy_current(&mut self) {
        if let Some(entry) = self.current_entry() {
            let notice = self
                .browser
                .copy_link(&entry.download_path(), &mut self.clipboard);
            self.notices.push(notice);
        }
    }

    fn copy_selected(&mut self) {
        let notice = self.browser.copy_selected_links(&mut self.clipboard);
        self.notices.push(notice);
    }

    fn show_details(&mut self) {
        if let Some(entry) = self.current_entry() {
            let src = self.browser.absolute_url(&entry.download_path());
            self.modal.show(src, entry.filename);
        }
    }

    // ========================================================================
    // 按键
    // ========================================================================

    /// 处理按键，返回 `true` 表示退出
    pub fn on_key(&mut self, code: KeyCode) -> bool {
        // 弹窗优先
        if self.modal.is_open() {
            match code {
                KeyCode::Enter => self.modal.close(),
                // 弹窗以外的区域
                KeyCode::Esc | KeyCode::Char('q') => self.modal.close_if_backdrop(true),
                _ => {}
            }
            return false;
        }

        match self.mode.clone() {
            AppMode::Confirm(action) => {
                match code {
                    KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                        self.mode = AppMode::Normal;
                        self.run(action);
                    }
                    KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                        self.mode = AppMode::Normal;
                    }
                    _ => {}
                }
                false
            }
            AppMode::Input => {
                match code {
                    KeyCode::Esc => {
                        self.input_buffer.clear();
                        self.mode = AppMode::Normal;
                    }
                    KeyCode::Enter => self.submit_input(),
                    KeyCode::Char(c) => self.input_buffer.push(c),
                    KeyCode::Backspace => {
                        self.input_buffer.pop();
                    }
                    _ => {}
                }
                false
            }
            AppMode::Normal => self.on_normal_key(code),
        }
    }

    fn on_normal_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Tab => self.next_tab(),
            KeyCode::Char('1') => self.set_tab(Tab::Upload),
            KeyCode::Char('2') => self.set_tab(Tab::Files),
            KeyCode::Char('3') => self.set_tab(Tab::Log),
            KeyCode::Char('?') => self.nav.toggle(),
            _ => match self.tab {
                Tab::Upload => {
                    if matches!(code, KeyCode::Char('i') | KeyCode::Enter) {
                        self.mode = AppMode::Input;
                    }
                }
                Tab::Files => self.on_files_key(code),
                Tab::Log => match code {
                    KeyCode::Char('d') => {
                        self.log_level = self.log_level.toggle_verbose();
                    }
                    KeyCode::Char('c') => self.logs.clear(),
                    _ => {}
                },
            },
        }
        false
    }

    fn on_files_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Up | KeyCode::Char('k') => self.previous_row(),
            KeyCode::Down | KeyCode::Char('j') => self.next_row(),
            KeyCode::Char(' ') => self.browser.toggle(self.selected_row),
            KeyCode::Char('a') => self.browser.toggle_all(),
            KeyCode::Char('d') => self.request_delete(),
            KeyCode::Char('D') => self.request_batch_delete(),
            KeyCode::Char('c') => self.copy_current(),
            KeyCode::Char('C') => self.copy_selected(),
            KeyCode::Char('f') => {
                let format = self.browser.cycle_link_format();
                self.add_log(LogLevel::Info, format!("链接格式: {}", format.label()));
            }
            KeyCode::Char('r') => self.reload(),
            KeyCode::Enter => self.show_details(),
            _ => {}
        }
    }

    // ========================================================================
    // 后台事件
    // ========================================================================

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Log(entry) => {
                self.logs.push(entry);
                self.trim_logs();
            }
            AppEvent::Pipeline(event) => self.reporter.apply(&event),
            AppEvent::Pushed(entry) => {
                self.browser.on_push(entry);
                // 保持光标停在原来的行上
                if self.browser.roster().len() > 1 {
                    self.selected_row += 1;
                }
            }
            AppEvent::Reloaded(Ok(entries)) => {
                self.browser.reload(entries);
                self.clamp_row();
            }
            AppEvent::Reloaded(Err(e)) => {
                tracing::warn!("Failed to load file list: {}", e);
            }
            AppEvent::BatchDeleted(result) => {
                let report = self.browser.apply_batch_delete(result);
                self.notices.extend(report.notices);
                self.clamp_row();
                if report.reload_required {
                    self.reload();
                }
            }
            AppEvent::Deleted { file_id, result } => {
                if let Some(notice) = self.browser.apply_delete(&file_id, result) {
                    self.notices.push(notice);
                }
                self.clamp_row();
            }
        }
    }

    /// 处理积压的后台事件并清理过期提示
    pub fn tick(&mut self) {
        while let Ok(event) = self.event_rx.try_recv() {
            self.handle_event(event);
        }
        self.notices.prune(Instant::now());
    }
}

/// 按空白切分路径；单引号或双引号包住的部分保留空格
fn split_paths(input: &str) -> Vec<String> {
    let mut paths = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in input.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c.is_whitespace() => {
                if !current.is_empty() {
                    paths.push(std::mem::take(&mut current));
                }
            }
            None => current.push(c),
        }
    }
    if !current.is_empty() {
        paths.push(current);
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use filedock_core::Notice;

    fn entry(id: &str) -> RosterEntry {
        RosterEntry {
            file_id: id.to_string(),
            filename: format!("{}.png", id),
            filesize: 1,
            upload_date: "2024-05-01".to_string(),
        }
    }

    fn app() -> App {
        let settings = ClientSettings {
            // 无人监听的端口
            server_url: "http://127.0.0.1:9".to_string(),
            ..Default::default()
        };
        App::new(settings).unwrap()
    }

    #[tokio::test]
    async fn test_batch_delete_needs_selection_then_confirmation() {
        let mut app = app();
        app.handle_event(AppEvent::Reloaded(Ok(vec![entry("a"), entry("b")])));
        app.set_tab(Tab::Files);

        app.on_key(KeyCode::Char('D'));
        assert_eq!(app.mode, AppMode::Normal);
        assert_eq!(
            app.notices.visible().last(),
            Some(&Notice::error("Please select files to delete."))
        );

        app.on_key(KeyCode::Char('a'));
        assert!(app.browser.controls().select_all_checked);
        app.on_key(KeyCode::Char('D'));
        assert_eq!(
            app.mode,
            AppMode::Confirm(PendingAction::BatchDelete(vec!["a".into(), "b".into()]))
        );

        app.on_key(KeyCode::Esc);
        assert_eq!(app.mode, AppMode::Normal);
        assert_eq!(app.browser.roster().len(), 2);
    }

    #[tokio::test]
    async fn test_push_keeps_cursor_on_same_row() {
        let mut app = app();
        app.handle_event(AppEvent::Reloaded(Ok(vec![entry("a"), entry("b")])));
        app.set_tab(Tab::Files);
        app.on_key(KeyCode::Down);
        assert_eq!(app.selected_row, 1);

        app.handle_event(AppEvent::Pushed(entry("new")));
        assert_eq!(app.browser.roster().get(app.selected_row).unwrap().entry.file_id, "b");
    }

    #[tokio::test]
    async fn test_tabs_drive_nav_menu() {
        let mut app = app();
        assert!(app.nav.is_active("/"));
        app.on_key(KeyCode::Tab);
        assert_eq!(app.tab, Tab::Files);
        assert!(app.nav.is_active("/files"));

        app.on_key(KeyCode::Enter);
        assert!(!app.modal.is_open());

        app.handle_event(AppEvent::Reloaded(Ok(vec![entry("a")])));
        app.on_key(KeyCode::Enter);
        assert!(app.modal.is_open());
        assert_eq!(app.modal.caption(), "a.png");
        assert!(!app.on_key(KeyCode::Char('q')));
        assert!(!app.modal.is_open());
        assert!(app.on_key(KeyCode::Char('q')));
    }

    #[test]
    fn test_split_paths_keeps_quoted_spaces() {
        assert_eq!(
            split_paths(r#"a.png "my photos/b c.jpg"  'x y.txt' d"#),
            vec!["a.png", "my photos/b c.jpg", "x y.txt", "d"]
        );
        assert!(split_paths("   ").is_empty());
        // 未闭合的引号读到行尾
        assert_eq!(split_paths("\"half open"), vec!["half open"]);
    }

    #[tokio::test]
    async fn test_visible_logs_newest_first_by_level() {
        let mut app = app();
        app.logs.clear();
        app.log_level = LogLevel::Info;
        app.add_log(LogLevel::Info, "first");
        app.add_log(LogLevel::Debug, "noise");
        app.add_log(LogLevel::Warn, "second");

        let newest: Vec<&str> = app
            .visible_logs()
            .rev()
            .map(|e| e.message.as_str())
            .collect();
        assert_eq!(newest, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn test_logs_sent_before_startup_are_kept() {
        let (event_tx, event_rx) = event_channel();
        event_tx
            .try_send(AppEvent::Log(LogEntry::new(
                LogLevel::Warn,
                "Failed to parse settings: bad toml, using defaults",
            )))
            .unwrap();

        let settings = ClientSettings {
            server_url: "http://127.0.0.1:9".to_string(),
            ..Default::default()
        };
        let mut app = App::with_events(settings, event_tx, event_rx).unwrap();
        app.tick();

        assert!(
            app.logs
                .iter()
                .any(|e| e.level == LogLevel::Warn && e.message.starts_with("Failed to parse"))
        );
    }
}
