//! Filedock TUI - 交互式终端界面
//!
//! 使用 ratatui 提供上传队列、文件列表和实时推送的界面。
//! 命令行参数中的文件路径会在启动后立即加入上传队列。
//!
//! # 日志
//!
//! 日志默认显示在 TUI 的"日志"标签页中。
//! 如需输出到文件进行调试，设置 RUST_LOG 环境变量：
//!
//! ```bash
//! RUST_LOG=debug cargo run -p filedock-tui 2>> /tmp/filedock.log
//! ```

mod app;
mod tui_log;
mod ui;

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use filedock_core::ClientSettings;
use ratatui::prelude::*;
use std::io;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use app::App;
use tui_log::TuiLogLayer;

#[tokio::main]
async fn main() -> Result<()> {
    let paths: Vec<String> = std::env::args().skip(1).collect();

    // 先接好日志，加载设置时的警告才能显示在日志面板
    let (event_tx, event_rx) = app::event_channel();
    init_logging(event_tx.clone());
    let mut app = App::with_events(ClientSettings::load(), event_tx, event_rx)?;
    app.enqueue_paths(paths);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

/// 初始化日志系统
///
/// - 总是将日志发送到 TUI 日志面板
/// - 如果设置了 RUST_LOG，同时输出到 stderr（用于调试）
fn init_logging(log_tx: tokio::sync::mpsc::Sender<app::AppEvent>) {
    // 桥接 log crate（filedock-core 使用）到 tracing
    let _ = tracing_log::LogTracer::init();

    let tui_layer = TuiLogLayer::new(log_tx);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,filedock_core=debug"));

    if std::env::var("RUST_LOG").is_ok() {
        use tracing_subscriber::fmt;

        let stderr_layer = fmt::layer()
            .with_writer(io::stderr)
            .with_target(true)
            .compact();

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(tui_layer)
            .with(stderr_layer)
            .try_init();
    } else {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(tui_layer)
            .try_init();
    }
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, mut app: App) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, &app))?;

        // 使用 poll 避免阻塞后台事件
        if event::poll(Duration::from_millis(100))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
            && app.on_key(key.code)
        {
            return Ok(());
        }

        app.tick();
    }
}
