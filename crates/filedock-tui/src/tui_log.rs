//! TUI 日志层
//!
//! 自定义 tracing Layer，把日志事件转换为 [`LogEntry`] 发到"日志"标签页。
//! 来自依赖库（reqwest、hyper 等）的事件会带上目标名前缀。

use crate::app::AppEvent;
use filedock_core::logging::{LogEntry, LogLevel};
use std::fmt;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

pub struct TuiLogLayer {
    tx: mpsc::Sender<AppEvent>,
}

impl TuiLogLayer {
    pub fn new(tx: mpsc::Sender<AppEvent>) -> Self {
        Self { tx }
    }
}

fn panel_level(level: &Level) -> LogLevel {
    match *level {
        Level::ERROR => LogLevel::Error,
        Level::WARN => LogLevel::Warn,
        Level::INFO => LogLevel::Info,
        Level::DEBUG => LogLevel::Debug,
        Level::TRACE => LogLevel::Trace,
    }
}

impl<S> Layer<S> for TuiLogLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let target = metadata.target();
        let message = match visitor.message {
            None => target.to_string(),
            Some(message) if target.starts_with("filedock") => message,
            Some(message) => format!("[{}] {}", target, message),
        };

        // 面板来不及消费时丢弃
        let entry = LogEntry::new(panel_level(metadata.level()), message);
        let _ = self.tx.try_send(AppEvent::Log(entry));
    }
}

/// 取出 `message` 字段，没有时用第一个字段
#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
}

impl MessageVisitor {
    fn record(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = Some(value);
        } else if self.message.is_none() {
            self.message = Some(format!("{}={}", field.name(), value));
        }
    }
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record(field, format!("{:?}", value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record(field, value.to_string());
    }
}
