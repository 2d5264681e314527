//! 剪贴板

use log::debug;

use crate::error::{Error, Result};

/// 文本剪贴板
pub trait ClipboardSink {
    fn write_text(&mut self, text: &str) -> Result<()>;
}

/// 系统剪贴板 (arboard)
///
/// 每次写入时打开，无图形会话的环境下写入返回 [`Error::Clipboard`]。
#[derive(Debug, Default)]
pub struct SystemClipboard;

impl SystemClipboard {
    pub fn new() -> Self {
        Self
    }
}

impl ClipboardSink for SystemClipboard {
    fn write_text(&mut self, text: &str) -> Result<()> {
        arboard::Clipboard::new()
            .and_then(|mut clipboard| clipboard.set_text(text.to_string()))
            .map_err(|e| Error::Clipboard(e.to_string()))?;
        debug!("Copied {} byte(s) to clipboard", text.len());
        Ok(())
    }
}

impl<F> ClipboardSink for F
where
    F: FnMut(&str) -> Result<()>,
{
    fn write_text(&mut self, text: &str) -> Result<()> {
        self(text)
    }
}
