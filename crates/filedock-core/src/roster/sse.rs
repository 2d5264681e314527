//! `text/event-stream` 增量解码
//!
//! 事件格式：
//! - `data: ...` 可出现多行，按 `\n` 拼接
//! - `event: name` 事件名，缺省为 `message`
//! - `: ...` 注释（服务端心跳）
//! - 空行表示一个事件结束
//!
//! 支持 LF、CRLF、CR 三种换行，输入块可以在任意字节处切分。

/// 解码出的事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
    pub id: Option<String>,
}

impl SseEvent {
    /// 是否会触发 `onmessage`
    pub fn is_message(&self) -> bool {
        self.event.is_empty() || self.event == "message"
    }
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    /// 上一块以 `\r` 结尾时，下一块开头的 `\n` 属于同一个换行
    pending_cr: bool,
    event: String,
    data: Vec<String>,
    id: Option<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 输入一块字节，返回其中完整的事件
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        let mut events = Vec::new();

        for &byte in chunk {
            if self.pending_cr {
                self.pending_cr = false;
                if byte == b'\n' {
                    continue;
                }
            }
            match byte {
                b'\n' => self.end_line(&mut events),
                b'\r' => {
                    self.pending_cr = true;
                    self.end_line(&mut events);
                }
                _ => self.buffer.push(byte),
            }
        }

        events
    }

    fn end_line(&mut self, events: &mut Vec<SseEvent>) {
        let line = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();

        if line.is_empty() {
            if let Some(event) = self.dispatch() {
                events.push(event);
            }
            return;
        }

        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line.as_str(), ""),
        };

        match field {
            "data" => self.data.push(value.to_string()),
            "event" => self.event = value.to_string(),
            "id" => self.id = Some(value.to_string()),
            // 重连间隔固定，忽略 retry
            _ => {}
        }
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = std::mem::take(&mut self.event);
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent {
            event,
            data,
            id: self.id.clone(),
        })
    }
}
