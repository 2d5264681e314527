//! 短暂提示 (toast)

use std::time::{Duration, Instant};

/// 提示显示时长
pub const NOTICE_LIFETIME: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

impl NoticeLevel {
    pub fn icon(&self) -> &'static str {
        match self {
            NoticeLevel::Success => "✅",
            NoticeLevel::Error => "❌",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.level.icon(), self.message)
    }
}

/// 当前显示中的提示，按到达顺序
#[derive(Debug)]
pub struct NoticeBoard {
    lifetime: Duration,
    notices: Vec<(Instant, Notice)>,
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::with_lifetime(NOTICE_LIFETIME)
    }

    pub fn with_lifetime(lifetime: Duration) -> Self {
        Self {
            lifetime,
            notices: Vec::new(),
        }
    }

    pub fn push(&mut self, notice: Notice) {
        self.push_at(notice, Instant::now());
    }

    pub fn push_at(&mut self, notice: Notice, now: Instant) {
        self.notices.push((now, notice));
    }

    pub fn extend(&mut self, notices: impl IntoIterator<Item = Notice>) {
        let now = Instant::now();
        for notice in notices {
            self.push_at(notice, now);
        }
    }

    /// 移除已过期的提示
    pub fn prune(&mut self, now: Instant) {
        let lifetime = self.lifetime;
        self.notices
            .retain(|(shown, _)| now.saturating_duration_since(*shown) < lifetime);
    }

    pub fn visible(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter().map(|(_, notice)| notice)
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notices_expire_after_lifetime() {
        let mut board = NoticeBoard::new();
        let start = Instant::now();
        board.push_at(Notice::success("Link copied to clipboard!"), start);
        board.push_at(Notice::error("Failed to copy link."), start + Duration::from_secs(2));

        board.prune(start + Duration::from_millis(2999));
        assert_eq!(board.visible().count(), 2);

        board.prune(start + Duration::from_secs(3));
        let left: Vec<&str> = board.visible().map(|n| n.message.as_str()).collect();
        assert_eq!(left, vec!["Failed to copy link."]);

        board.prune(start + Duration::from_secs(5));
        assert!(board.is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!(Notice::error("nope").to_string(), "❌ nope");
        assert!(!Notice::success("ok").is_error());
    }
}
