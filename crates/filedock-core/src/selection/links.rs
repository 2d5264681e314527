//! 复制链接的格式

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkFormat {
    #[default]
    Url,
    Markdown,
    Html,
    Ubb,
}

impl LinkFormat {
    pub const ALL: [LinkFormat; 4] = [
        LinkFormat::Url,
        LinkFormat::Markdown,
        LinkFormat::Html,
        LinkFormat::Ubb,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LinkFormat::Url => "url",
            LinkFormat::Markdown => "markdown",
            LinkFormat::Html => "html",
            LinkFormat::Ubb => "ubb",
        }
    }

    /// 提示中使用的大写名称
    pub fn label(&self) -> String {
        self.name().to_uppercase()
    }

    /// 循环切换到下一种格式
    pub fn next(self) -> Self {
        match self {
            LinkFormat::Url => LinkFormat::Markdown,
            LinkFormat::Markdown => LinkFormat::Html,
            LinkFormat::Html => LinkFormat::Ubb,
            LinkFormat::Ubb => LinkFormat::Url,
        }
    }

    pub fn format(&self, name: &str, url: &str) -> String {
        match self {
            LinkFormat::Url => url.to_string(),
            LinkFormat::Markdown => format!("![{}]({})", name, url),
            LinkFormat::Html => format!("<img src=\"{}\" alt=\"{}\">", url, name),
            LinkFormat::Ubb => format!("[img]{}[/img]", url),
        }
    }
}

impl fmt::Display for LinkFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LinkFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "url" => Ok(LinkFormat::Url),
            "markdown" | "md" => Ok(LinkFormat::Markdown),
            "html" => Ok(LinkFormat::Html),
            "ubb" | "bbcode" => Ok(LinkFormat::Ubb),
            other => Err(format!(
                "unknown link format '{}', expected url, markdown, html or ubb",
                other
            )),
        }
    }
}
