//! 客户端配置和持久化
//!
//! 提供服务器地址、链接格式、重连间隔等设置的存储和读取。

use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::selection::LinkFormat;

/// 默认服务器地址
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";

/// 推送流断开后的固定重连间隔（秒）
pub const DEFAULT_RECONNECT_DELAY_SECS: u64 = 5;

/// 客户端设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// 服务器地址（不含路径）
    pub server_url: String,
    /// 批量复制时使用的链接格式
    pub link_format: LinkFormat,
    /// 推送流重连间隔（秒）
    pub reconnect_delay_secs: u64,
    /// 删除前是否需要确认
    pub confirm_deletes: bool,
    /// 非上传请求的超时时间（秒），上传请求不设超时
    pub request_timeout_secs: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            link_format: LinkFormat::Url,
            reconnect_delay_secs: DEFAULT_RECONNECT_DELAY_SECS,
            confirm_deletes: true,
            request_timeout_secs: 30,
        }
    }
}

impl ClientSettings {
    /// 获取配置文件路径
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("filedock");
        config_dir.join("settings.toml")
    }

    /// 加载设置（如果文件不存在则使用默认值）
    pub fn load() -> Self {
        let path = Self::config_path();
        if path.exists() {
            match fs::read_to_string(&path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(settings) => {
                        debug!("Loaded settings from {:?}", path);
                        return settings;
                    }
                    Err(e) => {
                        log::warn!("Failed to parse settings: {}, using defaults", e);
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read settings file: {}, using defaults", e);
                }
            }
        }
        Self::default()
    }

    /// 保存设置
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        debug!("Saved settings to {:?}", path);
        Ok(())
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// 去掉末尾斜杠的服务器地址，用于拼接绝对链接
    pub fn origin(&self) -> &str {
        self.server_url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = ClientSettings::default();
        assert_eq!(settings.server_url, "http://127.0.0.1:8000");
        assert_eq!(settings.link_format, LinkFormat::Url);
        assert_eq!(settings.reconnect_delay(), Duration::from_secs(5));
        assert!(settings.confirm_deletes);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let settings: ClientSettings =
            toml::from_str("server_url = \"https://files.example.com/\"\nlink_format = \"markdown\"")
                .unwrap();
        assert_eq!(settings.origin(), "https://files.example.com");
        assert_eq!(settings.link_format, LinkFormat::Markdown);
        assert_eq!(settings.reconnect_delay_secs, 5);
    }

    #[test]
    fn test_toml_roundtrip_keeps_format() {
        let settings = ClientSettings {
            link_format: LinkFormat::Ubb,
            ..Default::default()
        };
        let text = toml::to_string_pretty(&settings).unwrap();
        assert!(text.contains("link_format = \"ubb\""), "{}", text);
    }
}
