//! 实时文件列表同步
//!
//! 状态机：`Disconnected -> Connecting -> Connected -> (出错) Disconnected`，
//! 一直循环到消费端关闭。
//!
//! 出错（包括服务端关闭推送流）后关闭订阅，固定等待重连间隔后重新连接。
//! 间隔不增长，也没有重试次数上限。

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use log::{debug, info, warn};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use super::RosterEntry;
use super::sse::{SseDecoder, SseEvent};
use crate::api::ApiClient;
use crate::config::DEFAULT_RECONNECT_DELAY_SECS;
use crate::error::{Error, Result};

/// 推送流：每一项是一条消息的 data 载荷
pub type PushStream = BoxStream<'static, Result<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Disconnected,
    Connecting,
    Connected,
}

impl SyncState {
    pub fn label(&self) -> &'static str {
        match self {
            SyncState::Disconnected => "disconnected",
            SyncState::Connecting => "connecting",
            SyncState::Connected => "connected",
        }
    }
}

/// 推送流来源
#[async_trait]
pub trait PushSource: Send + Sync + 'static {
    async fn connect(&self) -> Result<PushStream>;
}

/// `GET /api/file-updates` SSE 推送
#[derive(Debug, Clone)]
pub struct HttpPushSource {
    api: ApiClient,
}

impl HttpPushSource {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl PushSource for HttpPushSource {
    async fn connect(&self) -> Result<PushStream> {
        let response = self.api.file_updates().await?;
        let mut decoder = SseDecoder::new();

        let payloads = response.bytes_stream().flat_map(move |chunk| {
            let items: Vec<Result<String>> = match chunk {
                Ok(bytes) => decoder
                    .feed(&bytes)
                    .into_iter()
                    .filter(SseEvent::is_message)
                    .map(|event| Ok(event.data))
                    .collect(),
                Err(e) => vec![Err(Error::Http(e))],
            };
            stream::iter(items)
        });

        Ok(payloads.boxed())
    }
}

pub struct LiveRosterSync<S> {
    source: S,
    retry_delay: Duration,
    state: watch::Sender<SyncState>,
}

impl<S: PushSource> LiveRosterSync<S> {
    pub fn new(source: S) -> Self {
        let (state, _) = watch::channel(SyncState::Disconnected);
        Self {
            source,
            retry_delay: Duration::from_secs(DEFAULT_RECONNECT_DELAY_SECS),
            state,
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// 订阅连接状态
    pub fn subscribe_state(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// 持续同步，直到 `entries` 的接收端被关闭
    pub async fn run(self, entries: mpsc::UnboundedSender<RosterEntry>) {
        loop {
            self.state.send_replace(SyncState::Connecting);

            match self.source.connect().await {
                Ok(stream) => {
                    self.state.send_replace(SyncState::Connected);
                    info!("Push stream connected for file updates");
                    if !self.pump(stream, &entries).await {
                        break;
                    }
                }
                Err(e) => {
                    warn!(
                        "Push stream failed to connect, will retry in {:?}: {}",
                        self.retry_delay, e
                    );
                }
            }

            self.state.send_replace(SyncState::Disconnected);

            tokio::select! {
                _ = tokio::time::sleep(self.retry_delay) => {}
                _ = entries.closed() => break,
            }
        }

        self.state.send_replace(SyncState::Disconnected);
        debug!("Live roster sync stopped");
    }

    /// 转发消息直到流出错或结束；消费端关闭时返回 `false`
    async fn pump(
        &self,
        mut stream: PushStream,
        entries: &mpsc::UnboundedSender<RosterEntry>,
    ) -> bool {
        loop {
            tokio::select! {
                item = stream.next() => match item {
                    Some(Ok(payload)) => match serde_json::from_str::<RosterEntry>(&payload) {
                        Ok(entry) => {
                            debug!("Pushed file: {} ({})", entry.filename, entry.file_id);
                            if entries.send(entry).is_err() {
                                return false;
                            }
                        }
                        Err(e) => warn!("Ignoring malformed file update: {}. Payload: {}", e, payload),
                    },
                    Some(Err(e)) => {
                        warn!("Push stream failed, will retry in {:?}: {}", self.retry_delay, e);
                        return true;
                    }
                    None => {
                        warn!("Push stream closed, will retry in {:?}", self.retry_delay);
                        return true;
                    }
                },
                _ = entries.closed() => return false,
            }
        }
    }
}
