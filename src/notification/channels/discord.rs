//! Discord 渠道（REST API，不维护 gateway 连接）
//!
//! 每个目的地是一个频道 id。403 表示 bot 在该频道没有发言权限。

use crate::notification::channel::{Destination, NotificationSink, SinkError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::info;

/// Discord 单条消息长度上限
const MAX_MESSAGE_LEN: usize = 2000;

/// Discord 渠道配置
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    /// Bot token
    pub token: String,
    /// API 地址
    pub api_base: String,
    /// 超时时间 (秒)
    pub timeout_secs: u64,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_base: "https://discord.com/api/v10".to_string(),
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateMessage<'a> {
    content: &'a str,
}

/// Discord 渠道
pub struct DiscordChannel {
    client: Client,
    config: DiscordConfig,
}

impl DiscordChannel {
    pub fn new(config: DiscordConfig) -> Result<Self> {
        if config.token.is_empty() {
            anyhow::bail!("Discord token is required");
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }
}

/// 按字符截断到 Discord 上限
fn truncate_message(text: &str) -> &str {
    match text.char_indices().nth(MAX_MESSAGE_LEN) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[async_trait]
impl NotificationSink for DiscordChannel {
    fn name(&self) -> &str {
        "discord"
    }

    async fn send(&self, destination: &Destination, text: &str) -> Result<(), SinkError> {
        let url = format!(
            "{}/channels/{}/messages",
            self.config.api_base.trim_end_matches('/'),
            destination.id
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bot {}", self.config.token))
            .json(&CreateMessage {
                content: truncate_message(text),
            })
            .send()
            .await
            .map_err(|e| SinkError::Transport(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {
                info!(channel = %destination, "Message sent successfully");
                Ok(())
            }
            StatusCode::FORBIDDEN => Err(SinkError::PermissionDenied(destination.id.clone())),
            status => Err(SinkError::Rejected {
                destination: destination.id.clone(),
                status: status.as_u16(),
            }),
        }
    }
}
