//! 通知渠道 trait 定义

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 消息目的地（如 Discord 频道 id）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Destination {
    pub id: String,
    /// 可读名称（仅用于日志）
    pub label: Option<String>,
}

impl Destination {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{} ({})", label, self.id),
            None => f.write_str(&self.id),
        }
    }
}

/// 单个目的地的发送错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SinkError {
    /// 没有在该目的地发消息的权限
    #[error("permission denied for destination {0}")]
    PermissionDenied(String),

    /// 服务端拒绝（非 2xx）
    #[error("destination {destination} rejected message: HTTP {status}")]
    Rejected { destination: String, status: u16 },

    /// 网络层错误
    #[error("transport error: {0}")]
    Transport(String),
}

/// 通知渠道 trait
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// 渠道名称（用于日志）
    fn name(&self) -> &str;

    /// 向一个目的地发送一条文本消息
    async fn send(&self, destination: &Destination, text: &str) -> Result<(), SinkError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_display() {
        assert_eq!(Destination::new("123").to_string(), "123");
        assert_eq!(
            Destination::new("123").with_label("general").to_string(),
            "general (123)"
        );
    }

    #[test]
    fn test_sink_error_messages() {
        let err = SinkError::Rejected {
            destination: "123".into(),
            status: 429,
        };
        assert!(err.to_string().contains("HTTP 429"));
        assert!(SinkError::PermissionDenied("123".into())
            .to_string()
            .contains("permission denied"));
    }
}
