//! 控制台渠道 - 没有配置 Discord 时输出到 stdout

use crate::notification::channel::{Destination, NotificationSink, SinkError};
use async_trait::async_trait;

pub struct ConsoleChannel;

impl ConsoleChannel {
    pub fn new() -> Self {
        Self
    }

    /// 控制台渠道的默认目的地
    pub fn destination() -> Destination {
        Destination::new("stdout").with_label("console")
    }
}

impl Default for ConsoleChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationSink for ConsoleChannel {
    fn name(&self) -> &str {
        "console"
    }

    async fn send(&self, destination: &Destination, text: &str) -> Result<(), SinkError> {
        println!("[notify] #{} {}", destination.id, text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_console_always_succeeds() {
        let channel = ConsoleChannel::new();
        assert!(channel
            .send(&ConsoleChannel::destination(), "hello")
            .await
            .is_ok());
    }
}
