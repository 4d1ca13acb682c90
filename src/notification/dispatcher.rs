//! 通知分发器 - 按顺序尝试目的地，第一个成功即停止

use super::channel::{Destination, NotificationSink};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// 分发结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// 成功送达的目的地
    Delivered(Destination),
    /// dry-run 模式，未实际发送
    DryRun,
}

/// 分发失败
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// 所有目的地都失败
    #[error("all {attempts} destinations failed")]
    Exhausted { attempts: usize },

    #[error("no destinations configured")]
    NoDestinations,
}

/// 通知分发器
pub struct NotificationDispatcher {
    sink: Arc<dyn NotificationSink>,
    /// 按优先级排列的目的地
    destinations: Vec<Destination>,
    /// 是否为 dry-run 模式
    dry_run: bool,
}

impl NotificationDispatcher {
    /// 创建新的分发器
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            sink,
            destinations: Vec::new(),
            dry_run: false,
        }
    }

    /// 设置 dry-run 模式
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_destinations(mut self, destinations: impl IntoIterator<Item = Destination>) -> Self {
        for destination in destinations {
            self.add_destination(destination);
        }
        self
    }

    /// 追加目的地（排在已有目的地之后）
    pub fn add_destination(&mut self, destination: Destination) {
        info!(sink = self.sink.name(), destination = %destination, "Registering destination");
        self.destinations.push(destination);
    }

    /// 发送消息：按顺序尝试，单个目的地的错误只记录日志
    pub async fn deliver(&self, text: &str) -> Result<DeliveryOutcome, DeliveryError> {
        if self.destinations.is_empty() {
            return Err(DeliveryError::NoDestinations);
        }

        if self.dry_run {
            info!(sink = self.sink.name(), message = %text, "[DRY-RUN] Would send message");
            return Ok(DeliveryOutcome::DryRun);
        }

        for destination in &self.destinations {
            match self.sink.send(destination, text).await {
                Ok(()) => return Ok(DeliveryOutcome::Delivered(destination.clone())),
                Err(e) => {
                    warn!(
                        sink = self.sink.name(),
                        destination = %destination,
                        error = %e,
                        "Destination failed, trying next"
                    );
                }
            }
        }

        Err(DeliveryError::Exhausted {
            attempts: self.destinations.len(),
        })
    }

    pub fn destination_count(&self) -> usize {
        self.destinations.len()
    }

    pub fn destinations(&self) -> &[Destination] {
        &self.destinations
    }

    pub fn sink_name(&self) -> &str {
        self.sink.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::channel::SinkError;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// 测试用的 mock 渠道：`denied` 中的目的地返回 PermissionDenied
    struct MockSink {
        denied: HashSet<String>,
        attempts: Mutex<Vec<String>>,
    }

    impl MockSink {
        fn new(denied: &[&str]) -> Self {
            Self {
                denied: denied.iter().map(|d| d.to_string()).collect(),
                attempts: Mutex::new(Vec::new()),
            }
        }

        fn attempts(&self) -> Vec<String> {
            self.attempts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NotificationSink for MockSink {
        fn name(&self) -> &str {
            "mock"
        }

        async fn send(&self, destination: &Destination, _text: &str) -> Result<(), SinkError> {
            self.attempts.lock().unwrap().push(destination.id.clone());
            if self.denied.contains(&destination.id) {
                Err(SinkError::PermissionDenied(destination.id.clone()))
            } else {
                Ok(())
            }
        }
    }

    fn dispatcher(sink: Arc<MockSink>, ids: &[&str]) -> NotificationDispatcher {
        NotificationDispatcher::new(sink).with_destinations(ids.iter().map(|id| Destination::new(*id)))
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let sink = Arc::new(MockSink::new(&[]));
        let outcome = dispatcher(sink.clone(), &["1", "2", "3"]).deliver("hi").await.unwrap();

        assert_eq!(outcome, DeliveryOutcome::Delivered(Destination::new("1")));
        assert_eq!(sink.attempts(), vec!["1"]);
    }

    #[tokio::test]
    async fn test_permission_denied_falls_through_to_next() {
        let sink = Arc::new(MockSink::new(&["1"]));
        let outcome = dispatcher(sink.clone(), &["1", "2", "3"]).deliver("hi").await.unwrap();

        assert_eq!(outcome, DeliveryOutcome::Delivered(Destination::new("2")));
        assert_eq!(sink.attempts(), vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_all_denied_is_exhausted() {
        let sink = Arc::new(MockSink::new(&["1", "2"]));
        let result = dispatcher(sink.clone(), &["1", "2"]).deliver("hi").await;

        assert_eq!(result, Err(DeliveryError::Exhausted { attempts: 2 }));
        assert_eq!(sink.attempts().len(), 2);
    }

    #[tokio::test]
    async fn test_no_destinations() {
        let sink = Arc::new(MockSink::new(&[]));
        let result = dispatcher(sink, &[]).deliver("hi").await;
        assert_eq!(result, Err(DeliveryError::NoDestinations));
    }

    #[tokio::test]
    async fn test_dry_run_does_not_send() {
        let sink = Arc::new(MockSink::new(&[]));
        let dispatcher = dispatcher(sink.clone(), &["1"]).with_dry_run(true);

        assert_eq!(dispatcher.deliver("hi").await, Ok(DeliveryOutcome::DryRun));
        assert!(sink.attempts().is_empty()); // 不应该实际发送
    }
}
