//! 通知记忆 - 记录每个任务已经发送过哪些通知
//!
//! 只在进程生命周期内有效，不持久化。重启后所有进行中的任务会被重新通知。

use std::collections::{HashMap, HashSet};

/// 通知类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    QueuedAnnounced,
    StartedAnnounced,
    StabilizedReportSent,
    CompletedAnnounced,
}

/// 每个任务 id 已发送的通知集合
#[derive(Debug, Default)]
pub struct NotificationMemory {
    sent: HashMap<String, HashSet<NotificationKind>>,
}

impl NotificationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 是否已发送过
    pub fn has(&self, id: &str, kind: NotificationKind) -> bool {
        self.sent.get(id).is_some_and(|kinds| kinds.contains(&kind))
    }

    /// 标记为已发送，返回 `true` 表示这是第一次标记
    pub fn mark(&mut self, id: &str, kind: NotificationKind) -> bool {
        self.sent.entry(id.to_string()).or_default().insert(kind)
    }

    /// 被记录的任务数
    pub fn len(&self) -> usize {
        self.sent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_is_idempotent() {
        let mut memory = NotificationMemory::new();
        assert!(!memory.has("t1", NotificationKind::StartedAnnounced));
        assert!(memory.mark("t1", NotificationKind::StartedAnnounced));
        assert!(!memory.mark("t1", NotificationKind::StartedAnnounced));
        assert!(memory.has("t1", NotificationKind::StartedAnnounced));
    }

    #[test]
    fn test_kinds_are_independent_per_id() {
        let mut memory = NotificationMemory::new();
        memory.mark("t1", NotificationKind::QueuedAnnounced);
        memory.mark("t2", NotificationKind::CompletedAnnounced);

        assert!(!memory.has("t1", NotificationKind::CompletedAnnounced));
        assert!(!memory.has("t2", NotificationKind::QueuedAnnounced));
        assert!(memory.has("t1", NotificationKind::QueuedAnnounced));
        assert!(!memory.has("missing", NotificationKind::QueuedAnnounced));
        assert_eq!(memory.len(), 2);
    }
}
