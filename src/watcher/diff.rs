//! State diff - 比较两次快照，产生状态转换事件

use crate::torrent::{Job, JobState, Snapshot};

/// 一次状态转换
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionEvent {
    pub id: String,
    pub name: String,
    /// 上一次快照中的状态，`None` 表示首次见到
    pub from: Option<JobState>,
    pub to: JobState,
    /// 当前快照中的任务属性
    pub job: Job,
}

impl TransitionEvent {
    pub fn is_first_sighting(&self) -> bool {
        self.from.is_none()
    }

    /// 用于日志的 from 状态
    pub fn from_label(&self) -> &'static str {
        self.from.map(|s| s.label()).unwrap_or("unknown")
    }
}

/// 对 `current` 中每个 id 与 `previous` 比较状态，状态不同即产生事件
///
/// 事件顺序与 `current` 的插入顺序一致。只存在于 `previous` 的任务不产生事件：
/// 它们只是离开了这个过滤器的视图。
pub fn diff(previous: &Snapshot, current: &Snapshot) -> Vec<TransitionEvent> {
    current
        .iter()
        .filter_map(|job| {
            let from = previous.state_of(&job.id);
            if from == Some(job.state) {
                return None;
            }
            Some(TransitionEvent {
                id: job.id.clone(),
                name: job.name.clone(),
                from,
                to: job.state,
                job: job.clone(),
            })
        })
        .collect()
}
