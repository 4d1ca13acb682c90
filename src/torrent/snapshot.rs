//! Snapshot - 某一次 fetch 时刻的 id -> Job 映射
//!
//! 保留 daemon 响应的顺序，diff 按这个顺序产生事件。

use super::job::{Job, JobState};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// 不可变的任务快照
#[derive(Debug, Clone)]
pub struct Snapshot {
    jobs: Vec<Job>,
    index: HashMap<String, usize>,
    captured_at: DateTime<Utc>,
}

impl Snapshot {
    /// 空快照（冷启动时的 previous）
    pub fn empty() -> Self {
        Self {
            jobs: Vec::new(),
            index: HashMap::new(),
            captured_at: Utc::now(),
        }
    }

    /// 从任务列表构建快照
    ///
    /// 同一 id 出现多次时保留第一次出现的位置，属性取最后一次。
    pub fn from_jobs(jobs: impl IntoIterator<Item = Job>) -> Self {
        let mut ordered: Vec<Job> = Vec::new();
        let mut index = HashMap::new();

        for job in jobs {
            match index.get(&job.id) {
                Some(&pos) => ordered[pos] = job,
                None => {
                    index.insert(job.id.clone(), ordered.len());
                    ordered.push(job);
                }
            }
        }

        Self {
            jobs: ordered,
            index,
            captured_at: Utc::now(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Job> {
        self.index.get(id).map(|&pos| &self.jobs[pos])
    }

    /// 查询某个 id 的状态，不存在返回 None
    pub fn state_of(&self, id: &str) -> Option<JobState> {
        self.get(id).map(|job| job.state)
    }

    /// 按插入顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// 统计处于某状态的任务数
    pub fn count_in(&self, state: JobState) -> usize {
        self.jobs.iter().filter(|job| job.state == state).count()
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl FromIterator<Job> for Snapshot {
    fn from_iter<T: IntoIterator<Item = Job>>(iter: T) -> Self {
        Self::from_jobs(iter)
    }
}
