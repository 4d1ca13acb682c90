//! Shared fakes for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use torrent_relay::{
    Destination, Job, JobFilter, JobState, NotificationDispatcher, NotificationMemory,
    NotificationScheduler, NotificationSink, PhrasePicker, SchedulerConfig, SinkError, Snapshot,
    SnapshotSource, SourceError,
};

pub fn job(id: &str, state: JobState) -> Job {
    Job {
        id: id.to_string(),
        name: format!("{}.iso", id),
        state,
        raw_state: String::new(),
        download_speed: 10_000,
        size_bytes: 1_000_000,
        downloaded_bytes: 400_000,
        peer_count: 4,
        queue_rank: 1,
    }
}

/// 过滤器视图中包含的状态（与 daemon 的分类一致）
pub fn in_view(filter: JobFilter, state: JobState) -> bool {
    match filter {
        JobFilter::All => true,
        JobFilter::Downloading => matches!(state, JobState::Queued | JobState::Downloading),
        JobFilter::Stalled => state == JobState::StalledSeeding,
        JobFilter::Completed => matches!(state, JobState::StalledSeeding | JobState::Completed),
    }
}

/// 按脚本返回结果的 Snapshot Source；脚本用完后返回最近一次成功的任务列表。
/// 返回前按过滤器视图筛选。
pub struct FakeSource {
    script: Mutex<VecDeque<Result<Vec<Job>, SourceError>>>,
    current: Mutex<Vec<Job>>,
    fetch_calls: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Arc<Self> {
        Self::scripted(Vec::new())
    }

    pub fn scripted(script: Vec<Result<Vec<Job>, SourceError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            current: Mutex::new(Vec::new()),
            fetch_calls: AtomicUsize::new(0),
        })
    }

    /// 替换 daemon 当前的任务（影响 fetch_job 和脚本用完后的 fetch）
    pub fn set_jobs(&self, jobs: Vec<Job>) {
        *self.current.lock().unwrap() = jobs;
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotSource for FakeSource {
    async fn authenticate(&self) -> Result<(), SourceError> {
        Ok(())
    }

    async fn fetch(&self, filter: JobFilter) -> Result<Snapshot, SourceError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        let jobs = match next {
            Some(Ok(jobs)) => {
                self.set_jobs(jobs.clone());
                jobs
            }
            Some(Err(e)) => return Err(e),
            None => self.current.lock().unwrap().clone(),
        };
        Ok(jobs
            .into_iter()
            .filter(|job| in_view(filter, job.state))
            .collect())
    }

    async fn fetch_job(&self, id: &str) -> Result<Option<Job>, SourceError> {
        Ok(self
            .current
            .lock()
            .unwrap()
            .iter()
            .find(|job| job.id == id)
            .cloned())
    }
}

/// 记录所有送达消息的渠道；`denied` 中的目的地返回 PermissionDenied
pub struct RecordingSink {
    denied: HashSet<String>,
    delay: Duration,
    delivered: Mutex<Vec<(String, String)>>,
    attempts: AtomicUsize,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Self::denying(&[])
    }

    pub fn denying(ids: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            denied: ids.iter().map(|id| id.to_string()).collect(),
            delay: Duration::ZERO,
            delivered: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
        })
    }

    /// 每次发送前等待 `delay`，模拟慢速投递
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            denied: HashSet::new(),
            delay,
            delivered: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
        })
    }

    pub fn delivered(&self) -> Vec<(String, String)> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.delivered().into_iter().map(|(_, text)| text).collect()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, destination: &Destination, text: &str) -> Result<(), SinkError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.denied.contains(&destination.id) {
            return Err(SinkError::PermissionDenied(destination.id.clone()));
        }
        self.delivered
            .lock()
            .unwrap()
            .push((destination.id.clone(), text.to_string()));
        Ok(())
    }
}

pub fn scheduler_with(
    source: Arc<FakeSource>,
    sink: Arc<RecordingSink>,
    destinations: &[&str],
    config: SchedulerConfig,
) -> NotificationScheduler {
    let dispatcher = NotificationDispatcher::new(sink)
        .with_destinations(destinations.iter().map(|id| Destination::new(*id)));
    NotificationScheduler::new(NotificationMemory::new(), dispatcher, source, config)
        .with_phrases(PhrasePicker::seeded(42))
}

pub fn scheduler(source: Arc<FakeSource>, sink: Arc<RecordingSink>) -> NotificationScheduler {
    scheduler_with(source, sink, &["general"], SchedulerConfig::default())
}
