//! Poll loop - 固定间隔拉取快照，diff 后交给调度器
//!
//! 每个过滤器单独保存上一次*成功*的快照。拉取失败时保留旧快照，
//! 下一次成功时与它比较，不会漏掉转换，只会延迟。
//!
//! 任务可能从一个过滤器的视图移到另一个（downloading -> completed），
//! 所以另外记录每个任务跨过滤器最后一次看到的状态，用来补全
//! 首次出现在某个视图中的事件的 `from`。

use super::diff::{diff, TransitionEvent};
use crate::error::SourceError;
use crate::notification::NotificationScheduler;
use crate::source::{JobFilter, SnapshotSource};
use crate::torrent::{JobState, Snapshot};
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// 连续失败多少次后升级为 error 日志
const FAILURE_ESCALATION_THRESHOLD: u32 = 5;

/// Ctrl-C 后等待后台投递的上限，超时后放弃未完成的稳定期报告
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// 启动方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartMode {
    /// previous 为空，启动时已有的任务都视为新出现
    #[default]
    Cold,
    /// 启动前先拉一次作为 previous，只通知之后的变化
    Warm,
}

impl FromStr for StartMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cold" => Ok(StartMode::Cold),
            "warm" => Ok(StartMode::Warm),
            other => Err(anyhow!("unknown start mode '{}', expected 'cold' or 'warm'", other)),
        }
    }
}

/// Poll loop 状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// 等待下一次 tick
    Idle,
    /// fetch -> diff -> schedule 进行中
    Polling,
}

#[derive(Debug, Clone)]
pub struct PollLoopConfig {
    /// 两次 poll 开始之间的间隔
    pub interval: Duration,
    pub start_mode: StartMode,
    pub filters: Vec<JobFilter>,
    /// 单次 fetch 的上限
    pub fetch_timeout: Duration,
}

impl Default for PollLoopConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            start_mode: StartMode::Cold,
            filters: vec![JobFilter::All],
            fetch_timeout: Duration::from_secs(10),
        }
    }
}

pub struct PollLoop {
    source: Arc<dyn SnapshotSource>,
    scheduler: NotificationScheduler,
    config: PollLoopConfig,
    /// 每个过滤器上一次成功的快照
    previous: HashMap<JobFilter, Snapshot>,
    /// 每个过滤器的连续失败次数
    failures: HashMap<JobFilter, u32>,
    /// 任意过滤器中最后一次看到的任务状态
    last_known: HashMap<String, JobState>,
    state: LoopState,
}

impl PollLoop {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        scheduler: NotificationScheduler,
        mut config: PollLoopConfig,
    ) -> Self {
        let mut seen = Vec::new();
        config.filters.retain(|f| {
            if seen.contains(f) {
                false
            } else {
                seen.push(*f);
                true
            }
        });
        if config.filters.is_empty() {
            config.filters.push(JobFilter::All);
        }

        Self {
            source,
            scheduler,
            config,
            previous: HashMap::new(),
            failures: HashMap::new(),
            last_known: HashMap::new(),
            state: LoopState::Idle,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn config(&self) -> &PollLoopConfig {
        &self.config
    }

    /// 某个过滤器上一次成功的快照
    pub fn previous(&self, filter: JobFilter) -> Option<&Snapshot> {
        self.previous.get(&filter)
    }

    /// 任意过滤器中最后一次看到的状态
    pub fn last_known_state(&self, id: &str) -> Option<JobState> {
        self.last_known.get(id).copied()
    }

    fn remember(&mut self, snapshot: &Snapshot) {
        for job in snapshot.iter() {
            self.last_known.insert(job.id.clone(), job.state);
        }
    }

    /// 在某个视图中首次出现的任务，用跨视图的已知状态补全 `from`；
    /// 补全后状态没有变化的事件丢弃
    fn carry_known_state(&self, events: Vec<TransitionEvent>) -> Vec<TransitionEvent> {
        events
            .into_iter()
            .filter_map(|mut event| {
                if event.is_first_sighting() {
                    event.from = self.last_known_state(&event.id);
                    if event.from == Some(event.to) {
                        return None;
                    }
                }
                Some(event)
            })
            .collect()
    }

    async fn fetch(&self, filter: JobFilter) -> Result<Snapshot, SourceError> {
        match timeout(self.config.fetch_timeout, self.source.fetch(filter)).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::FetchFailed(format!(
                "timed out after {}s",
                self.config.fetch_timeout.as_secs()
            ))),
        }
    }

    /// 热启动：每个过滤器拉一次作为基线。失败的过滤器退化为冷启动
    pub async fn seed(&mut self) {
        for filter in self.config.filters.clone() {
            match self.fetch(filter).await {
                Ok(snapshot) => {
                    info!(
                        filter = %filter,
                        jobs = snapshot.len(),
                        captured_at = %snapshot.captured_at(),
                        "Seeded baseline snapshot"
                    );
                    self.remember(&snapshot);
                    self.previous.insert(filter, snapshot);
                }
                Err(e) => {
                    warn!(filter = %filter, error = %e, "Failed to seed baseline, falling back to cold start");
                }
            }
        }
    }

    /// 拉取所有过滤器并 diff，返回本轮的转换事件（按过滤器顺序）
    pub async fn poll_once(&mut self) -> Vec<TransitionEvent> {
        self.state = LoopState::Polling;
        let mut events = Vec::new();

        for filter in self.config.filters.clone() {
            match self.fetch(filter).await {
                Ok(current) => {
                    self.failures.remove(&filter);
                    let previous = self.previous.get(&filter).cloned().unwrap_or_default();
                    let transitions = self.carry_known_state(diff(&previous, &current));
                    debug!(filter = %filter, jobs = current.len(), transitions = transitions.len(), "Polled");
                    events.extend(transitions);
                    self.remember(&current);
                    self.previous.insert(filter, current);
                }
                Err(e) => {
                    let count = self.failures.entry(filter).or_insert(0);
                    *count += 1;
                    if *count >= FAILURE_ESCALATION_THRESHOLD {
                        error!(filter = %filter, consecutive = *count, error = %e, "Fetch keeps failing, keeping previous snapshot");
                    } else {
                        warn!(filter = %filter, consecutive = *count, error = %e, "Fetch failed, keeping previous snapshot");
                    }
                }
            }
        }

        self.state = LoopState::Idle;
        events
    }

    /// 一轮完整的 poll：diff 后把事件交给后台投递，返回事件数
    pub async fn run_cycle(&mut self) -> usize {
        let events = self.poll_once().await;
        let count = events.len();
        self.scheduler.spawn_cycle(events).await;
        count
    }

    /// 永久运行，直到 Ctrl-C
    pub async fn run(self) -> Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// 运行直到 `shutdown` 完成
    ///
    /// 间隔从一轮开始算到下一轮开始，投递和稳定期报告都在后台进行。
    /// 退出前最多等待 [`SHUTDOWN_GRACE`] 让进行中的投递完成。
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        if self.config.start_mode == StartMode::Warm {
            self.seed().await;
        }

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tokio::pin!(shutdown);

        info!(
            interval_secs = self.config.interval.as_secs(),
            start_mode = ?self.config.start_mode,
            filters = ?self.config.filters,
            "Poll loop started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let count = self.run_cycle().await;
                    if count > 0 {
                        info!(transitions = count, "Dispatched transitions");
                    }
                }
                _ = &mut shutdown => {
                    let pending = self.scheduler.pending_reports().await;
                    info!(pending, "Shutting down poll loop");
                    if timeout(SHUTDOWN_GRACE, self.scheduler.wait_idle()).await.is_err() {
                        warn!("Abandoning pending notifications");
                    }
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_mode_parse() {
        assert_eq!("cold".parse::<StartMode>().unwrap(), StartMode::Cold);
        assert_eq!("WARM".parse::<StartMode>().unwrap(), StartMode::Warm);
        assert!("lukewarm".parse::<StartMode>().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = PollLoopConfig::default();
        assert_eq!(config.interval, Duration::from_secs(30));
        assert_eq!(config.start_mode, StartMode::Cold);
        assert_eq!(config.filters, vec![JobFilter::All]);
    }
}
