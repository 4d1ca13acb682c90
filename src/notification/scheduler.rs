//! 通知调度器 - 把状态转换映射为通知，并保证每个 (任务, 通知类型) 至多发送一次
//!
//! 进入 Downloading 时先发"开始下载"，再挂一个独立的延迟任务：等待稳定期后
//! 重新拉取该任务的最新属性，发送速度 / peer / ETA 统计。延迟任务通过
//! `tokio::spawn` 运行，不阻塞 poll loop，也不阻塞其它通知。
//!
//! 每轮 poll 的事件交给同一个投递 worker 按提交顺序处理，同一任务的
//! 消息不会因为渠道变慢而乱序。

use super::dispatcher::{DeliveryError, DeliveryOutcome, NotificationDispatcher};
use super::formatter::{self, PhrasePicker, PIRATE_PHRASES};
use super::memory::{NotificationKind, NotificationMemory};
use crate::source::SnapshotSource;
use crate::torrent::JobState;
use crate::watcher::diff::TransitionEvent;
use anyhow::anyhow;
use std::str::FromStr;
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 完成通知的触发条件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionPolicy {
    /// 第一次看到 Completed / StalledSeeding 就通知，不管之前是什么状态
    #[default]
    AnyFirstSighting,
    /// 只在从 Downloading 转换过来时通知（启动时已经在做种的任务不通知）
    OnlyFromDownloading,
}

impl FromStr for CompletionPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" | "any-first-sighting" => Ok(CompletionPolicy::AnyFirstSighting),
            "from-downloading" | "only-from-downloading" => {
                Ok(CompletionPolicy::OnlyFromDownloading)
            }
            other => Err(anyhow!(
                "unknown completion policy '{}', expected 'any' or 'from-downloading'",
                other
            )),
        }
    }
}

/// 调度器配置
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// 开始下载到发送统计之间的等待时间
    pub stabilization_delay: Duration,
    pub completion_policy: CompletionPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            stabilization_delay: Duration::from_secs(90),
            completion_policy: CompletionPolicy::default(),
        }
    }
}

/// 单个事件的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// 已发送
    Sent(NotificationKind),
    /// 已经发送过，跳过
    Duplicate(NotificationKind),
    /// 不需要通知的状态
    Ignored,
    /// 所有目的地都失败（不会重试）
    Undelivered(NotificationKind),
}

/// 一轮 poll 的事件，处理完后通过 `done` 通知
struct Cycle {
    events: Vec<TransitionEvent>,
    done: oneshot::Sender<()>,
}

struct Shared {
    memory: Mutex<NotificationMemory>,
    dispatcher: NotificationDispatcher,
    source: Arc<dyn SnapshotSource>,
    phrases: std::sync::Mutex<PhrasePicker>,
    config: SchedulerConfig,
    /// 尚未结束的稳定期报告
    pending: Mutex<Vec<JoinHandle<()>>>,
    /// 投递 worker 的入口，第一次提交时启动
    cycles: OnceLock<mpsc::UnboundedSender<Cycle>>,
    /// 已提交但尚未投递完的轮次
    queued_cycles: Mutex<Vec<oneshot::Receiver<()>>>,
}

/// 通知调度器（clone 后共享同一份记忆）
#[derive(Clone)]
pub struct NotificationScheduler {
    shared: Arc<Shared>,
}

impl NotificationScheduler {
    pub fn new(
        memory: NotificationMemory,
        dispatcher: NotificationDispatcher,
        source: Arc<dyn SnapshotSource>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                memory: Mutex::new(memory),
                dispatcher,
                source,
                phrases: std::sync::Mutex::new(PhrasePicker::new()),
                config,
                pending: Mutex::new(Vec::new()),
                cycles: OnceLock::new(),
                queued_cycles: Mutex::new(Vec::new()),
            }),
        }
    }

    /// 替换短语选择器（测试中使用固定种子）
    pub fn with_phrases(self, picker: PhrasePicker) -> Self {
        if let Ok(mut phrases) = self.shared.phrases.lock() {
            *phrases = picker;
        }
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }

    /// 处理一个状态转换
    pub async fn handle(&self, event: &TransitionEvent) -> Dispatch {
        self.shared.handle(event).await
    }

    /// 按顺序处理一批事件
    pub async fn handle_all(&self, events: &[TransitionEvent]) -> Vec<Dispatch> {
        let mut results = Vec::with_capacity(events.len());
        for event in events {
            results.push(self.shared.handle(event).await);
        }
        results
    }

    /// 把一轮事件交给投递 worker，立即返回
    ///
    /// 各轮之间、轮内事件之间都保持提交顺序。
    pub async fn spawn_cycle(&self, events: Vec<TransitionEvent>) {
        if events.is_empty() {
            return;
        }
        let sender = self.shared.cycles.get_or_init(|| {
            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(deliver_cycles(Arc::downgrade(&self.shared), rx));
            tx
        });

        let (done, finished) = oneshot::channel();
        if sender.send(Cycle { events, done }).is_err() {
            warn!("Delivery worker stopped, dropping cycle");
            return;
        }
        let mut queued = self.shared.queued_cycles.lock().await;
        queued.retain_mut(|rx| matches!(rx.try_recv(), Err(oneshot::error::TryRecvError::Empty)));
        queued.push(finished);
    }

    /// 发送一条与任务无关的消息（如启动汇总）
    pub async fn announce(&self, text: &str) -> Result<DeliveryOutcome, DeliveryError> {
        self.shared.dispatcher.deliver(text).await
    }

    pub async fn has_sent(&self, id: &str, kind: NotificationKind) -> bool {
        self.shared.memory.lock().await.has(id, kind)
    }

    /// 尚未结束的稳定期报告数
    pub async fn pending_reports(&self) -> usize {
        let mut pending = self.shared.pending.lock().await;
        pending.retain(|handle| !handle.is_finished());
        pending.len()
    }

    /// 等待已提交的轮次和稳定期报告全部结束（包括等待期间新产生的）
    pub async fn wait_idle(&self) {
        loop {
            let cycles = std::mem::take(&mut *self.shared.queued_cycles.lock().await);
            let handles = std::mem::take(&mut *self.shared.pending.lock().await);
            if cycles.is_empty() && handles.is_empty() {
                break;
            }
            for finished in cycles {
                // worker 退出时 sender 被丢弃，同样视为结束
                let _ = finished.await;
            }
            for handle in handles {
                if let Err(e) = handle.await {
                    warn!(error = %e, "Background notification task failed");
                }
            }
        }
    }
}

/// 投递 worker：逐轮、逐个处理事件。调度器全部释放后退出
async fn deliver_cycles(shared: Weak<Shared>, mut cycles: mpsc::UnboundedReceiver<Cycle>) {
    while let Some(cycle) = cycles.recv().await {
        let Some(shared) = shared.upgrade() else {
            break;
        };
        for event in &cycle.events {
            shared.handle(event).await;
        }
        let _ = cycle.done.send(());
    }
    debug!("Delivery worker stopped");
}

impl Shared {
    async fn handle(self: &Arc<Self>, event: &TransitionEvent) -> Dispatch {
        debug!(
            job_id = %event.id,
            from = event.from_label(),
            to = %event.to,
            "Handling transition"
        );

        match event.to {
            JobState::Queued => {
                self.announce_once(event, NotificationKind::QueuedAnnounced, formatter::queued(&event.job))
                    .await
            }
            JobState::Downloading => {
                let outcome = self
                    .announce_once(event, NotificationKind::StartedAnnounced, formatter::started(&event.job))
                    .await;
                if !matches!(outcome, Dispatch::Duplicate(_)) {
                    self.schedule_stabilization(event.id.clone()).await;
                }
                outcome
            }
            JobState::StalledSeeding | JobState::Completed => {
                if self.config.completion_policy == CompletionPolicy::OnlyFromDownloading
                    && event.from != Some(JobState::Downloading)
                {
                    debug!(job_id = %event.id, from = event.from_label(), "Completion not from downloading, skipped");
                    return Dispatch::Ignored;
                }
                let phrase = self.pick_phrase();
                self.announce_once(
                    event,
                    NotificationKind::CompletedAnnounced,
                    formatter::completed(&event.job, phrase),
                )
                .await
            }
            JobState::Other => Dispatch::Ignored,
        }
    }

    /// 先在记忆中占位再发送，保证并发处理同一事件时只发一次
    async fn announce_once(&self, event: &TransitionEvent, kind: NotificationKind, text: String) -> Dispatch {
        if !self.memory.lock().await.mark(&event.id, kind) {
            debug!(job_id = %event.id, kind = ?kind, "Already announced, skipping");
            return Dispatch::Duplicate(kind);
        }

        match self.dispatcher.deliver(&text).await {
            Ok(outcome) => {
                info!(job_id = %event.id, name = %event.name, kind = ?kind, outcome = ?outcome, "Notification sent");
                Dispatch::Sent(kind)
            }
            Err(e) => {
                warn!(job_id = %event.id, kind = ?kind, error = %e, "Notification dropped");
                Dispatch::Undelivered(kind)
            }
        }
    }

    async fn schedule_stabilization(self: &Arc<Self>, id: String) {
        let shared = Arc::clone(self);
        let handle = tokio::spawn(async move {
            shared.stabilization_report(&id).await;
        });
        self.track(handle).await;
    }

    async fn stabilization_report(&self, id: &str) {
        tokio::time::sleep(self.config.stabilization_delay).await;

        if self.memory.lock().await.has(id, NotificationKind::StabilizedReportSent) {
            return;
        }

        let job = match self.source.fetch_job(id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                debug!(job_id = %id, "Job gone before stabilization report, skipping");
                return;
            }
            Err(e) => {
                warn!(job_id = %id, error = %e, "Failed to refresh job for stabilization report");
                return;
            }
        };

        match self.dispatcher.deliver(&formatter::stabilized(&job)).await {
            Ok(_) => {
                self.memory
                    .lock()
                    .await
                    .mark(id, NotificationKind::StabilizedReportSent);
                info!(job_id = %id, speed = job.download_speed, peers = job.peer_count, "Stabilization report sent");
            }
            Err(e) => {
                warn!(job_id = %id, error = %e, "Stabilization report dropped");
            }
        }
    }

    async fn track(&self, handle: JoinHandle<()>) {
        let mut pending = self.pending.lock().await;
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    fn pick_phrase(&self) -> &'static str {
        self.phrases
            .lock()
            .map(|mut picker| picker.pick())
            .unwrap_or(PIRATE_PHRASES[0])
    }
}
