//! Watch 命令 - 长期运行的监控进程
//!
//! 启动顺序：加载配置 -> 登录 daemon（失败即退出）-> 构建渠道和调度器
//! -> 发送启动汇总 -> 进入 poll loop。

use crate::config::AppConfig;
use crate::notification::{
    formatter, ConsoleChannel, Destination, DiscordChannel, NotificationDispatcher,
    NotificationMemory, NotificationScheduler, NotificationSink,
};
use crate::notification::scheduler::CompletionPolicy;
use crate::source::{JobFilter, QbittorrentClient, SnapshotSource};
use crate::watcher::{PollLoop, StartMode};
use anyhow::{Context, Result};
use clap::Args;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Watch 命令参数（覆盖环境变量）
#[derive(Args, Debug, Clone, Default)]
pub struct WatchArgs {
    /// 轮询间隔（秒）
    #[arg(long, short)]
    pub interval: Option<u64>,

    /// 开始下载后多久发送统计（秒）
    #[arg(long)]
    pub stabilization_delay: Option<u64>,

    /// 热启动：启动时已存在的任务不通知
    #[arg(long, conflicts_with = "cold")]
    pub warm: bool,

    /// 冷启动：启动时已存在的任务都通知
    #[arg(long)]
    pub cold: bool,

    /// 完成通知策略: any, from-downloading
    #[arg(long)]
    pub completion_policy: Option<CompletionPolicy>,

    /// 监控的过滤器（可重复）: all, downloading, stalled, completed
    #[arg(long = "filter")]
    pub filters: Vec<JobFilter>,

    /// Dry-run 模式（只记录日志不发送）
    #[arg(long)]
    pub dry_run: bool,

    /// 不发送启动汇总
    #[arg(long)]
    pub no_startup_announce: bool,
}

impl WatchArgs {
    /// 把命令行参数合并进配置
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(secs) = self.interval.filter(|s| *s > 0) {
            config.poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = self.stabilization_delay.filter(|s| *s > 0) {
            config.stabilization_delay = Duration::from_secs(secs);
        }
        if self.warm {
            config.start_mode = StartMode::Warm;
        } else if self.cold {
            config.start_mode = StartMode::Cold;
        }
        if let Some(policy) = self.completion_policy {
            config.completion_policy = policy;
        }
        if !self.filters.is_empty() {
            config.filters = self.filters.clone();
        }
        if self.no_startup_announce {
            config.announce_startup = false;
        }
    }
}

/// 根据配置构建分发器：有 Discord token 用 Discord，否则输出到控制台
pub fn build_dispatcher(config: &AppConfig, dry_run: bool) -> Result<NotificationDispatcher> {
    let dispatcher = match (config.discord_config(), &config.discord) {
        (Some(discord_config), Some(settings)) => {
            let sink: Arc<dyn NotificationSink> = Arc::new(DiscordChannel::new(discord_config)?);
            NotificationDispatcher::new(sink)
                .with_destinations(settings.channel_ids.iter().map(Destination::new))
        }
        _ => {
            info!("No Discord token configured, notifications go to stdout");
            NotificationDispatcher::new(Arc::new(ConsoleChannel::new()))
                .with_destinations([ConsoleChannel::destination()])
        }
    };
    Ok(dispatcher.with_dry_run(dry_run))
}

/// 处理 watch 命令
pub async fn handle_watch(args: WatchArgs) -> Result<()> {
    let mut config = AppConfig::from_env()?;
    args.apply(&mut config);

    let client = QbittorrentClient::new(config.qbittorrent.clone())?;
    client
        .authenticate()
        .await
        .context("Cannot log in to qBittorrent")?;
    let source: Arc<dyn SnapshotSource> = Arc::new(client);

    let dispatcher = build_dispatcher(&config, args.dry_run)?;
    info!(
        sink = dispatcher.sink_name(),
        destinations = dispatcher.destination_count(),
        dry_run = args.dry_run,
        "Notification dispatcher ready"
    );
    let scheduler = NotificationScheduler::new(
        NotificationMemory::new(),
        dispatcher,
        Arc::clone(&source),
        config.scheduler_config(),
    );

    if config.announce_startup {
        match source.fetch(JobFilter::All).await {
            Ok(snapshot) => {
                if let Err(e) = scheduler.announce(&formatter::startup_summary(&snapshot)).await {
                    warn!(error = %e, "Failed to send startup summary");
                }
            }
            Err(e) => warn!(error = %e, "Failed to fetch torrents for startup summary"),
        }
    }

    PollLoop::new(source, scheduler, config.poll_loop_config())
        .run()
        .await
}
