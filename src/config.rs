//! 运行配置 - 从环境变量加载
//!
//! `.env` 由 `main` 在启动时载入进程环境，这里只读取环境变量。
//! 命令行参数在 `cli` 中覆盖这里的值。

use crate::notification::scheduler::{CompletionPolicy, SchedulerConfig};
use crate::notification::channels::DiscordConfig;
use crate::source::{JobFilter, QbittorrentConfig};
use crate::watcher::{PollLoopConfig, StartMode};
use anyhow::{anyhow, bail, Context, Result};
use std::str::FromStr;
use std::time::Duration;

/// Discord 投递配置
#[derive(Debug, Clone)]
pub struct DiscordSettings {
    pub token: String,
    /// 按优先级排列的频道 id
    pub channel_ids: Vec<String>,
}

/// 完整的运行配置
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub qbittorrent: QbittorrentConfig,
    /// 未配置时使用控制台输出
    pub discord: Option<DiscordSettings>,
    pub poll_interval: Duration,
    pub stabilization_delay: Duration,
    pub fetch_timeout: Duration,
    pub start_mode: StartMode,
    pub completion_policy: CompletionPolicy,
    pub filters: Vec<JobFilter>,
    /// 启动时发送汇总消息
    pub announce_startup: bool,
}

impl AppConfig {
    /// 从进程环境加载
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意 key -> value 查找函数加载（测试中使用 HashMap）
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &str| get(key).ok_or_else(|| anyhow!("{} is not set", key));

        let fetch_timeout = parse_secs(get("FETCH_TIMEOUT_SECS"), "FETCH_TIMEOUT_SECS", 10)?;

        let qbittorrent = QbittorrentConfig {
            base_url: required("QB_URL")?.trim_end_matches('/').to_string(),
            username: required("QB_USERNAME")?,
            password: required("QB_PASSWORD")?,
            timeout_secs: fetch_timeout.as_secs(),
        };

        let discord = match get("DISCORD_TOKEN") {
            Some(token) => {
                let channel_ids = split_list(get("DISCORD_CHANNEL_IDS"));
                if channel_ids.is_empty() {
                    bail!("DISCORD_TOKEN is set but DISCORD_CHANNEL_IDS is empty");
                }
                Some(DiscordSettings { token, channel_ids })
            }
            None => None,
        };

        let filters = match get("WATCH_FILTERS") {
            Some(raw) => split_list(Some(raw))
                .iter()
                .map(|f| f.parse::<JobFilter>())
                .collect::<Result<Vec<_>>>()
                .context("Invalid WATCH_FILTERS")?,
            None => vec![JobFilter::All],
        };

        Ok(Self {
            qbittorrent,
            discord,
            poll_interval: parse_secs(get("POLL_INTERVAL_SECS"), "POLL_INTERVAL_SECS", 30)?,
            stabilization_delay: parse_secs(
                get("STABILIZATION_DELAY_SECS"),
                "STABILIZATION_DELAY_SECS",
                90,
            )?,
            fetch_timeout,
            start_mode: parse_or_default(get("START_MODE"), "START_MODE")?,
            completion_policy: parse_or_default(get("COMPLETION_POLICY"), "COMPLETION_POLICY")?,
            filters,
            announce_startup: parse_bool(get("ANNOUNCE_STARTUP"), "ANNOUNCE_STARTUP", true)?,
        })
    }

    pub fn poll_loop_config(&self) -> PollLoopConfig {
        PollLoopConfig {
            interval: self.poll_interval,
            start_mode: self.start_mode,
            filters: self.filters.clone(),
            fetch_timeout: self.fetch_timeout,
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            stabilization_delay: self.stabilization_delay,
            completion_policy: self.completion_policy,
        }
    }

    pub fn discord_config(&self) -> Option<DiscordConfig> {
        self.discord.as_ref().map(|settings| DiscordConfig {
            token: settings.token.clone(),
            ..Default::default()
        })
    }
}

fn split_list(raw: Option<String>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

fn parse_secs(raw: Option<String>, key: &str, default: u64) -> Result<Duration> {
    let secs = match raw {
        Some(value) => value
            .parse::<u64>()
            .with_context(|| format!("{} must be a whole number of seconds, got '{}'", key, value))?,
        None => default,
    };
    if secs == 0 {
        bail!("{} must be greater than zero", key);
    }
    Ok(Duration::from_secs(secs))
}

fn parse_or_default<T>(raw: Option<String>, key: &str) -> Result<T>
where
    T: FromStr<Err = anyhow::Error> + Default,
{
    match raw {
        Some(value) => value.parse::<T>().with_context(|| format!("Invalid {}", key)),
        None => Ok(T::default()),
    }
}

fn parse_bool(raw: Option<String>, key: &str, default: bool) -> Result<bool> {
    match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => bail!("{} must be a boolean, got '{}'", key, other),
    }
}
