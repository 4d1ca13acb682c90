//! Job 数据模型 - daemon 中的一个下载任务

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// 任务的粗粒度状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// 排队等待下载
    Queued,
    /// 正在下载
    Downloading,
    /// 下载完成，正在做种（包括无 peer 的 stalled 做种）
    StalledSeeding,
    /// 下载完成，已停止
    Completed,
    /// 其它状态（校验中、错误、下载停滞等）
    Other,
}

impl JobState {
    /// 从 daemon 的 state 字符串映射
    pub fn from_daemon(raw: &str) -> Self {
        match raw {
            "queuedDL" => JobState::Queued,
            "downloading" | "forcedDL" => JobState::Downloading,
            "uploading" | "stalledUP" | "forcedUP" => JobState::StalledSeeding,
            "pausedUP" | "stoppedUP" | "queuedUP" => JobState::Completed,
            _ => JobState::Other,
        }
    }

    /// 是否为"已完成"类状态
    pub fn is_finished(&self) -> bool {
        matches!(self, JobState::StalledSeeding | JobState::Completed)
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Downloading => "downloading",
            JobState::StalledSeeding => "seeding",
            JobState::Completed => "completed",
            JobState::Other => "other",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// daemon `/api/v2/torrents/info` 返回的原始对象
#[derive(Debug, Clone, Deserialize)]
pub struct TorrentInfo {
    pub hash: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub dlspeed: i64,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub downloaded: i64,
    #[serde(default)]
    pub num_seeds: Option<i64>,
    #[serde(default)]
    pub num_complete: Option<i64>,
    #[serde(default)]
    pub priority: i64,
}

/// 一个下载任务的只读副本
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// torrent hash，daemon 内唯一
    pub id: String,
    pub name: String,
    pub state: JobState,
    /// daemon 原始状态字符串（仅用于日志）
    pub raw_state: String,
    /// 下载速度 (B/s)
    pub download_speed: u64,
    pub size_bytes: u64,
    pub downloaded_bytes: u64,
    pub peer_count: u64,
    /// 队列排名，仅在 Queued 状态下有意义
    pub queue_rank: i64,
}

impl Job {
    /// 根据剩余字节和当前速度估算 ETA
    pub fn eta(&self) -> Eta {
        estimate_eta(self.size_bytes, self.downloaded_bytes, self.download_speed)
    }
}

fn non_negative(value: i64) -> u64 {
    value.max(0) as u64
}

impl From<TorrentInfo> for Job {
    fn from(info: TorrentInfo) -> Self {
        let peers = info.num_seeds.or(info.num_complete).unwrap_or(0);

        Self {
            state: JobState::from_daemon(&info.state),
            id: info.hash,
            name: info.name,
            raw_state: info.state,
            download_speed: non_negative(info.dlspeed),
            size_bytes: non_negative(info.size),
            downloaded_bytes: non_negative(info.downloaded),
            peer_count: non_negative(peers),
            queue_rank: info.priority,
        }
    }
}

/// 预计剩余时间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eta {
    Known(Duration),
    /// 速度为 0 时无法估算
    Unknown,
}

/// ETA = (size - downloaded) / speed，向下取整到秒
pub fn estimate_eta(size_bytes: u64, downloaded_bytes: u64, speed: u64) -> Eta {
    if speed == 0 {
        return Eta::Unknown;
    }
    let remaining = size_bytes.saturating_sub(downloaded_bytes);
    Eta::Known(Duration::from_secs(remaining / speed))
}

impl fmt::Display for Eta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Eta::Unknown => f.write_str("Unknown"),
            Eta::Known(duration) => {
                let total = duration.as_secs();
                let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
                if hours > 0 {
                    write!(f, "{}h {}m {}s", hours, minutes, seconds)
                } else if minutes > 0 {
                    write!(f, "{}m {}s", minutes, seconds)
                } else {
                    write!(f, "{}s", seconds)
                }
            }
        }
    }
}
