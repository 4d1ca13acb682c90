//! 消息格式化模块 - 将状态转换和快照转换为聊天消息
//!
//! 所有函数都是纯函数；完成消息里的随机短语由 [`PhrasePicker`] 选出后传入，
//! 测试可以用固定种子得到确定的输出。

use crate::torrent::{Job, JobState, Snapshot};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// 完成消息使用的短语
pub const PIRATE_PHRASES: &[&str] = &[
    "Yo-ho-ho!",
    "Arrr, me hearties!",
    "Shiver me timbers!",
    "A fine bounty indeed!",
    "Drink up, me hearties, yo-ho!",
    "By the powers!",
    "Aye, she be done!",
    "Well blow me down!",
    "We be rich, mates!",
    "To the depths with the rest!",
    "Treasure secured!",
    "A grand haul!",
    "Anchors aweigh!",
    "Plunder complete!",
    "Set sail for the next adventure!",
];

/// 随机短语选择器
pub struct PhrasePicker {
    rng: StdRng,
}

impl PhrasePicker {
    /// 使用系统熵初始化
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// 固定种子（测试用）
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn pick(&mut self) -> &'static str {
        PIRATE_PHRASES
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(PIRATE_PHRASES[0])
    }
}

impl Default for PhrasePicker {
    fn default() -> Self {
        Self::new()
    }
}

/// 人类可读的速度
pub fn format_speed(bytes_per_sec: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;

    let speed = bytes_per_sec as f64;
    if speed >= MIB {
        format!("{:.1} MiB/s", speed / MIB)
    } else if speed >= KIB {
        format!("{:.1} KiB/s", speed / KIB)
    } else {
        format!("{} B/s", bytes_per_sec)
    }
}

pub fn queued(job: &Job) -> String {
    format!(
        "Arrr, {} be queued fer download. Rank in queue: {}!",
        job.name, job.queue_rank
    )
}

pub fn started(job: &Job) -> String {
    format!("Avast! The download be startin' fer {}! ⚓", job.name)
}

/// 稳定期后的下载统计
pub fn stabilized(job: &Job) -> String {
    format!(
        "Arrr, {} be downloadin' at {} with {} mates connected! ETA: {}.",
        job.name,
        format_speed(job.download_speed),
        job.peer_count,
        job.eta()
    )
}

pub fn completed(job: &Job, phrase: &str) -> String {
    format!("{} {} be finished, ye scallywags! 🏴‍☠️", phrase, job.name)
}

/// 启动时的汇总消息
pub fn startup_summary(snapshot: &Snapshot) -> String {
    format!(
        "Ahoy, mateys! The relay has been initialized! ⚓\n\
         🏴‍☠️ Total Torrents: {}\n\
         🚢 Downloading: {}\n\
         🍻 Completed: {}\n\
         ⚓ Seeding: {}",
        snapshot.len(),
        snapshot.count_in(JobState::Downloading),
        snapshot.count_in(JobState::Completed),
        snapshot.count_in(JobState::StalledSeeding),
    )
}

/// 当前下载状态概览
pub fn status_report(snapshot: &Snapshot) -> String {
    format!(
        "Arrr, here be the current state of yer downloads:\n\
         🚢 Downloading: {} torrents\n\
         📜 Queued: {}",
        snapshot.count_in(JobState::Downloading),
        snapshot.count_in(JobState::Queued),
    )
}

/// 每个下载中任务的速度和 ETA
pub fn eta_report(snapshot: &Snapshot) -> String {
    let lines: Vec<String> = snapshot
        .iter()
        .filter(|job| job.state == JobState::Downloading)
        .map(|job| {
            format!(
                "{}: Speed: {}, ETA: {}",
                job.name,
                format_speed(job.download_speed),
                job.eta()
            )
        })
        .collect();

    if lines.is_empty() {
        "No downloads be active, ye landlubber!".to_string()
    } else {
        format!(
            "Arrr, here be the ETAs fer yer downloads:\n{}",
            lines.join("\n")
        )
    }
}
