//! status / eta 命令 - 一次性查看 daemon 中的下载状态

use super::output::format_output;
use crate::config::AppConfig;
use crate::notification::formatter;
use crate::source::{JobFilter, QbittorrentClient, SnapshotSource};
use crate::torrent::{Eta, Job, JobState, Snapshot};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;

/// 报告命令参数
#[derive(Args, Debug, Clone, Default)]
pub struct ReportArgs {
    /// 输出 JSON 格式
    #[arg(long)]
    pub json: bool,
}

/// status 命令输出
#[derive(Debug, Serialize)]
pub struct StatusOutput {
    pub total: usize,
    pub downloading: usize,
    pub queued: usize,
    pub seeding: usize,
    pub completed: usize,
    /// 快照拉取时间
    pub captured_at: DateTime<Utc>,
}

impl StatusOutput {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            total: snapshot.len(),
            downloading: snapshot.count_in(JobState::Downloading),
            queued: snapshot.count_in(JobState::Queued),
            seeding: snapshot.count_in(JobState::StalledSeeding),
            completed: snapshot.count_in(JobState::Completed),
            captured_at: snapshot.captured_at(),
        }
    }
}

/// eta 命令中的单行
#[derive(Debug, Serialize)]
pub struct EtaLine {
    pub id: String,
    pub name: String,
    pub download_speed: u64,
    /// None 表示速度为 0，无法估算
    pub eta_secs: Option<u64>,
}

impl From<&Job> for EtaLine {
    fn from(job: &Job) -> Self {
        let eta_secs = match job.eta() {
            Eta::Known(duration) => Some(duration.as_secs()),
            Eta::Unknown => None,
        };
        Self {
            id: job.id.clone(),
            name: job.name.clone(),
            download_speed: job.download_speed,
            eta_secs,
        }
    }
}

pub fn render_status(snapshot: &Snapshot, json: bool) -> String {
    format_output(
        &StatusOutput::from_snapshot(snapshot),
        json,
        &formatter::status_report(snapshot),
    )
}

pub fn render_eta(snapshot: &Snapshot, json: bool) -> String {
    let lines: Vec<EtaLine> = snapshot
        .iter()
        .filter(|job| job.state == JobState::Downloading)
        .map(EtaLine::from)
        .collect();
    format_output(&lines, json, &formatter::eta_report(snapshot))
}

async fn fetch_all(config: &AppConfig) -> Result<Snapshot> {
    let client = QbittorrentClient::new(config.qbittorrent.clone())?;
    client
        .authenticate()
        .await
        .context("Cannot log in to qBittorrent")?;
    client
        .fetch(JobFilter::All)
        .await
        .context("Failed to fetch torrents")
}

/// 处理 status 命令
pub async fn handle_status(args: ReportArgs) -> Result<()> {
    let config = AppConfig::from_env()?;
    let snapshot = fetch_all(&config).await?;
    println!("{}", render_status(&snapshot, args.json));
    Ok(())
}

/// 处理 eta 命令
pub async fn handle_eta(args: ReportArgs) -> Result<()> {
    let config = AppConfig::from_env()?;
    let snapshot = fetch_all(&config).await?;
    println!("{}", render_eta(&snapshot, args.json));
    Ok(())
}
