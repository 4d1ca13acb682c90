//! Snapshot Source - 从 daemon 拉取任务快照
//!
//! `SnapshotSource` 是 poll loop 和 scheduler 唯一依赖的读取接口，
//! 具体实现见 [`qbittorrent::QbittorrentClient`]。

pub mod qbittorrent;

use crate::error::SourceError;
use crate::torrent::{Job, Snapshot};
use anyhow::anyhow;
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;

pub use qbittorrent::{QbittorrentClient, QbittorrentConfig};

/// daemon 端的任务过滤器
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobFilter {
    /// 不过滤
    All,
    /// 下载中的视图（包含排队等待的下载）
    Downloading,
    Stalled,
    Completed,
}

impl JobFilter {
    /// `filter=` 查询参数，`All` 不带参数
    pub fn query_value(&self) -> Option<&'static str> {
        match self {
            JobFilter::All => None,
            JobFilter::Downloading => Some("downloading"),
            JobFilter::Stalled => Some("stalled"),
            JobFilter::Completed => Some("completed"),
        }
    }
}

impl fmt::Display for JobFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.query_value().unwrap_or("all"))
    }
}

impl FromStr for JobFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(JobFilter::All),
            "downloading" | "active" | "queued" => Ok(JobFilter::Downloading),
            "stalled" => Ok(JobFilter::Stalled),
            "completed" => Ok(JobFilter::Completed),
            other => Err(anyhow!(
                "unknown filter '{}', expected one of: all, downloading, stalled, completed",
                other
            )),
        }
    }
}

/// 快照读取接口
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// 登录 daemon。启动时调用一次，会话过期时由实现自行重试
    async fn authenticate(&self) -> Result<(), SourceError>;

    /// 拉取匹配过滤器的所有任务
    async fn fetch(&self, filter: JobFilter) -> Result<Snapshot, SourceError>;

    /// 拉取单个任务的当前属性，任务不存在返回 `Ok(None)`
    async fn fetch_job(&self, id: &str) -> Result<Option<Job>, SourceError> {
        let snapshot = self.fetch(JobFilter::All).await?;
        Ok(snapshot.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_parse_aliases() {
        assert_eq!("all".parse::<JobFilter>().unwrap(), JobFilter::All);
        assert_eq!("Active".parse::<JobFilter>().unwrap(), JobFilter::Downloading);
        assert_eq!("queued".parse::<JobFilter>().unwrap(), JobFilter::Downloading);
        assert_eq!(" stalled ".parse::<JobFilter>().unwrap(), JobFilter::Stalled);
        assert_eq!("completed".parse::<JobFilter>().unwrap(), JobFilter::Completed);
        assert!("paused".parse::<JobFilter>().is_err());
    }

    #[test]
    fn test_filter_query_value() {
        assert_eq!(JobFilter::All.query_value(), None);
        assert_eq!(JobFilter::Downloading.query_value(), Some("downloading"));
        assert_eq!(JobFilter::All.to_string(), "all");
        assert_eq!(JobFilter::Completed.to_string(), "completed");
    }
}
