//! qBittorrent WebUI API 客户端
//!
//! 基于 cookie 的会话：`/api/v2/auth/login` 返回 SID cookie，由 reqwest 的
//! cookie store 保存，后续请求自动携带。会话过期时 daemon 返回 403，
//! 客户端重新登录一次并重试。

use super::{JobFilter, SnapshotSource};
use crate::error::SourceError;
use crate::torrent::{Job, Snapshot, TorrentInfo};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// 客户端配置
#[derive(Debug, Clone)]
pub struct QbittorrentConfig {
    /// WebUI 地址 (如 http://localhost:8080)
    pub base_url: String,
    pub username: String,
    pub password: String,
    /// 单次请求超时 (秒)
    pub timeout_secs: u64,
}

impl Default for QbittorrentConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            username: "admin".to_string(),
            password: String::new(),
            timeout_secs: 10,
        }
    }
}

/// qBittorrent 客户端
pub struct QbittorrentClient {
    client: Client,
    config: QbittorrentConfig,
    /// 串行化重新登录，保证只有一个写者
    login_lock: Mutex<()>,
    /// 每次登录成功 +1，用来判断别的请求是否已经重新登录过
    session_generation: AtomicU64,
}

impl QbittorrentClient {
    /// 创建新的客户端
    pub fn new(mut config: QbittorrentConfig) -> Result<Self> {
        config.base_url = config.base_url.trim_end_matches('/').to_string();

        let client = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            config,
            login_lock: Mutex::new(()),
            session_generation: AtomicU64::new(0),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    async fn login(&self) -> Result<(), SourceError> {
        let form = [
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];

        let response = self
            .client
            .post(self.url("/api/v2/auth/login"))
            .header("Referer", &self.config.base_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| SourceError::AuthFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SourceError::AuthFailed(e.to_string()))?;

        if status == StatusCode::OK && body.trim() == "Ok." {
            self.session_generation.fetch_add(1, Ordering::SeqCst);
            info!(url = %self.config.base_url, "Authenticated with qBittorrent");
            Ok(())
        } else {
            Err(SourceError::AuthFailed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body.trim()
            )))
        }
    }

    /// 重新登录；如果在等锁期间别的请求已经登录成功，直接返回
    async fn reauthenticate(&self, seen_generation: u64) -> Result<(), SourceError> {
        let _guard = self.login_lock.lock().await;
        if self.session_generation.load(Ordering::SeqCst) != seen_generation {
            debug!("Session already refreshed by a concurrent request");
            return Ok(());
        }
        self.login().await
    }

    async fn get_torrents(&self, query: &[(&str, &str)]) -> Result<Vec<Job>, SourceError> {
        let response = self
            .client
            .get(self.url("/api/v2/torrents/info"))
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN || status == StatusCode::UNAUTHORIZED {
            return Err(SourceError::AuthExpired);
        }
        if !status.is_success() {
            return Err(SourceError::FetchFailed(format!("HTTP {}", status.as_u16())));
        }

        let torrents: Vec<TorrentInfo> = response
            .json()
            .await
            .map_err(|e| SourceError::FetchFailed(format!("Failed to parse response: {}", e)))?;

        Ok(torrents.into_iter().map(Job::from).collect())
    }

    /// 拉取任务列表，会话过期时重新登录并重试一次
    async fn fetch_with_reauth(&self, query: &[(&str, &str)]) -> Result<Vec<Job>, SourceError> {
        let generation = self.session_generation.load(Ordering::SeqCst);

        match self.get_torrents(query).await {
            Err(e) if e.is_auth_expired() => {
                warn!("qBittorrent session expired, re-authenticating");
                self.reauthenticate(generation).await.map_err(|e| {
                    SourceError::FetchFailed(format!("re-authentication failed: {}", e))
                })?;

                match self.get_torrents(query).await {
                    Err(e) if e.is_auth_expired() => Err(SourceError::FetchFailed(
                        "session rejected after re-authentication".to_string(),
                    )),
                    other => other,
                }
            }
            other => other,
        }
    }
}

#[async_trait]
impl SnapshotSource for QbittorrentClient {
    async fn authenticate(&self) -> Result<(), SourceError> {
        let _guard = self.login_lock.lock().await;
        self.login().await
    }

    async fn fetch(&self, filter: JobFilter) -> Result<Snapshot, SourceError> {
        let jobs = match filter.query_value() {
            Some(value) => self.fetch_with_reauth(&[("filter", value)]).await?,
            None => self.fetch_with_reauth(&[]).await?,
        };
        debug!(filter = %filter, count = jobs.len(), "Fetched torrents");
        Ok(Snapshot::from_jobs(jobs))
    }

    async fn fetch_job(&self, id: &str) -> Result<Option<Job>, SourceError> {
        let jobs = self.fetch_with_reauth(&[("hashes", id)]).await?;
        Ok(jobs.into_iter().find(|job| job.id == id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = QbittorrentConfig::default();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.timeout_secs, 10);
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = QbittorrentClient::new(QbittorrentConfig {
            base_url: "http://nas:8080/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.base_url(), "http://nas:8080");
        assert_eq!(client.url("/api/v2/auth/login"), "http://nas:8080/api/v2/auth/login");
    }
}
