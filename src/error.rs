//! 错误类型 - Snapshot Source 层的错误分类
//!
//! 调用方（poll loop / scheduler）把 `AuthExpired` 和 `FetchFailed` 都当作
//! "本轮没有数据"处理，只有启动时的 `AuthFailed` 是致命的。

use thiserror::Error;

/// Snapshot Source 错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// 登录失败（凭据错误或 daemon 拒绝）
    #[error("authentication with the daemon failed: {0}")]
    AuthFailed(String),

    /// 会话过期，需要重新登录
    #[error("daemon session expired")]
    AuthExpired,

    /// 网络错误、非 2xx 响应、超时或响应解析失败
    #[error("fetch from daemon failed: {0}")]
    FetchFailed(String),
}

impl SourceError {
    /// 是否为会话过期
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, SourceError::AuthExpired)
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::FetchFailed(format!("request timed out: {}", err))
        } else {
            SourceError::FetchFailed(err.to_string())
        }
    }
}
