//! Torrent Relay - 监控 qBittorrent 下载状态并把状态转换发送到聊天频道

pub mod cli;
pub mod config;
pub mod error;
pub mod notification;
pub mod source;
pub mod torrent;
pub mod watcher;

pub use config::AppConfig;
pub use error::SourceError;
pub use notification::{
    CompletionPolicy, ConsoleChannel, DeliveryError, DeliveryOutcome, Destination, Dispatch,
    DiscordChannel, NotificationDispatcher, NotificationKind, NotificationMemory,
    NotificationScheduler, NotificationSink, PhrasePicker, SchedulerConfig, SinkError,
};
pub use source::{JobFilter, QbittorrentClient, QbittorrentConfig, SnapshotSource};
pub use torrent::{estimate_eta, Eta, Job, JobState, Snapshot};
pub use watcher::{diff, LoopState, PollLoop, PollLoopConfig, StartMode, TransitionEvent};
