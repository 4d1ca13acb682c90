//! Torrent 数据模型

pub mod job;
pub mod snapshot;

pub use job::{estimate_eta, Eta, Job, JobState, TorrentInfo};
pub use snapshot::Snapshot;
