//! 通知层 - 去重记忆、消息格式化、渠道和调度
//!
//! # 结构
//! 1. `NotificationSink`：单个渠道向单个目的地发消息
//! 2. `NotificationDispatcher`：按顺序尝试目的地，第一个成功即停止
//! 3. `NotificationScheduler`：状态转换 -> 通知，负责去重和稳定期延迟报告
//!
//! # 使用示例
//! ```ignore
//! use torrent_relay::notification::*;
//!
//! let dispatcher = NotificationDispatcher::new(Arc::new(ConsoleChannel::new()))
//!     .with_destinations([ConsoleChannel::destination()]);
//! let scheduler = NotificationScheduler::new(
//!     NotificationMemory::new(),
//!     dispatcher,
//!     source,
//!     SchedulerConfig::default(),
//! );
//! scheduler.handle(&event).await;
//! ```

pub mod channel;
pub mod channels;
pub mod dispatcher;
pub mod formatter;
pub mod memory;
pub mod scheduler;

pub use channel::{Destination, NotificationSink, SinkError};
pub use channels::{ConsoleChannel, DiscordChannel, DiscordConfig};
pub use dispatcher::{DeliveryError, DeliveryOutcome, NotificationDispatcher};
pub use formatter::PhrasePicker;
pub use memory::{NotificationKind, NotificationMemory};
pub use scheduler::{CompletionPolicy, Dispatch, NotificationScheduler, SchedulerConfig};
