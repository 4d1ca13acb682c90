//! Torrent watching subsystem - diffs snapshots and drives the poll loop

pub mod diff;
pub mod poll_loop;

pub use diff::{diff, TransitionEvent};
pub use poll_loop::{LoopState, PollLoop, PollLoopConfig, StartMode};
