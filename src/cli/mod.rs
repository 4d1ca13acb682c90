//! CLI command handling

pub mod output;
pub mod report;
pub mod watch;

pub use output::*;
pub use report::*;
pub use watch::*;
