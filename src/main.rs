//! Torrent Relay CLI
//!
//! 监控 qBittorrent 下载状态，把排队 / 开始 / 完成等里程碑发送到 Discord

use anyhow::Result;
use clap::{Parser, Subcommand};
use torrent_relay::cli::{handle_eta, handle_status, handle_watch, ReportArgs, WatchArgs};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "torrent-relay")]
#[command(about = "Torrent Relay - 监控 qBittorrent 并发送下载通知")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// 持续监控并发送通知（默认命令）
    Watch(WatchArgs),
    /// 查看下载和排队数量
    Status(ReportArgs),
    /// 查看每个下载的速度和 ETA
    Eta(ReportArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // 日志输出到 stderr，stdout 留给命令输出和控制台通知
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("torrent_relay=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or_else(|| Commands::Watch(WatchArgs::default())) {
        Commands::Watch(args) => handle_watch(args).await?,
        Commands::Status(args) => handle_status(args).await?,
        Commands::Eta(args) => handle_eta(args).await?,
    }

    Ok(())
}
