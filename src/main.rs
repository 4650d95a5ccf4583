//! ReplyKit - AI reply assistant for web chat platforms.
//!
//! Attaches to a running Chromium over the DevTools protocol, watches the
//! active chat page, and offers generated replies for insertion.

use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use replykit_protocols::Platform;

mod cli;
mod config;
mod session;

use cli::{Cli, Commands};
use config::{default_config_path, replykit_dir, DaemonConfig};

/// Initialize tracing with console and file output.
///
/// Log files land in ~/.replykit/debug/ with daily rotation.
fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = replykit_dir().join("debug");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("replykit")
        .filename_suffix("log")
        .max_log_files(14)
        .build(&log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Keep the writer guard alive for the program's lifetime.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_ansi(true))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing().map_err(|e| anyhow::anyhow!("tracing init failed: {e}"))?;

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(default_config_path);
    let config = DaemonConfig::load(&config_path)?;

    match cli.command {
        None => session::run(config, "http://localhost:9222".to_string(), false).await,
        Some(Commands::Run {
            endpoint,
            auto_insert,
        }) => session::run(config, endpoint, auto_insert).await,
        Some(Commands::Platforms) => {
            print_platforms();
            Ok(())
        }
    }
}

fn print_platforms() {
    println!("{:<12} {}", "PLATFORM", "MATCHES");
    println!("{}", "-".repeat(50));
    for platform in Platform::ALL {
        let example = match platform {
            Platform::WhatsApp => "web.whatsapp.com",
            Platform::Slack => "app.slack.com, *.slack.com/client",
            Platform::LinkedIn => "linkedin.com",
            Platform::Fiverr => "fiverr.com",
        };
        println!("{:<12} {}", platform.as_str(), example);
    }
}
