//! CLI definitions for ReplyKit.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// ReplyKit CLI.
#[derive(Parser)]
#[command(name = "replykit")]
#[command(about = "AI reply assistant for web chat platforms")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (default: ~/.replykit/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Attach to the browser and assist the active chat page (default)
    Run {
        /// Browser debugging endpoint
        #[arg(long, default_value = "http://localhost:9222")]
        endpoint: String,

        /// Write generated replies into the compose box automatically
        #[arg(long)]
        auto_insert: bool,
    },

    /// List supported platforms and their URL match rules
    Platforms,
}
