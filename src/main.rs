// File: src/main.rs
// Block explorer - web server, one-shot table printout and terminal dashboard

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;

use blockscope::{AppConfig, cli_interface, telemetry, tui_dashboard, web_server};

/// Command-line interface definition
#[derive(Parser)]
#[command(name = "blockscope")]
#[command(about = "Block explorer with an auto-refreshing latest-blocks table")]
#[command(version)]
pub struct Cli {
    /// Default log level (overridden by RUST_LOG)
    #[arg(short, long, global = true, default_value = "info", env = "BLOCKSCOPE_LOG")]
    pub log_level: String,

    /// Interface mode selection
    #[command(subcommand)]
    pub mode: InterfaceMode,
}

/// Available interface modes
#[derive(Subcommand)]
pub enum InterfaceMode {
    /// Explorer web server over a demo chain
    Serve {
        /// Bind address
        #[arg(short, long, default_value = "127.0.0.1:8080", env = "BLOCKSCOPE_LISTEN")]
        listen: SocketAddr,

        /// Enable CORS for development
        #[arg(short, long, env = "BLOCKSCOPE_CORS")]
        cors: bool,

        /// Blocks generated before serving
        #[arg(long, default_value = "200", env = "BLOCKSCOPE_SEED_BLOCKS")]
        seed_blocks: u64,

        /// Seconds between demo blocks
        #[arg(long, default_value = "2", env = "BLOCKSCOPE_BLOCK_INTERVAL")]
        block_interval: u64,

        /// Latest-blocks table refresh interval in milliseconds
        #[arg(short, long, default_value = "3000", env = "BLOCKSCOPE_REFRESH_MS")]
        refresh_ms: u64,
    },

    /// Print the latest blocks of a running explorer once
    Blocks {
        /// Explorer base URL
        #[arg(short, long, default_value = "http://127.0.0.1:8080", env = "BLOCKSCOPE_EXPLORER")]
        explorer: String,
    },

    /// Terminal dashboard following a running explorer
    Watch {
        /// Explorer base URL
        #[arg(short, long, default_value = "http://127.0.0.1:8080", env = "BLOCKSCOPE_EXPLORER")]
        explorer: String,

        /// Refresh interval in milliseconds
        #[arg(short, long, default_value = "3000", env = "BLOCKSCOPE_REFRESH_MS")]
        refresh_ms: u64,
    },
}

impl InterfaceMode {
    /// Collapse the selected mode's flags into an application config
    fn app_config(&self) -> AppConfig {
        let defaults = AppConfig::default();
        match self {
            InterfaceMode::Serve { listen, cors, seed_blocks, block_interval, refresh_ms } => AppConfig {
                listen: *listen,
                cors: *cors,
                seed_blocks: *seed_blocks,
                block_interval: Duration::from_secs((*block_interval).max(1)),
                refresh_interval: Duration::from_millis((*refresh_ms).max(1)),
                ..defaults
            },
            InterfaceMode::Blocks { explorer } => AppConfig {
                explorer_url: explorer.clone(),
                ..defaults
            },
            InterfaceMode::Watch { explorer, refresh_ms } => AppConfig {
                explorer_url: explorer.clone(),
                refresh_interval: Duration::from_millis((*refresh_ms).max(1)),
                ..defaults
            },
        }
    }
}

/// Main application entry point
/// Routes to appropriate interface mode based on CLI arguments
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let watching = matches!(cli.mode, InterfaceMode::Watch { .. });
    telemetry::init_tracing(if watching { "warn" } else { cli.log_level.as_str() }, watching)?;

    let config = cli.mode.app_config();
    debug!(?config, "configuration loaded");

    // Route to appropriate interface based on selected mode
    match cli.mode {
        InterfaceMode::Serve { .. } => {
            println!("🌐 Block Explorer - Web Server Mode");
            web_server::run_web_mode(&config).await
        },

        InterfaceMode::Blocks { .. } => {
            println!("🔍 Block Explorer - Latest Blocks from {}", config.explorer_url);
            cli_interface::run_blocks_mode(&config).await
        },

        InterfaceMode::Watch { .. } => {
            println!("📊 Block Explorer - Terminal Dashboard");
            tui_dashboard::run_tui_mode(&config).await
        },
    }
}
