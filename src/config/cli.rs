use crate::config::app_config::AppConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "synesthesia")]
#[command(about = "Turn your images into original music")]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the upload page
    Serve {
        /// Address to listen on, overrides server.bind
        #[arg(long)]
        bind: Option<String>,
    },
    /// Run the pipeline once for an image file
    Render {
        /// PNG or JPEG image
        image: PathBuf,

        /// Where to write the generated clip
        #[arg(short, long, default_value = "music.mp3")]
        out: PathBuf,
    },
}

impl Cli {
    /// 套用命令列覆蓋設定
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Command::Serve { bind: Some(bind) } = &self.command {
            tracing::info!("🔧 Bind address overridden to: {}", bind);
            config.server.bind = bind.clone();
        }
    }
}
