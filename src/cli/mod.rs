// CLI module for gemgate

use clap::Parser;
use std::path::PathBuf;

/// gemgate - Multi-protocol LLM API gateway for Google Gemini
#[derive(Parser, Debug)]
#[command(name = "gemgate", version, about, long_about = None)]
pub struct Args {
    /// Path to the configuration file (default: ~/.gemgate/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the bind host from the configuration
    #[arg(long)]
    pub host: Option<String>,

    /// Override the bind port from the configuration
    #[arg(long)]
    pub port: Option<u16>,
}
