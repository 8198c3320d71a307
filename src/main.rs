mod archive;
mod assemble;
mod cli;
mod clock;
mod commands;
mod config;
mod error;
mod mcp;
mod page_range;
mod pdf;
mod service;
mod storage;
mod sweep;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use service::SplitMode;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the MCP protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if cli.strict_ranges {
        config.strict_ranges = true;
    }

    match cli.command {
        Commands::Serve => {
            mcp::run_server(&config).await?;
        }
        Commands::Merge { inputs, output } => {
            commands::merge::run(inputs.as_slice(), &output)?;
        }
        Commands::Split { path, mode, output } => {
            let mode = SplitMode::from_params(mode.ranges, mode.parts)?;
            commands::split::run(&path, &mode, config.strict_ranges, &output)?;
        }
        Commands::Watermark { path, text, output } => {
            commands::watermark::run(&path, &text, config.watermark_font_size, &output)?;
        }
        Commands::Sweep => {
            commands::sweep::run(&config)?;
        }
    }

    Ok(())
}
