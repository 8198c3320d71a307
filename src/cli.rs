use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "quire")]
#[command(about = "PDF merge, split and watermark tool with MCP server support")]
#[command(version)]
pub struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Fail on malformed or out-of-range page ranges instead of emitting empty parts
    #[arg(long, global = true)]
    pub strict_ranges: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as MCP server, sweeping stale outputs in the background
    Serve,

    /// Combine two or more PDFs into one
    Merge {
        /// PDF files to merge, in order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Split a PDF into parts bundled as a zip archive
    #[command(alias = "burst")]
    Split {
        /// PDF file to split
        path: PathBuf,

        #[command(flatten)]
        mode: SplitArgs,

        /// Output archive
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Stamp a text watermark across every page
    Watermark {
        /// PDF file to watermark
        path: PathBuf,

        /// Watermark text
        text: String,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Delete stored outputs older than the retention window
    Sweep,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct SplitArgs {
    /// Page ranges, one part per token (e.g., "1-3, 5, 7-10")
    #[arg(short, long)]
    pub ranges: Option<String>,

    /// Number of evenly sized parts
    #[arg(short, long)]
    pub parts: Option<usize>,
}
