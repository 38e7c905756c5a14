//! CLI parse: clap types for draftsmith. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub const DEFAULT_OWNER: &str = "local";

/// Draftsmith CLI - Long-form document generation
#[derive(Parser)]
#[command(name = "draftsmith")]
#[command(about = "Generate long, multi-section documents from a short idea")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Select a title, create the document and run the full pipeline
    Generate {
        /// Research idea the document is built from
        #[arg(long)]
        idea: String,
        /// Academic discipline used to frame the prompts
        #[arg(long)]
        discipline: Option<String>,
        #[arg(long, default_value = DEFAULT_OWNER)]
        owner: String,
    },
    /// List documents, newest first
    List {
        #[arg(long, default_value = DEFAULT_OWNER)]
        owner: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show a document outline, a key prefix, one part or its full content
    Show {
        /// Document id
        id: String,
        #[arg(long, default_value = DEFAULT_OWNER)]
        owner: String,
        /// Print every part with its content
        #[arg(long, conflicts_with_all = ["prefix", "part"])]
        full: bool,
        /// Only parts whose key equals or nests under this prefix
        #[arg(long, conflicts_with = "part")]
        prefix: Option<String>,
        /// Print the content of the part with this exact key
        #[arg(long)]
        part: Option<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Create an empty document with a fixed title
    Create {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = DEFAULT_OWNER)]
        owner: String,
    },
    /// Print the resolved configuration (API key redacted)
    Config,
}
