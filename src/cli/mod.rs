//! CLI module for OpenSpeak
//!
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// OpenSpeak - retrieval-augmented speaking coach
#[derive(Parser, Debug)]
#[command(
    name = "openspeak",
    version,
    about = "OpenSpeak - a session-aware speaking coach grounded in your reference notes",
    after_help = "EXAMPLES:\n    \
                  openspeak index                                 # Build the index from the corpus\n    \
                  openspeak ask --session s1 \"How do I pause?\"    # One question\n    \
                  openspeak chat --session s1                     # Interactive session\n    \
                  openspeak --config my.toml config               # Show effective configuration"
)]
pub struct Cli {
    /// Path to the configuration file (defaults apply when it does not exist)
    #[arg(short, long, default_value = "openspeak.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build or rebuild the embedding index from the reference corpus
    Index {
        /// Rebuild even when the stored index matches the corpus
        #[arg(short, long)]
        force: bool,

        /// Corpus file, overriding rag.corpus_path
        #[arg(long)]
        corpus: Option<PathBuf>,
    },

    /// Ask a single question within a session
    Ask {
        /// Session identifier
        #[arg(short, long, default_value = "default")]
        session: String,

        /// The message to send
        message: String,
    },

    /// Chat interactively; an empty line or `/quit` exits
    Chat {
        /// Session identifier; a random one is generated when omitted
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Print the effective configuration as TOML
    Config,
}
