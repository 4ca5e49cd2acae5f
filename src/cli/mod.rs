//! CLI module for Uzhavan.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Uzhavan - a farming assistant that answers in simple Tamil
///
/// Answers are grounded in a local corpus of agricultural text. Ask by typing,
/// or press Enter to talk in voice mode.
#[derive(Parser, Debug)]
#[command(name = "uzhavan")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a single question
    Ask {
        /// The question to ask
        question: String,

        /// Number of corpus chunks to use as context
        #[arg(short = 'k', long, value_parser = parse_count)]
        top_k: Option<usize>,

        /// Also speak the answer aloud
        #[arg(short, long)]
        speak: bool,
    },

    /// Start an interactive text session
    Chat {
        /// Also speak each answer aloud
        #[arg(short, long)]
        speak: bool,
    },

    /// Start a push-to-talk voice session
    Listen,

    /// Show the corpus chunks closest to a query
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value = "5", value_parser = parse_count)]
        limit: usize,
    },

    /// Build the corpus file from text documents
    Index {
        /// Text files to chunk and embed
        #[arg(required = true)]
        files: Vec<String>,

        /// Where to write the corpus (defaults to the configured corpus path)
        #[arg(short, long)]
        output: Option<String>,

        /// Maximum characters per chunk
        #[arg(long, default_value = "800", value_parser = parse_count)]
        max_chars: usize,
    },

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

/// Parse a count that must be at least one.
fn parse_count(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}
