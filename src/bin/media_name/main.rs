//! medianame - Normalize media file names with suggested names.
//!
//! Scans a directory tree for media files, asks a naming service for a clean name for each,
//! writes the suggestions to a reviewable CSV ledger,
//! and then renames the files after validation and confirmation.

mod config;
mod logger;
mod pipeline;

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::Shell;

use crate::pipeline::MediaNamer;

/// Normalize media file names with suggested names.
///
/// Suggestions are written to a CSV ledger that can be edited before anything is renamed.
/// Renaming never overwrites existing files and can be safely re-run after an interrupted run.
#[derive(Parser)]
#[command(
    author,
    version,
    name = env!("CARGO_BIN_NAME"),
    about = "Normalize media file names with suggested names"
)]
pub struct MediaNameArgs {
    /// Optional root directory to scan
    #[arg(value_hint = clap::ValueHint::DirPath)]
    path: Option<PathBuf>,

    /// Suggestion ledger CSV file
    #[arg(short = 'o', long, name = "FILE", value_hint = clap::ValueHint::FilePath)]
    ledger: Option<PathBuf>,

    /// Reuse an existing ledger instead of requesting new suggestions
    #[arg(short = 's', long)]
    skip_suggest: bool,

    /// Answer yes to all confirmation prompts
    #[arg(short = 'y', long)]
    yes: bool,

    /// Only print changes without renaming files
    #[arg(short = 'p', long)]
    print: bool,

    /// API key for the naming service
    #[arg(short = 'k', long, name = "KEY")]
    api_key: Option<String>,

    /// Model name for the naming service
    #[arg(short = 'm', long, name = "MODEL")]
    model: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[arg(short = 'u', long, name = "URL")]
    base_url: Option<String>,

    /// Additional media file extension to include
    #[arg(short = 'e', long, num_args = 1, action = clap::ArgAction::Append, name = "EXTENSION")]
    extension: Vec<String>,

    /// Generate shell completion
    #[arg(short = 'l', long, name = "SHELL")]
    completion: Option<Shell>,

    /// Print verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = MediaNameArgs::parse();
    if let Some(ref shell) = args.completion {
        media_namer::generate_shell_completion(*shell, MediaNameArgs::command(), true, env!("CARGO_BIN_NAME"))
    } else {
        MediaNamer::new(args)?.run().await
    }
}
