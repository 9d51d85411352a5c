use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Score an original paragraph against the translation of a source paragraph
    Score {
        /// Paragraph in the original language
        #[arg(short, long)]
        original: String,

        /// Paragraph in the source language (translated before scoring)
        #[arg(short, long)]
        source: String,

        /// Collection whose translation cache is used
        #[arg(short = 'k', long)]
        collection: String,
    },

    /// Match each sentence of a paragraph against translated text
    Match {
        /// Paragraph whose sentences are matched
        #[arg(short, long)]
        source: String,

        /// Translated paragraph, one sentence per line when possible
        #[arg(short, long)]
        target: String,
    },

    /// Split a paragraph into sentences
    Split {
        /// Paragraph to split
        #[arg(short, long)]
        text: String,
    },

    /// Score every pair in a JSONL file
    Batch {
        /// Input file with one {"original", "source"} object per line
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for one result object per line
        #[arg(short, long)]
        output: PathBuf,

        /// Collection whose translation cache is used
        #[arg(short = 'k', long)]
        collection: String,

        /// Persist new translations when the batch finishes
        #[arg(long)]
        flush: bool,
    },

    /// Inspect persisted translation caches
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// List persisted collections and their record counts
    List,

    /// Print the cached translations of one collection
    Show {
        /// Collection identifier
        #[arg(short = 'k', long)]
        collection: String,
    },
}
