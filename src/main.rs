//! bitext-align - paragraph alignment scoring for translation-pair annotation
//!
//! Command-line entry point: scores candidate paragraph pairs through a
//! cached LLM translation, matches sentences, and inspects translation caches.

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_appender::{non_blocking, rolling};

use bitext_align::cli::{Args, CacheAction, Commands};
use bitext_align::config::Config;
use bitext_align::text::split_sentences;
use bitext_align::workflow::{Workflow, collection_records, list_collections};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    // Load configuration
    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if std::path::Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::Split { text } => {
            for sentence in split_sentences(&text) {
                println!("{}", sentence);
            }
        }
        Commands::Score { original, source, collection } => {
            let workflow = Workflow::new(config)?;
            let score = workflow.score_pair(&original, &source, &collection).await?;
            println!("{}", serde_json::to_string_pretty(&score)?);
        }
        Commands::Match { source, target } => {
            let workflow = Workflow::new(config)?;
            let matches = workflow.match_paragraphs(&source, &target).await;
            println!("{}", serde_json::to_string_pretty(&matches)?);
        }
        Commands::Batch { input, output, collection, flush } => {
            let workflow = Workflow::new(config)?;
            let summary = workflow.process_batch(&input, &output, &collection, flush).await?;
            println!(
                "Scored {} pairs, {} without a score, {} translations persisted",
                summary.scored, summary.failed, summary.flushed
            );
        }
        Commands::Cache { action } => {
            let cache_dir = &config.cache.dir;
            match action {
                CacheAction::List => {
                    let collections = list_collections(cache_dir).await?;
                    if collections.is_empty() {
                        println!("No cached collections found.");
                    } else {
                        println!("{:<30} {:>10}", "Collection", "Records");
                        println!("{}", "-".repeat(41));
                        for collection in collections {
                            println!("{:<30} {:>10}", collection.name, collection.records);
                        }
                    }
                }
                CacheAction::Show { collection } => {
                    for record in collection_records(cache_dir, &collection).await? {
                        println!("{}", preview(&record.source, 47));
                        println!("  -> {}", preview(&record.translation, 70));
                    }
                }
            }
        }
    }

    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".bitext-align").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "bitext-align.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Console output goes to stderr so JSON results on stdout stay clean
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}",
          log_level, log_dir.join("bitext-align.log").display());

    Ok(())
}

/// Truncate on a character boundary for table output
fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}
