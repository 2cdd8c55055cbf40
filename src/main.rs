//! # civcal CLI Application
//!
//! Command-line front end for the civcal refresh pipeline.
//!
//! ## Key Components
//!
//! - CLI argument parsing with clap
//! - Subcommands:
//!   - `refresh`: Refresh one category from a sources file
//!   - `refresh-all`: Refresh every category concurrently
//!   - `sources`: List the configured sources
//!
//! ## Features
//!
//! - Structured extraction through Gemini when `GEMINI_API_KEY` is set, or
//!   `GEMINI_FREE_API_KEY` with `--free-tier`
//! - Heuristic-only mode that never calls a model
//! - Progress bars fed from the pipeline's progress events
//! - Both JSON and text output formats

mod telemetry;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use civcal::calendar::{CalendarItem, Category, SourceConfig, SourcesFile};
use civcal::extract::{LlmExtractor, NoExtractor, StructuredExtractor};
use civcal::fetcher::{Fetcher, FetcherConfig};
use civcal::model::{Client, GeminiCompletionModel};
use civcal::pipeline::{Pipeline, PipelineConfig, ProgressEvent, RefreshSummary};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use telemetry::OtelGuard;
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

#[derive(Parser)]
#[command(author, version, about = "Scrape local calendars into deduplicated event, class and meeting feeds", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Refresh one category
    Refresh(RefreshArgs),

    /// Refresh every category
    RefreshAll(RefreshAllArgs),

    /// List configured sources
    Sources(SourcesArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Sources file (JSON)
    #[arg(short, long, default_value = "sources.json")]
    sources: PathBuf,

    /// Write the feed to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Never call the model, even for AI sources
    #[arg(long)]
    heuristic_only: bool,

    /// Skip fetching detail pages
    #[arg(long)]
    no_enrich: bool,

    /// Months of recurring occurrences to generate
    #[arg(long, default_value = "6")]
    horizon_months: u32,

    /// Use the free-tier key (GEMINI_FREE_API_KEY) and its lower quota
    #[arg(long)]
    free_tier: bool,

    /// Request timeout in seconds
    #[arg(short, long, default_value = "15")]
    timeout: u64,
}

#[derive(Args, Debug)]
struct RefreshArgs {
    /// Category to refresh (events, classes, meetings)
    #[arg(short, long)]
    category: Category,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Args, Debug)]
struct RefreshAllArgs {
    #[command(flatten)]
    run: RunArgs,
}

#[derive(Args, Debug)]
struct SourcesArgs {
    /// Sources file (JSON)
    #[arg(short, long, default_value = "sources.json")]
    sources: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _otel: OtelGuard = telemetry::init_tracing_subscriber()?;

    match cli.command {
        Commands::Refresh(args) => {
            let sources = load_sources(&args.run.sources)?;
            let pipeline = build_pipeline(&args.run)?;
            refresh_command(pipeline, vec![args.category], sources, &args.run).await?;
        }
        Commands::RefreshAll(args) => {
            let sources = load_sources(&args.run.sources)?;
            let pipeline = build_pipeline(&args.run)?;
            refresh_command(pipeline, Category::ALL.to_vec(), sources, &args.run).await?;
        }
        Commands::Sources(args) => {
            sources_command(args)?;
        }
    }

    Ok(())
}

fn load_sources(path: &Path) -> anyhow::Result<Vec<SourceConfig>> {
    let file = SourcesFile::load(path)
        .with_context(|| format!("Failed to load sources from {}", path.display()))?;
    Ok(file.sources)
}

enum PipelineHandle {
    Heuristic(Pipeline<NoExtractor>),
    Model(Pipeline<LlmExtractor<GeminiCompletionModel>>),
}

/// Build the pipeline, with the Gemini extractor unless disabled or unconfigured
fn build_pipeline(args: &RunArgs) -> anyhow::Result<PipelineHandle> {
    let fetcher = Fetcher::new(FetcherConfig::builder().timeout_secs(args.timeout).build())?;
    let config = PipelineConfig::builder()
        .enrich_details(!args.no_enrich)
        .recurrence_horizon_months(args.horizon_months)
        .build();

    if args.heuristic_only {
        info!("Heuristic-only mode, no model calls");
        return Ok(PipelineHandle::Heuristic(Pipeline::without_extractor(fetcher, config)));
    }

    let client = if args.free_tier {
        Client::new_gemini_free_from_env()
    } else {
        Client::new_gemini_from_env()
    };

    match client {
        Ok(client) => Ok(PipelineHandle::Model(Pipeline::with_extractor(
            fetcher,
            client.extractor(),
            config,
        ))),
        Err(e) => {
            warn!("{}; AI sources will use heuristics", e);
            Ok(PipelineHandle::Heuristic(Pipeline::without_extractor(fetcher, config)))
        }
    }
}

#[instrument(skip_all, fields(categories = categories.len(), sources = sources.len()))]
async fn refresh_command(
    handle: PipelineHandle,
    categories: Vec<Category>,
    sources: Vec<SourceConfig>,
    args: &RunArgs,
) -> anyhow::Result<()> {
    let summaries = match &handle {
        PipelineHandle::Heuristic(pipeline) => refresh_with_progress(pipeline, &categories, &sources).await,
        PipelineHandle::Model(pipeline) => refresh_with_progress(pipeline, &categories, &sources).await,
    };

    for summary in &summaries {
        for (source, detail) in &summary.errors {
            eprintln!("{}: {} failed: {}", summary.category, source, detail);
        }
    }

    let rendered = match args.format {
        OutputFormat::Json => {
            let feed: BTreeMap<&str, &Vec<CalendarItem>> = summaries
                .iter()
                .map(|s| (s.category.as_str(), &s.items))
                .collect();
            serde_json::to_string_pretty(&feed)?
        }
        OutputFormat::Text => render_text(&summaries),
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote feed to {}", path.display());
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

/// Run each category with its own progress bar
async fn refresh_with_progress<E: StructuredExtractor>(
    pipeline: &Pipeline<E>,
    categories: &[Category],
    sources: &[SourceConfig],
) -> Vec<RefreshSummary> {
    let bars = MultiProgress::new();
    let style = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {prefix:>9} {bar:40.cyan/blue} {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

    let runs = categories.iter().map(|&category| {
        let bar = bars.add(ProgressBar::new(0));
        bar.set_style(style.clone());
        bar.set_prefix(category.to_string());
        async move {
            let (progress_sender, progress_receiver) = mpsc::channel(100);
            let (_, summary) = tokio::join!(
                pipeline.run_into(category, sources, progress_sender),
                collect_progress(category, progress_receiver, bar),
            );
            summary
        }
    });

    futures::future::join_all(runs).await
}

/// Drive a progress bar from events and keep what the summary needs
async fn collect_progress(
    category: Category,
    mut receiver: mpsc::Receiver<ProgressEvent>,
    bar: ProgressBar,
) -> RefreshSummary {
    let mut summary = RefreshSummary {
        category,
        total: 0,
        errors: Vec::new(),
        items: Vec::new(),
    };

    while let Some(event) = receiver.recv().await {
        match event {
            ProgressEvent::Init { total } => {
                summary.total = total;
                bar.set_length(total as u64);
                bar.set_message("Starting...");
            }
            ProgressEvent::Progress { current, source, .. } => {
                bar.set_position(current as u64);
                bar.set_message(source);
            }
            ProgressEvent::Error { source, detail } => {
                bar.set_message(format!("{} failed", source));
                summary.errors.push((source, detail));
            }
            ProgressEvent::Items { items, .. } => summary.items = items,
            ProgressEvent::Complete => {
                bar.finish_with_message(format!("{} items", summary.items.len()));
            }
        }
    }
    summary
}

fn render_text(summaries: &[RefreshSummary]) -> String {
    let mut out = String::new();
    for summary in summaries {
        out.push_str(&format!(
            "\n{} ({} items from {} sources)\n",
            summary.category,
            summary.items.len(),
            summary.total
        ));
        for item in &summary.items {
            out.push_str(&format!(
                "  {}  {}",
                item.start.format("%Y-%m-%d %H:%M"),
                item.title
            ));
            if let Some(location) = &item.location {
                out.push_str(&format!(" @ {}", location));
            }
            if let Some(pattern) = &item.recurring_pattern {
                out.push_str(&format!(" ({})", pattern));
            }
            out.push_str(&format!(" [{}]\n", item.source_name));
        }
    }
    out
}

fn sources_command(args: SourcesArgs) -> anyhow::Result<()> {
    let sources = load_sources(&args.sources)?;

    if args.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&sources)?);
        return Ok(());
    }

    println!("Configured sources: {}", sources.len());
    for source in &sources {
        println!(
            "{:<9} {:<12} {:<8} {} ({})",
            source.category.as_str(),
            format!("{:?}", source.scraping_method).to_lowercase(),
            if source.enabled { "enabled" } else { "disabled" },
            source.name,
            source.url
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_defaults_match_fetcher_defaults() {
        let cli = Cli::parse_from(["civcal", "refresh", "--category", "events"]);
        let Commands::Refresh(args) = cli.command else {
            panic!("expected refresh");
        };
        assert_eq!(args.category, Category::Events);
        assert_eq!(args.run.timeout, FetcherConfig::default().timeout_secs);
        assert!(!args.run.free_tier);
        assert_eq!(args.run.format, OutputFormat::Text);
    }

    #[test]
    fn test_free_tier_flag() {
        let cli = Cli::parse_from(["civcal", "refresh-all", "--free-tier", "--timeout", "10"]);
        let Commands::RefreshAll(args) = cli.command else {
            panic!("expected refresh-all");
        };
        assert!(args.run.free_tier);
        assert_eq!(args.run.timeout, 10);
    }
}
