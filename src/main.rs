//! Trivia Harvester - resumable Open Trivia DB scraper and analyzer
//!
//! A CLI tool that fetches trivia questions, deduplicates them, appends
//! them one by one to a CSV file, and reports statistics over that file.
//!
//! Exit codes:
//!   0 - Success (including an interrupted scrape, which is resumable)
//!   1 - Runtime error (config, validation, missing or malformed CSV, etc.)

mod analysis;
mod api;
mod cli;
mod config;
mod error;
mod models;
mod report;
mod scraper;

use analysis::{analyze_file, compute_insights, rank_counts, AnalysisOptions};
use anyhow::{Context, Result};
use api::client::{ClientSettings, TriviaClient};
use cli::{AnalyzeArgs, Args, Command, OutputFormat, ScrapeArgs};
use config::{Config, DEFAULT_CONFIG_FILE};
use report::AnalysisReport;
use scraper::session::{ScrapeOptions, ScrapeSession, ScrapeSummary};
use scraper::store::QuestionStore;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if let Command::InitConfig = args.command {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("Trivia Harvester v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };

    let outcome = match args.command {
        Command::Scrape(ref scrape_args) => run_scrape(config, scrape_args, args.quiet).await,
        Command::Analyze(ref analyze_args) => run_analyze(config, analyze_args),
        Command::InitConfig => Ok(()),
    };

    if let Err(e) = outcome {
        error!("{:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle init-config: generate a default .trivia.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to customize the API, output file, targets, and analyzer thresholds.");
    Ok(())
}

/// Initialize logging based on verbosity settings. `RUST_LOG` wins when set.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let builder = FmtSubscriber::builder()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    match EnvFilter::try_from_default_env() {
        Ok(filter) => {
            let subscriber = builder.with_env_filter(filter).finish();
            tracing::subscriber::set_global_default(subscriber)
                .expect("Failed to set tracing subscriber");
        }
        Err(_) => {
            let subscriber = builder.with_max_level(level).finish();
            tracing::subscriber::set_global_default(subscriber)
                .expect("Failed to set tracing subscriber");
        }
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}

/// Run one scrape. Ctrl-C drops the driver between awaits; the file stays resumable.
async fn run_scrape(mut config: Config, args: &ScrapeArgs, quiet: bool) -> Result<()> {
    config.merge_scrape_args(args);
    let start_time = Instant::now();

    let settings = ClientSettings::from(&config.api);
    let client = TriviaClient::new(settings).context("Failed to build HTTP client")?;

    let output = config.scrape.output.clone();
    let (store, seen) = QuestionStore::open(&output);

    let mut options = ScrapeOptions::from(&config.scrape);
    options.show_progress = !quiet;

    let mut session = ScrapeSession::new(client, store, seen, options);

    println!("🎯 Trivia Harvester");
    println!("📁 Output file: {}", output);
    println!("📊 Progress: {}", session.progress_info());

    let by_category = config.scrape.by_category;
    let per_category = config.scrape.questions_per_category;
    let total = config.scrape.total_questions;

    if by_category {
        println!("🗂️  Mode: one batch of {} per category", per_category);
    } else {
        println!("🎯 Target: {} questions", total);
    }

    let summary = {
        let driver = async {
            if by_category {
                session.scrape_all_categories(per_category).await
            } else {
                session.scrape_to_target(total).await
            }
        };

        tokio::select! {
            summary = driver => Some(summary),
            _ = tokio::signal::ctrl_c() => None,
        }
    };

    let Some(summary) = summary else {
        warn!("Scraping interrupted by user");
        println!("\n⏹️  Interrupted.");
        println!("📊 Progress: {}", session.progress_info());
        println!("   Run the same command again to resume.");
        return Ok(());
    };

    print_scrape_summary(&summary, start_time.elapsed().as_secs_f64());

    if summary.added > 0 {
        log_file_stats(Path::new(&output), &config);
    }

    Ok(())
}

fn print_scrape_summary(summary: &ScrapeSummary, duration: f64) {
    println!("\n📊 Scrape Summary:");
    println!("   Stopped: {}", summary.stop_reason);
    println!("   New questions: {}", summary.added);
    println!("   Requests: {}", summary.requests);
    println!("   Total in file: {}", summary.total_written);
    println!("   Duration: {:.1}s", duration);
    println!("\n✅ Scrape complete!");
}

/// Re-read the file and log headline statistics.
fn log_file_stats(path: &Path, config: &Config) {
    let options = AnalysisOptions::from(&config.analyze);
    match analyze_file(path, &options) {
        Ok(stats) => {
            info!("Final statistics:");
            info!("  Total questions: {}", stats.total_questions);
            info!("  Unique categories: {}", stats.category_count());
            info!("  Difficulty breakdown:");
            for (difficulty, count) in rank_counts(&stats.difficulties) {
                info!("    {}: {}", difficulty, count);
            }
        }
        Err(e) => warn!("Could not compute final statistics: {}", e),
    }
}

/// Analyze a CSV file and print or save the report.
fn run_analyze(mut config: Config, args: &AnalyzeArgs) -> Result<()> {
    config.merge_analyze_args(args);

    let path = Path::new(&config.analyze.input);
    let options = AnalysisOptions::from(&config.analyze);

    if args.format == OutputFormat::Text && args.output.is_none() {
        println!("🎯 Trivia Questions Data Analyzer");
        println!("📁 Analyzing file: {}\n", path.display());
    }

    let stats = analyze_file(path, &options)?;
    let insights = compute_insights(&stats, &options);
    let report = AnalysisReport::new(path, stats, insights);

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Text => report::generate_text_report(&report, config.analyze.top_categories),
    };

    match args.output {
        Some(ref output_path) => {
            report::write_report(&output, output_path)?;
            println!("✅ Report saved to: {}", output_path.display());
        }
        None => print!("{}", output),
    }

    Ok(())
}
