//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Trivia Harvester - resumable Open Trivia DB scraper
///
/// Fetches trivia questions, deduplicates them, appends them to a CSV file
/// one by one (safe to interrupt and resume), and reports statistics.
///
/// Examples:
///   trivia-harvester scrape
///   trivia-harvester scrape --output quiz.csv --total 2000
///   trivia-harvester scrape --by-category --per-category 25
///   trivia-harvester analyze quiz.csv
///   trivia-harvester analyze --format json --output stats.json
///   trivia-harvester init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .trivia.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true, env = "TRIVIA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (errors only, no progress bar)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Fetch questions and append new ones to the CSV file
    Scrape(ScrapeArgs),
    /// Print statistics over a scraped CSV file
    Analyze(AnalyzeArgs),
    /// Generate a default .trivia.toml configuration file
    InitConfig,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct ScrapeArgs {
    /// Output CSV file (appended to, created if missing)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Total number of questions wanted in the file
    #[arg(short = 'n', long, value_name = "COUNT")]
    pub total: Option<usize>,

    /// Questions per request (API maximum is 50)
    #[arg(long, value_name = "COUNT")]
    pub per_request: Option<usize>,

    /// Visit every category once instead of fetching to a total
    #[arg(long)]
    pub by_category: bool,

    /// Questions requested per category with --by-category
    #[arg(long, value_name = "COUNT")]
    pub per_category: Option<usize>,

    /// Restrict batches to one category id
    #[arg(long, value_name = "ID")]
    pub category: Option<u32>,

    /// Restrict batches to one difficulty
    #[arg(long, value_name = "LEVEL")]
    pub difficulty: Option<DifficultyArg>,

    /// Restrict batches to one question type
    #[arg(long = "type", value_name = "TYPE")]
    pub question_type: Option<QuestionTypeArg>,

    /// Delay between batches in milliseconds
    #[arg(long, value_name = "MS")]
    pub delay_ms: Option<u64>,

    /// Attempts per API call
    #[arg(long, value_name = "NUM")]
    pub max_retries: Option<usize>,

    /// Base URL of the trivia API
    #[arg(long, value_name = "URL", env = "TRIVIA_API_URL")]
    pub api_url: Option<String>,

    /// Do not request a session token
    #[arg(long)]
    pub no_token: bool,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct AnalyzeArgs {
    /// CSV file to analyze
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Output format (text, json)
    #[arg(long, default_value = "text", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Output format for the analyzer report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text (default)
    #[default]
    Text,
    /// JSON format
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DifficultyArg {
    Easy,
    Medium,
    Hard,
}

impl DifficultyArg {
    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyArg::Easy => "easy",
            DifficultyArg::Medium => "medium",
            DifficultyArg::Hard => "hard",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QuestionTypeArg {
    Multiple,
    Boolean,
}

impl QuestionTypeArg {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionTypeArg::Multiple => "multiple",
            QuestionTypeArg::Boolean => "boolean",
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Command::Scrape(ref scrape) = self.command {
            scrape.validate()?;
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

impl ScrapeArgs {
    fn validate(&self) -> Result<(), String> {
        let counts = [
            ("--total", self.total),
            ("--per-request", self.per_request),
            ("--per-category", self.per_category),
            ("--max-retries", self.max_retries),
        ];
        for (flag, value) in counts {
            if value == Some(0) {
                return Err(format!("{} must be at least 1", flag));
            }
        }

        if let Some(ref url) = self.api_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("API URL must start with 'http://' or 'https://'".to_string());
            }
        }

        Ok(())
    }
}
