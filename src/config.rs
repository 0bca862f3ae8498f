//! Configuration file handling.
//!
//! This module handles loading `.trivia.toml` files and merging them
//! with command-line flags.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = ".trivia.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Upstream API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Scraper settings.
    #[serde(default)]
    pub scrape: ScrapeConfig,

    /// Analyzer settings.
    #[serde(default)]
    pub analyze: AnalyzeConfig,
}

/// Upstream API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL; endpoints are resolved relative to it.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request transport timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Attempts per logical call.
    #[serde(default = "default_retries")]
    pub max_retries: usize,

    /// Minimum delay between batches, in milliseconds.
    #[serde(default = "default_request_delay")]
    pub request_delay_ms: u64,

    /// Base of the exponential transport backoff, in milliseconds.
    #[serde(default = "default_backoff_base")]
    pub backoff_base_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Ask the server for a session token to suppress repeats.
    #[serde(default = "default_true")]
    pub use_session_token: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
            max_retries: default_retries(),
            request_delay_ms: default_request_delay(),
            backoff_base_ms: default_backoff_base(),
            user_agent: default_user_agent(),
            use_session_token: true,
        }
    }
}

fn default_base_url() -> String {
    "https://opentdb.com".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_retries() -> usize {
    3
}

fn default_request_delay() -> u64 {
    5100 // API allows one request per 5 seconds per client
}

fn default_backoff_base() -> u64 {
    1000
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}

fn default_true() -> bool {
    true
}

/// Scraper settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Output CSV file.
    #[serde(default = "default_data_file")]
    pub output: String,

    /// Stop once this many questions are in the file.
    #[serde(default = "default_total_questions")]
    pub total_questions: usize,

    #[serde(default = "default_batch_size")]
    pub questions_per_request: usize,

    /// Visit every category once instead of fetching to a target count.
    #[serde(default)]
    pub by_category: bool,

    #[serde(default = "default_batch_size")]
    pub questions_per_category: usize,

    /// Optional category id filter.
    #[serde(default)]
    pub category: Option<u32>,

    /// Optional difficulty filter (easy, medium, hard).
    #[serde(default)]
    pub difficulty: Option<String>,

    /// Optional type filter (multiple, boolean).
    #[serde(default)]
    pub question_type: Option<String>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            output: default_data_file(),
            total_questions: default_total_questions(),
            questions_per_request: default_batch_size(),
            by_category: false,
            questions_per_category: default_batch_size(),
            category: None,
            difficulty: None,
            question_type: None,
        }
    }
}

fn default_data_file() -> String {
    "trivia_questions.csv".to_string()
}

fn default_total_questions() -> usize {
    5000
}

fn default_batch_size() -> usize {
    50
}

/// Analyzer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeConfig {
    /// CSV file to analyze.
    #[serde(default = "default_data_file")]
    pub input: String,

    /// Sample questions kept per category.
    #[serde(default = "default_sample_questions")]
    pub sample_questions: usize,

    /// Sample questions are truncated to this many characters.
    #[serde(default = "default_sample_length")]
    pub sample_length: usize,

    /// Length of the top-categories ranking.
    #[serde(default = "default_top_categories")]
    pub top_categories: usize,

    /// Categories smaller than this are ignored by the difficulty insights.
    #[serde(default = "default_min_category_size")]
    pub min_category_size: usize,

    /// Percent of easy questions for a category to count as "mostly easy".
    #[serde(default = "default_easy_threshold")]
    pub easy_threshold: f64,

    /// Percent of hard questions for a category to count as "many hard".
    #[serde(default = "default_hard_threshold")]
    pub hard_threshold: f64,
}

impl Default for AnalyzeConfig {
    fn default() -> Self {
        Self {
            input: default_data_file(),
            sample_questions: default_sample_questions(),
            sample_length: default_sample_length(),
            top_categories: default_top_categories(),
            min_category_size: default_min_category_size(),
            easy_threshold: default_easy_threshold(),
            hard_threshold: default_hard_threshold(),
        }
    }
}

fn default_sample_questions() -> usize {
    3
}

fn default_sample_length() -> usize {
    100
}

fn default_top_categories() -> usize {
    10
}

fn default_min_category_size() -> usize {
    10
}

fn default_easy_threshold() -> f64 {
    60.0
}

fn default_hard_threshold() -> f64 {
    40.0
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Apply `scrape` subcommand flags. Flags win over the file.
    pub fn merge_scrape_args(&mut self, args: &crate::cli::ScrapeArgs) {
        if let Some(ref output) = args.output {
            self.scrape.output = output.display().to_string();
        }
        if let Some(total) = args.total {
            self.scrape.total_questions = total;
        }
        if let Some(per_request) = args.per_request {
            self.scrape.questions_per_request = per_request;
        }
        if args.by_category {
            self.scrape.by_category = true;
        }
        if let Some(per_category) = args.per_category {
            self.scrape.questions_per_category = per_category;
        }
        if let Some(category) = args.category {
            self.scrape.category = Some(category);
        }
        if let Some(difficulty) = args.difficulty {
            self.scrape.difficulty = Some(difficulty.as_str().to_string());
        }
        if let Some(question_type) = args.question_type {
            self.scrape.question_type = Some(question_type.as_str().to_string());
        }

        if let Some(delay) = args.delay_ms {
            self.api.request_delay_ms = delay;
        }
        if let Some(retries) = args.max_retries {
            self.api.max_retries = retries;
        }
        if let Some(ref url) = args.api_url {
            self.api.base_url = url.clone();
        }
        if args.no_token {
            self.api.use_session_token = false;
        }
    }

    /// Apply `analyze` subcommand flags.
    pub fn merge_analyze_args(&mut self, args: &crate::cli::AnalyzeArgs) {
        if let Some(ref file) = args.file {
            self.analyze.input = file.display().to_string();
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{AnalyzeArgs, DifficultyArg, ScrapeArgs};
    use std::path::PathBuf;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "https://opentdb.com");
        assert_eq!(config.api.request_delay_ms, 5100);
        assert_eq!(config.scrape.output, "trivia_questions.csv");
        assert_eq!(config.scrape.total_questions, 5000);
        assert_eq!(config.analyze.sample_questions, 3);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[api]
max_retries = 5
request_delay_ms = 100

[scrape]
output = "custom.csv"
by_category = true
difficulty = "hard"

[analyze]
top_categories = 5
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.api.max_retries, 5);
        assert_eq!(config.api.request_delay_ms, 100);
        assert_eq!(config.api.timeout_seconds, 30);
        assert_eq!(config.scrape.output, "custom.csv");
        assert!(config.scrape.by_category);
        assert_eq!(config.scrape.difficulty.as_deref(), Some("hard"));
        assert_eq!(config.analyze.top_categories, 5);
        assert_eq!(config.analyze.min_category_size, 10);
    }

    #[test]
    fn test_merge_scrape_args() {
        let mut config = Config::default();
        let args = ScrapeArgs {
            output: Some(PathBuf::from("out.csv")),
            total: Some(200),
            difficulty: Some(DifficultyArg::Medium),
            no_token: true,
            ..Default::default()
        };

        config.merge_scrape_args(&args);

        assert_eq!(config.scrape.output, "out.csv");
        assert_eq!(config.scrape.total_questions, 200);
        assert_eq!(config.scrape.difficulty.as_deref(), Some("medium"));
        assert!(!config.api.use_session_token);
        // untouched
        assert_eq!(config.scrape.questions_per_request, 50);
    }

    #[test]
    fn test_merge_analyze_args() {
        let mut config = Config::default();
        let args = AnalyzeArgs {
            file: Some(PathBuf::from("other.csv")),
            ..Default::default()
        };
        config.merge_analyze_args(&args);
        assert_eq!(config.analyze.input, "other.csv");
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[api]"));
        assert!(toml_str.contains("[scrape]"));
        assert!(toml_str.contains("[analyze]"));
    }
}
