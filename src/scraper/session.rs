//! Scrape session: the explicit context owning the client, the store and
//! the dedup set, plus the two fetch-loop drivers.

use crate::api::client::{pause, BatchRequest, TriviaClient};
use crate::config::ScrapeConfig;
use crate::models::{ProgressInfo, MAX_QUESTIONS_PER_REQUEST};
use crate::scraper::normalizer::{Normalizer, SeenHashes};
use crate::scraper::store::QuestionStore;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::fmt;
use tracing::{debug, error, info, warn};

/// Batch options shared by both drivers.
#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    pub questions_per_request: usize,
    pub category: Option<u32>,
    pub difficulty: Option<String>,
    pub question_type: Option<String>,
    pub show_progress: bool,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            questions_per_request: MAX_QUESTIONS_PER_REQUEST,
            category: None,
            difficulty: None,
            question_type: None,
            show_progress: false,
        }
    }
}

impl From<&ScrapeConfig> for ScrapeOptions {
    fn from(config: &ScrapeConfig) -> Self {
        Self {
            questions_per_request: config.questions_per_request,
            category: config.category,
            difficulty: config.difficulty.clone(),
            question_type: config.question_type.clone(),
            show_progress: true,
        }
    }
}

/// Why a driver returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The file already held the target count; nothing was requested.
    AlreadyComplete,
    TargetReached,
    /// A batch produced no new questions.
    Exhausted,
    CategoriesVisited,
    NoCategories,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::AlreadyComplete => write!(f, "target already reached"),
            StopReason::TargetReached => write!(f, "target reached"),
            StopReason::Exhausted => write!(f, "no new questions available"),
            StopReason::CategoriesVisited => write!(f, "all categories visited"),
            StopReason::NoCategories => write!(f, "no categories found"),
        }
    }
}

/// Outcome of one driver run.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeSummary {
    pub added: usize,
    pub requests: usize,
    pub total_written: usize,
    pub stop_reason: StopReason,
}

pub struct ScrapeSession<R: Rng = StdRng> {
    client: TriviaClient,
    store: QuestionStore,
    seen: SeenHashes,
    normalizer: Normalizer<R>,
    options: ScrapeOptions,
}

impl ScrapeSession<StdRng> {
    /// Session over `store` with an entropy-seeded shuffle.
    pub fn new(
        client: TriviaClient,
        store: QuestionStore,
        seen: SeenHashes,
        options: ScrapeOptions,
    ) -> Self {
        Self::with_rng(client, store, seen, options, StdRng::from_entropy())
    }
}

impl<R: Rng> ScrapeSession<R> {
    pub fn with_rng(
        client: TriviaClient,
        store: QuestionStore,
        seen: SeenHashes,
        options: ScrapeOptions,
        rng: R,
    ) -> Self {
        Self {
            client,
            store,
            seen,
            normalizer: Normalizer::new(rng),
            options,
        }
    }

    pub fn progress_info(&self) -> ProgressInfo {
        ProgressInfo {
            questions_written: self.store.written(),
            unique_hashes: self.seen.len(),
            output_file: self.store.path().display().to_string(),
            file_exists: self.store.exists(),
        }
    }

    /// Fetch batches until the file holds `total` questions or a batch
    /// yields nothing new.
    pub async fn scrape_to_target(&mut self, total: usize) -> ScrapeSummary {
        let initial = self.store.written();

        if initial >= total {
            info!(
                "Already have {} questions (target: {}). Nothing to do!",
                initial, total
            );
            return self.summary(initial, 0, StopReason::AlreadyComplete);
        }

        self.start_token().await;

        info!("Starting scrape. Current: {}, Target: {}", initial, total);

        let progress = self.progress_bar(total as u64);
        progress.set_position(initial as u64);

        let per_request = self.options.questions_per_request.max(1);
        let mut requests = 0;
        let mut stop_reason = StopReason::TargetReached;

        while self.store.written() < total {
            let remaining = total - self.store.written();
            let amount = per_request.min(remaining).min(MAX_QUESTIONS_PER_REQUEST);

            info!(
                "Fetching {} questions (current total: {}/{})",
                amount,
                self.store.written(),
                total
            );

            let request = self.batch_request(amount, self.options.category);
            let accepted = self.fetch_batch(&request).await;
            requests += 1;
            progress.set_position(self.store.written() as u64);

            if accepted < amount {
                warn!("Received fewer questions than requested, might be running out of new questions");

                if accepted == 0 {
                    warn!("No new questions received, stopping scrape");
                    stop_reason = StopReason::Exhausted;
                    break;
                }
            }

            if self.store.written() < total {
                self.wait_between_requests().await;
            }
        }

        progress.finish_and_clear();

        let summary = self.summary(initial, requests, stop_reason);
        info!(
            "Scraping complete! Added {} new questions in {} requests",
            summary.added, summary.requests
        );
        info!("Total questions in file: {}", summary.total_written);
        summary
    }

    /// Visit every category once, requesting one batch each.
    pub async fn scrape_all_categories(&mut self, per_category: usize) -> ScrapeSummary {
        let initial = self.store.written();

        self.start_token().await;

        let categories = match self.client.fetch_categories().await {
            Ok(categories) => categories,
            Err(e) => {
                error!("Failed to fetch categories: {}", e);
                Vec::new()
            }
        };

        if categories.is_empty() {
            error!("No categories found, cannot proceed");
            return self.summary(initial, 1, StopReason::NoCategories);
        }

        let progress = self.progress_bar(categories.len() as u64);
        let mut requests = 1;

        for (i, category) in categories.iter().enumerate() {
            info!(
                "Fetching from category {}/{}: {}",
                i + 1,
                categories.len(),
                category.name
            );

            let request = self.batch_request(per_category, Some(category.id));
            self.fetch_batch(&request).await;
            requests += 1;
            progress.inc(1);

            if i + 1 < categories.len() {
                self.wait_between_requests().await;
            }
        }

        progress.finish_and_clear();

        let summary = self.summary(initial, requests, StopReason::CategoriesVisited);
        info!(
            "Category scraping complete! Added {} new questions",
            summary.added
        );
        summary
    }

    /// Fetch, normalize and append one batch. Returns the number of newly
    /// accepted questions; every failure collapses to zero.
    async fn fetch_batch(&mut self, request: &BatchRequest) -> usize {
        let raw_questions = match self.client.fetch_questions(request).await {
            Ok(questions) => questions,
            Err(e) => {
                error!("Batch request failed: {}", e);
                return 0;
            }
        };

        let mut accepted = 0;
        for raw in &raw_questions {
            let Some(question) = self.normalizer.normalize(raw, &mut self.seen) else {
                continue;
            };
            accepted += 1;

            // The hash stays registered even if the write fails.
            if let Err(e) = self.store.append(&question) {
                error!("Error writing question to CSV: {}", e);
            }
        }

        info!("Processed {} new questions from API", accepted);
        accepted
    }

    async fn start_token(&mut self) {
        if !self.client.acquire_token().await {
            warn!("Proceeding without session token");
        }
        if self.client.token_state().is_active() {
            debug!("Session token: {}", self.client.token_state());
        }
    }

    async fn wait_between_requests(&self) {
        let delay = self.client.request_delay();
        info!("Waiting {:.1} seconds...", delay.as_secs_f64());
        pause(delay).await;
    }

    fn batch_request(&self, amount: usize, category: Option<u32>) -> BatchRequest {
        BatchRequest {
            category,
            difficulty: self.options.difficulty.clone(),
            question_type: self.options.question_type.clone(),
            ..BatchRequest::new(amount)
        }
    }

    fn progress_bar(&self, length: u64) -> ProgressBar {
        if !self.options.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(length);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }

    fn summary(&self, initial: usize, requests: usize, stop_reason: StopReason) -> ScrapeSummary {
        ScrapeSummary {
            added: self.store.written().saturating_sub(initial),
            requests,
            total_written: self.store.written(),
            stop_reason,
        }
    }
}
