//! HTTP client for the Open Trivia DB API.
//!
//! One logical call is attempted up to `max_retries` times. Transport and
//! decode failures back off exponentially; structured response codes are
//! dispatched per [`Dispatch`]. Calls are strictly sequential.

use crate::api::response::{Dispatch, Envelope, ResponseCode};
use crate::api::token::{token_preview, TokenState};
use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::models::{
    CategoryList, QuestionBatch, RawQuestion, TokenReply, TriviaCategory,
    MAX_QUESTIONS_PER_REQUEST,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const QUESTIONS_PATH: &str = "api.php";
const CATEGORIES_PATH: &str = "api_category.php";
const TOKEN_PATH: &str = "api_token.php";

/// Runtime settings for the client.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub timeout_seconds: u64,
    pub max_retries: usize,
    /// Minimum delay between consecutive batches.
    pub request_delay: Duration,
    /// Transport backoff is `backoff_base * 2^attempt`.
    pub backoff_base: Duration,
    pub user_agent: String,
    pub use_session_token: bool,
}

impl From<&ApiConfig> for ClientSettings {
    fn from(config: &ApiConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            timeout_seconds: config.timeout_seconds,
            max_retries: config.max_retries.max(1),
            request_delay: Duration::from_millis(config.request_delay_ms),
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            user_agent: config.user_agent.clone(),
            use_session_token: config.use_session_token,
        }
    }
}

/// Parameters of one question-batch request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchRequest {
    pub amount: usize,
    pub category: Option<u32>,
    pub difficulty: Option<String>,
    pub question_type: Option<String>,
}

impl BatchRequest {
    pub fn new(amount: usize) -> Self {
        Self {
            amount,
            ..Default::default()
        }
    }

    /// Query parameters, with `amount` clamped to the API maximum.
    fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![(
            "amount",
            self.amount.clamp(1, MAX_QUESTIONS_PER_REQUEST).to_string(),
        )];
        if let Some(category) = self.category {
            query.push(("category", category.to_string()));
        }
        if let Some(ref difficulty) = self.difficulty {
            query.push(("difficulty", difficulty.clone()));
        }
        if let Some(ref question_type) = self.question_type {
            query.push(("type", question_type.clone()));
        }
        query
    }
}

/// The trivia API client. Owns the session token.
pub struct TriviaClient {
    settings: ClientSettings,
    http_client: reqwest::Client,
    token: TokenState,
}

impl TriviaClient {
    pub fn new(settings: ClientSettings) -> Result<Self, ApiError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .user_agent(settings.user_agent.clone())
            .build()?;

        Ok(Self {
            settings,
            http_client,
            token: TokenState::NoToken,
        })
    }

    pub fn token_state(&self) -> &TokenState {
        &self.token
    }

    pub fn request_delay(&self) -> Duration {
        self.settings.request_delay
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    /// Request a fresh session token.
    ///
    /// Returns `false` when no token could be obtained; the client then runs
    /// without one.
    pub async fn acquire_token(&mut self) -> bool {
        if !self.settings.use_session_token {
            debug!("Session tokens disabled");
            self.token.clear();
            return false;
        }

        let query = vec![("command", "request".to_string())];
        match self.token_command(&query).await {
            Some(TokenReply {
                token: Some(token),
                response_message,
            }) => {
                if let Some(message) = response_message {
                    debug!("Token endpoint: {}", message);
                }
                info!("Got session token: {}...", token_preview(&token));
                self.token.activate(token);
                true
            }
            _ => {
                error!("Failed to get session token");
                self.token.clear();
                false
            }
        }
    }

    /// Reset the current token in place; falls back to a fresh token.
    pub async fn reset_token(&mut self) -> bool {
        let token = match self.token.exhaust() {
            Some(token) => token,
            None => return self.acquire_token().await,
        };

        let query = vec![("command", "reset".to_string()), ("token", token)];
        if self.token_command(&query).await.is_some() {
            info!("Session token reset successfully");
            self.token.rearm();
            true
        } else {
            error!("Failed to reset session token, getting new one");
            self.acquire_token().await
        }
    }

    /// Fetch one batch of raw questions. An empty vector means "no data".
    pub async fn fetch_questions(
        &mut self,
        request: &BatchRequest,
    ) -> Result<Vec<RawQuestion>, ApiError> {
        let url = self.endpoint(QUESTIONS_PATH);
        let query = request.to_query();
        let batch: Option<QuestionBatch> = self.call(&url, &query, true).await?;
        let results = batch.map(|b| b.results).unwrap_or_default();

        let questions = results
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<RawQuestion>(value) {
                Ok(raw) => Some(raw),
                Err(e) => {
                    error!("Error processing question: {}", e);
                    None
                }
            })
            .collect();
        Ok(questions)
    }

    /// List every available category.
    pub async fn fetch_categories(&mut self) -> Result<Vec<TriviaCategory>, ApiError> {
        info!("Fetching categories...");
        let url = self.endpoint(CATEGORIES_PATH);
        let list: Option<CategoryList> = self.call(&url, &[], false).await?;
        let categories = list.map(|l| l.trivia_categories).unwrap_or_default();
        info!("Found {} categories", categories.len());
        Ok(categories)
    }

    /// One logical API call with retries and response-code dispatch.
    async fn call<T: DeserializeOwned>(
        &mut self,
        url: &str,
        params: &[(&str, String)],
        attach_token: bool,
    ) -> Result<Option<T>, ApiError> {
        let max_retries = self.settings.max_retries;
        let mut last_error = String::from("no attempt made");

        for attempt in 0..max_retries {
            // Rebuilt per attempt so a refreshed token is picked up.
            let mut query: Vec<(&str, String)> = params.to_vec();
            if attach_token {
                if let Some(token) = self.token.current() {
                    query.push(("token", token.to_string()));
                }
            }

            info!("Making request to {} (attempt {})", url, attempt + 1);

            let (code, value) = match self.send_once(url, &query).await {
                Ok(reply) => reply,
                Err(e) if !e.is_retryable() => {
                    error!("Request failed permanently: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    error!("Request failed (attempt {}): {}", attempt + 1, e);
                    last_error = e.to_string();
                    if attempt + 1 < max_retries {
                        self.backoff(attempt).await;
                    }
                    continue;
                }
            };

            match code.dispatch() {
                Dispatch::Success => match serde_json::from_value::<T>(value) {
                    Ok(payload) => return Ok(Some(payload)),
                    Err(e) => {
                        let e = ApiError::MalformedResponse {
                            url: url.to_string(),
                            reason: e.to_string(),
                        };
                        error!("Request failed (attempt {}): {}", attempt + 1, e);
                        last_error = e.to_string();
                        if attempt + 1 < max_retries {
                            self.backoff(attempt).await;
                        }
                    }
                },
                Dispatch::Empty => {
                    warn!("No results available for this query");
                    return Ok(None);
                }
                Dispatch::Invalid => {
                    error!("Invalid parameter in request ({})", code);
                    return Ok(None);
                }
                Dispatch::RetryWithNewToken => {
                    warn!("Session token not found, requesting new one");
                    last_error = code.to_string();
                    self.token.invalidate();
                    self.acquire_token().await;
                }
                Dispatch::RetryAfterReset => {
                    info!("Session token exhausted, resetting");
                    last_error = code.to_string();
                    self.reset_token().await;
                }
                Dispatch::RetryAfterDelay => {
                    warn!("Rate limited, waiting longer");
                    last_error = code.to_string();
                    pause(self.settings.request_delay * 2).await;
                }
            }
        }

        error!("Failed to get response after {} attempts", max_retries);
        Err(ApiError::RetriesExhausted {
            url: url.to_string(),
            attempts: max_retries,
            last_error,
        })
    }

    /// Token lifecycle call. Retries transport failures and rate limiting
    /// only; any other non-success code yields `None`.
    async fn token_command(&self, params: &[(&str, String)]) -> Option<TokenReply> {
        let url = self.endpoint(TOKEN_PATH);
        let max_retries = self.settings.max_retries;

        for attempt in 0..max_retries {
            info!("Making request to {} (attempt {})", url, attempt + 1);

            match self.send_once(&url, params).await {
                Ok((ResponseCode::Success, value)) => match serde_json::from_value(value) {
                    Ok(reply) => return Some(reply),
                    Err(e) => error!("Malformed token reply: {}", e),
                },
                Ok((ResponseCode::RateLimited, _)) => {
                    warn!("Rate limited, waiting longer");
                    pause(self.settings.request_delay * 2).await;
                    continue;
                }
                Ok((code, _)) => {
                    warn!("Token command rejected: {}", code);
                    return None;
                }
                Err(e) => error!("Request failed (attempt {}): {}", attempt + 1, e),
            }

            if attempt + 1 < max_retries {
                self.backoff(attempt).await;
            }
        }

        None
    }

    /// Single HTTP round-trip, decoded as JSON with its response code.
    async fn send_once(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<(ResponseCode, Value), ApiError> {
        let response = self.http_client.get(url).query(query).send().await?;

        if !response.status().is_success() {
            return Err(ApiError::HttpStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        let value: Value =
            serde_json::from_str(&body).map_err(|e| ApiError::MalformedResponse {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        let envelope =
            Envelope::deserialize(&value).map_err(|e| ApiError::MalformedResponse {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        debug!("Response code from {}: {}", url, envelope.code());
        Ok((envelope.code(), value))
    }

    async fn backoff(&self, attempt: usize) {
        let factor = 2u32.saturating_pow(attempt as u32);
        let delay = self
            .settings
            .backoff_base
            .checked_mul(factor)
            .unwrap_or(Duration::from_secs(60));
        debug!("Backing off for {:?}", delay);
        pause(delay).await;
    }
}

/// Sleep, skipping zero-length waits.
pub async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
