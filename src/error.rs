//! Error types shared across modules.

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the request layer.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Malformed response from {url}: {reason}")]
    MalformedResponse { url: String, reason: String },

    #[error("Giving up on {url} after {attempts} attempts (last error: {last_error})")]
    RetriesExhausted {
        url: String,
        attempts: usize,
        last_error: String,
    },
}

impl ApiError {
    /// Whether this failure is retried with backoff. Client errors other
    /// than 429 will not change on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::HttpStatus { status, .. } => *status == 429 || !(400..500).contains(status),
            ApiError::RetriesExhausted { .. } => false,
            ApiError::Transport(_) | ApiError::MalformedResponse { .. } => true,
        }
    }
}

/// Failures reading or appending the question table.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Failures of the analyzer.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("File '{0}' not found")]
    FileNotFound(PathBuf),

    #[error("Missing expected columns: {}. Found columns: {}", .missing.join(", "), .found.join(", "))]
    MissingColumns {
        missing: Vec<String>,
        found: Vec<String>,
    },

    #[error("Error reading CSV file: {0}")]
    Csv(#[from] csv::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_message_names_columns() {
        let err = AnalysisError::MissingColumns {
            missing: vec!["difficulty".to_string()],
            found: vec!["category".to_string(), "question".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("difficulty"));
        assert!(msg.contains("category, question"));
    }

    #[test]
    fn test_retries_exhausted_not_retryable() {
        let err = ApiError::RetriesExhausted {
            url: "http://x".to_string(),
            attempts: 3,
            last_error: "timeout".to_string(),
        };
        assert!(!err.is_retryable());

        let err = ApiError::HttpStatus {
            status: 503,
            url: "http://x".to_string(),
        };
        assert!(err.is_retryable());

        let err = ApiError::HttpStatus {
            status: 429,
            url: "http://x".to_string(),
        };
        assert!(err.is_retryable());

        let err = ApiError::HttpStatus {
            status: 404,
            url: "http://x".to_string(),
        };
        assert!(!err.is_retryable());
    }
}
