//! Structured response codes and their dispatch.
//!
//! Every API reply carries a numeric `response_code`. The request layer
//! classifies it into a [`Dispatch`] that the retry loop consumes.

use serde::Deserialize;
use std::fmt;

/// Response codes documented by the Open Trivia DB API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    Success,
    NoResults,
    InvalidParameter,
    TokenNotFound,
    TokenEmpty,
    RateLimited,
    Unknown(i64),
}

impl From<i64> for ResponseCode {
    fn from(code: i64) -> Self {
        match code {
            0 => ResponseCode::Success,
            1 => ResponseCode::NoResults,
            2 => ResponseCode::InvalidParameter,
            3 => ResponseCode::TokenNotFound,
            4 => ResponseCode::TokenEmpty,
            5 => ResponseCode::RateLimited,
            other => ResponseCode::Unknown(other),
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseCode::Success => write!(f, "success"),
            ResponseCode::NoResults => write!(f, "no results"),
            ResponseCode::InvalidParameter => write!(f, "invalid parameter"),
            ResponseCode::TokenNotFound => write!(f, "token not found"),
            ResponseCode::TokenEmpty => write!(f, "token empty"),
            ResponseCode::RateLimited => write!(f, "rate limited"),
            ResponseCode::Unknown(code) => write!(f, "unknown code {}", code),
        }
    }
}

/// What the retry loop should do with a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Decode and return the payload.
    Success,
    /// Return "no data" without error.
    Empty,
    /// Abort this call and return "no data".
    Invalid,
    /// Acquire a fresh token, then retry.
    RetryWithNewToken,
    /// Reset the current token in place, then retry.
    RetryAfterReset,
    /// Sleep twice the inter-request delay, then retry.
    RetryAfterDelay,
}

impl ResponseCode {
    pub fn dispatch(self) -> Dispatch {
        match self {
            ResponseCode::Success => Dispatch::Success,
            ResponseCode::NoResults => Dispatch::Empty,
            ResponseCode::InvalidParameter | ResponseCode::Unknown(_) => Dispatch::Invalid,
            ResponseCode::TokenNotFound => Dispatch::RetryWithNewToken,
            ResponseCode::TokenEmpty => Dispatch::RetryAfterReset,
            ResponseCode::RateLimited => Dispatch::RetryAfterDelay,
        }
    }
}

/// Envelope probe: only the status code is read here.
///
/// Endpoints that omit `response_code` (the category listing) are treated as successful.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub response_code: Option<i64>,
}

impl Envelope {
    pub fn code(&self) -> ResponseCode {
        self.response_code
            .map(ResponseCode::from)
            .unwrap_or(ResponseCode::Success)
    }
}
