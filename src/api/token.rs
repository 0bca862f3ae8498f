//! Session token state machine.
//!
//! The server uses the session token to avoid re-serving questions this
//! client has already seen. Transitions are driven by response codes:
//!
//! ```text
//! NoToken --acquire--> Active --(TokenNotFound)--> Invalid --acquire--> Active | NoToken
//!                      Active --(TokenEmpty)-----> Exhausted --reset--> Active
//! ```
//!
//! A failed acquisition leaves the machine in `NoToken` (degraded mode: only
//! client-side hash dedup applies).

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TokenState {
    #[default]
    NoToken,
    Active(String),
    Exhausted(String),
    Invalid,
}

impl TokenState {
    /// Token to attach to outgoing question requests, if any.
    pub fn current(&self) -> Option<&str> {
        match self {
            TokenState::Active(token) => Some(token),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, TokenState::Active(_))
    }

    /// Server reported the token unknown.
    pub fn invalidate(&mut self) {
        *self = TokenState::Invalid;
    }

    /// Server reported every question for this token served. Returns the token to reset.
    pub fn exhaust(&mut self) -> Option<String> {
        let state = std::mem::take(self);
        match state {
            TokenState::Active(token) | TokenState::Exhausted(token) => {
                *self = TokenState::Exhausted(token.clone());
                Some(token)
            }
            other => {
                *self = other;
                None
            }
        }
    }

    pub fn activate(&mut self, token: String) {
        *self = TokenState::Active(token);
    }

    /// Re-arm an exhausted token after a successful reset.
    pub fn rearm(&mut self) {
        *self = match std::mem::take(self) {
            TokenState::Exhausted(token) => TokenState::Active(token),
            other => other,
        };
    }

    pub fn clear(&mut self) {
        *self = TokenState::NoToken;
    }
}

impl fmt::Display for TokenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenState::NoToken => write!(f, "no token"),
            TokenState::Active(token) => write!(f, "active ({}...)", token_preview(token)),
            TokenState::Exhausted(token) => write!(f, "exhausted ({}...)", token_preview(token)),
            TokenState::Invalid => write!(f, "invalid"),
        }
    }
}

/// First 16 characters of a token, for logs.
pub fn token_preview(token: &str) -> &str {
    match token.char_indices().nth(16) {
        Some((idx, _)) => &token[..idx],
        None => token,
    }
}
