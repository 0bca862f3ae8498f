//! Data models for the trivia harvester.
//!
//! This module contains the wire types returned by the Open Trivia DB API
//! and the normalized question record persisted to the CSV table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of questions the API serves per request.
pub const MAX_QUESTIONS_PER_REQUEST: usize = 50;

/// Separator used to join answer options in the persisted table.
pub const OPTIONS_SEPARATOR: &str = " | ";

/// Column order of the persisted table.
pub const CSV_COLUMNS: [&str; 6] = [
    "category",
    "question",
    "options",
    "correct_answer",
    "difficulty",
    "type",
];

/// One question object as returned by the question-batch endpoint.
///
/// All text fields are still HTML-entity encoded at this point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawQuestion {
    pub category: String,
    #[serde(rename = "type")]
    pub question_type: String,
    pub difficulty: String,
    pub question: String,
    pub correct_answer: String,
    #[serde(default)]
    pub incorrect_answers: Vec<String>,
}

/// Payload of a successful question-batch response.
///
/// Results are kept as raw JSON so a single malformed question can be
/// skipped without discarding the batch.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionBatch {
    #[serde(default)]
    pub results: Vec<serde_json::Value>,
}

/// A category entry from the category listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriviaCategory {
    pub id: u32,
    pub name: String,
}

/// Payload of the category listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryList {
    #[serde(default)]
    pub trivia_categories: Vec<TriviaCategory>,
}

/// Payload of the session token endpoint (request and reset commands).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenReply {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub response_message: Option<String>,
}

/// A normalized question, ready to be appended to the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub category: String,
    pub question: String,
    /// Correct and incorrect answers in shuffled order.
    pub options: Vec<String>,
    pub correct_answer: String,
    pub difficulty: String,
    pub question_type: String,
    /// Dedup key; kept in memory only.
    pub question_hash: String,
}

impl Question {
    /// Options joined with the table separator.
    pub fn joined_options(&self) -> String {
        self.options.join(OPTIONS_SEPARATOR)
    }

    /// Borrowing view of this question as a table row.
    pub fn as_row(&self) -> QuestionRow<'_> {
        QuestionRow {
            category: &self.category,
            question: &self.question,
            options: self.joined_options(),
            correct_answer: &self.correct_answer,
            difficulty: &self.difficulty,
            question_type: &self.question_type,
        }
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}/{}] {}",
            self.category, self.difficulty, self.question
        )
    }
}

/// Serialized shape of one table row. Field order is the column order.
#[derive(Debug, Serialize)]
pub struct QuestionRow<'a> {
    pub category: &'a str,
    pub question: &'a str,
    pub options: String,
    pub correct_answer: &'a str,
    pub difficulty: &'a str,
    #[serde(rename = "type")]
    pub question_type: &'a str,
}

/// The subset of a stored row needed to rebuild the dedup set.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredKey {
    pub question: String,
    pub correct_answer: String,
}

/// Snapshot of scraper progress.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressInfo {
    pub questions_written: usize,
    pub unique_hashes: usize,
    pub output_file: String,
    pub file_exists: bool,
}

impl fmt::Display for ProgressInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} questions written, {} unique hashes, file {} ({})",
            self.questions_written,
            self.unique_hashes,
            self.output_file,
            if self.file_exists { "exists" } else { "missing" }
        )
    }
}
