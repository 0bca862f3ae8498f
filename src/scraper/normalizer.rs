//! Question normalization and duplicate detection.
//!
//! Raw API questions are HTML-entity decoded, their options shuffled, and
//! keyed by a content hash. A hash, once registered, stays registered for the
//! rest of the run.

use crate::models::{Question, RawQuestion};
use rand::seq::SliceRandom;
use rand::Rng;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use tracing::debug;

/// Decode HTML entities (`&quot;`, `&#039;`, `&eacute;`, ...).
pub fn decode_text(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

/// Dedup key: SHA-256 of the lower-cased, trimmed `"question:correct_answer"`.
pub fn question_hash(question: &str, correct_answer: &str) -> String {
    let content = format!("{}:{}", question, correct_answer)
        .to_lowercase()
        .trim()
        .to_string();

    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// In-memory set of every hash loaded or appended this run.
#[derive(Debug, Clone, Default)]
pub struct SeenHashes {
    hashes: HashSet<String>,
}

impl SeenHashes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.hashes.contains(hash)
    }

    /// Register a hash. Returns `false` if it was already present.
    pub fn insert(&mut self, hash: String) -> bool {
        self.hashes.insert(hash)
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }
}

/// Turns raw API questions into records, rejecting duplicates.
pub struct Normalizer<R: Rng> {
    rng: R,
}

impl<R: Rng> Normalizer<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Normalize `raw`. Returns `None` when its hash is already in `seen`.
    ///
    /// On success the hash is registered in `seen` before the record is
    /// returned; there is no way to unregister it.
    pub fn normalize(&mut self, raw: &RawQuestion, seen: &mut SeenHashes) -> Option<Question> {
        let category = decode_text(&raw.category);
        let question = decode_text(&raw.question);
        let correct_answer = decode_text(&raw.correct_answer);

        let mut options = Vec::with_capacity(raw.incorrect_answers.len() + 1);
        options.push(correct_answer.clone());
        options.extend(raw.incorrect_answers.iter().map(|a| decode_text(a)));
        options.shuffle(&mut self.rng);

        let hash = question_hash(&question, &correct_answer);
        if seen.contains(&hash) {
            debug!(
                "Duplicate question detected: {}...",
                question.chars().take(50).collect::<String>()
            );
            return None;
        }
        seen.insert(hash.clone());

        Some(Question {
            category,
            question,
            options,
            correct_answer,
            difficulty: raw.difficulty.clone(),
            question_type: raw.question_type.clone(),
            question_hash: hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeSet;

    fn raw(question: &str, correct: &str, incorrect: &[&str]) -> RawQuestion {
        RawQuestion {
            category: "Entertainment: Music".to_string(),
            question_type: "multiple".to_string(),
            difficulty: "medium".to_string(),
            question: question.to_string(),
            correct_answer: correct.to_string(),
            incorrect_answers: incorrect.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn normalizer(seed: u64) -> Normalizer<StdRng> {
        Normalizer::new(StdRng::seed_from_u64(seed))
    }

    #[test]
    fn test_decode_text() {
        assert_eq!(decode_text("Who wrote &quot;Hamlet&quot;?"), "Who wrote \"Hamlet\"?");
        assert_eq!(decode_text("It&#039;s"), "It's");
        assert_eq!(decode_text("Beyonc&eacute; &amp; Jay-Z"), "Beyoncé & Jay-Z");
        assert_eq!(decode_text("plain"), "plain");
    }

    #[test]
    fn test_question_hash_is_case_and_whitespace_insensitive() {
        let a = question_hash("What is 2+2?", "Four");
        let b = question_hash("WHAT IS 2+2?", "four");
        let c = question_hash("  What is 2+2?", "Four  ");
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_ne!(a, question_hash("What is 2+2?", "Five"));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_options_are_a_permutation_of_answers() {
        let mut normalizer = normalizer(7);
        let mut seen = SeenHashes::new();
        let question = normalizer
            .normalize(&raw("Pick one", "D", &["A", "B", "C"]), &mut seen)
            .unwrap();

        let options: BTreeSet<_> = question.options.iter().map(String::as_str).collect();
        let expected: BTreeSet<_> = ["A", "B", "C", "D"].into_iter().collect();
        assert_eq!(options, expected);
        assert_eq!(question.options.len(), 4);
        assert_eq!(
            question.options.iter().filter(|o| **o == question.correct_answer).count(),
            1
        );
    }

    #[test]
    fn test_shuffle_moves_correct_answer_across_seeds() {
        let mut positions = BTreeSet::new();
        for seed in 0..32 {
            let mut normalizer = normalizer(seed);
            let mut seen = SeenHashes::new();
            let question = normalizer
                .normalize(&raw("Pick one", "D", &["A", "B", "C"]), &mut seen)
                .unwrap();
            let position = question.options.iter().position(|o| o == "D").unwrap();
            positions.insert(position);
        }
        assert!(positions.len() > 1);
    }

    #[test]
    fn test_entities_decoded_before_hashing() {
        let mut normalizer = normalizer(1);
        let mut seen = SeenHashes::new();

        let first = normalizer
            .normalize(&raw("Who is &quot;Q&quot;?", "Bond&#039;s boss", &["M"]), &mut seen)
            .unwrap();
        assert_eq!(first.question, "Who is \"Q\"?");
        assert_eq!(first.correct_answer, "Bond's boss");
        assert_eq!(first.question_hash, question_hash("Who is \"Q\"?", "Bond's boss"));

        // Same content, already decoded: still a duplicate.
        assert!(normalizer
            .normalize(&raw("Who is \"Q\"?", "Bond's boss", &["M"]), &mut seen)
            .is_none());
    }

    #[test]
    fn test_duplicates_rejected_and_set_grows_once() {
        let mut normalizer = normalizer(3);
        let mut seen = SeenHashes::new();

        assert!(normalizer.normalize(&raw("Q1", "A", &["B"]), &mut seen).is_some());
        assert!(normalizer.normalize(&raw("q1", "a", &["C"]), &mut seen).is_none());
        assert!(normalizer.normalize(&raw("Q2", "A", &["B"]), &mut seen).is_some());

        assert_eq!(seen.len(), 2);
        assert!(seen.contains(&question_hash("Q1", "A")));
    }
}
