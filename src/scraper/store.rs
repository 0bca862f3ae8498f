//! Append-only CSV storage for normalized questions.
//!
//! Every append opens the file, writes one row, flushes and closes it, so an
//! interrupted run loses at most the in-flight record. On startup the
//! existing file is scanned once to rebuild the dedup set and written count.

use crate::error::StoreError;
use crate::models::{Question, StoredKey, CSV_COLUMNS};
use crate::scraper::normalizer::{question_hash, SeenHashes};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Log a progress line every this many written questions.
const PROGRESS_EVERY: usize = 10;

pub struct QuestionStore {
    path: PathBuf,
    written: usize,
}

impl QuestionStore {
    /// Open the store at `path`, preloading whatever it already contains.
    pub fn open(path: impl Into<PathBuf>) -> (Self, SeenHashes) {
        let path = path.into();
        let (seen, written) = preload(&path);
        (Self { path, written }, seen)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records written so far, including those preloaded.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Append one record, writing the header first if the file is missing or empty.
    pub fn append(&mut self, question: &Question) -> Result<(), StoreError> {
        self.ensure_header()?;

        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|source| self.io_error(source))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer
            .serialize(question.as_row())
            .map_err(|source| self.csv_error(source))?;
        writer.flush().map_err(|source| self.io_error(source))?;

        self.written += 1;
        debug!("Appended question {}", question.question_hash);
        if self.written % PROGRESS_EVERY == 0 {
            info!(
                "Progress: {} questions written to {}",
                self.written,
                self.path.display()
            );
        }

        Ok(())
    }

    /// Prepare the file for the next row: write the header if it is missing
    /// or empty, and terminate a trailing row left unfinished by a kill so
    /// the new record starts on its own line.
    fn ensure_header(&self) -> Result<(), StoreError> {
        let len = match fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == ErrorKind::NotFound => 0,
            Err(source) => return Err(self.io_error(source)),
        };

        if len > 0 {
            return self.terminate_last_row();
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| self.io_error(source))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer
            .write_record(CSV_COLUMNS)
            .map_err(|source| self.csv_error(source))?;
        writer.flush().map_err(|source| self.io_error(source))?;
        info!("Created new CSV file: {}", self.path.display());

        Ok(())
    }

    fn terminate_last_row(&self) -> Result<(), StoreError> {
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| self.io_error(source))?;

        let mut last = [0u8; 1];
        file.seek(SeekFrom::End(-1))
            .and_then(|_| file.read_exact(&mut last))
            .map_err(|source| self.io_error(source))?;

        if last[0] != b'\n' {
            warn!(
                "{} ends with an unfinished row; starting the next record on a new line",
                self.path.display()
            );
            file.write_all(b"\n")
                .and_then(|_| file.flush())
                .map_err(|source| self.io_error(source))?;
        }

        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn csv_error(&self, source: csv::Error) -> StoreError {
        StoreError::Csv {
            path: self.path.clone(),
            source,
        }
    }
}

/// Rebuild the dedup set and written count from an existing file.
///
/// A missing file is a fresh start. An unreadable file is logged and also
/// treated as a fresh start, which may let on-disk duplicates back in.
pub fn preload(path: &Path) -> (SeenHashes, usize) {
    if !path.exists() {
        info!("No existing file found at {}, starting fresh", path.display());
        return (SeenHashes::new(), 0);
    }

    match read_existing(path) {
        Ok((seen, written)) => {
            info!(
                "Loaded {} existing questions from {}",
                seen.len(),
                path.display()
            );
            info!("Will continue from question {}", written + 1);
            (seen, written)
        }
        Err(e) => {
            error!("Error loading existing questions: {}", e);
            warn!(
                "Starting fresh due to error reading existing file; questions already in {} may be duplicated",
                path.display()
            );
            (SeenHashes::new(), 0)
        }
    }
}

fn read_existing(path: &Path) -> Result<(SeenHashes, usize), StoreError> {
    let csv_error = |source: csv::Error| StoreError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(&csv_error)?;

    let mut seen = SeenHashes::new();
    let mut written = 0;

    for (index, row) in reader.deserialize::<StoredKey>().enumerate() {
        match row {
            Ok(key) => {
                seen.insert(question_hash(&key.question, &key.correct_answer));
                written += 1;
            }
            Err(e) if e.is_io_error() => return Err(csv_error(e)),
            // Typically a row truncated by an interrupted append.
            Err(e) => warn!("Skipping unreadable row {}: {}", index + 2, e),
        }
    }

    Ok((seen, written))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn question(text: &str, answer: &str) -> Question {
        Question {
            category: "History".to_string(),
            question: text.to_string(),
            options: vec!["X".to_string(), answer.to_string(), "Y".to_string()],
            correct_answer: answer.to_string(),
            difficulty: "hard".to_string(),
            question_type: "multiple".to_string(),
            question_hash: question_hash(text, answer),
        }
    }

    #[test]
    fn test_missing_file_is_fresh_start() {
        let dir = TempDir::new().unwrap();
        let (store, seen) = QuestionStore::open(dir.path().join("none.csv"));

        assert_eq!(store.written(), 0);
        assert_eq!(seen.len(), 0);
        assert!(!store.exists());
    }

    #[test]
    fn test_header_written_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("q.csv");
        let (mut store, _) = QuestionStore::open(&path);

        store.append(&question("First?", "One")).unwrap();
        store.append(&question("Second?", "Two")).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "category,question,options,correct_answer,difficulty,type");
        assert_eq!(lines.len(), 3);
        assert_eq!(content.matches("category,question").count(), 1);
        assert!(lines[1].contains("X | One | Y"));
        assert_eq!(store.written(), 2);
    }

    #[test]
    fn test_empty_existing_file_gets_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.csv");
        fs::write(&path, "").unwrap();

        let (mut store, seen) = QuestionStore::open(&path);
        assert_eq!(store.written(), 0);
        assert_eq!(seen.len(), 0);

        store.append(&question("Q?", "A")).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("category,question,options,correct_answer,difficulty,type"));
    }

    #[test]
    fn test_reopen_reconstructs_state() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("resume.csv");

        {
            let (mut store, _) = QuestionStore::open(&path);
            for i in 0..7 {
                store
                    .append(&question(&format!("Question {}?", i), "Answer"))
                    .unwrap();
            }
            // dropped here, as if the process was killed after record 7
        }

        let (store, seen) = QuestionStore::open(&path);
        assert_eq!(store.written(), 7);
        assert_eq!(seen.len(), 7);
        assert!(seen.contains(&question_hash("question 3?", "answer")));
    }

    #[test]
    fn test_embedded_separators_survive_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quoted.csv");

        let tricky = question("Which, of these\nis \"odd\"?", "A, B");
        {
            let (mut store, _) = QuestionStore::open(&path);
            store.append(&tricky).unwrap();
        }

        let (store, seen) = QuestionStore::open(&path);
        assert_eq!(store.written(), 1);
        assert!(seen.contains(&tricky.question_hash));
    }

    #[test]
    fn test_truncated_row_is_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("truncated.csv");
        fs::write(
            &path,
            "category,question,options,correct_answer,difficulty,type\n\
             History,Q1?,A | B,A,easy,multiple\n\
             History,Q2?\n",
        )
        .unwrap();

        let (store, seen) = QuestionStore::open(&path);
        assert_eq!(store.written(), 1);
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn test_append_after_unfinished_row_starts_new_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("killed.csv");
        fs::write(
            &path,
            "category,question,options,correct_answer,difficulty,type\n\
             History,Q1?,A | B,A,easy,multiple\n\
             History,Q2?,A | B",
        )
        .unwrap();

        let next = question("Q3?", "Y");
        {
            let (mut store, _) = QuestionStore::open(&path);
            assert_eq!(store.written(), 1);
            store.append(&next).unwrap();
        }

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("History,Q2?,A | B\n"));
        assert!(content.ends_with('\n'));

        let (store, seen) = QuestionStore::open(&path);
        assert_eq!(store.written(), 2);
        assert!(seen.contains(&next.question_hash));
        assert!(seen.contains(&question_hash("Q1?", "A")));
    }

    #[test]
    fn test_append_to_terminated_file_adds_no_blank_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clean.csv");

        {
            let (mut store, _) = QuestionStore::open(&path);
            store.append(&question("First?", "One")).unwrap();
        }
        let (mut store, _) = QuestionStore::open(&path);
        store.append(&question("Second?", "Two")).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("\n\n"));
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn test_unreadable_file_degrades_to_fresh_start() {
        let dir = TempDir::new().unwrap();

        // A directory exists but cannot be read as a table.
        let (store, seen) = QuestionStore::open(dir.path());
        assert_eq!(store.written(), 0);
        assert_eq!(seen.len(), 0);
    }

    #[test]
    fn test_file_without_expected_columns_degrades_to_fresh_start() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("foreign.csv");
        fs::write(&path, "a,b\n1,2\n3,4\n").unwrap();

        let (store, seen) = QuestionStore::open(&path);
        // Rows without question/correct_answer are skipped individually.
        assert_eq!(store.written(), 0);
        assert_eq!(seen.len(), 0);
    }
}
