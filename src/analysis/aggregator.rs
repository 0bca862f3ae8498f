//! Question table aggregation and statistics.
//!
//! This module reads a persisted question table in one pass and computes
//! per-category counts, difficulty and type distributions, sample questions,
//! a category ranking and threshold-based insights.

use crate::config::AnalyzeConfig;
use crate::error::AnalysisError;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// Columns a table must carry to be analyzed. `type` is optional.
pub const REQUIRED_COLUMNS: [&str; 5] = [
    "category",
    "question",
    "options",
    "correct_answer",
    "difficulty",
];

/// Tunables for one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub sample_questions: usize,
    pub sample_length: usize,
    pub min_category_size: usize,
    pub easy_threshold: f64,
    pub hard_threshold: f64,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self::from(&AnalyzeConfig::default())
    }
}

impl From<&AnalyzeConfig> for AnalysisOptions {
    fn from(config: &AnalyzeConfig) -> Self {
        Self {
            sample_questions: config.sample_questions,
            sample_length: config.sample_length,
            min_category_size: config.min_category_size,
            easy_threshold: config.easy_threshold,
            hard_threshold: config.hard_threshold,
        }
    }
}

/// Statistics for a single category.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CategoryStats {
    pub name: String,
    pub total: usize,
    pub difficulties: BTreeMap<String, usize>,
    pub types: BTreeMap<String, usize>,
    pub samples: Vec<String>,
}

impl CategoryStats {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn difficulty_count(&self, difficulty: &str) -> usize {
        self.difficulties.get(difficulty).copied().unwrap_or(0)
    }

    /// Share of `difficulty` in this category, in percent.
    pub fn difficulty_percentage(&self, difficulty: &str) -> f64 {
        percentage(self.difficulty_count(difficulty), self.total)
    }
}

/// Aggregate over a whole table.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetStats {
    pub total_questions: usize,
    pub difficulties: BTreeMap<String, usize>,
    pub types: BTreeMap<String, usize>,
    pub has_type_column: bool,
    /// Ranked by count descending, then name ascending.
    pub categories: Vec<CategoryStats>,
    pub skipped_rows: usize,
}

impl DatasetStats {
    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    pub fn average_per_category(&self) -> f64 {
        if self.categories.is_empty() {
            0.0
        } else {
            self.total_questions as f64 / self.categories.len() as f64
        }
    }
}

/// A category paired with the share that qualified it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub category: String,
    pub percentage: f64,
}

/// A category paired with its record count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

/// Threshold-based observations over a [`DatasetStats`].
#[derive(Debug, Clone, Serialize)]
pub struct Insights {
    pub most_populous: Option<CategoryCount>,
    pub least_populous: Option<CategoryCount>,
    /// Sorted by easy share, highest first.
    pub mostly_easy: Vec<CategoryShare>,
    /// Sorted by hard share, highest first.
    pub many_hard: Vec<CategoryShare>,
    pub average_per_category: f64,
}

/// Analyze the table at `path`.
pub fn analyze_file(path: &Path, options: &AnalysisOptions) -> Result<DatasetStats, AnalysisError> {
    if !path.exists() {
        return Err(AnalysisError::FileNotFound(path.to_path_buf()));
    }

    debug!("Analyzing {}", path.display());
    let file = std::fs::File::open(path).map_err(csv::Error::from)?;
    analyze_reader(file, options)
}

/// Analyze a table from any reader.
pub fn analyze_reader<R: Read>(
    reader: R,
    options: &AnalysisOptions,
) -> Result<DatasetStats, AnalysisError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h == name);

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|name| column(**name).is_none())
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(AnalysisError::MissingColumns {
            missing,
            found: headers.iter().map(String::from).collect(),
        });
    }

    // Presence checked above.
    let category_idx = column("category").unwrap_or_default();
    let question_idx = column("question").unwrap_or_default();
    let difficulty_idx = column("difficulty").unwrap_or_default();
    let type_idx = column("type");

    let mut total_questions = 0;
    let mut skipped_rows = 0;
    let mut difficulties: BTreeMap<String, usize> = BTreeMap::new();
    let mut types: BTreeMap<String, usize> = BTreeMap::new();
    let mut categories: HashMap<String, CategoryStats> = HashMap::new();

    for (index, record) in reader.records().enumerate() {
        let record = record?;

        let (Some(category), Some(question), Some(difficulty)) = (
            record.get(category_idx),
            record.get(question_idx),
            record.get(difficulty_idx),
        ) else {
            warn!("Skipping incomplete row {}", index + 2);
            skipped_rows += 1;
            continue;
        };

        total_questions += 1;
        *difficulties.entry(difficulty.to_string()).or_default() += 1;

        let stats = categories
            .entry(category.to_string())
            .or_insert_with(|| CategoryStats::new(category));
        stats.total += 1;
        *stats.difficulties.entry(difficulty.to_string()).or_default() += 1;

        if let Some(question_type) = type_idx.and_then(|idx| record.get(idx)) {
            *types.entry(question_type.to_string()).or_default() += 1;
            *stats.types.entry(question_type.to_string()).or_default() += 1;
        }

        if stats.samples.len() < options.sample_questions {
            stats.samples.push(truncate_text(question, options.sample_length));
        }
    }

    let mut categories: Vec<CategoryStats> = categories.into_values().collect();
    categories.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));

    Ok(DatasetStats {
        total_questions,
        difficulties,
        types,
        has_type_column: type_idx.is_some(),
        categories,
        skipped_rows,
    })
}

/// Compute the most/least populous categories and the difficulty outliers.
pub fn compute_insights(stats: &DatasetStats, options: &AnalysisOptions) -> Insights {
    let to_count = |c: &CategoryStats| CategoryCount {
        category: c.name.clone(),
        count: c.total,
    };

    let mut mostly_easy = Vec::new();
    let mut many_hard = Vec::new();

    for category in stats
        .categories
        .iter()
        .filter(|c| c.total >= options.min_category_size)
    {
        let easy = category.difficulty_percentage("easy");
        if easy >= options.easy_threshold {
            mostly_easy.push(CategoryShare {
                category: category.name.clone(),
                percentage: easy,
            });
        }

        let hard = category.difficulty_percentage("hard");
        if hard >= options.hard_threshold {
            many_hard.push(CategoryShare {
                category: category.name.clone(),
                percentage: hard,
            });
        }
    }

    sort_shares(&mut mostly_easy);
    sort_shares(&mut many_hard);

    Insights {
        most_populous: stats.categories.first().map(to_count),
        least_populous: stats.categories.last().map(to_count),
        mostly_easy,
        many_hard,
        average_per_category: stats.average_per_category(),
    }
}

/// Rank a distribution by count descending, then key ascending.
pub fn rank_counts(counts: &BTreeMap<String, usize>) -> Vec<(&str, usize)> {
    let mut ranked: Vec<(&str, usize)> = counts.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    // BTreeMap iteration is already key-ordered; a stable sort keeps it for ties.
    ranked.sort_by_key(|(_, count)| std::cmp::Reverse(*count));
    ranked
}

/// `part` as a percentage of `whole`; zero when `whole` is zero.
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Cut `text` to `max_chars` characters, marking the cut with "...".
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

fn sort_shares(shares: &mut [CategoryShare]) {
    shares.sort_by(|a, b| {
        b.percentage
            .partial_cmp(&a.percentage)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.category.cmp(&b.category))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write as _;
    use tempfile::TempDir;

    fn table(header: &str, rows: &[(&str, &str)]) -> String {
        let mut out = format!("{}\n", header);
        for (i, (category, difficulty)) in rows.iter().enumerate() {
            let _ = writeln!(
                out,
                "{},\"{}\",Q{}?,A | B,A,{}",
                i + 1,
                category,
                i,
                difficulty
            );
        }
        out
    }

    fn ranking(stats: &DatasetStats) -> Vec<&str> {
        stats.categories.iter().map(|c| c.name.as_str()).collect()
    }

    fn repeated(category: &'static str, difficulty: &'static str, n: usize) -> Vec<(&'static str, &'static str)> {
        std::iter::repeat((category, difficulty)).take(n).collect()
    }

    #[test]
    fn test_counts_and_ranking() {
        let mut rows = repeated("Science", "easy", 5);
        rows.extend(repeated("History", "hard", 3));
        rows.extend(repeated("Art", "medium", 2));
        let data = table("id,category,question,options,correct_answer,difficulty", &rows);

        let stats = analyze_reader(data.as_bytes(), &AnalysisOptions::default()).unwrap();

        assert_eq!(stats.total_questions, 10);
        assert_eq!(stats.category_count(), 3);
        assert_eq!(ranking(&stats), vec!["Science", "History", "Art"]);
        assert!(!stats.has_type_column);
        assert_eq!(stats.difficulties.get("easy"), Some(&5));
        assert_eq!(stats.categories[0].samples, vec!["Q0?", "Q1?", "Q2?"]);
    }

    #[test]
    fn test_missing_difficulty_column() {
        let data = "category,question,options,correct_answer,type\nScience,Q?,A | B,A,multiple\n";

        let err = analyze_reader(data.as_bytes(), &AnalysisOptions::default()).unwrap_err();

        match err {
            AnalysisError::MissingColumns { missing, found } => {
                assert_eq!(missing, vec!["difficulty".to_string()]);
                assert!(found.contains(&"type".to_string()));
            }
            other => panic!("expected MissingColumns, got {}", other),
        }
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.csv");

        let err = analyze_file(&path, &AnalysisOptions::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::FileNotFound(_)));
    }

    #[test]
    fn test_type_distribution() {
        let data = "category,question,options,correct_answer,difficulty,type\n\
                    Science,Q1?,A | B,A,easy,multiple\n\
                    Science,Q2?,True | False,True,easy,boolean\n\
                    Art,Q3?,A | B,A,hard,multiple\n";

        let stats = analyze_reader(data.as_bytes(), &AnalysisOptions::default()).unwrap();

        assert!(stats.has_type_column);
        assert_eq!(stats.types.get("multiple"), Some(&2));
        assert_eq!(stats.categories[0].types.get("boolean"), Some(&1));
    }

    #[test]
    fn test_samples_truncated_by_characters() {
        let long = "é".repeat(120);
        let data = format!(
            "category,question,options,correct_answer,difficulty\nScience,{},A | B,A,easy\n",
            long
        );

        let stats = analyze_reader(data.as_bytes(), &AnalysisOptions::default()).unwrap();
        let sample = &stats.categories[0].samples[0];

        assert!(sample.ends_with("..."));
        assert_eq!(sample.chars().count(), 103);
    }

    #[test]
    fn test_ties_ordered_by_name() {
        let mut rows = repeated("Zoology", "easy", 2);
        rows.extend(repeated("Anatomy", "easy", 2));
        let data = table("id,category,question,options,correct_answer,difficulty", &rows);

        let stats = analyze_reader(data.as_bytes(), &AnalysisOptions::default()).unwrap();
        assert_eq!(ranking(&stats), vec!["Anatomy", "Zoology"]);
    }

    #[test]
    fn test_insights_thresholds() {
        let mut rows = repeated("Easy Town", "easy", 7);
        rows.extend(repeated("Easy Town", "hard", 3));
        rows.extend(repeated("Hard Place", "hard", 6));
        rows.extend(repeated("Hard Place", "medium", 6));
        // Too small to qualify even though it is all easy.
        rows.extend(repeated("Tiny", "easy", 4));
        let data = table("id,category,question,options,correct_answer,difficulty", &rows);

        let options = AnalysisOptions::default();
        let stats = analyze_reader(data.as_bytes(), &options).unwrap();
        let insights = compute_insights(&stats, &options);

        assert_eq!(
            insights.most_populous,
            Some(CategoryCount {
                category: "Hard Place".to_string(),
                count: 12
            })
        );
        assert_eq!(insights.least_populous.map(|c| c.category), Some("Tiny".to_string()));
        assert_eq!(insights.mostly_easy.len(), 1);
        assert_eq!(insights.mostly_easy[0].category, "Easy Town");
        assert!((insights.mostly_easy[0].percentage - 70.0).abs() < 1e-9);
        assert_eq!(insights.many_hard.len(), 1);
        assert_eq!(insights.many_hard[0].category, "Hard Place");
        assert!((insights.average_per_category - 26.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_rank_counts() {
        let counts: BTreeMap<String, usize> = [
            ("medium".to_string(), 4),
            ("easy".to_string(), 4),
            ("hard".to_string(), 9),
        ]
        .into_iter()
        .collect();

        assert_eq!(rank_counts(&counts), vec![("hard", 9), ("easy", 4), ("medium", 4)]);
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("exactly10!", 10), "exactly10!");
        assert_eq!(truncate_text("longer than ten", 10), "longer tha...");
    }
}
