//! Analysis report generation.
//!
//! This module renders a [`DatasetStats`] aggregate and its [`Insights`] as a
//! console text report or as JSON.

use crate::analysis::{percentage, rank_counts, truncate_text, CategoryStats, DatasetStats, Insights};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Qualifying categories listed per insight.
const INSIGHT_EXAMPLES: usize = 3;

/// Width of the category column in the summary table.
const SUMMARY_CATEGORY_WIDTH: usize = 40;

const RULE: &str = "==================================================";

/// Metadata about one analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub source_file: String,
    pub generated_at: DateTime<Utc>,
    pub tool_version: String,
}

/// Everything a rendered report contains.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub metadata: ReportMetadata,
    pub stats: DatasetStats,
    pub insights: Insights,
}

impl AnalysisReport {
    pub fn new(source_file: &Path, stats: DatasetStats, insights: Insights) -> Self {
        Self {
            metadata: ReportMetadata {
                source_file: source_file.display().to_string(),
                generated_at: Utc::now(),
                tool_version: env!("CARGO_PKG_VERSION").to_string(),
            },
            stats,
            insights,
        }
    }
}

/// Generate the complete text report.
pub fn generate_text_report(report: &AnalysisReport, top_categories: usize) -> String {
    let mut output = String::new();

    output.push_str("🎯 TRIVIA QUESTIONS ANALYSIS\n");
    output.push_str(RULE);
    output.push('\n');

    output.push_str(&generate_overall_section(&report.stats));

    if report.stats.total_questions == 0 {
        output.push_str("\nNo questions to analyze.\n");
        return output;
    }

    output.push_str(&generate_category_section(&report.stats));
    output.push_str(&generate_summary_table(&report.stats));
    output.push_str(&generate_top_categories_section(&report.stats, top_categories));
    output.push_str(&generate_insights_section(&report.insights));

    output.push_str(&format!(
        "\n✅ Analysis complete! Data from '{}' successfully analyzed.\n",
        report.metadata.source_file
    ));

    output
}

/// Generate the overall statistics section.
fn generate_overall_section(stats: &DatasetStats) -> String {
    let mut section = String::new();

    section.push_str("\n📊 OVERALL STATISTICS\n");
    section.push_str(&format!(
        "Total Questions: {}\n",
        format_count(stats.total_questions)
    ));
    section.push_str(&format!("Total Categories: {}\n", stats.category_count()));
    if stats.skipped_rows > 0 {
        section.push_str(&format!("Skipped Rows: {}\n", stats.skipped_rows));
    }

    if !stats.difficulties.is_empty() {
        section.push_str("\n⭐ Difficulty Levels (Overall):\n");
        section.push_str(&distribution_lines(
            &stats.difficulties,
            stats.total_questions,
            "  ",
        ));
    }

    if stats.has_type_column && !stats.types.is_empty() {
        section.push_str("\n🧩 Question Types (Overall):\n");
        section.push_str(&distribution_lines(&stats.types, stats.total_questions, "  "));
    }

    section
}

/// Generate the detailed per-category breakdown.
fn generate_category_section(stats: &DatasetStats) -> String {
    let mut section = String::new();

    section.push_str("\n📚 DETAILED CATEGORY BREAKDOWN\n");
    section.push_str(RULE);
    section.push('\n');

    for (i, category) in stats.categories.iter().enumerate() {
        section.push_str(&generate_category_block(
            i + 1,
            category,
            stats.total_questions,
            stats.has_type_column,
        ));
    }

    section
}

/// Generate the block for a single category.
fn generate_category_block(
    position: usize,
    category: &CategoryStats,
    total_questions: usize,
    with_types: bool,
) -> String {
    let mut block = String::new();

    block.push_str(&format!("\n{}. {}\n", position, category.name));
    block.push_str(&format!(
        "   📊 Questions: {} ({:.1}% of total)\n",
        format_count(category.total),
        percentage(category.total, total_questions)
    ));

    block.push_str("   ⭐ Difficulties:\n");
    block.push_str(&distribution_lines(
        &category.difficulties,
        category.total,
        "      ",
    ));

    if with_types && !category.types.is_empty() {
        block.push_str("   🧩 Types:\n");
        block.push_str(&distribution_lines(&category.types, category.total, "      "));
    }

    if !category.samples.is_empty() {
        block.push_str("   💡 Sample Questions:\n");
        for (j, sample) in category.samples.iter().enumerate() {
            block.push_str(&format!("      {}. {}\n", j + 1, sample));
        }
    }

    block
}

/// Generate the quick summary table.
fn generate_summary_table(stats: &DatasetStats) -> String {
    let mut table = String::new();

    table.push_str("\n📋 QUICK SUMMARY TABLE\n");
    table.push_str(RULE);
    table.push('\n');
    table.push_str(&format!(
        "{:<40} {:<10} {:<5} {:<6} {:<4}\n",
        "Category", "Questions", "Easy", "Medium", "Hard"
    ));
    table.push_str(&"-".repeat(70));
    table.push('\n');

    for category in &stats.categories {
        let name = truncate_text(&category.name, SUMMARY_CATEGORY_WIDTH - 3);
        table.push_str(&format!(
            "{:<40} {:<10} {:<5} {:<6} {:<4}\n",
            name,
            category.total,
            category.difficulty_count("easy"),
            category.difficulty_count("medium"),
            category.difficulty_count("hard"),
        ));
    }

    table
}

/// Generate the top-N ranking.
fn generate_top_categories_section(stats: &DatasetStats, top: usize) -> String {
    let mut section = String::new();

    section.push_str(&format!("\n🏆 TOP {} CATEGORIES BY QUESTION COUNT\n", top));
    section.push_str(RULE);
    section.push('\n');

    for (i, category) in stats.categories.iter().take(top).enumerate() {
        section.push_str(&format!(
            "{:2}. {:<45} {:>4} questions ({:4.1}%)\n",
            i + 1,
            category.name,
            category.total,
            percentage(category.total, stats.total_questions)
        ));
    }

    section
}

/// Generate the insights section.
fn generate_insights_section(insights: &Insights) -> String {
    let mut section = String::new();

    section.push_str("\n💡 INSIGHTS\n");
    section.push_str(RULE);
    section.push('\n');

    if let Some(ref most) = insights.most_populous {
        section.push_str(&format!(
            "• Most questions: {} ({} questions)\n",
            most.category, most.count
        ));
    }
    if let Some(ref least) = insights.least_populous {
        section.push_str(&format!(
            "• Least questions: {} ({} questions)\n",
            least.category, least.count
        ));
    }

    if !insights.mostly_easy.is_empty() {
        section.push_str(&format!(
            "• Categories with mostly easy questions ({}):\n",
            insights.mostly_easy.len()
        ));
        for share in insights.mostly_easy.iter().take(INSIGHT_EXAMPLES) {
            section.push_str(&format!(
                "  - {}: {:.1}% easy\n",
                share.category, share.percentage
            ));
        }
    }

    if !insights.many_hard.is_empty() {
        section.push_str(&format!(
            "• Categories with many hard questions ({}):\n",
            insights.many_hard.len()
        ));
        for share in insights.many_hard.iter().take(INSIGHT_EXAMPLES) {
            section.push_str(&format!(
                "  - {}: {:.1}% hard\n",
                share.category, share.percentage
            ));
        }
    }

    section.push_str(&format!(
        "• Average questions per category: {:.1}\n",
        insights.average_per_category
    ));

    section
}

/// One bullet per value, most common first.
fn distribution_lines(counts: &BTreeMap<String, usize>, total: usize, indent: &str) -> String {
    rank_counts(counts)
        .into_iter()
        .map(|(label, count)| {
            format!(
                "{}• {}: {} ({:.1}%)\n",
                indent,
                title_case(label),
                format_count(count),
                percentage(count, total)
            )
        })
        .collect()
}

/// Capitalize the first letter of every word.
pub fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Format a count with thousands separators.
pub fn format_count(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Generate a JSON report.
pub fn generate_json_report(report: &AnalysisReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write rendered report content to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}
