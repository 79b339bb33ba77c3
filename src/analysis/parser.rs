//! Extraction of labeled fields from free-form model output.
//!
//! The model is asked to answer with `TITLE:`, `SUMMARY:`, `CATEGORY:` and
//! `KEYWORDS:` lines. Matching is a case-sensitive substring test anywhere in
//! the line, so prose that happens to contain a marker is also picked up.
//! A later line for the same field replaces an earlier one. Missing fields
//! keep their defaults and parsing never fails.

use serde::{Deserialize, Serialize};

/// Summary used when the model gives none
pub const DEFAULT_SUMMARY: &str = "Content analyzed";

/// Category used when the model gives none
pub const DEFAULT_CATEGORY: &str = "General";

/// Structured description of a piece of content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub title: String,
    pub summary: String,
    pub category: String,
    pub keywords: String,
}

impl AnalysisRecord {
    /// Defaults for a page whose best known title is `title`.
    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            summary: DEFAULT_SUMMARY.to_string(),
            category: DEFAULT_CATEGORY.to_string(),
            keywords: String::new(),
        }
    }
}

#[derive(Clone, Copy)]
enum Field {
    Title,
    Summary,
    Category,
    Keywords,
}

/// Checked in this order; the first marker found on a line claims it.
const MARKERS: [(&str, Field); 4] = [
    ("TITLE:", Field::Title),
    ("SUMMARY:", Field::Summary),
    ("CATEGORY:", Field::Category),
    ("KEYWORDS:", Field::Keywords),
];

/// Parse `raw` on top of `defaults`.
pub fn parse(raw: &str, defaults: AnalysisRecord) -> AnalysisRecord {
    let mut record = defaults;

    for line in raw.lines() {
        let Some((field, value)) = MARKERS.iter().find_map(|(marker, field)| {
            line.split_once(marker).map(|(_, rest)| (*field, clean_value(rest)))
        }) else {
            continue;
        };

        match field {
            Field::Title => record.title = value,
            Field::Summary => record.summary = value,
            Field::Category => record.category = value,
            Field::Keywords => record.keywords = value,
        }
    }

    record
}

/// Trim whitespace, then markdown emphasis, then quotes.
fn clean_value(value: &str) -> String {
    value
        .trim()
        .trim_matches('*')
        .trim_matches('"')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> AnalysisRecord {
        AnalysisRecord {
            title: "x".into(),
            summary: "s".into(),
            category: "General".into(),
            keywords: "".into(),
        }
    }

    #[test]
    fn test_partial_fields_keep_defaults() {
        let record = parse("TITLE: Hello\nCATEGORY: Music\n", defaults());
        assert_eq!(
            record,
            AnalysisRecord {
                title: "Hello".into(),
                summary: "s".into(),
                category: "Music".into(),
                keywords: "".into(),
            }
        );
    }

    #[test]
    fn test_last_match_wins() {
        let record = parse("TITLE: First\nTITLE: Second\nTITLE: Third", defaults());
        assert_eq!(record.title, "Third");
    }

    #[test]
    fn test_empty_and_garbage_input() {
        assert_eq!(parse("", defaults()), defaults());
        assert_eq!(parse("I cannot help with that.\n\n???", defaults()), defaults());
    }

    #[test]
    fn test_strips_emphasis_and_quotes() {
        let raw = "TITLE: **\"Rust in Production\"**\nSUMMARY: \"A talk\"\nKEYWORDS: *rust async runtime*";
        let record = parse(raw, defaults());
        assert_eq!(record.title, "Rust in Production");
        assert_eq!(record.summary, "A talk");
        assert_eq!(record.keywords, "rust async runtime");
    }

    #[test]
    fn test_marker_anywhere_in_line() {
        let record = parse("Here you go - CATEGORY: Science", defaults());
        assert_eq!(record.category, "Science");
    }

    #[test]
    fn test_marker_is_case_sensitive() {
        let record = parse("title: lowercase\nCategory: Tech", defaults());
        assert_eq!(record, defaults());
    }

    #[test]
    fn test_first_marker_on_a_line_claims_it() {
        let record = parse("TITLE: see KEYWORDS: below", defaults());
        assert_eq!(record.title, "see KEYWORDS: below");
        assert_eq!(record.keywords, "");
    }

    #[test]
    fn test_full_response() {
        let raw = "TITLE: Intro to Tokio\n\
                   SUMMARY: How the Tokio runtime schedules tasks\n\
                   CATEGORY: Technology\n\
                   KEYWORDS: tokio async runtime scheduler tutorial";
        let record = parse(raw, AnalysisRecord::with_title("page title"));
        assert_eq!(record.title, "Intro to Tokio");
        assert_eq!(record.summary, "How the Tokio runtime schedules tasks");
        assert_eq!(record.category, "Technology");
        assert_eq!(record.keywords, "tokio async runtime scheduler tutorial");
    }

    #[test]
    fn test_with_title_defaults() {
        let record = AnalysisRecord::with_title("Page");
        assert_eq!(record.title, "Page");
        assert_eq!(record.summary, DEFAULT_SUMMARY);
        assert_eq!(record.category, DEFAULT_CATEGORY);
        assert!(record.keywords.is_empty());
    }
}
