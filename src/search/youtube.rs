use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;

use super::{encode_query, ItemKind, SearchItem};
use crate::scrape::PageFetcher;

const SEARCH_URL: &str = "https://www.youtube.com/results?search_query=";
/// Video ids past this position are ignored
const MAX_SCANNED_IDS: usize = 30;

static VIDEO_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""videoId":"([a-zA-Z0-9_-]{11})""#).expect("Failed to compile video id regex")
});

static VIDEO_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""title":\{"runs":\[\{"text":"([^"]+)"\}"#)
        .expect("Failed to compile video title regex")
});

/// Video search by scraping the YouTube results page.
pub struct VideoSearch {
    fetcher: Arc<dyn PageFetcher>,
}

impl VideoSearch {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }

    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchItem> {
        log::info!("searching videos for: {query}");

        let url = format!("{SEARCH_URL}{}", encode_query(query));
        match self.fetcher.fetch(&url) {
            Ok(html) => {
                let results = parse_results(&html, limit);
                log::info!("found {} video results", results.len());
                results
            }
            Err(err) => {
                log::error!("video search failed: {err}");
                vec![]
            }
        }
    }
}

/// Titles are matched to ids by position in the page; ids without a title
/// get a placeholder.
pub fn parse_results(html: &str, limit: usize) -> Vec<SearchItem> {
    let ids: Vec<&str> = VIDEO_ID
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .take(MAX_SCANNED_IDS)
        .collect();

    let titles: Vec<&str> = VIDEO_TITLE
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect();

    let mut seen = HashSet::new();
    let mut results = Vec::new();

    for (i, id) in ids.into_iter().enumerate() {
        if results.len() >= limit {
            break;
        }
        if !seen.insert(id) {
            continue;
        }

        let title = titles.get(i).copied().unwrap_or("Video");
        results.push(SearchItem {
            title: title.to_string(),
            url: format!("https://www.youtube.com/watch?v={id}"),
            snippet: None,
            kind: ItemKind::Video,
            video_id: Some(id.to_string()),
            thumbnail: Some(format!("https://img.youtube.com/vi/{id}/mqdefault.jpg")),
        });
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrape::FetchError;

    const RESULTS_PAGE: &str = r#"var ytInitialData = {"contents":[
        {"videoRenderer":{"videoId":"aaaaaaaaaaa","title":{"runs":[{"text":"Rust in 100 Seconds"}]}}},
        {"videoRenderer":{"videoId":"aaaaaaaaaaa","title":{"runs":[{"text":"Duplicate"}]}}},
        {"videoRenderer":{"videoId":"bbbbbbbbb-_","title":{"runs":[{"text":"Ownership Explained"}]}}},
        {"videoRenderer":{"videoId":"ccccccccccc"}}
    ]};"#;

    #[test]
    fn test_parse_results() {
        let results = parse_results(RESULTS_PAGE, 6);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].title, "Rust in 100 Seconds");
        assert_eq!(results[0].url, "https://www.youtube.com/watch?v=aaaaaaaaaaa");
        assert_eq!(results[0].video_id.as_deref(), Some("aaaaaaaaaaa"));
        assert_eq!(
            results[0].thumbnail.as_deref(),
            Some("https://img.youtube.com/vi/aaaaaaaaaaa/mqdefault.jpg")
        );
        assert_eq!(results[0].kind, ItemKind::Video);

        // duplicate id skipped, title index follows the raw id position
        assert_eq!(results[1].video_id.as_deref(), Some("bbbbbbbbb-_"));
        assert_eq!(results[1].title, "Ownership Explained");

        assert_eq!(results[2].title, "Video");
    }

    #[test]
    fn test_limit() {
        assert_eq!(parse_results(RESULTS_PAGE, 2).len(), 2);
        assert!(parse_results("<html></html>", 6).is_empty());
    }

    #[test]
    fn test_fetch_failure_yields_empty() {
        struct Failing;
        impl PageFetcher for Failing {
            fn fetch(&self, _url: &str) -> Result<String, FetchError> {
                Err(FetchError::Transport("timed out".into()))
            }
        }

        assert!(VideoSearch::new(Arc::new(Failing)).search("rust", 6).is_empty());
    }
}
