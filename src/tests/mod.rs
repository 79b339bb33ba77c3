mod web;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::analyzer::{Analyzer, AnalyzerError};
use crate::app::Recommender;
use crate::config::Config;
use crate::scrape::{FetchError, PageFetcher};

/// Serves canned pages by URL prefix; anything else is a 404.
#[derive(Default)]
pub struct StubFetcher {
    pages: Vec<(String, String)>,
    pub requested: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn with_page(mut self, url_prefix: &str, html: &str) -> Self {
        self.pages.push((url_prefix.to_string(), html.to_string()));
        self
    }
}

impl PageFetcher for StubFetcher {
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.requested.lock().unwrap().push(url.to_string());

        self.pages
            .iter()
            .find(|(prefix, _)| url.starts_with(prefix.as_str()))
            .map(|(_, html)| html.clone())
            .ok_or(FetchError::Status(404))
    }
}

/// Returns a fixed answer and counts calls.
pub struct StubAnalyzer {
    answer: Result<String, AnalyzerError>,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl StubAnalyzer {
    pub fn answering(answer: &str) -> Self {
        Self::with_result(Ok(answer.to_string()))
    }

    pub fn failing(err: AnalyzerError) -> Self {
        Self::with_result(Err(err))
    }

    fn with_result(answer: Result<String, AnalyzerError>) -> Self {
        Self {
            answer,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(vec![]),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Analyzer for StubAnalyzer {
    fn analyze(&self, prompt: &str) -> Result<String, AnalyzerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.answer.clone()
    }
}

pub const ARTICLE_URL: &str = "https://blog.example.com/rust-ownership";
pub const VIDEO_URL: &str = "https://www.youtube.com/watch?v=aaaaaaaaaaa";

pub const ARTICLE_HTML: &str = r#"<html><head><title>Rust Ownership</title></head><body>
    <article>
      <p>Ownership is a set of rules that govern how a Rust program manages memory at runtime.</p>
      <p>Borrowing lets code refer to a value without taking ownership of it, checked at compile time.</p>
    </article></body></html>"#;

pub const VIDEO_HTML: &str =
    "<html><head><title>Learning Rust Ownership - YouTube</title></head><body></body></html>";

pub const DDG_HTML: &str = r#"<html><body><table>
    <tr><td><a class='result-link' href="https://doc.rust-lang.org/book/ch04-00.html">Understanding Ownership - The Rust Book</a></td></tr>
    <tr><td class='result-snippet'>Ownership is Rust's most unique feature.</td></tr>
    </table></body></html>"#;

pub const YOUTUBE_RESULTS: &str = r#"{"videoId":"bbbbbbbbbbb","title":{"runs":[{"text":"Rust Ownership in 10 Minutes"}]}}"#;

pub const ANALYSIS: &str = "TITLE: Rust Ownership Explained\n\
SUMMARY: How Rust manages memory\n\
CATEGORY: Technology\n\
KEYWORDS: rust ownership borrowing tutorial\n";

/// Fetcher serving the article, the video page and both search providers.
pub fn full_fetcher() -> StubFetcher {
    StubFetcher::default()
        .with_page(ARTICLE_URL, ARTICLE_HTML)
        .with_page(VIDEO_URL, VIDEO_HTML)
        .with_page("https://lite.duckduckgo.com/", DDG_HTML)
        .with_page("https://www.youtube.com/results", YOUTUBE_RESULTS)
}

pub fn create_recommender(
    fetcher: StubFetcher,
    analyzer: StubAnalyzer,
) -> (Recommender, Arc<StubFetcher>, Arc<StubAnalyzer>) {
    let fetcher = Arc::new(fetcher);
    let analyzer = Arc::new(analyzer);
    let recommender = Recommender::new(Config::default(), fetcher.clone(), analyzer.clone());
    (recommender, fetcher, analyzer)
}

/// Pages keyed by URL, for tests that index many distinct pages.
pub fn pages_fetcher(pages: &HashMap<String, String>) -> StubFetcher {
    pages
        .iter()
        .fold(StubFetcher::default(), |f, (url, html)| f.with_page(url, html))
}
