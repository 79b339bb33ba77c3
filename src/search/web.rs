use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::sync::Arc;

use super::{encode_query, ItemKind, SearchItem};
use crate::config::SearchConfig;
use crate::scrape::PageFetcher;

const SEARCH_URL: &str = "https://lite.duckduckgo.com/lite/?q=";
const SNIPPET_CHARS: usize = 200;
/// Shorter titles are usually navigation or ads
const MIN_TITLE_CHARS: usize = 10;

static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.result-link").expect("Failed to parse link selector"));
static SNIPPET_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".result-snippet").expect("Failed to parse snippet selector"));

/// Article search through the DuckDuckGo lite HTML endpoint.
pub struct WebSearch {
    fetcher: Arc<dyn PageFetcher>,
    excluded_domains: Vec<String>,
}

impl WebSearch {
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: &SearchConfig) -> Self {
        Self {
            fetcher,
            excluded_domains: config
                .excluded_domains
                .iter()
                .map(|d| d.to_lowercase())
                .collect(),
        }
    }

    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchItem> {
        log::info!("searching web for: {query}");

        let url = format!("{SEARCH_URL}{}", encode_query(query));
        match self.fetcher.fetch(&url) {
            Ok(html) => {
                let results = parse_results(&html, limit, &self.excluded_domains);
                log::info!("found {} web results", results.len());
                results
            }
            Err(err) => {
                log::error!("web search failed: {err}");
                vec![]
            }
        }
    }
}

/// Pair result links with snippets by position and apply the filters.
pub fn parse_results(html: &str, limit: usize, excluded_domains: &[String]) -> Vec<SearchItem> {
    let document = Html::parse_document(html);

    let snippets: Vec<String> = document
        .select(&SNIPPET_SELECTOR)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .collect();

    let mut results = Vec::new();
    for (i, link) in document.select(&LINK_SELECTOR).enumerate() {
        if results.len() >= limit {
            break;
        }

        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let url = resolve_href(href);
        let title = link.text().collect::<String>().trim().to_string();

        let url_lower = url.to_lowercase();
        if excluded_domains.iter().any(|d| url_lower.contains(d.as_str())) {
            log::debug!("skipping excluded result {url}");
            continue;
        }

        if url.is_empty() || title.chars().count() <= MIN_TITLE_CHARS {
            continue;
        }

        let snippet = snippets
            .get(i)
            .map(|s| s.chars().take(SNIPPET_CHARS).collect::<String>());

        results.push(SearchItem {
            title,
            url,
            snippet,
            kind: ItemKind::Article,
            video_id: None,
            thumbnail: None,
        });
    }

    results
}

/// Result links go through a `/l/?uddg=<target>` redirect.
fn resolve_href(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };

    match url::Url::parse(&absolute) {
        Ok(parsed) => parsed
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, target)| target.into_owned())
            .unwrap_or(absolute),
        Err(_) => absolute,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrape::FetchError;

    const RESULTS_PAGE: &str = r#"<html><body><table>
        <tr><td><a rel="nofollow" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fdoc.rust-lang.org%2Fbook%2F&amp;rut=abc" class='result-link'>The Rust Programming Language Book</a></td></tr>
        <tr><td class='result-snippet'>An introductory book about Rust.</td></tr>
        <tr><td><a rel="nofollow" href="https://www.zhihu.com/question/1" class='result-link'>Some excluded forum question</a></td></tr>
        <tr><td class='result-snippet'>Excluded.</td></tr>
        <tr><td><a rel="nofollow" href="https://short.example" class='result-link'>Short</a></td></tr>
        <tr><td class='result-snippet'>Too short a title.</td></tr>
        <tr><td><a rel="nofollow" href="https://blog.example.com/ownership" class='result-link'>Ownership and borrowing deep dive</a></td></tr>
        <tr><td class='result-snippet'>Ownership explained with examples.</td></tr>
        </table></body></html>"#;

    fn excluded() -> Vec<String> {
        SearchConfig::default().excluded_domains
    }

    #[test]
    fn test_parse_results() {
        let results = parse_results(RESULTS_PAGE, 6, &excluded());

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url, "https://doc.rust-lang.org/book/");
        assert_eq!(results[0].title, "The Rust Programming Language Book");
        assert_eq!(
            results[0].snippet.as_deref(),
            Some("An introductory book about Rust.")
        );
        assert_eq!(results[0].kind, ItemKind::Article);
        assert_eq!(results[1].url, "https://blog.example.com/ownership");
        assert_eq!(
            results[1].snippet.as_deref(),
            Some("Ownership explained with examples.")
        );
    }

    #[test]
    fn test_limit() {
        let results = parse_results(RESULTS_PAGE, 1, &excluded());
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_snippet_truncated() {
        let long = "x".repeat(500);
        let html = format!(
            r#"<table><tr><td><a class="result-link" href="https://example.com/a">A sufficiently long title</a></td></tr>
               <tr><td class="result-snippet">{long}</td></tr></table>"#
        );
        let results = parse_results(&html, 6, &[]);
        assert_eq!(results[0].snippet.as_ref().unwrap().chars().count(), 200);
    }

    #[test]
    fn test_fetch_failure_yields_empty() {
        struct Failing;
        impl PageFetcher for Failing {
            fn fetch(&self, _url: &str) -> Result<String, FetchError> {
                Err(FetchError::Status(503))
            }
        }

        let search = WebSearch::new(Arc::new(Failing), &SearchConfig::default());
        assert!(search.search("rust", 6).is_empty());
    }
}
