//! Page text extraction.
//!
//! Turns a URL into a title and cleaned body text. Never fails: fetch errors
//! produce a synthetic record carrying the error message.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;

use crate::scrape::{FetchError, PageFetcher};

/// Subtrees never treated as content
const SKIPPED_TAGS: [&str; 8] = [
    "script", "style", "nav", "footer", "header", "aside", "noscript", "iframe",
];

/// Tried in order; the first match is the main content container
const CONTENT_SELECTORS: [&str; 9] = [
    "article",
    "main",
    r#"[role="main"]"#,
    ".article-body",
    ".story-body",
    ".post-content",
    ".entry-content",
    "#article-body",
    ".content",
];

/// Only elements with more text than this count as content
const MIN_BLOCK_CHARS: usize = 30;
/// Elements with more descendant elements than this are containers
const MAX_BLOCK_CHILDREN: usize = 5;
/// Below this, title + description replaces the body text
const MIN_BODY_CHARS: usize = 100;
/// Below this, the bare title is used
const MIN_TEXT_CHARS: usize = 20;

static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Failed to compile whitespace regex"));

static DISALLOWED_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[^\w\s.,!?;:()\-'"]+"#).expect("Failed to compile character filter regex")
});

static BLOCK_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("p, h1, h2, h3, h4, h5, li, span, div").expect("Failed to parse block selector")
});

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedContent {
    pub text: String,
    pub title: String,
    pub url: String,
    pub error: Option<String>,
}

pub struct ContentNormalizer {
    fetcher: Arc<dyn PageFetcher>,
}

impl ContentNormalizer {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }

    pub fn normalize(&self, url: &str) -> NormalizedContent {
        log::info!("fetching {url}");

        match self.fetcher.fetch(url) {
            Ok(html) => {
                let content = extract(&html, url);
                log::info!("extracted {} characters", content.text.chars().count());
                content
            }
            Err(err @ FetchError::Status(_)) => {
                log::warn!("{url}: {err}");
                NormalizedContent {
                    text: format!("Article from {url}"),
                    title: title_from_url(url),
                    url: url.to_string(),
                    error: Some(err.to_string()),
                }
            }
            Err(err) => {
                log::error!("{url}: {err}");
                NormalizedContent {
                    text: String::new(),
                    title: "Error".to_string(),
                    url: url.to_string(),
                    error: Some(err.to_string()),
                }
            }
        }
    }
}

/// Extract title and body text from page markup.
pub fn extract(html: &str, url: &str) -> NormalizedContent {
    let document = Html::parse_document(html);

    let mut title = first_text(&document, "title").unwrap_or_else(|| "No title".to_string());
    if let Some(og_title) = meta_content(&document, r#"meta[property="og:title"]"#) {
        title = og_title.trim().to_string();
    }

    let description = meta_content(&document, r#"meta[property="og:description"]"#)
        .or_else(|| meta_content(&document, r#"meta[name="description"]"#))
        .unwrap_or_default();

    let main_content = CONTENT_SELECTORS
        .iter()
        .filter_map(|selector| Selector::parse(selector).ok())
        .find_map(|selector| document.select(&selector).find(|el| !is_skipped(el)))
        .or_else(|| {
            Selector::parse("body")
                .ok()
                .and_then(|body| document.select(&body).next())
        });

    let mut text_parts = Vec::new();
    if let Some(main_content) = main_content {
        for element in main_content.select(&BLOCK_SELECTOR) {
            if is_skipped(&element) || child_element_count(&element) > MAX_BLOCK_CHILDREN {
                continue;
            }

            let text = visible_text(&element);
            let text = text.trim();
            if text.chars().count() > MIN_BLOCK_CHARS {
                text_parts.push(text.to_string());
            }
        }
    }

    let mut text = clean_text(&text_parts.join(" "));

    if text.chars().count() < MIN_BODY_CHARS {
        log::debug!("limited content extracted, using metadata");
        text = clean_text(&format!("{title}. {description}"));
    }

    if text.chars().count() < MIN_TEXT_CHARS {
        text = title.clone();
    }

    NormalizedContent {
        text,
        title,
        url: url.to_string(),
        error: None,
    }
}

/// Collapse whitespace and drop everything but word characters and basic
/// punctuation.
pub fn clean_text(text: &str) -> String {
    let text = WHITESPACE.replace_all(text, " ");
    let text = DISALLOWED_CHARS.replace_all(&text, "");
    text.trim().to_string()
}

/// Last path segment with dashes turned into spaces, title-cased.
fn title_from_url(url: &str) -> String {
    let segment = url.rsplit('/').next().unwrap_or_default().replace('-', " ");

    let mut title = String::with_capacity(segment.len());
    let mut previous_is_letter = false;
    for c in segment.chars() {
        if previous_is_letter {
            title.extend(c.to_lowercase());
        } else {
            title.extend(c.to_uppercase());
        }
        previous_is_letter = c.is_alphabetic();
    }
    title
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .filter(|content| !content.is_empty())
        .map(|content| content.to_string())
}

fn is_skipped_name(name: &str) -> bool {
    SKIPPED_TAGS.contains(&name)
}

/// True if the element or any ancestor is a skipped tag.
fn is_skipped(element: &ElementRef) -> bool {
    is_skipped_name(element.value().name())
        || element
            .ancestors()
            .filter_map(|node| node.value().as_element())
            .any(|el| is_skipped_name(el.name()))
}

fn child_element_count(element: &ElementRef) -> usize {
    element
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .filter(|el| !is_skipped(el))
        .count()
}

fn visible_text(element: &ElementRef) -> String {
    element
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node
                .ancestors()
                .filter_map(|a| a.value().as_element())
                .any(|el| is_skipped_name(el.name()));
            (!hidden).then(|| text.to_string())
        })
        .collect()
}
