use once_cell::sync::Lazy;
use regex::Regex;

use crate::scrape::PageFetcher;

const VIDEO_HOSTS: [&str; 2] = ["youtube.com", "youtu.be"];
const TITLE_SUFFIX: &str = " - YouTube";
/// Titles this short are placeholders ("YouTube", "-")
const MIN_TITLE_CHARS: usize = 5;

static TITLE_PATTERNS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r"<title>([^<]+)</title>").expect("Failed to compile title tag regex"),
        Regex::new(r#""title":"([^"]+)""#).expect("Failed to compile title json regex"),
        Regex::new(r#"<meta name="title" content="([^"]+)""#)
            .expect("Failed to compile title meta regex"),
    ]
});

pub fn is_video_url(url: &str) -> bool {
    match reqwest::Url::parse(url.trim()) {
        Ok(parsed) => parsed
            .host_str()
            .map(|host| VIDEO_HOSTS.iter().any(|h| host.contains(h)))
            .unwrap_or(false),
        Err(_) => false,
    }
}

/// First usable title from the page, trying each pattern in order.
pub fn extract_video_title(html: &str) -> Option<String> {
    TITLE_PATTERNS.iter().find_map(|pattern| {
        let title = pattern.captures(html)?.get(1)?.as_str().trim();
        let title = title.strip_suffix(TITLE_SUFFIX).unwrap_or(title).trim();

        (title.chars().count() > MIN_TITLE_CHARS).then(|| title.to_string())
    })
}

pub fn fetch_video_title(fetcher: &dyn PageFetcher, url: &str) -> Option<String> {
    match fetcher.fetch(url) {
        Ok(html) => {
            let title = extract_video_title(&html);
            log::debug!("video title for {url}: {title:?}");
            title
        }
        Err(err) => {
            log::warn!("failed to fetch video page {url}: {err}");
            None
        }
    }
}
