//! Related-content search.
//!
//! Both providers read pages through [`PageFetcher`](crate::scrape::PageFetcher)
//! and never fail outward: errors are logged and yield an empty list.

pub mod web;
pub mod youtube;

use serde::{Deserialize, Serialize};

pub use web::WebSearch;
pub use youtube::VideoSearch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Article,
    Video,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchItem {
    pub title: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub snippet: Option<String>,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub video_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub thumbnail: Option<String>,
}

/// `application/x-www-form-urlencoded` query value.
pub(crate) fn encode_query(query: &str) -> String {
    url::form_urlencoded::byte_serialize(query.as_bytes()).collect()
}
