use serde::{Deserialize, Serialize};

use crate::analysis::parser::AnalysisRecord;

/// Keywords shorter than this are treated as unusable
const MIN_KEYWORDS_CHARS: usize = 6;

/// Title prefix length used in the title + category fallback
const TITLE_PREFIX_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Article,
    Video,
}

impl ContentType {
    pub fn is_video(&self) -> bool {
        matches!(self, ContentType::Video)
    }
}

/// Build the recommendation search query.
///
/// In order of preference:
/// 1. the model's keywords, once they are long enough to mean something
/// 2. the precomputed query (a video's page title), unchanged
/// 3. the first 50 characters of the title followed by the category
///
/// `content_type` does not change the outcome; callers pass `precomputed`
/// only for videos.
pub fn build(
    record: &AnalysisRecord,
    content_type: ContentType,
    precomputed: Option<&str>,
) -> String {
    let keywords = usable_keywords(&record.keywords);

    let query = match (keywords, precomputed) {
        (Some(keywords), _) => keywords,
        (None, Some(precomputed)) => precomputed.to_string(),
        (None, None) => {
            let title: String = record.title.chars().take(TITLE_PREFIX_CHARS).collect();
            format!("{} {}", title, record.category)
        }
    };

    log::debug!("search query for {content_type:?}: {query:?}");
    query
}

fn usable_keywords(keywords: &str) -> Option<String> {
    if keywords.chars().count() < MIN_KEYWORDS_CHARS {
        return None;
    }

    Some(
        keywords
            .replace(|c| matches!(c, '[' | ']' | '"'), "")
            .trim()
            .to_string(),
    )
}
