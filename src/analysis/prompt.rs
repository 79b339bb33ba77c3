//! Prompt templates for the analyzer.

pub fn video_prompt(video_title: &str) -> String {
    format!(
        r#"This is a YouTube video titled: "{video_title}"

Analyze what this video is about and provide:
TITLE: [the video title, cleaned up, max 80 chars]
SUMMARY: [brief description of what this video is likely about, max 150 chars]
CATEGORY: [one of: Music, Dance, Gaming, Education, Entertainment, News, Sports, Technology, Comedy, Other]
KEYWORDS: [5 specific search terms to find similar videos - focus on the main topic, artist, or content type]"#
    )
}

pub fn article_prompt(content: &str) -> String {
    format!(
        r#"Analyze this content:

{content}

Provide EXACTLY in this format:
TITLE: [short descriptive title, max 80 chars]
SUMMARY: [brief summary, max 150 chars]
CATEGORY: [one of: Technology, News, Entertainment, Education, Science, Business, Health, Sports, Music, Other]
KEYWORDS: [Write a single specific search query (3-6 words) to find similar articles. Be very specific - include the main topic. For example: "machine learning neural networks tutorial" or "climate change effects research". Do NOT use generic words like "article" or "information".]"#
    )
}
