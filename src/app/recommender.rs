use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use crate::{
    analysis::{self, prompt, AnalysisRecord, ContentType},
    analyzer::{Analyzer, AnalyzerError},
    app::errors::AppError,
    config::Config,
    fingerprint::{FingerprintEncoder, SimilarityIndex},
    scrape::{normalizer::ContentNormalizer, video, PageFetcher},
    search::{SearchItem, VideoSearch, WebSearch},
    storage::StorageManager,
};

/// Cached result of one analysis, keyed by URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    pub id: u64,
    pub url: String,
    pub title: String,
    pub summary: String,
    pub category: String,
    pub keywords: String,
    pub is_video: bool,
    pub analyzed_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    pub articles: Vec<SearchItem>,
    pub youtube: Vec<SearchItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResponse {
    pub title: String,
    pub summary: String,
    pub category: String,
    pub keywords: String,
    pub content_type: ContentType,
    pub recommendations: Recommendations,
}

/// Recommendations handed out for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub url: String,
    pub timestamp: String,
    pub recommendations: Recommendations,
}

/// Oldest history entries are dropped past this
const HISTORY_CAPACITY: usize = 100;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SimilarRequest {
    pub url: Option<String>,
    pub text: Option<String>,
    pub k: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarItem {
    pub id: u64,
    pub url: String,
    pub distance: f32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub size: usize,
    pub dimension: usize,
}

struct SnapshotStore {
    storage: Box<dyn StorageManager>,
    file: String,
}

pub struct Recommender {
    config: Config,
    encoder: FingerprintEncoder,
    index: SimilarityIndex,
    records: RwLock<HashMap<String, ContentRecord>>,
    history: RwLock<VecDeque<HistoryEntry>>,
    fetcher: Arc<dyn PageFetcher>,
    normalizer: ContentNormalizer,
    web_search: WebSearch,
    video_search: VideoSearch,
    analyzer: Arc<dyn Analyzer>,
    snapshot: Option<SnapshotStore>,
}

impl Recommender {
    pub fn new(config: Config, fetcher: Arc<dyn PageFetcher>, analyzer: Arc<dyn Analyzer>) -> Self {
        let encoder =
            FingerprintEncoder::new(config.fingerprint.dimension, config.fingerprint.max_tokens);
        let index = SimilarityIndex::for_encoder(&encoder);

        Self {
            normalizer: ContentNormalizer::new(fetcher.clone()),
            web_search: WebSearch::new(fetcher.clone(), &config.search),
            video_search: VideoSearch::new(fetcher.clone()),
            config,
            encoder,
            index,
            records: RwLock::new(HashMap::new()),
            history: RwLock::new(VecDeque::new()),
            fetcher,
            analyzer,
            snapshot: None,
        }
    }

    /// Persist the index as `file` in `storage`.
    pub fn with_snapshot(mut self, storage: Box<dyn StorageManager>, file: &str) -> Self {
        self.snapshot = Some(SnapshotStore {
            storage,
            file: file.to_string(),
        });
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Analyze a page, find related content and index its fingerprint.
    ///
    /// Nothing is stored unless the page yields enough text to analyze and an
    /// analyzer could be asked.
    pub fn extract(&self, url: &str) -> Result<ExtractResponse, AppError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(AppError::InvalidInput("URL is required".to_string()));
        }

        log::info!("analyzing {url}");

        let content_type = if video::is_video_url(url) {
            ContentType::Video
        } else {
            ContentType::Article
        };

        let video_title = match content_type {
            ContentType::Video => {
                log::info!("detected video");
                video::fetch_video_title(self.fetcher.as_ref(), url)
            }
            ContentType::Article => None,
        };

        let content = self.normalizer.normalize(url);

        let analysis_text = match &video_title {
            Some(title) => format!("YouTube Video: {title}"),
            None if content.text.is_empty() => content.title.clone(),
            None => content
                .text
                .chars()
                .take(self.config.analysis.char_limit)
                .collect(),
        };

        if analysis_text.chars().count() < self.config.analysis.min_content_chars {
            return Err(AppError::InvalidInput(
                "Could not extract content from URL".to_string(),
            ));
        }

        let prompt = match &video_title {
            Some(title) => prompt::video_prompt(title),
            None => prompt::article_prompt(&analysis_text),
        };

        log::info!("generating analysis");
        let raw = match self.analyzer.analyze(&prompt) {
            Ok(raw) => raw,
            Err(err @ AnalyzerError::Rejected(_)) => {
                log::warn!("{err}, using defaults");
                String::new()
            }
            Err(err) => return Err(err.into()),
        };

        let defaults = AnalysisRecord::with_title(
            video_title.clone().unwrap_or_else(|| content.title.clone()),
        );
        let record = analysis::parse(&raw, defaults);
        log::debug!("analysis: {record:?}");

        let query = analysis::build_query(&record, content_type, video_title.as_deref());
        log::info!("search query: {query}");

        let limit = self.config.search.num_results;
        let recommendations = match content_type {
            ContentType::Video => Recommendations {
                articles: vec![],
                youtube: self.video_search.search(&query, limit),
            },
            ContentType::Article => Recommendations {
                articles: self.web_search.search(&query, limit),
                youtube: vec![],
            },
        };

        let fingerprint = self.encoder.encode(&analysis_text);
        let id = self.index.add(fingerprint, url)?;

        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let content_record = ContentRecord {
            id,
            url: url.to_string(),
            title: record.title.clone(),
            summary: record.summary.clone(),
            category: record.category.clone(),
            keywords: record.keywords.clone(),
            is_video: content_type.is_video(),
            analyzed_at: now.clone(),
        };
        self.records_write().insert(url.to_string(), content_record);

        {
            let mut history = self.history.write().unwrap_or_else(|e| e.into_inner());
            if history.len() >= HISTORY_CAPACITY {
                history.pop_front();
            }
            history.push_back(HistoryEntry {
                url: url.to_string(),
                timestamp: now,
                recommendations: recommendations.clone(),
            });
        }

        log::info!("indexed {url} as {id}");

        Ok(ExtractResponse {
            title: record.title,
            summary: record.summary,
            category: record.category,
            keywords: record.keywords,
            content_type,
            recommendations,
        })
    }

    /// Nearest indexed pages to a free text or to an already indexed URL.
    ///
    /// A URL query never returns entries for that same URL.
    pub fn similar(&self, request: SimilarRequest) -> Result<Vec<SimilarItem>, AppError> {
        let k = request.k.unwrap_or(self.config.similar_default_k);

        let url = request.url.as_deref().map(str::trim).filter(|u| !u.is_empty());
        let text = request.text.as_deref().map(str::trim).filter(|t| !t.is_empty());

        let neighbors = match (url, text) {
            (Some(url), _) => {
                // re-analyzed pages have several entries, the latest one wins
                let (own_ids, vector) = self
                    .index
                    .find_by_metadata(url)
                    .ok_or_else(|| AppError::NotFound(format!("{url} has not been analyzed")))?;

                self.index
                    .search(&vector, k.saturating_add(own_ids.len()))?
                    .into_iter()
                    .filter(|n| !own_ids.contains(&n.id))
                    .take(k)
                    .collect::<Vec<_>>()
            }
            (None, Some(text)) => self.index.search(&self.encoder.encode(text), k)?,
            (None, None) => {
                return Err(AppError::InvalidInput(
                    "url or text is required".to_string(),
                ))
            }
        };

        let records = self.records_read();
        let items = neighbors
            .into_iter()
            .filter_map(|n| {
                let entry = self.index.get(n.id)?;
                let record = records.get(&entry.metadata);
                Some(SimilarItem {
                    id: n.id,
                    distance: n.distance,
                    title: record.map(|r| r.title.clone()),
                    category: record.map(|r| r.category.clone()),
                    url: entry.metadata,
                })
            })
            .collect();

        Ok(items)
    }

    /// Cached records, most recently analyzed first.
    pub fn contents(&self, limit: usize) -> Vec<ContentRecord> {
        let mut records: Vec<_> = self.records_read().values().cloned().collect();
        records.sort_by(|a, b| b.id.cmp(&a.id));
        records.truncate(limit);
        records
    }

    /// Most recent requests first.
    pub fn history(&self, limit: usize) -> Vec<HistoryEntry> {
        self.history
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn index_stats(&self) -> IndexStats {
        IndexStats {
            size: self.index.len(),
            dimension: self.index.dimension(),
        }
    }

    pub fn index(&self) -> &SimilarityIndex {
        &self.index
    }

    /// Write the index snapshot. No-op without a snapshot store.
    pub fn save_index(&self) -> Result<(), AppError> {
        let Some(snapshot) = &self.snapshot else {
            return Ok(());
        };

        let mut buf = Vec::new();
        self.index.save(&mut buf)?;
        snapshot.storage.write(&snapshot.file, &buf)?;

        log::info!(
            "saved {} fingerprints to {}",
            self.index.len(),
            snapshot.file
        );
        Ok(())
    }

    /// Replace the index with the stored snapshot, if there is one.
    /// Returns the number of restored entries.
    pub fn restore_index(&self) -> Result<usize, AppError> {
        let Some(snapshot) = &self.snapshot else {
            return Ok(0);
        };

        if !snapshot.storage.exists(&snapshot.file) {
            return Ok(0);
        }

        let data = snapshot.storage.read(&snapshot.file)?;
        let count = self.index.load(&mut data.as_slice())?;

        log::info!("restored {count} fingerprints from {}", snapshot.file);
        Ok(count)
    }

    fn records_read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, ContentRecord>> {
        self.records.read().unwrap_or_else(|e| e.into_inner())
    }

    fn records_write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, ContentRecord>> {
        self.records.write().unwrap_or_else(|e| e.into_inner())
    }
}
