pub mod errors;
pub mod factory;
pub mod recommender;

pub use errors::AppError;
pub use factory::{AppFactory, AppPaths};
pub use recommender::{
    ContentRecord, ExtractResponse, HistoryEntry, IndexStats, Recommendations, Recommender,
    SimilarItem, SimilarRequest,
};
