//! Turning model output into a structured record and a search query.
//!
//! - `parser`: Tolerant extraction of labeled fields from model output
//! - `query`: Search query selection from the parsed record
//! - `prompt`: Prompt templates for articles and videos

pub mod parser;
pub mod prompt;
pub mod query;

pub use parser::{parse, AnalysisRecord};
pub use query::{build as build_query, ContentType};
