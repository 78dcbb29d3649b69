//! Error taxonomy for symbol searches.
//!
//! Only two kinds of failure ever reach a caller: [`SearchError::NotFound`]
//! when every file was scanned without a single block, and a fatal scan
//! failure that happened before the first match. Per-file read problems and
//! enumeration errors after a match never surface here; the scanner skips
//! them and the search returns its partial results.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("No symbols found for {} in {}", .symbols.join(", "), .patterns.join(", "))]
    NotFound {
        symbols: Vec<String>,
        patterns: Vec<String>,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid file pattern: {0}")]
    Glob(#[from] globset::Error),

    #[error("Failed to enumerate files: {0}")]
    Walk(#[from] ignore::Error),

    #[error("Failed to compile symbol pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Failed to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

impl SearchError {
    /// True when the search completed but nothing matched.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SearchError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
