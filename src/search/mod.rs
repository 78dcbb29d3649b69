//! Symbol search pipeline
//!
//! A search maps each caller pattern to an extension-filtered glob, adds the
//! conventional ignore fragments, streams matching files through a bounded
//! worker pool running the block matcher, and ranks what comes back:
//!
//! ```text
//! request -> pattern + exclude -> scanner -> matcher -> ranker -> format
//! ```
//!
//! Aggregation stops early once the match budget (a fixed number of blocks
//! per symbol) is reached.

pub mod budget;
pub mod compact;
pub mod exclude;
pub mod format;
pub mod matcher;
pub mod pattern;
pub mod ranker;
pub mod scanner;

use crate::config::ScanConfig;
use crate::error::{Result, SearchError};
use crate::request::ReadSymbolRequest;
use budget::{CancellationToken, ScanBudget};
use matcher::{BlockMatcher, MatchLimits, RegexCache};
use rayon::{ThreadPool, ThreadPoolBuilder};
use scanner::{FileStream, ScanPlan, ScannedFile, WalkLimits};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// A file admitted by discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Relative to the search root, or absolute when outside it
    pub path: PathBuf,
    pub abs_path: PathBuf,
    pub size: u64,
    /// Position in discovery order; breaks ranking ties
    pub order: usize,
}

/// A matched block
#[derive(Debug, Clone)]
pub struct Block {
    pub file: Arc<FileEntry>,
    /// 1-based, inclusive
    pub start_line: usize,
    /// 1-based, inclusive
    pub end_line: usize,
    pub text: String,
    /// Matched symbol text, wildcards resolved
    pub symbol: String,
    /// Byte offset of the match in the file
    pub offset: usize,
    pub score: i64,
}

/// Ranked result of one search
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub symbols: Vec<String>,
    /// Best-first, at most the request limit
    pub blocks: Vec<Block>,
    /// Blocks found before truncation
    pub total: usize,
    pub files_scanned: usize,
}

impl SearchOutcome {
    pub fn is_truncated(&self) -> bool {
        self.total > self.blocks.len()
    }
}

/// Reusable search engine: one worker pool and one pattern cache
pub struct SymbolSearch {
    config: ScanConfig,
    pool: Arc<ThreadPool>,
    patterns: RegexCache,
}

impl SymbolSearch {
    pub fn new(config: ScanConfig) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.pool_width.max(1))
            .thread_name(|i| format!("symscan-worker-{i}"))
            .build()?;
        let patterns = RegexCache::new(config.regex_cache_size);

        Ok(Self {
            config,
            pool: Arc::new(pool),
            patterns,
        })
    }

    /// Run a search and return the rendered response string
    pub fn read_symbol(&self, request: &ReadSymbolRequest) -> Result<String> {
        let outcome = self.search(request)?;
        Ok(format::format_outcome(&outcome, self.config.debug, request.compact))
    }

    /// Run a search to completion
    pub fn search(&self, request: &ReadSymbolRequest) -> Result<SearchOutcome> {
        self.search_with_token(request, CancellationToken::new())
    }

    /// Run a search that stops early once `token` is cancelled.
    ///
    /// Blocks aggregated before cancellation are still ranked and returned.
    pub fn search_with_token(
        &self,
        request: &ReadSymbolRequest,
        token: CancellationToken,
    ) -> Result<SearchOutcome> {
        let symbols = request.symbol_set()?;
        let paths = request.file_paths();
        let limit = request.effective_limit(self.config.default_limit);

        let mapped: Vec<String> = paths.iter().map(|p| pattern::map_pattern(p)).collect();
        let fragments = exclude::generate_ignore_patterns(&paths);
        debug!(?symbols, ?mapped, ?fragments, limit, "starting symbol search");

        let plan = ScanPlan::new(&self.config.root, &mapped, &fragments)?;
        let matcher = BlockMatcher::new(
            self.patterns.get_or_compile(&symbols)?,
            MatchLimits {
                max_block_bytes: self.config.max_block_bytes,
                max_symbol_offset: self.config.max_symbol_offset,
            },
        );
        let budget = ScanBudget::new(
            self.config.max_files,
            self.config.max_matches(symbols.len()),
            token,
        );
        let discovery = plan.discover(WalkLimits {
            max_depth: self.config.max_depth,
            max_file_size: self.config.max_file_size,
            respect_gitignore: self.config.respect_gitignore,
        });

        let stream = FileStream::new(
            discovery,
            Arc::clone(&self.pool),
            Arc::new(matcher),
            budget.clone(),
        );

        let (mut blocks, files_scanned) = collect_blocks(stream, &budget)?;
        if blocks.is_empty() {
            return Err(SearchError::NotFound {
                symbols,
                patterns: paths,
            });
        }

        let total = ranker::rank(&mut blocks, limit);
        debug!(
            files_scanned,
            matches = budget.matches_recorded(),
            total,
            shown = blocks.len(),
            "symbol search finished"
        );

        Ok(SearchOutcome {
            symbols,
            blocks,
            total,
            files_scanned,
        })
    }
}

/// Drain scanned files into one block list, honoring the match budget.
///
/// A scan error before the first block aborts the search. After that it is
/// logged and the partial results are kept.
fn collect_blocks<I>(files: I, budget: &ScanBudget) -> Result<(Vec<Block>, usize)>
where
    I: IntoIterator<Item = Result<ScannedFile>>,
{
    let mut blocks = Vec::new();
    let mut files_scanned = 0;
    for scanned in files {
        let file = match scanned {
            Ok(file) => file,
            Err(err) if blocks.is_empty() => return Err(err),
            Err(err) => {
                warn!(%err, "scan error after matches were found, keeping partial results");
                continue;
            }
        };

        files_scanned += 1;
        if file.blocks.is_empty() {
            continue;
        }

        let take = file.blocks.len().min(budget.remaining_matches());
        blocks.extend(file.blocks.into_iter().take(take));
        if budget.record_matches(take) {
            debug!(matches = blocks.len(), "match budget reached, stopping scan");
            break;
        }
    }

    Ok((blocks, files_scanned))
}
