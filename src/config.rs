//! Search configuration.
//!
//! Every limit the pipeline enforces lives in [`ScanConfig`] and is passed
//! explicitly into a search. Values come from, in order: built-in defaults,
//! `config.json` in the application config directory, environment variables,
//! and finally CLI flags.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "symscan";
const CONFIG_FILE: &str = "config.json";

/// Limits and switches for one [`SymbolSearch`](crate::search::SymbolSearch)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Base directory for relative patterns and displayed paths
    #[serde(skip)]
    pub root: PathBuf,
    /// Number of files read and matched concurrently
    pub pool_width: usize,
    /// Maximum number of files dispatched to the pool per search
    pub max_files: usize,
    /// Files larger than this are skipped
    pub max_file_size: u64,
    /// Maximum directory depth below each walk base
    pub max_depth: usize,
    /// Aggregated blocks are capped at this times the number of symbols
    pub max_matches_per_symbol: usize,
    /// Blocks longer than this are discarded
    pub max_block_bytes: usize,
    /// Maximum distance from line start to the symbol on a heading line
    pub max_symbol_offset: usize,
    /// Result limit used when a request does not carry one
    pub default_limit: usize,
    /// Honor `.gitignore` and `.ignore` files while walking
    pub respect_gitignore: bool,
    /// Capacity of the compiled symbol pattern cache
    pub regex_cache_size: usize,
    /// Add diagnostic fields to result headers
    pub debug: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            root: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            pool_width: 32,
            max_files: 10_000,
            max_file_size: 1024 * 1024, // 1MB
            max_depth: 20,
            max_matches_per_symbol: 50,
            max_block_bytes: 20_000,
            max_symbol_offset: 200,
            default_limit: 5,
            respect_gitignore: true,
            regex_cache_size: 64,
            debug: false,
        }
    }
}

impl ScanConfig {
    /// Load config from the app config directory (or defaults), then apply
    /// environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match get_config_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Read a config file, using defaults for missing fields
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: ScanConfig =
            serde_json::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`
    ///
    /// `WORKSPACE_FOLDER_PATHS` (first comma-separated entry) sets the root,
    /// `DEBUG=true` enables diagnostics and `SYMSCAN_POOL_WIDTH` sets the pool
    /// width.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(folders) = lookup("WORKSPACE_FOLDER_PATHS") {
            if let Some(first) = folders.split(',').map(str::trim).find(|f| !f.is_empty()) {
                self.root = PathBuf::from(first);
            }
        }

        if let Some(debug) = lookup("DEBUG") {
            self.debug = debug == "true";
        }

        if let Some(width) = lookup("SYMSCAN_POOL_WIDTH").and_then(|w| w.parse::<usize>().ok()) {
            if width > 0 {
                self.pool_width = width;
            }
        }
    }

    /// Aggregation cap for a search over `symbol_count` symbols
    pub fn max_matches(&self, symbol_count: usize) -> usize {
        self.max_matches_per_symbol
            .saturating_mul(symbol_count.max(1))
            .max(1)
    }
}

/// Path of the optional config file, if a config directory exists
pub fn get_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE))
}
