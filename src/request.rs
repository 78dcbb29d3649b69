//! Request contract for symbol reads
//!
//! ```json
//! { "symbols": ["getUser*", "UserService"], "file_paths": ["src/"], "limit": 5 }
//! ```

use crate::error::{Result, SearchError};
use ahash::AHashSet;
use serde::{Deserialize, Serialize};

/// Searched when a request names no paths
pub const DEFAULT_FILE_PATH: &str = ".";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadSymbolRequest {
    /// Symbol names, optionally with `*` wildcards
    pub symbols: Vec<String>,
    /// Files, directories or globs to search
    #[serde(default = "default_file_paths", alias = "files")]
    pub file_paths: Vec<String>,
    /// Maximum number of blocks to return
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Strip comments and blank lines from returned blocks
    #[serde(default)]
    pub compact: bool,
}

fn default_file_paths() -> Vec<String> {
    vec![DEFAULT_FILE_PATH.to_string()]
}

impl ReadSymbolRequest {
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
            file_paths: default_file_paths(),
            limit: None,
            compact: false,
        }
    }

    pub fn with_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }

    /// Trimmed, distinct symbols in request order
    pub fn symbol_set(&self) -> Result<Vec<String>> {
        if self.symbols.is_empty() {
            return Err(SearchError::InvalidRequest(
                "at least one symbol is required".to_string(),
            ));
        }

        let mut seen = AHashSet::new();
        let mut symbols = Vec::with_capacity(self.symbols.len());
        for symbol in &self.symbols {
            let symbol = symbol.trim();
            if symbol.is_empty() {
                return Err(SearchError::InvalidRequest(
                    "symbols must not be empty strings".to_string(),
                ));
            }
            if seen.insert(symbol) {
                symbols.push(symbol.to_string());
            }
        }
        Ok(symbols)
    }

    /// Requested paths, or `["."]` when none were given
    pub fn file_paths(&self) -> Vec<String> {
        let paths: Vec<String> = self
            .file_paths
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();

        if paths.is_empty() {
            default_file_paths()
        } else {
            paths
        }
    }

    /// Result limit, never below one
    pub fn effective_limit(&self, default_limit: usize) -> usize {
        self.limit.unwrap_or(default_limit).max(1)
    }
}

/// Split a comma-separated symbol argument such as `myFunc,MyClass`
pub fn parse_symbol_list(arg: &str) -> Vec<String> {
    arg.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_defaults() {
        let request: ReadSymbolRequest =
            serde_json::from_str(r#"{"symbols": ["myFunc"]}"#).unwrap();

        assert_eq!(request.file_paths, vec!["."]);
        assert_eq!(request.limit, None);
        assert!(!request.compact);
        assert_eq!(request.effective_limit(5), 5);
    }

    #[test]
    fn test_deserialize_full() {
        let json = r#"{"symbols": ["a", "b"], "file_paths": ["src/", "lib"], "limit": 2, "compact": true}"#;
        let request: ReadSymbolRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.file_paths(), vec!["src/", "lib"]);
        assert_eq!(request.effective_limit(5), 2);
        assert!(request.compact);
    }

    #[test]
    fn test_files_alias() {
        let request: ReadSymbolRequest =
            serde_json::from_str(r#"{"symbols": ["a"], "files": ["app.ts"]}"#).unwrap();
        assert_eq!(request.file_paths(), vec!["app.ts"]);
    }

    #[test]
    fn test_missing_symbols_field_is_rejected() {
        assert!(serde_json::from_str::<ReadSymbolRequest>(r#"{"file_paths": ["."]}"#).is_err());
    }

    #[test]
    fn test_symbol_set_trims_and_dedups() {
        let request = ReadSymbolRequest::new([" myFunc ", "MyClass", "myFunc"]);
        assert_eq!(request.symbol_set().unwrap(), vec!["myFunc", "MyClass"]);
    }

    #[test]
    fn test_symbol_set_rejects_empty() {
        let empty = ReadSymbolRequest::new(Vec::<String>::new());
        assert!(matches!(empty.symbol_set(), Err(SearchError::InvalidRequest(_))));

        let blank = ReadSymbolRequest::new(["ok", "  "]);
        assert!(matches!(blank.symbol_set(), Err(SearchError::InvalidRequest(_))));
    }

    #[test]
    fn test_empty_paths_default_to_current_dir() {
        let request = ReadSymbolRequest::new(["a"]).with_paths(Vec::<String>::new());
        assert_eq!(request.file_paths(), vec!["."]);

        let request = ReadSymbolRequest::new(["a"]).with_paths(["", " "]);
        assert_eq!(request.file_paths(), vec!["."]);
    }

    #[test]
    fn test_zero_limit_means_one() {
        assert_eq!(ReadSymbolRequest::new(["a"]).with_limit(0).effective_limit(5), 1);
    }

    #[test]
    fn test_parse_symbol_list() {
        assert_eq!(
            parse_symbol_list("myFunc, MyClass,,get*Data"),
            vec!["myFunc", "MyClass", "get*Data"]
        );
        assert!(parse_symbol_list(" , ").is_empty());
    }
}
