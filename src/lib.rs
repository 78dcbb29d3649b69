//! # symscan - symbol-aware code block search
//!
//! symscan finds the blocks (functions, classes, interfaces, enums, CSS
//! rules, schema types, ...) whose heading line names a symbol, across
//! dozens of file types, without parsing any of them.
//!
//! ## Architecture
//!
//! - [`search`] - the pipeline: pattern mapping, ignore fragments, concurrent
//!   file scanning, block matching, ranking and formatting
//! - [`request`] - the serde request contract
//! - [`config`] - limits and switches for a search
//! - [`error`] - error taxonomy
//! - [`output`] - colored terminal rendering
//!
//! ## Quick Start
//!
//! ```no_run
//! use symscan::config::ScanConfig;
//! use symscan::request::ReadSymbolRequest;
//! use symscan::search::SymbolSearch;
//!
//! let search = SymbolSearch::new(ScanConfig::default()).unwrap();
//! let request = ReadSymbolRequest::new(["UserService", "get*Data"]).with_paths(["src/"]);
//!
//! match search.read_symbol(&request) {
//!     Ok(text) => println!("{text}"),
//!     Err(err) if err.is_not_found() => eprintln!("{err}"),
//!     Err(err) => panic!("search failed: {err}"),
//! }
//! ```
//!
//! ## Matching
//!
//! A heading is a line where a symbol appears as a whole token, outside
//! strings and property accesses, followed by an opening brace on the same
//! or the next line. The block runs through the deeper-indented lines below
//! it and its closing brace. Nested braces are not balanced, which keeps the
//! matcher fast and language-agnostic.

pub mod config;
pub mod error;
pub mod output;
pub mod request;
pub mod search;

pub use config::ScanConfig;
pub use error::{Result, SearchError};
pub use request::ReadSymbolRequest;
pub use search::{Block, FileEntry, SearchOutcome, SymbolSearch};
