//! Heuristic block matching
//!
//! Finds the blocks whose heading line mentions one of the searched symbols,
//! without parsing. A heading is a line where a symbol appears as a whole
//! token (not inside a string, not a property access, not an argument) and an
//! opening brace follows it. The block then runs through every line indented
//! deeper than the heading and absorbs the closing brace line.
//!
//! Nested braces are not balanced: the block stops at the first dedented
//! line. That keeps matching fast and language-agnostic at the cost of some
//! false positives (brace-like text in strings) and false negatives
//! (multi-line signatures).

use crate::error::Result;
use lru::LruCache;
use memchr::{memchr, memchr_iter, memrchr};
use regex::Regex;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

/// Characters that disqualify a symbol occurrence when directly before it
const REJECT_BEFORE: &[char] = &['(', '[', '.', '\'', '"', '`'];

/// Characters that disqualify a symbol occurrence when directly after it
const REJECT_AFTER: &[char] = &['.', '\'', '"', '`', ')', ']'];

/// One alternation regex compiled for an ordered symbol list
#[derive(Debug)]
pub struct SymbolPattern {
    symbols: Vec<String>,
    regex: Regex,
}

impl SymbolPattern {
    pub fn compile(symbols: &[String]) -> Result<Self> {
        let alternation = symbols
            .iter()
            .map(|s| symbol_regex(s))
            .collect::<Vec<_>>()
            .join("|");
        let regex = Regex::new(&format!("(?:{alternation})"))?;

        Ok(Self {
            symbols: symbols.to_vec(),
            regex,
        })
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn as_regex(&self) -> &Regex {
        &self.regex
    }
}

/// Regex source for one symbol.
///
/// `*` becomes a run of word characters. Word boundaries are only added on
/// sides where the symbol starts or ends with a word character, so selectors
/// like `#links`, `.navbar`, `:hover` or `[data-theme="dark"]` still match.
fn symbol_regex(symbol: &str) -> String {
    let body = if symbol.chars().all(|c| c == '*') {
        r"\w+".to_string()
    } else {
        symbol
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(r"\w*")
    };

    let word_edge =
        |c: Option<char>| c.is_some_and(|c| c == '*' || c == '_' || c.is_alphanumeric());
    let lead = if word_edge(symbol.chars().next()) { r"\b" } else { "" };
    let trail = if word_edge(symbol.chars().next_back()) { r"\b" } else { "" };

    format!("{lead}{body}{trail}")
}

/// Scan-scoped cache of compiled symbol patterns, keyed by the exact ordered
/// symbol list.
pub struct RegexCache {
    entries: Mutex<LruCache<Vec<String>, Arc<SymbolPattern>>>,
}

impl RegexCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Get the compiled pattern for `symbols`, compiling it on a miss
    pub fn get_or_compile(&self, symbols: &[String]) -> Result<Arc<SymbolPattern>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(pattern) = entries.get(symbols) {
            return Ok(Arc::clone(pattern));
        }

        let pattern = Arc::new(SymbolPattern::compile(symbols)?);
        entries.put(symbols.to_vec(), Arc::clone(&pattern));
        Ok(pattern)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Size caps applied while matching
#[derive(Debug, Clone, Copy)]
pub struct MatchLimits {
    /// Blocks longer than this many bytes are discarded
    pub max_block_bytes: usize,
    /// Occurrences further than this from line start are not headings
    pub max_symbol_offset: usize,
}

impl Default for MatchLimits {
    fn default() -> Self {
        Self {
            max_block_bytes: 20_000,
            max_symbol_offset: 200,
        }
    }
}

/// A block found in one file's content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMatch {
    /// 1-based, inclusive
    pub start_line: usize,
    /// 1-based, inclusive
    pub end_line: usize,
    /// Byte offset of the symbol occurrence
    pub offset: usize,
    /// The concrete text that matched (wildcards resolved)
    pub symbol: String,
    pub text: String,
}

/// Block matcher for one search
#[derive(Debug, Clone)]
pub struct BlockMatcher {
    pattern: Arc<SymbolPattern>,
    limits: MatchLimits,
}

impl BlockMatcher {
    pub fn new(pattern: Arc<SymbolPattern>, limits: MatchLimits) -> Self {
        Self { pattern, limits }
    }

    pub fn symbols(&self) -> &[String] {
        self.pattern.symbols()
    }

    /// Find every block in `content`, in content order
    pub fn find_blocks(&self, content: &str) -> Vec<BlockMatch> {
        let bytes = content.as_bytes();

        // Single-line content (typically minified bundles) never holds a block
        if memchr(b'\n', bytes).is_none() {
            return Vec::new();
        }

        let mut blocks = Vec::new();
        let mut lines = LineCounter::default();
        let mut resume_at = 0;

        for m in self.pattern.as_regex().find_iter(content) {
            if m.start() < resume_at {
                continue;
            }

            let line_start = memrchr(b'\n', &bytes[..m.start()]).map_or(0, |i| i + 1);
            // Heading shares a line with the previous block's closing brace
            if line_start < resume_at {
                continue;
            }
            if m.start() - line_start > self.limits.max_symbol_offset {
                continue;
            }
            if !has_clean_edges(content, m.start(), m.end()) {
                continue;
            }

            let Some(span) = expand_block(content, line_start, m.end(), resume_at) else {
                continue;
            };
            if span.end - span.start > self.limits.max_block_bytes {
                continue;
            }

            let text = content[span.start..span.end].trim_end_matches('\r');
            let start_line = lines.line_at(bytes, span.start);
            let end_line = start_line + memchr_iter(b'\n', text.as_bytes()).count();

            blocks.push(BlockMatch {
                start_line,
                end_line,
                offset: m.start(),
                symbol: m.as_str().to_string(),
                text: text.to_string(),
            });
            resume_at = span.end;
        }

        blocks
    }
}

/// Incremental 1-based line numbering over increasing offsets
#[derive(Default)]
struct LineCounter {
    offset: usize,
    line: usize,
}

impl LineCounter {
    fn line_at(&mut self, bytes: &[u8], offset: usize) -> usize {
        self.line += memchr_iter(b'\n', &bytes[self.offset..offset]).count();
        self.offset = offset;
        self.line + 1
    }
}

/// Reject property access, string contents, index and argument positions
fn has_clean_edges(content: &str, start: usize, end: usize) -> bool {
    let before = content[..start].chars().next_back();
    let after = content[end..].chars().next();

    !before.is_some_and(|c| REJECT_BEFORE.contains(&c))
        && !after.is_some_and(|c| REJECT_AFTER.contains(&c))
}

/// Byte range of a block
struct Span {
    start: usize,
    end: usize,
}

/// Grow a heading into a block, or None if the heading opens no brace.
/// Leading comments are never taken from before `floor`.
fn expand_block(content: &str, line_start: usize, symbol_end: usize, floor: usize) -> Option<Span> {
    let heading_end = line_end(content, symbol_end);
    let indent = leading_whitespace(&content[line_start..heading_end]);

    let mut end = heading_end;
    if !content[symbol_end..heading_end].contains('{') {
        // Brace on its own line below the heading
        let (next_start, next_end) = next_line(content, heading_end)?;
        if !content[next_start..next_end].trim_start().starts_with('{') {
            return None;
        }
        end = next_end;
    }

    // Body: lines deeper than the heading; blank lines only count when a
    // deeper line follows them
    let mut cursor = end;
    while let Some((start, stop)) = next_line(content, cursor) {
        let line = &content[start..stop];
        if line.trim().is_empty() {
            cursor = stop;
            continue;
        }
        if !is_deeper(line, indent) {
            break;
        }
        end = stop;
        cursor = stop;
    }

    // Closing brace at the heading's own indentation
    let mut cursor = end;
    while let Some((start, stop)) = next_line(content, cursor) {
        let line = &content[start..stop];
        if line.trim().is_empty() {
            cursor = stop;
            continue;
        }
        if leading_whitespace(line) == indent && line[indent.len()..].starts_with('}') {
            end = start + indent.len() + 1;
        }
        break;
    }

    let start = absorb_leading_comments(content, line_start, floor);
    Some(Span { start, end })
}

/// Move the block start up over directly preceding comment lines
fn absorb_leading_comments(content: &str, mut line_start: usize, floor: usize) -> usize {
    while line_start > 0 {
        let prev_end = line_start - 1;
        let prev_start = memrchr(b'\n', &content.as_bytes()[..prev_end]).map_or(0, |i| i + 1);
        if prev_start < floor || !is_comment_line(&content[prev_start..prev_end]) {
            break;
        }
        line_start = prev_start;
    }
    line_start
}

/// Line comment, block comment part, or `#` comment (a `#` line with a brace
/// is a CSS id selector, not a comment)
pub(crate) fn is_comment_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with("//")
        || trimmed.starts_with("/*")
        || trimmed.starts_with('*')
        || (trimmed.starts_with('#') && !trimmed.contains('{'))
}

fn is_deeper(line: &str, indent: &str) -> bool {
    line.starts_with(indent) && line[indent.len()..].starts_with([' ', '\t'])
}

fn leading_whitespace(line: &str) -> &str {
    let len = line.len() - line.trim_start_matches([' ', '\t']).len();
    &line[..len]
}

/// Offset of the newline ending the line that contains `from`, or the end
fn line_end(content: &str, from: usize) -> usize {
    memchr(b'\n', &content.as_bytes()[from..]).map_or(content.len(), |i| from + i)
}

/// Bounds of the line after the newline at `prev_end`
fn next_line(content: &str, prev_end: usize) -> Option<(usize, usize)> {
    if prev_end >= content.len() {
        return None;
    }
    let start = prev_end + 1;
    Some((start, line_end(content, start)))
}
