//! File discovery and bounded concurrent scanning
//!
//! [`ScanPlan`] compiles mapped patterns and ignore fragments into walk
//! targets. [`Discovery`] lazily walks them in file-name order, assigning each
//! admitted file its discovery index. [`FileStream`] feeds discovered files to
//! a fixed-width rayon pool and yields per-file results in completion order.
//!
//! The stream never has more reads in flight than the pool width. Reads are
//! only dispatched when the consumer asks for the next result, so a consumer
//! that stops pulling also stops the scan.

use crate::error::{Result, SearchError};
use crate::search::budget::ScanBudget;
use crate::search::exclude::directory_stem;
use crate::search::matcher::BlockMatcher;
use crate::search::pattern::{extension_class, has_glob_chars};
use crate::search::ranker::score;
use crate::search::{Block, FileEntry};
use ahash::AHashSet;
use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::{Walk, WalkBuilder};
use rayon::ThreadPool;
use std::collections::VecDeque;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use tracing::{debug, trace};

/// Walk settings shared by every target of one plan
#[derive(Debug, Clone, Copy)]
pub struct WalkLimits {
    pub max_depth: usize,
    pub max_file_size: u64,
    pub respect_gitignore: bool,
}

/// One source of candidate files
#[derive(Debug, Clone)]
enum ScanTarget {
    /// An existing file named without glob characters; bypasses exclusions
    Literal(PathBuf),
    Glob(GlobTarget),
}

#[derive(Debug, Clone)]
struct GlobTarget {
    /// Directory the walk starts from
    base: PathBuf,
    /// Literal leading segments of the pattern, `/`-terminated
    prefix: String,
    /// Depth bound when the pattern has no `**`
    depth: Option<usize>,
    include: GlobSet,
}

/// Compiled walk targets and exclusions for one search
#[derive(Debug, Clone)]
pub struct ScanPlan {
    root: PathBuf,
    targets: Vec<ScanTarget>,
    /// File-level exclusions, matched against root-relative paths
    excludes: GlobSet,
    /// Directories never descended into
    prune: GlobSet,
}

impl ScanPlan {
    /// Compile mapped patterns and `!`-prefixed ignore fragments.
    ///
    /// Patterns whose base does not exist are dropped with a debug log.
    pub fn new<S: AsRef<str>>(root: &Path, patterns: &[S], ignore_fragments: &[S]) -> Result<Self> {
        let mut excludes = GlobSetBuilder::new();
        let mut prune = GlobSetBuilder::new();
        for fragment in ignore_fragments {
            let fragment = fragment.as_ref().trim_start_matches('!');
            excludes.add(compile_glob(fragment)?);
            if let Some(stem) = directory_stem(fragment) {
                prune.add(compile_glob(stem)?);
            }
        }

        let mut targets = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            if let Some(target) = plan_target(root, pattern.as_ref())? {
                targets.push(target);
            }
        }

        Ok(Self {
            root: root.to_path_buf(),
            targets,
            excludes: excludes.build()?,
            prune: prune.build()?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Start a lazy walk over all targets
    pub fn discover(&self, limits: WalkLimits) -> Discovery {
        Discovery {
            targets: self.targets.iter().cloned().collect(),
            current: None,
            prune: self.prune.clone(),
            limits,
            admission: Admission {
                root: self.root.clone(),
                excludes: self.excludes.clone(),
                seen: AHashSet::new(),
                next_order: 0,
                max_file_size: limits.max_file_size,
            },
        }
    }
}

fn compile_glob(pattern: &str) -> Result<Glob> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .empty_alternates(true)
        .build()?;
    Ok(glob)
}

fn plan_target(root: &Path, mapped: &str) -> Result<Option<ScanTarget>> {
    let pattern = mapped.strip_prefix("./").unwrap_or(mapped);

    if !has_glob_chars(pattern) {
        let path = root.join(pattern);
        if path.is_file() {
            return Ok(Some(ScanTarget::Literal(path)));
        }
        if !path.is_dir() {
            debug!(pattern = mapped, "no such file or directory, skipping");
            return Ok(None);
        }
        // An extensioned name that turned out to be a directory
        let widened = format!("{}/**/*.{}", pattern.trim_end_matches('/'), extension_class());
        return plan_glob(root, &widened);
    }

    plan_glob(root, pattern)
}

fn plan_glob(root: &Path, pattern: &str) -> Result<Option<ScanTarget>> {
    let segments: Vec<&str> = pattern.split('/').collect();
    let literal = segments
        .iter()
        .position(|s| has_glob_chars(s))
        .unwrap_or(segments.len());

    let prefix: String = segments[..literal].iter().map(|s| format!("{s}/")).collect();
    let base = if prefix.is_empty() {
        root.to_path_buf()
    } else {
        root.join(&prefix)
    };
    if !base.is_dir() {
        debug!(pattern, base = %base.display(), "walk base does not exist, skipping");
        return Ok(None);
    }

    let depth = if segments.contains(&"**") {
        None
    } else {
        Some(segments.len() - literal)
    };

    let mut include = GlobSetBuilder::new();
    include.add(compile_glob(pattern)?);

    Ok(Some(ScanTarget::Glob(GlobTarget {
        base,
        prefix,
        depth,
        include: include.build()?,
    })))
}

/// `/`-separated rendering of a path for glob matching
fn slash_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Path shown to the caller: relative to the root when below it
fn display_path(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Dedup, exclusion, size checks and discovery numbering
#[derive(Debug)]
struct Admission {
    root: PathBuf,
    excludes: GlobSet,
    seen: AHashSet<PathBuf>,
    next_order: usize,
    max_file_size: u64,
}

impl Admission {
    fn admit(&mut self, abs_path: &Path, size: u64, explicit: bool) -> Option<FileEntry> {
        let path = display_path(&self.root, abs_path);

        if !explicit && self.excludes.is_match(slash_path(&path)) {
            trace!(path = %path.display(), "excluded by ignore pattern");
            return None;
        }
        if size > self.max_file_size {
            trace!(path = %path.display(), size, "file too large, skipping");
            return None;
        }
        if !self.seen.insert(abs_path.to_path_buf()) {
            return None;
        }

        let order = self.next_order;
        self.next_order += 1;
        Some(FileEntry {
            path,
            abs_path: abs_path.to_path_buf(),
            size,
            order,
        })
    }
}

/// Lazy, file-name-ordered walk over every target of a [`ScanPlan`]
pub struct Discovery {
    targets: VecDeque<ScanTarget>,
    current: Option<(GlobTarget, Walk)>,
    prune: GlobSet,
    limits: WalkLimits,
    admission: Admission,
}

impl Discovery {
    fn start_walk(&self, target: &GlobTarget) -> Walk {
        let respect = self.limits.respect_gitignore;
        let depth = target
            .depth
            .map_or(self.limits.max_depth, |d| d.min(self.limits.max_depth));

        let root = self.admission.root.clone();
        let prune = self.prune.clone();

        WalkBuilder::new(&target.base)
            .standard_filters(false)
            .hidden(false)
            .git_ignore(respect)
            .git_exclude(respect)
            .ignore(respect)
            .parents(respect)
            .max_depth(Some(depth))
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                if !entry.file_type().is_some_and(|t| t.is_dir()) {
                    return true;
                }
                let dir = display_path(&root, entry.path());
                !prune.is_match(slash_path(&dir))
            })
            .build()
    }
}

impl Iterator for Discovery {
    type Item = Result<FileEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((target, walk)) = &mut self.current {
                match walk.next() {
                    Some(Ok(entry)) => {
                        if !entry.file_type().is_some_and(|t| t.is_file()) {
                            continue;
                        }
                        let Ok(rel) = entry.path().strip_prefix(&target.base) else {
                            continue;
                        };
                        let candidate = format!("{}{}", target.prefix, slash_path(rel));
                        if !target.include.is_match(&candidate) {
                            continue;
                        }
                        let size = match entry.metadata() {
                            Ok(meta) => meta.len(),
                            Err(err) => {
                                trace!(
                                    path = %entry.path().display(),
                                    %err,
                                    "metadata unavailable, skipping"
                                );
                                continue;
                            }
                        };
                        if let Some(file) = self.admission.admit(entry.path(), size, false) {
                            return Some(Ok(file));
                        }
                        continue;
                    }
                    Some(Err(err)) => return Some(Err(SearchError::Walk(err))),
                    None => self.current = None,
                }
            }

            match self.targets.pop_front()? {
                ScanTarget::Literal(path) => {
                    let size = match fs::metadata(&path) {
                        Ok(meta) => meta.len(),
                        Err(err) => {
                            trace!(path = %path.display(), %err, "metadata unavailable, skipping");
                            continue;
                        }
                    };
                    if let Some(file) = self.admission.admit(&path, size, true) {
                        return Some(Ok(file));
                    }
                }
                ScanTarget::Glob(target) => {
                    let walk = self.start_walk(&target);
                    self.current = Some((target, walk));
                }
            }
        }
    }
}

/// Blocks found in one file
#[derive(Debug)]
pub struct ScannedFile {
    pub entry: Arc<FileEntry>,
    pub blocks: Vec<Block>,
}

/// Message sent back by a worker; exactly one per dispatched file
enum Completion {
    Scanned(ScannedFile),
    Skipped { path: PathBuf, reason: String },
}

/// Bounded-concurrency stream of scanned files in completion order.
///
/// Dropping the stream waits for reads already in flight; their results are
/// discarded.
pub struct FileStream {
    discovery: Discovery,
    pool: Arc<ThreadPool>,
    matcher: Arc<BlockMatcher>,
    budget: ScanBudget,
    width: usize,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
    in_flight: usize,
    discovery_done: bool,
    pending_error: Option<SearchError>,
}

impl FileStream {
    pub fn new(
        discovery: Discovery,
        pool: Arc<ThreadPool>,
        matcher: Arc<BlockMatcher>,
        budget: ScanBudget,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        let width = pool.current_num_threads().max(1);
        Self {
            discovery,
            pool,
            matcher,
            budget,
            width,
            tx,
            rx,
            in_flight: 0,
            discovery_done: false,
            pending_error: None,
        }
    }

    /// Dispatch reads until the pool is full or there is nothing left to do
    fn fill(&mut self) {
        while self.in_flight < self.width && !self.discovery_done && self.pending_error.is_none() {
            if self.budget.token().is_cancelled() {
                debug!("scan cancelled, no further reads dispatched");
                self.discovery_done = true;
                break;
            }

            match self.discovery.next() {
                Some(Ok(entry)) => {
                    if !self.budget.claim_file() {
                        debug!(files = self.budget.files_claimed(), "file budget spent");
                        self.discovery_done = true;
                        break;
                    }
                    self.dispatch(entry);
                }
                Some(Err(err)) => self.pending_error = Some(err),
                None => self.discovery_done = true,
            }
        }
    }

    fn dispatch(&mut self, entry: FileEntry) {
        let entry = Arc::new(entry);
        let matcher = Arc::clone(&self.matcher);
        let tx = self.tx.clone();
        self.in_flight += 1;

        self.pool.spawn(move || {
            let completion = panic::catch_unwind(AssertUnwindSafe(|| scan_file(&entry, &matcher)))
                .unwrap_or_else(|_| Completion::Skipped {
                    path: entry.path.clone(),
                    reason: "matcher panicked".to_string(),
                });
            // Receiver gone means the stream was dropped mid-drain
            let _ = tx.send(completion);
        });
    }

    fn recv(&mut self) -> Option<Completion> {
        match self.rx.recv() {
            Ok(completion) => {
                self.in_flight -= 1;
                Some(completion)
            }
            Err(_) => {
                self.in_flight = 0;
                None
            }
        }
    }

    /// Wait out every read still in flight, discarding results
    fn drain(&mut self) {
        while self.in_flight > 0 {
            if self.recv().is_none() {
                break;
            }
        }
    }

    #[cfg(test)]
    fn in_flight(&self) -> usize {
        self.in_flight
    }
}

impl Iterator for FileStream {
    type Item = Result<ScannedFile>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.budget.token().is_cancelled() {
                self.drain();
                return None;
            }
            self.fill();

            if let Some(err) = self.pending_error.take() {
                return Some(Err(err));
            }
            if self.in_flight == 0 {
                return None;
            }

            let completion = self.recv()?;
            if self.budget.token().is_cancelled() {
                self.drain();
                return None;
            }

            match completion {
                Completion::Scanned(file) => return Some(Ok(file)),
                Completion::Skipped { path, reason } => {
                    trace!(path = %path.display(), %reason, "skipped unreadable file");
                }
            }
        }
    }
}

impl Drop for FileStream {
    fn drop(&mut self) {
        self.drain();
    }
}

/// Read one file and run the matcher over it
fn scan_file(entry: &Arc<FileEntry>, matcher: &BlockMatcher) -> Completion {
    let content = match fs::read_to_string(&entry.abs_path) {
        Ok(content) => content,
        Err(err) => {
            return Completion::Skipped {
                path: entry.path.clone(),
                reason: err.to_string(),
            };
        }
    };

    let blocks = matcher
        .find_blocks(&content)
        .into_iter()
        .map(|m| Block {
            score: score(&m.text, &entry.path),
            file: Arc::clone(entry),
            start_line: m.start_line,
            end_line: m.end_line,
            text: m.text,
            symbol: m.symbol,
            offset: m.offset,
        })
        .collect();

    Completion::Scanned(ScannedFile {
        entry: Arc::clone(entry),
        blocks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::budget::CancellationToken;
    use crate::search::exclude::generate_ignore_patterns;
    use crate::search::matcher::{MatchLimits, SymbolPattern};
    use crate::search::pattern::map_pattern;
    use rayon::ThreadPoolBuilder;
    use tempfile::TempDir;

    const LIMITS: WalkLimits = WalkLimits {
        max_depth: 20,
        max_file_size: 1024 * 1024,
        respect_gitignore: true,
    };

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn plan(root: &Path, patterns: &[&str]) -> ScanPlan {
        let mapped: Vec<String> = patterns.iter().map(|p| map_pattern(p)).collect();
        let fragments = generate_ignore_patterns(patterns);
        ScanPlan::new(root, &mapped, &fragments).unwrap()
    }

    fn discovered(root: &Path, patterns: &[&str]) -> Vec<String> {
        plan(root, patterns)
            .discover(LIMITS)
            .map(|f| slash_path(&f.unwrap().path))
            .collect()
    }

    fn stream(root: &Path, patterns: &[&str], width: usize, budget: ScanBudget) -> FileStream {
        let pool = ThreadPoolBuilder::new().num_threads(width).build().unwrap();
        let symbols = vec!["target".to_string()];
        let pattern = Arc::new(SymbolPattern::compile(&symbols).unwrap());
        let matcher = BlockMatcher::new(pattern, MatchLimits::default());
        FileStream::new(
            plan(root, patterns).discover(LIMITS),
            Arc::new(pool),
            Arc::new(matcher),
            budget,
        )
    }

    #[test]
    fn test_discovery_is_sorted_and_numbered() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/b.ts", "x");
        write(dir.path(), "src/a.ts", "x");
        write(dir.path(), "lib/c.rs", "x");
        write(dir.path(), "notes.txt", "x");

        let files: Vec<FileEntry> = plan(dir.path(), &["."])
            .discover(LIMITS)
            .map(|f| f.unwrap())
            .collect();

        let paths: Vec<String> = files.iter().map(|f| slash_path(&f.path)).collect();
        assert_eq!(paths, vec!["lib/c.rs", "src/a.ts", "src/b.ts"]);
        let orders: Vec<usize> = files.iter().map(|f| f.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn test_conventional_directories_are_skipped() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/app.ts", "x");
        write(dir.path(), "src/app.test.ts", "x");
        write(dir.path(), "src/_private.ts", "x");
        write(dir.path(), "node_modules/pkg/index.js", "x");
        write(dir.path(), "dist/bundle.js", "x");
        write(dir.path(), "packages/dist/keep.ts", "x");
        write(dir.path(), "packages/scripts/skip.ts", "x");
        write(dir.path(), "scripts/keep.ts", "x");

        assert_eq!(
            discovered(dir.path(), &["."]),
            vec!["packages/dist/keep.ts", "scripts/keep.ts", "src/app.ts"]
        );
    }

    #[test]
    fn test_explicit_directory_is_walked() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "node_modules/pkg/index.js", "x");
        write(dir.path(), "dist/bundle.js", "x");
        write(dir.path(), "src/app.ts", "x");

        assert_eq!(discovered(dir.path(), &["dist/"]), vec!["dist/bundle.js"]);
        assert_eq!(
            discovered(dir.path(), &["node_modules/pkg/"]),
            vec!["node_modules/pkg/index.js"]
        );
    }

    #[test]
    fn test_literal_file_bypasses_denylist() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/app.test.ts", "x");

        assert!(discovered(dir.path(), &["src/"]).is_empty());
        assert_eq!(discovered(dir.path(), &["src/app.test.ts"]), vec!["src/app.test.ts"]);
    }

    #[test]
    fn test_single_star_does_not_recurse() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/top.ts", "x");
        write(dir.path(), "src/nested/deep.ts", "x");

        assert_eq!(discovered(dir.path(), &["src/*"]), vec!["src/top.ts"]);
        assert_eq!(
            discovered(dir.path(), &["src/**/*"]),
            vec!["src/nested/deep.ts", "src/top.ts"]
        );
    }

    #[test]
    fn test_overlapping_patterns_are_deduplicated() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/a.ts", "x");
        write(dir.path(), "src/b.ts", "x");

        assert_eq!(
            discovered(dir.path(), &["src/a.ts", "src", "."]),
            vec!["src/a.ts", "src/b.ts"]
        );
    }

    #[test]
    fn test_missing_bases_are_skipped() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/a.ts", "x");

        let plan = plan(dir.path(), &["missing/", "nope.ts", "gone/**/*.ts"]);
        assert!(plan.is_empty());
        assert_eq!(plan.discover(LIMITS).count(), 0);
    }

    #[test]
    fn test_oversized_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "big.ts", &"x".repeat(64));
        write(dir.path(), "small.ts", "x");

        let limits = WalkLimits {
            max_file_size: 16,
            ..LIMITS
        };
        let files: Vec<String> = plan(dir.path(), &["."])
            .discover(limits)
            .map(|f| slash_path(&f.unwrap().path))
            .collect();
        assert_eq!(files, vec!["small.ts"]);
    }

    #[test]
    fn test_stream_handles_more_files_than_workers() {
        let dir = TempDir::new().unwrap();
        for i in 0..40 {
            write(dir.path(), &format!("src/f{i:02}.ts"), "\nfunction target() {\n  return 1\n}\n");
        }

        let budget = ScanBudget::new(1000, 1000, CancellationToken::new());
        let mut files = stream(dir.path(), &["src/"], 3, budget);

        let mut blocks = 0;
        let mut scanned = 0;
        while let Some(file) = files.next() {
            let file = file.unwrap();
            assert!(files.in_flight() <= 3);
            blocks += file.blocks.len();
            scanned += 1;
        }

        assert_eq!(scanned, 40);
        assert_eq!(blocks, 40);
        assert_eq!(files.in_flight(), 0);
    }

    #[test]
    fn test_cancelled_stream_stops_and_drains() {
        let dir = TempDir::new().unwrap();
        for i in 0..50 {
            write(dir.path(), &format!("f{i:02}.ts"), "\nclass target {\n  x\n}\n");
        }

        let token = CancellationToken::new();
        let budget = ScanBudget::new(1000, 1000, token.clone());
        let mut files = stream(dir.path(), &["."], 4, budget.clone());

        assert!(files.next().unwrap().is_ok());
        token.cancel();
        assert!(files.next().is_none());
        assert!(files.next().is_none());
        assert_eq!(files.in_flight(), 0);
        assert!(budget.files_claimed() < 50);
    }

    #[test]
    fn test_file_budget_limits_dispatch() {
        let dir = TempDir::new().unwrap();
        for i in 0..10 {
            write(dir.path(), &format!("f{i}.ts"), "\nclass target {\n  x\n}\n");
        }

        let budget = ScanBudget::new(4, 1000, CancellationToken::new());
        let scanned = stream(dir.path(), &["."], 2, budget).count();
        assert_eq!(scanned, 4);
    }

    #[test]
    fn test_unreadable_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "good.ts", "\nclass target {\n  x\n}\n");
        fs::write(dir.path().join("bad.ts"), [0xff, 0xfe, b'\n', 0xff]).unwrap();

        let budget = ScanBudget::new(100, 100, CancellationToken::new());
        let files: Vec<ScannedFile> = stream(dir.path(), &["."], 2, budget)
            .map(|f| f.unwrap())
            .collect();

        assert_eq!(files.len(), 1);
        assert_eq!(slash_path(&files[0].entry.path), "good.ts");
        assert_eq!(files[0].blocks.len(), 1);
    }
}
