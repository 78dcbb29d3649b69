//! Ignore fragment synthesis
//!
//! Produces negative globs (prefixed with `!`) for files and directories that
//! are almost never what a symbol lookup is after. A directory is only
//! excluded while no caller pattern names it as a path segment.

/// Test, spec, underscore-prefixed and minified files, anywhere
pub const DENYLIST_FRAGMENT: &str = "!**/{*.test.*,*.spec.*,_*,*.min.*}";

/// Excluded at any depth
pub const GLOBAL_DIRS: &[&str] = &["node_modules", ".git"];

/// Excluded only directly below the root
pub const ROOT_DIRS: &[&str] = &["dist", "build", "out", "test", "tests", "examples", "runtime"];

/// Excluded only when nested below another directory
pub const NESTED_DIRS: &[&str] = &["bin", "scripts"];

/// Build the ignore fragments for a set of caller patterns.
///
/// The denylist fragment is always first, followed by at most one fragment
/// per directory tier (global, root-only, nested).
pub fn generate_ignore_patterns<S: AsRef<str>>(patterns: &[S]) -> Vec<String> {
    let mut fragments = vec![DENYLIST_FRAGMENT.to_string()];

    if let Some(dirs) = brace_list(GLOBAL_DIRS, patterns) {
        fragments.push(format!("!**/{dirs}/**"));
    }
    if let Some(dirs) = brace_list(ROOT_DIRS, patterns) {
        fragments.push(format!("!{dirs}/**"));
    }
    if let Some(dirs) = brace_list(NESTED_DIRS, patterns) {
        fragments.push(format!("!*/**/{dirs}/**"));
    }

    fragments
}

/// Directory part of a `<dirs>/**` fragment, used to prune whole directories
/// during the walk instead of testing every file below them.
pub fn directory_stem(fragment: &str) -> Option<&str> {
    fragment.strip_suffix("/**")
}

/// Check whether any caller pattern names `dir` as a literal path segment
pub fn is_explicitly_named<S: AsRef<str>>(dir: &str, patterns: &[S]) -> bool {
    patterns
        .iter()
        .any(|p| p.as_ref().split(['/', '\\']).any(|segment| segment == dir))
}

/// `{a,b}` for the names not explicitly requested, `a` for a single name
fn brace_list<S: AsRef<str>>(dirs: &[&str], patterns: &[S]) -> Option<String> {
    let kept: Vec<&str> = dirs
        .iter()
        .copied()
        .filter(|dir| !is_explicitly_named(dir, patterns))
        .collect();

    match kept.as_slice() {
        [] => None,
        [single] => Some((*single).to_string()),
        many => Some(format!("{{{}}}", many.join(","))),
    }
}
