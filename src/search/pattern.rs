//! Pattern mapping
//!
//! Turns one caller-supplied path, directory, or glob into a glob that is
//! restricted to the source extensions the block matcher understands.

/// Extensions searched when a pattern does not name one itself.
///
/// `d.ts` comes first so declaration files are listed before plain `ts`.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "d.ts", "ts", "tsx", "js", "jsx", "mjs", "cjs", "cts", "java", "cs", "cpp", "c", "h", "hpp",
    "cc", "go", "rs", "php", "swift", "scss", "css", "less", "graphql", "gql", "prisma", "proto",
];

/// Declaration-only compound suffixes (ambient type files)
pub const DECLARATION_SUFFIXES: &[&str] = &[".d.ts", ".d.mts", ".d.cts"];

const GLOB_CHARS: &[char] = &['*', '?', '[', ']', '{', '}'];

/// `{d.ts,ts,...}`
pub fn extension_class() -> String {
    format!("{{{}}}", DEFAULT_EXTENSIONS.join(","))
}

/// Check whether a pattern contains glob metacharacters
pub fn has_glob_chars(pattern: &str) -> bool {
    pattern.contains(GLOB_CHARS)
}

/// Check whether a path ends in a declaration-only suffix such as `.d.ts`
pub fn is_declaration_file(path: &str) -> bool {
    DECLARATION_SUFFIXES.iter().any(|suffix| path.ends_with(suffix))
}

/// Map a caller pattern to a glob with an extension filter.
///
/// Rules, first match wins:
/// 1. already names an extension: unchanged
/// 2. `.` or `./`: recursive glob from the current directory
/// 3. trailing `/`: recursive glob inside that directory
/// 4. bare `*` or `*.*`: extension glob in the current directory
/// 5. plain name without glob characters: treated as a directory
/// 6. other globs: extension class appended to the last segment
///
/// Before any of that, a `node_modules/<pkg>` segment is widened to also
/// cover `node_modules/@types/<pkg>`.
pub fn map_pattern(input: &str) -> String {
    let pattern = expand_types_package(input);
    let exts = extension_class();

    if has_extension(input) {
        return pattern;
    }

    if input == "." || input == "./" {
        return format!("./**/*.{exts}");
    }

    if pattern.ends_with('/') {
        return format!("{pattern}**/*.{exts}");
    }

    if input == "*" || input == "*.*" {
        return format!("*.{exts}");
    }

    if !has_glob_chars(input) {
        return format!("{pattern}/**/*.{exts}");
    }

    format!("{pattern}.{exts}")
}

/// The last path segment looks like `name.ext`
fn has_extension(pattern: &str) -> bool {
    let last = pattern.rsplit('/').next().unwrap_or(pattern);

    if DEFAULT_EXTENSIONS
        .iter()
        .any(|ext| last.len() > ext.len() + 1 && last.ends_with(&format!(".{ext}")))
    {
        return true;
    }

    // `*.{ts,tsx}`: an alternation of extensions
    if let Some(idx) = last.rfind(".{") {
        if let Some(alternates) = last[idx + 2..].strip_suffix('}') {
            return idx > 0
                && alternates.split(',').all(|ext| {
                    !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric() || c == '.')
                });
        }
    }

    match last.rsplit_once('.') {
        Some((name, ext)) => {
            !name.is_empty()
                && !ext.is_empty()
                && ext.len() <= 8
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        }
        None => false,
    }
}

/// `node_modules/lodash` -> `node_modules/{@types/,}lodash`
fn expand_types_package(pattern: &str) -> String {
    let segments: Vec<&str> = pattern.split('/').collect();

    let Some(idx) = segments.iter().position(|s| *s == "node_modules") else {
        return pattern.to_string();
    };

    match segments.get(idx + 1) {
        Some(pkg) if !pkg.is_empty() && !pkg.starts_with('@') => {
            let mut rewritten: Vec<String> = segments.iter().map(|s| s.to_string()).collect();
            rewritten[idx + 1] = format!("{{@types/,}}{pkg}");
            rewritten.join("/")
        }
        _ => pattern.to_string(),
    }
}
