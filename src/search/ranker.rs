//! Heuristic scoring and ranking of matched blocks
//!
//! Longer, keyword-bearing, shallow, declaration-file blocks float to the
//! top. Nothing is filtered here: a one-line incidental match still ranks,
//! just below everything that looks like a definition.

use crate::search::matcher::is_comment_line;
use crate::search::pattern::is_declaration_file;
use crate::search::Block;
use std::path::{Component, Path};

/// Words on a heading line that suggest a definition
pub const DECLARATION_KEYWORDS: &[&str] = &[
    "class",
    "interface",
    "type",
    "function",
    "enum",
    "namespace",
    "module",
    "model",
    "declare",
    "abstract",
    "const",
    "extends",
    "implements",
];

const LINE_WEIGHT: i64 = 2;
const KEYWORD_WEIGHT: i64 = 1000;
const DEPTH_PENALTY: i64 = 10;
const DECLARATION_FILE_BONUS: i64 = 100;

/// Score a block's text found at `path`
pub fn score(text: &str, path: &Path) -> i64 {
    let line_count = text.split('\n').count() as i64;
    let keywords = keyword_count(heading_line(text)) as i64;
    let depth = path_depth(path) as i64;
    let declaration_bonus = if is_declaration_file(&path.to_string_lossy()) {
        DECLARATION_FILE_BONUS
    } else {
        0
    };

    LINE_WEIGHT * line_count + KEYWORD_WEIGHT * keywords - DEPTH_PENALTY * depth
        + declaration_bonus
}

/// First line that is not a comment
fn heading_line(text: &str) -> &str {
    text.lines().find(|line| !is_comment_line(line)).unwrap_or("")
}

/// Number of declaration keywords appearing as whole words
fn keyword_count(line: &str) -> usize {
    line.split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
        .filter(|word| DECLARATION_KEYWORDS.contains(word))
        .count()
}

/// Directories above the file: `a.ts` is 0, `src/a.ts` is 1
pub fn path_depth(path: &Path) -> usize {
    path.components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .count()
        .saturating_sub(1)
}

/// Sort best-first and keep `limit` blocks. Returns how many existed before
/// truncation.
///
/// Equal scores keep discovery order: earlier files first, then earlier
/// offsets within a file.
pub fn rank(blocks: &mut Vec<Block>, limit: usize) -> usize {
    blocks.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.file.order.cmp(&b.file.order))
            .then_with(|| a.offset.cmp(&b.offset))
    });

    let total = blocks.len();
    blocks.truncate(limit);
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::FileEntry;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn block(path: &str, order: usize, offset: usize, text: &str) -> Block {
        let file = Arc::new(FileEntry {
            path: PathBuf::from(path),
            abs_path: PathBuf::from(path),
            size: text.len() as u64,
            order,
        });
        Block {
            score: score(text, &file.path),
            start_line: 1,
            end_line: text.split('\n').count(),
            offset,
            symbol: "x".to_string(),
            text: text.to_string(),
            file,
        }
    }

    #[test]
    fn test_score_formula() {
        // 3 lines, "function" once, depth 1
        let text = "function f() {\n  x\n}";
        assert_eq!(score(text, Path::new("src/a.ts")), 2 * 3 + 1000 - 10);

        // 1 line, "export" is not a keyword, "const" is
        let text = "export const f = () => { }";
        assert_eq!(score(text, Path::new("a.ts")), 2 + 1000);
    }

    #[test]
    fn test_score_is_idempotent() {
        let text = "class A extends B {\n  x\n}";
        let path = Path::new("lib/models/a.ts");
        assert_eq!(score(text, path), score(text, path));
    }

    #[test]
    fn test_keywords_are_whole_words() {
        assert_eq!(keyword_count("const typeName = classify()"), 1);
        assert_eq!(keyword_count("export abstract class A extends B implements C {"), 4);
        assert_eq!(keyword_count("myFunc() {"), 0);
    }

    #[test]
    fn test_heading_skips_comments() {
        let text = "// the class keyword in a comment\nfunction f() {\n}";
        assert_eq!(heading_line(text), "function f() {");
    }

    #[test]
    fn test_ten_line_class_beats_two_line_function() {
        let class_text = format!("class A {{\n{}}}", "  x\n".repeat(8));
        let function_text = "function f() {\n}";

        let class_score = score(&class_text, Path::new("src/a.ts"));
        let function_score = score(function_text, Path::new("src/a.ts"));
        assert!(class_score > function_score);
    }

    #[test]
    fn test_declaration_file_bonus() {
        let text = "interface Props {\n  a: string\n}";
        let declared = score(text, Path::new("types/props.d.ts"));
        let plain = score(text, Path::new("types/props.ts"));
        assert_eq!(declared - plain, 100);
    }

    #[test]
    fn test_shallow_beats_deep() {
        let text = "function f() {\n}";
        assert!(score(text, Path::new("a.ts")) > score(text, Path::new("a/b/c/d.ts")));
    }

    #[test]
    fn test_path_depth() {
        assert_eq!(path_depth(Path::new("file.rs")), 0);
        assert_eq!(path_depth(Path::new("src/file.rs")), 1);
        assert_eq!(path_depth(Path::new("./src/query/executor.rs")), 2);
    }

    #[test]
    fn test_rank_orders_and_truncates() {
        let mut blocks = vec![
            block("a.ts", 0, 0, "x() {"),
            block("b.ts", 1, 0, "function f() {\n  x\n}"),
            block("c.ts", 2, 0, "class C {\n  x\n  y\n}"),
        ];

        let total = rank(&mut blocks, 2);

        assert_eq!(total, 3);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].file.path, PathBuf::from("c.ts"));
        assert_eq!(blocks[1].file.path, PathBuf::from("b.ts"));
    }

    #[test]
    fn test_rank_ties_keep_discovery_order() {
        let text = "function commonFunc() { return 1 }";
        let mut blocks = vec![
            block("z.ts", 3, 0, text),
            block("y.ts", 1, 40, text),
            block("y.ts", 1, 10, text),
            block("x.ts", 2, 0, text),
        ];

        rank(&mut blocks, 10);

        let order: Vec<(usize, usize)> = blocks.iter().map(|b| (b.file.order, b.offset)).collect();
        assert_eq!(order, vec![(1, 10), (1, 40), (2, 0), (3, 0)]);
    }
}
