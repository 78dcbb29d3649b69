//! Token-saving compaction of block text
//!
//! Comments and blank lines are dropped, the block is dedented, and the
//! remaining indentation is re-expressed as one tab per indentation step.

/// Columns a tab counts for when measuring indentation
const TAB_WIDTH: usize = 4;

/// Compact a block for display
pub fn compact_code(text: &str) -> String {
    let stripped = strip_delimited_comments(text);

    let lines: Vec<(usize, &str)> = stripped
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty() && !is_line_comment(line))
        .map(|line| {
            let body = line.trim_start_matches([' ', '\t']);
            (indent_width(&line[..line.len() - body.len()]), body)
        })
        .collect();

    let base = lines.iter().map(|(width, _)| *width).min().unwrap_or(0);
    let unit = lines
        .iter()
        .map(|(width, _)| width - base)
        .filter(|step| *step > 0)
        .min();

    lines
        .iter()
        .map(|(width, body)| {
            let depth = unit.map_or(0, |unit| (width - base) / unit);
            format!("{}{}", "\t".repeat(depth), body)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Full-line `//` comments and `# ` shell, Python or GraphQL comments
fn is_line_comment(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("//") || trimmed == "#" || trimmed.starts_with("# ")
}

fn indent_width(indent: &str) -> usize {
    indent
        .chars()
        .map(|c| if c == '\t' { TAB_WIDTH } else { 1 })
        .sum()
}

/// Remove `/* ... */` comments and `"""` docstrings.
///
/// A `/*` only opens a comment at line start or after whitespace, so globs
/// such as `src/**/*.ts` inside strings survive.
fn strip_delimited_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    loop {
        let block = find_block_open(rest).map(|i| (i, "/*", "*/"));
        let doc = rest.find("\"\"\"").map(|i| (i, "\"\"\"", "\"\"\""));

        let (open, opener, close) = match (block, doc) {
            (Some(b), Some(d)) => {
                if b.0 <= d.0 {
                    b
                } else {
                    d
                }
            }
            (Some(b), None) => b,
            (None, Some(d)) => d,
            (None, None) => break,
        };

        out.push_str(&rest[..open]);
        let body_start = open + opener.len();

        match rest[body_start..].find(close) {
            Some(end) => rest = &rest[body_start + end + close.len()..],
            None => {
                // Unterminated: keep the remainder as is
                out.push_str(&rest[open..]);
                return out;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Byte offset of the first `/*` at line start or after whitespace
fn find_block_open(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    text.match_indices("/*")
        .map(|(i, _)| i)
        .find(|&i| i == 0 || matches!(bytes[i - 1], b' ' | b'\t' | b'\n' | b'\r'))
}
