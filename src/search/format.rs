//! Plain-text rendering of search results
//!
//! Each block renders as a `start:end:path` header line followed by its text;
//! blocks are separated by a blank line. When ranking dropped blocks, a
//! trailer says how many were shown.

use crate::search::compact::compact_code;
use crate::search::{Block, SearchOutcome};

/// `start:end:path`, with score and match details appended in debug mode
pub fn format_header(block: &Block, debug: bool) -> String {
    let header = format!(
        "{}:{}:{}",
        block.start_line,
        block.end_line,
        block.file.path.display()
    );

    if debug {
        format!(
            "{header} (score: {}, symbol: {}, offset: {}, order: {})",
            block.score, block.symbol, block.offset, block.file.order
        )
    } else {
        header
    }
}

/// Block text as displayed, compacted on request
pub fn block_body(block: &Block, compact: bool) -> String {
    if compact {
        compact_code(&block.text)
    } else {
        block.text.clone()
    }
}

/// Note appended when `shown` of `total` blocks are displayed
pub fn truncation_trailer(shown: usize, total: usize) -> Option<String> {
    (total > shown).then(|| {
        format!(
            "[Showing {shown} of {total} matches. Narrow the symbols or raise the limit to see more.]"
        )
    })
}

/// Render a whole outcome as the response string
pub fn format_outcome(outcome: &SearchOutcome, debug: bool, compact: bool) -> String {
    let mut sections: Vec<String> = outcome
        .blocks
        .iter()
        .map(|block| format!("{}\n{}", format_header(block, debug), block_body(block, compact)))
        .collect();

    if let Some(trailer) = truncation_trailer(outcome.blocks.len(), outcome.total) {
        sections.push(trailer);
    }

    sections.join("\n\n")
}
