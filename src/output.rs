//! Colored terminal rendering of search outcomes
//!
//! Produces exactly the text of [`format_outcome`](crate::search::format::format_outcome),
//! with the path, line range and trailer colored when writing to a terminal.

use crate::search::format::{block_body, truncation_trailer};
use crate::search::{Block, SearchOutcome};
use std::io;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Print an outcome to stdout
pub fn print_outcome(
    outcome: &SearchOutcome,
    debug: bool,
    compact: bool,
    color: bool,
) -> io::Result<()> {
    let choice = if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    let mut stdout = StandardStream::stdout(choice);
    write_outcome(&mut stdout, outcome, debug, compact)
}

/// Write an outcome to any color-capable writer
pub fn write_outcome<W: WriteColor>(
    out: &mut W,
    outcome: &SearchOutcome,
    debug: bool,
    compact: bool,
) -> io::Result<()> {
    for (i, block) in outcome.blocks.iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
            writeln!(out)?;
        }
        write_header(out, block, debug)?;
        writeln!(out)?;
        write!(out, "{}", block_body(block, compact))?;
    }

    if let Some(trailer) = truncation_trailer(outcome.blocks.len(), outcome.total) {
        writeln!(out)?;
        writeln!(out)?;
        out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
        write!(out, "{trailer}")?;
        out.reset()?;
    }

    writeln!(out)?;
    Ok(())
}

/// `start:end:path` with the line range green and the path magenta
fn write_header<W: WriteColor>(out: &mut W, block: &Block, debug: bool) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
    write!(out, "{}:{}", block.start_line, block.end_line)?;
    out.reset()?;
    write!(out, ":")?;

    out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)).set_bold(true))?;
    write!(out, "{}", block.file.path.display())?;
    out.reset()?;

    if debug {
        out.set_color(ColorSpec::new().set_dimmed(true))?;
        write!(
            out,
            " (score: {}, symbol: {}, offset: {}, order: {})",
            block.score, block.symbol, block.offset, block.file.order
        )?;
        out.reset()?;
    }

    Ok(())
}
