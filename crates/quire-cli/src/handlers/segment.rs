//! Segment command handler.
//!
//! Prints the sentence units the narrator would read, one per line, or as
//! JSON for tooling.

use anyhow::Result;
use quire_voice::{SentenceUnit, collapse_whitespace, segment};

use super::read_text;
use crate::commands::SegmentArgs;
use crate::presentation::{print_separator, truncate_string};

const PREVIEW_CHARS: usize = 70;

/// Execute the segment command.
pub fn execute(args: &SegmentArgs) -> Result<()> {
    let text = read_text(&args.file)?;
    let units = segment(&text);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&units)?);
        return Ok(());
    }

    if units.is_empty() {
        println!("No sentences found in {}.", args.file.display());
        return Ok(());
    }

    println!("Found {} sentence(s):\n", units.len());
    println!("{:>5} {:>15}  Text", "Index", "Bytes");
    print_separator(95);
    for unit in &units {
        println!("{}", format_unit(&text, unit));
    }
    Ok(())
}

fn format_unit(text: &str, unit: &SentenceUnit) -> String {
    let range = format!("{}..{}", unit.start, unit.end);
    format!(
        "{:>5} {:>15}  {}",
        unit.index,
        range,
        truncate_string(&collapse_whitespace(unit.slice(text)), PREVIEW_CHARS)
    )
}
