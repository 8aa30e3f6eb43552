//! Sentence segmentation.
//!
//! Splits document text into [`SentenceUnit`]s: contiguous byte ranges that
//! partition the text. A boundary is a terminal mark (`.`, `!`, `?`)
//! followed by whitespace and then an uppercase letter, or by whitespace that
//! runs to the end of the document. Each unit keeps its trailing whitespace,
//! so concatenating the unit slices gives back the original text byte for
//! byte.
//!
//! The rule is a heuristic: abbreviations such as "Mr. Smith" split after
//! "Mr.", and a terminal mark inside closing quotes (`."`) never splits.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// One sentence of the source text, the atomic unit of synthesis and playback.
///
/// Offsets are byte positions into the text snapshot the unit was computed
/// from and always fall on `char` boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentenceUnit {
    /// Position of the unit in playback order.
    pub index: usize,

    /// Byte offset of the first byte of the unit.
    pub start: usize,

    /// Byte offset one past the last byte of the unit.
    pub end: usize,
}

impl SentenceUnit {
    /// Byte range of the unit.
    #[must_use]
    pub const fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Length of the unit in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `offset` falls inside this unit.
    #[must_use]
    pub const fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// The unit's slice of `text`.
    ///
    /// # Panics
    ///
    /// Panics if `text` is not the snapshot the unit was computed from and
    /// the range falls outside it or off a `char` boundary.
    #[must_use]
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.range()]
    }
}

/// Split `text` into sentence units.
///
/// Returns an empty list for empty or whitespace-only input. Text without any
/// boundary is a single unit.
#[must_use]
pub fn segment(text: &str) -> Vec<SentenceUnit> {
    let mut ranges: Vec<Range<usize>> = Vec::new();
    let mut unit_start = 0;

    for end in boundaries(text) {
        ranges.push(unit_start..end);
        unit_start = end;
    }
    if unit_start < text.len() {
        ranges.push(unit_start..text.len());
    }

    merge_blank_ranges(text, ranges)
        .into_iter()
        .enumerate()
        .map(|(index, range)| SentenceUnit {
            index,
            start: range.start,
            end: range.end,
        })
        .collect()
}

/// Byte offsets at which a new sentence begins.
///
/// An offset equal to `text.len()` is never produced; a trailing boundary is
/// implied by the end of the text.
fn boundaries(text: &str) -> Vec<usize> {
    let mut found = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if !is_terminal(c) {
            continue;
        }

        // At least one whitespace char must follow the mark.
        let mut saw_space = false;
        while let Some(&(_, next)) = chars.peek() {
            if !next.is_whitespace() {
                break;
            }
            saw_space = true;
            chars.next();
        }
        if !saw_space {
            continue;
        }

        // Whitespace running to the end of the document closes the last
        // unit implicitly.
        if let Some(&(offset, next)) = chars.peek() {
            if next.is_uppercase() {
                found.push(offset);
            }
        }
    }

    found
}

const fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// Fold whitespace-only ranges into a neighbour so the ranges still
/// partition the text. A blank range joins the previous one, or the next one
/// when it is first. If every range is blank, nothing is speakable.
fn merge_blank_ranges(text: &str, ranges: Vec<Range<usize>>) -> Vec<Range<usize>> {
    let mut merged: Vec<Range<usize>> = Vec::with_capacity(ranges.len());
    let mut leading_blank: Option<usize> = None;

    for range in ranges {
        let blank = text[range.clone()].trim().is_empty();
        match (blank, merged.last_mut()) {
            (true, Some(previous)) => previous.end = range.end,
            (true, None) => {
                leading_blank.get_or_insert(range.start);
            }
            (false, _) => {
                let start = leading_blank.take().unwrap_or(range.start);
                merged.push(start..range.end);
            }
        }
    }

    merged
}
