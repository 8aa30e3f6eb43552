//! Highlight synchronizer: sentence index ⇄ text position.
//!
//! The host renders the active unit with a marker and everything else
//! verbatim, and turns a click position into a sentence index for seeking.
//! All offsets are byte offsets into the text the units were computed from.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::NarrationError;
use crate::segment::SentenceUnit;

/// Byte range of unit `index`.
pub fn range_for_index(units: &[SentenceUnit], index: usize) -> Result<Range<usize>, NarrationError> {
    units
        .get(index)
        .map(SentenceUnit::range)
        .ok_or(NarrationError::SeekOutOfRange {
            index,
            count: units.len(),
        })
}

/// Index of the unit containing byte `offset`.
///
/// An offset equal to the text length (a caret after the last character)
/// maps to the last unit. Offsets beyond that, or any offset when `units` is
/// empty, map to `None`.
#[must_use]
pub fn index_for_offset(units: &[SentenceUnit], offset: usize) -> Option<usize> {
    let last = units.last()?;
    if offset == last.end {
        return Some(last.index);
    }
    // Units are sorted and contiguous: the first unit ending past `offset`
    // is the one containing it.
    let position = units.partition_point(|unit| unit.end <= offset);
    units
        .get(position)
        .filter(|unit| unit.contains(offset))
        .map(|unit| unit.index)
}

/// The sentence the user last clicked into; consumed by the next `start()`
/// that does not name a start index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeekMark {
    pub sentence_index: usize,
}

impl SeekMark {
    #[must_use]
    pub const fn new(sentence_index: usize) -> Self {
        Self { sentence_index }
    }

    /// Mark the unit under a click at byte `offset`.
    #[must_use]
    pub fn from_offset(units: &[SentenceUnit], offset: usize) -> Option<Self> {
        index_for_offset(units, offset).map(Self::new)
    }
}

/// A run of text to render, either the active sentence or plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightSpan<'a> {
    pub text: &'a str,
    pub range: Range<usize>,
    pub active: bool,
}

/// Split `text` into at most three spans: before, active unit, after.
///
/// With no active unit (or an index out of range) the whole text is a single
/// inactive span. Span texts concatenate to `text` exactly.
#[must_use]
pub fn highlight_spans<'a>(
    text: &'a str,
    units: &[SentenceUnit],
    active: Option<usize>,
) -> Vec<HighlightSpan<'a>> {
    let span = |range: Range<usize>, active: bool| HighlightSpan {
        text: &text[range.clone()],
        range,
        active,
    };

    let Some(unit) = active.and_then(|i| units.get(i)) else {
        return if text.is_empty() {
            Vec::new()
        } else {
            vec![span(0..text.len(), false)]
        };
    };

    let mut spans = Vec::with_capacity(3);
    if unit.start > 0 {
        spans.push(span(0..unit.start, false));
    }
    spans.push(span(unit.range(), true));
    if unit.end < text.len() {
        spans.push(span(unit.end..text.len(), false));
    }
    spans
}

/// Render `text` with the active unit wrapped in `open`/`close` markers.
///
/// Whitespace is preserved exactly; removing the markers gives back `text`.
#[must_use]
pub fn render_highlighted(
    text: &str,
    units: &[SentenceUnit],
    active: Option<usize>,
    open: &str,
    close: &str,
) -> String {
    let mut out = String::with_capacity(text.len() + open.len() + close.len());
    for span in highlight_spans(text, units, active) {
        if span.active {
            out.push_str(open);
            out.push_str(span.text);
            out.push_str(close);
        } else {
            out.push_str(span.text);
        }
    }
    out
}
