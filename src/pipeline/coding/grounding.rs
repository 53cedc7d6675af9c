//! Evidence span grounding.
//!
//! Maps each quotation the model claims to support a code onto an exact,
//! non-overlapping character range of the note. Claims are resolved in order,
//! so an earlier claim has priority over contested text. Matching is literal
//! (exact, then case-insensitive) over a fixed list of candidates that only
//! strip quoting and trailing punctuation. Nothing fuzzier is attempted: a
//! claim that cannot be found is kept with sentinel offsets.

use std::ops::Range;

use super::types::{EvidenceSpanClaim, GroundedEvidenceSpan};

/// Quotation marks the model wraps quotes in.
pub const QUOTE_CHARS: &[char] = &[
    '"', '\'', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}', '\u{00AB}', '\u{00BB}',
    '\u{2039}', '\u{203A}', '\u{201E}', '\u{201F}',
];

/// Sentence punctuation the model appends to quotes.
pub const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?'];

/// A note with its character boundaries precomputed.
///
/// Searches run on byte offsets at char boundaries; offsets handed to callers
/// count characters.
pub struct NoteIndex<'a> {
    note: &'a str,
    /// Byte offset of every char, plus `note.len()`.
    boundaries: Vec<usize>,
}

impl<'a> NoteIndex<'a> {
    pub fn new(note: &'a str) -> Self {
        let boundaries = note
            .char_indices()
            .map(|(offset, _)| offset)
            .chain(std::iter::once(note.len()))
            .collect();
        Self { note, boundaries }
    }

    pub fn note(&self) -> &'a str {
        self.note
    }

    fn char_offset(&self, byte: usize) -> usize {
        self.boundaries.partition_point(|&boundary| boundary < byte)
    }

    fn next_boundary(&self, byte: usize) -> usize {
        let index = self.char_offset(byte);
        self.boundaries
            .get(index + 1)
            .copied()
            .unwrap_or(self.note.len() + 1)
    }
}

/// Grounds the claims of one code entry.
///
/// Ranges allocated here are private to this grounder; a new grounder starts
/// with nothing allocated.
pub struct SpanGrounder<'n, 'a> {
    index: &'n NoteIndex<'a>,
    used_ranges: Vec<Range<usize>>,
}

impl<'n, 'a> SpanGrounder<'n, 'a> {
    pub fn new(index: &'n NoteIndex<'a>) -> Self {
        Self {
            index,
            used_ranges: Vec::new(),
        }
    }

    /// Ground one claim. `None` if the claim is blank.
    pub fn ground(&mut self, claim: &EvidenceSpanClaim) -> Option<GroundedEvidenceSpan> {
        let trimmed = claim.text.trim();
        if trimmed.is_empty() {
            return None;
        }
        let explanation = claim.explanation.trim();

        let located = span_candidates(trimmed)
            .iter()
            .find_map(|candidate| self.locate(candidate));

        let Some(range) = located else {
            tracing::warn!(claim = %trimmed, "Could not align evidence span");
            return Some(GroundedEvidenceSpan::ungrounded(trimmed, explanation));
        };

        let span = GroundedEvidenceSpan {
            text: self.index.note[range.clone()].to_string(),
            start: self.index.char_offset(range.start) as i64,
            end: self.index.char_offset(range.end) as i64,
            explanation: explanation.to_string(),
        };
        self.used_ranges.push(range);
        Some(span)
    }

    /// Exact search, then case-insensitive search.
    fn locate(&self, snippet: &str) -> Option<Range<usize>> {
        self.find_exact(snippet)
            .or_else(|| self.find_ignore_case(snippet))
    }

    /// Leftmost occurrence that does not overlap an allocated range. After an
    /// overlapping hit the scan resumes one char past its start, so adjacent
    /// repeats stay reachable.
    fn find_exact(&self, snippet: &str) -> Option<Range<usize>> {
        let note = self.index.note;
        let mut from = 0;
        while from <= note.len() {
            let start = from + note[from..].find(snippet)?;
            let range = start..start + snippet.len();
            if !self.overlaps(&range) {
                return Some(range);
            }
            from = self.index.next_boundary(start);
        }
        None
    }

    fn find_ignore_case(&self, snippet: &str) -> Option<Range<usize>> {
        let note = self.index.note;
        self.index
            .boundaries
            .iter()
            .copied()
            .filter(|&start| start < note.len())
            .filter_map(|start| {
                match_ignore_case(&note[start..], snippet).map(|len| start..start + len)
            })
            .find(|range| !self.overlaps(range))
    }

    fn overlaps(&self, range: &Range<usize>) -> bool {
        self.used_ranges
            .iter()
            .any(|used| range.start < used.end && used.start < range.end)
    }
}

/// Byte length of the prefix of `haystack` matching `needle` char-for-char,
/// ignoring case.
fn match_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    let mut consumed = 0;
    let mut hay = haystack.chars();
    for expected in needle.chars() {
        let actual = hay.next()?;
        if actual != expected && !actual.to_lowercase().eq(expected.to_lowercase()) {
            return None;
        }
        consumed += actual.len_utf8();
    }
    Some(consumed)
}

/// Candidate spellings of a claim, most faithful first, without duplicates:
/// the claim, quotes stripped, quotes and trailing punctuation stripped,
/// leading quote dropped, trailing quote dropped.
pub fn span_candidates(snippet: &str) -> Vec<String> {
    let cleaned = snippet.trim();
    let mut candidates: Vec<String> = Vec::new();
    if cleaned.is_empty() {
        return candidates;
    }

    let mut add = |value: &str| {
        let value = value.trim();
        if !value.is_empty() && !candidates.iter().any(|c| c == value) {
            candidates.push(value.to_string());
        }
    };

    add(cleaned);

    let without_quotes = cleaned.trim_matches(|c: char| QUOTE_CHARS.contains(&c));
    add(without_quotes);
    add(without_quotes.trim_end_matches(|c: char| TRAILING_PUNCTUATION.contains(&c)));

    if let Some(first) = cleaned.chars().next().filter(|c| QUOTE_CHARS.contains(c)) {
        add(&cleaned[first.len_utf8()..]);
    }
    if let Some(last) = cleaned.chars().next_back().filter(|c| QUOTE_CHARS.contains(c)) {
        add(&cleaned[..cleaned.len() - last.len_utf8()]);
    }

    candidates
}

/// Ground one entry's claims in order. Blank claims produce no span.
pub fn ground_evidence_spans(
    index: &NoteIndex<'_>,
    claims: &[EvidenceSpanClaim],
) -> Vec<GroundedEvidenceSpan> {
    let mut grounder = SpanGrounder::new(index);
    claims
        .iter()
        .filter_map(|claim| grounder.ground(claim))
        .collect()
}
