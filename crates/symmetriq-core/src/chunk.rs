//! Fixed-window text chunker with overlap.
//!
//! Splits corpus text into [`Segment`]s of at most `max_chunk_size`
//! characters, where consecutive segments share `overlap` characters so
//! that a sentence straddling a boundary is still retrievable from one side.
//!
//! # Algorithm
//!
//! 1. Reject `max_chunk_size == 0` and `overlap >= max_chunk_size`.
//! 2. Measure the text in chars (Unicode scalar values), so a window never
//!    cuts a multi-byte UTF-8 sequence.
//! 3. Emit the window `[start, start + max_chunk_size)`, clamped to the end
//!    of the text.
//! 4. Stop once a window reaches the end; otherwise advance `start` by
//!    `max_chunk_size - overlap` and repeat.
//!
//! For a text of `L` chars with `L > overlap` this produces
//! `ceil((L - overlap) / (max_chunk_size - overlap))` segments. Shorter
//! non-empty texts produce one segment; empty text produces none.
//!
//! # Example
//!
//! ```rust
//! use symmetriq_core::chunk::split;
//!
//! let segments = split("abcdefghij", 4, 1).unwrap();
//! let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
//! assert_eq!(texts, ["abcd", "defg", "ghij"]);
//! ```

use crate::error::{RagError, Result};
use crate::models::Segment;

/// Split `text` into overlapping windows of at most `max_chunk_size` chars.
///
/// Segment indices are contiguous from 0. The output is a pure function of
/// the inputs.
///
/// # Errors
///
/// [`RagError::InputValidation`] naming `chunk_size` or `chunk_overlap`
/// when the parameters are out of range.
pub fn split(text: &str, max_chunk_size: usize, overlap: usize) -> Result<Vec<Segment>> {
    if max_chunk_size == 0 {
        return Err(RagError::invalid("chunk_size", "must be > 0"));
    }
    if overlap >= max_chunk_size {
        return Err(RagError::invalid(
            "chunk_overlap",
            format!(
                "{} must be smaller than chunk_size ({})",
                overlap, max_chunk_size
            ),
        ));
    }
    if text.is_empty() {
        return Ok(Vec::new());
    }

    // Byte offset of every char start, plus the end of the text.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_count = bounds.len() - 1;
    let step = max_chunk_size - overlap;

    let mut segments = Vec::with_capacity(char_count.div_ceil(step));
    let mut start = 0;
    loop {
        let end = (start + max_chunk_size).min(char_count);
        segments.push(Segment::new(segments.len(), &text[bounds[start]..bounds[end]]));
        if end == char_count {
            break;
        }
        start += step;
    }

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconstruct(segments: &[Segment], overlap: usize) -> String {
        let mut out = String::new();
        for (i, s) in segments.iter().enumerate() {
            if i == 0 {
                out.push_str(&s.text);
            } else {
                out.extend(s.text.chars().skip(overlap));
            }
        }
        out
    }

    #[test]
    fn test_empty_text() {
        let segments = split("", 500, 50).unwrap();
        assert!(segments.is_empty());
    }

    #[test]
    fn test_small_text_single_segment() {
        let segments = split("Hello, world!", 500, 50).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].index, 0);
        assert_eq!(segments[0].text, "Hello, world!");
    }

    #[test]
    fn test_text_shorter_than_overlap() {
        let segments = split("abc", 10, 5).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "abc");
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        match split("abc", 0, 0) {
            Err(RagError::InputValidation { field, .. }) => assert_eq!(field, "chunk_size"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_overlap_not_smaller_than_size_rejected() {
        for overlap in [10, 11] {
            match split("abc", 10, overlap) {
                Err(RagError::InputValidation { field, .. }) => {
                    assert_eq!(field, "chunk_overlap")
                }
                other => panic!("expected validation error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_segment_count_matches_formula() {
        for m in 1..12usize {
            for o in 0..m {
                for len in (o + 1)..40 {
                    let text: String = (0..len)
                        .map(|i| (b'a' + (i % 26) as u8) as char)
                        .collect();
                    let segments = split(&text, m, o).unwrap();
                    let expected = (len - o).div_ceil(m - o);
                    assert_eq!(
                        segments.len(),
                        expected,
                        "len={} size={} overlap={}",
                        len,
                        m,
                        o
                    );
                    for s in &segments {
                        assert!(s.text.chars().count() <= m);
                    }
                    assert_eq!(reconstruct(&segments, o), text);
                }
            }
        }
    }

    #[test]
    fn test_indices_contiguous() {
        let text = "x".repeat(2_000);
        let segments = split(&text, 500, 50).unwrap();
        for (i, s) in segments.iter().enumerate() {
            assert_eq!(s.index, i, "Index mismatch at position {}", i);
        }
    }

    #[test]
    fn test_overlap_shared_between_neighbours() {
        let segments = split("0123456789", 4, 2).unwrap();
        let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, ["0123", "2345", "4567", "6789"]);
    }

    #[test]
    fn test_multibyte_utf8_chars() {
        let text = "┌──────┐\n│ 蛋白质 │\n└──────┘";
        let segments = split(text, 3, 1).unwrap();
        assert!(!segments.is_empty());
        for s in &segments {
            assert!(s.text.chars().count() <= 3);
        }
        assert_eq!(reconstruct(&segments, 1), text);
    }

    #[test]
    fn test_deterministic() {
        let text = "Alpha\n\nBeta\n\nGamma\n\nDelta";
        let a = split(text, 8, 3).unwrap();
        let b = split(text, 8, 3).unwrap();
        assert_eq!(a, b);
    }
}
