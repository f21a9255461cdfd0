//! Byte-budget text chunker.
//!
//! Splits text into ordered [`TextChunk`]s under a caller-specified byte
//! budget. Split points always fall on UTF-8 character boundaries, prefer
//! the last newline (else the last whitespace) inside the budget window,
//! and fall back to a hard split when a contiguous run exceeds the budget.
//!
//! The chunking is lossless and deterministic: concatenating the chunks in
//! order reproduces the input exactly, and identical input plus budget
//! always yields identical boundaries. Both the PII screener and the
//! summarization invoker rely on this to reconcile offsets across passes.

use crate::models::TextChunk;

/// Split `text` into ordered chunks of at most `max_chunk_bytes` bytes.
///
/// Chunks record their byte offset into `text`. Empty input yields no
/// chunks. A chunk may exceed the budget only when a single code point is
/// wider than `max_chunk_bytes`, since splitting inside a code point is
/// never allowed.
///
/// The budget must be positive (configuration validation enforces this for
/// the pipeline's budgets); debug builds assert, release builds raise a
/// zero budget to one byte so the loop always advances.
pub fn chunk_text(text: &str, max_chunk_bytes: usize) -> Vec<TextChunk> {
    debug_assert!(max_chunk_bytes > 0, "chunk budget must be positive");
    let budget = max_chunk_bytes.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let remaining = &text[start..];
        if remaining.len() <= budget {
            chunks.push(TextChunk {
                offset: start,
                text: remaining.to_string(),
            });
            break;
        }

        let mut end = snap_to_char_boundary(remaining, budget);
        if end == 0 {
            // Single code point wider than the budget; take it whole.
            end = remaining
                .char_indices()
                .nth(1)
                .map(|(i, _)| i)
                .unwrap_or(remaining.len());
        } else {
            end = preferred_split(&remaining[..end]).unwrap_or(end);
        }

        chunks.push(TextChunk {
            offset: start,
            text: remaining[..end].to_string(),
        });
        start += end;
    }

    chunks
}

/// Split after the last newline in the window, else after the last
/// whitespace. Returns `None` when the window contains no whitespace,
/// in which case the caller hard-splits at the byte limit.
fn preferred_split(window: &str) -> Option<usize> {
    let pos = window
        .rfind('\n')
        .or_else(|| window.rfind(|c: char| c.is_whitespace()))?;
    // Split after the whitespace so it stays with the leading chunk.
    let ws_len = window[pos..].chars().next().map_or(1, |c| c.len_utf8());
    Some(pos + ws_len)
}

/// Snap a byte index back to the nearest valid UTF-8 char boundary.
fn snap_to_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reassemble(chunks: &[TextChunk]) -> String {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn concatenation_reproduces_input() {
        let text = "The quick brown fox jumps over the lazy dog. \
                    Pack my box with five dozen liquor jugs.\n\
                    Sphinx of black quartz, judge my vow.";
        for budget in [1, 2, 7, 16, 64, 1024] {
            let chunks = chunk_text(text, budget);
            assert_eq!(reassemble(&chunks), text, "budget {}", budget);
        }
    }

    #[test]
    fn offsets_index_into_parent() {
        let text = "alpha beta gamma delta epsilon";
        let chunks = chunk_text(text, 12);
        for chunk in &chunks {
            assert_eq!(&text[chunk.offset..chunk.offset + chunk.text.len()], chunk.text);
        }
    }

    #[test]
    fn splits_on_char_boundaries_only() {
        let text = "héllo wörld ñandú 日本語テキスト";
        for budget in 1..=text.len() {
            let chunks = chunk_text(text, budget);
            assert_eq!(reassemble(&chunks), text);
            for chunk in &chunks {
                assert!(text.is_char_boundary(chunk.offset));
                assert!(text.is_char_boundary(chunk.offset + chunk.text.len()));
            }
        }
    }

    #[test]
    fn prefers_whitespace_boundary() {
        let text = "one two three";
        let chunks = chunk_text(text, 9);
        assert_eq!(chunks[0].text, "one two ");
        assert_eq!(chunks[1].text, "three");
    }

    #[test]
    fn prefers_newline_over_space() {
        let text = "first line\nsecond one here";
        let chunks = chunk_text(text, 18);
        assert_eq!(chunks[0].text, "first line\n");
    }

    #[test]
    fn hard_splits_unbroken_run() {
        let text = "abcdefghijklmnop";
        let chunks = chunk_text(text, 4);
        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(|c| c.text.len() == 4));
        assert_eq!(reassemble(&chunks), text);
    }

    #[test]
    fn budget_of_one_with_multibyte_chars() {
        let text = "日本";
        let chunks = chunk_text(text, 1);
        // Each code point is 3 bytes; the budget cannot split inside one.
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "日");
        assert_eq!(chunks[1].text, "本");
        assert_eq!(chunks[1].offset, 3);
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(chunk_text("", 100).is_empty());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "chunk budget must be positive")]
    fn zero_budget_asserts_in_debug_builds() {
        chunk_text("text", 0);
    }

    #[test]
    fn deterministic_boundaries() {
        let text = "alpha beta gamma delta epsilon zeta eta theta";
        let first = chunk_text(text, 11);
        let second = chunk_text(text, 11);
        assert_eq!(first, second);
    }
}
