//! Oversized text splitting.
//!
//! Uses the text-splitter crate to find the semantic sub-boundary
//! (sentence or word break) nearest a character limit. The returned cut
//! is a byte index, so callers keep exact sub-ranges into the original
//! text and no content is lost between head and remainder.

use text_splitter::TextSplitter;

/// Find the byte index at which to split `text` so the head stays within
/// `max_chars` characters, preferring the semantic boundary nearest the
/// limit. Returns a cut strictly inside the text when the text exceeds
/// the limit; callers only invoke this when a split is required.
pub(crate) fn split_point(text: &str, max_chars: usize) -> usize {
    let max_chars = max_chars.max(1);

    let splitter = TextSplitter::new(max_chars);
    let mut indices = splitter.chunk_indices(text);
    let first = indices.next();
    let second = indices.next();

    let mut cut = match (first, second) {
        // The second chunk's offset marks the boundary; whitespace
        // between the semantic chunks stays with the head.
        (Some(_), Some((offset, _))) => offset,
        _ => text.len(),
    };

    // Boundary-free text (or trimming artifacts) can leave the head over
    // the limit; clamp to a hard character cut.
    cut = clamp_to_chars(text, cut, max_chars);

    // Guarantee forward progress even for degenerate inputs
    if cut == 0 {
        cut = text
            .char_indices()
            .nth(1)
            .map(|(i, _)| i)
            .unwrap_or(text.len());
    }

    cut
}

/// Clamp a byte cut so the head holds at most `max_chars` characters.
fn clamp_to_chars(text: &str, cut: usize, max_chars: usize) -> usize {
    let head_chars = text[..cut].chars().count();
    if head_chars <= max_chars {
        return cut;
    }

    text.char_indices()
        .nth(max_chars)
        .map(|(i, _)| i)
        .unwrap_or(cut)
}
