//! Recursive character text chunking
//!
//! Splits on the coarsest separator present (paragraphs, then lines, then
//! words), recursively re-splitting oversized pieces, and merges adjacent
//! pieces into chunks of at most `chunk_size` characters with `chunk_overlap`
//! characters carried over between consecutive chunks.

use std::collections::VecDeque;

use crate::types::{Chunk, ChunkSource, Document};
use super::parser::ParsedDocument;

/// Separator hierarchy, coarsest first; the empty separator is the final
/// fallback and cuts at fixed-size character windows.
const SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

/// Text chunker with configurable size and overlap
pub struct TextChunker {
    /// Target chunk size in characters
    chunk_size: usize,
    /// Overlap between chunks
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker
    ///
    /// The overlap is clamped below the chunk size.
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        let overlap = if overlap >= chunk_size {
            tracing::warn!(
                chunk_size,
                overlap,
                "chunk overlap must be smaller than chunk size, clamping"
            );
            chunk_size / 2
        } else {
            overlap
        };

        Self {
            chunk_size,
            overlap,
        }
    }

    /// Chunk a parsed document, tracking character offsets for each chunk
    pub fn chunk_document(&self, doc: &Document, parsed: &ParsedDocument) -> Vec<Chunk> {
        let text = &parsed.content;
        let pieces = self.split_text(text);

        let mut chunks = Vec::with_capacity(pieces.len());
        let mut search_from = 0usize;

        for (i, piece) in pieces.into_iter().enumerate() {
            // Pieces are substrings of the input and appear in order; overlap
            // means the next piece can start before the previous one ends, so
            // the search window only advances past the previous start.
            let start = text[search_from..]
                .find(piece.as_str())
                .map(|p| search_from + p)
                .unwrap_or(search_from);
            let end = start + piece.len();

            let mut next = start + 1;
            while next < text.len() && !text.is_char_boundary(next) {
                next += 1;
            }
            search_from = next.min(text.len());

            let source = ChunkSource {
                filename: doc.filename.clone(),
                page_number: None,
            };

            chunks.push(Chunk::new(doc.id, piece, source, start, end, i as u32));
        }

        chunks
    }

    /// Split raw text into chunk-sized pieces
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, SEPARATORS)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        // First separator that occurs in the text wins; the empty separator
        // always matches.
        let mut separator = "";
        let mut remaining: &[&str] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() || text.contains(sep) {
                separator = sep;
                remaining = &separators[i + 1..];
                break;
            }
        }

        if separator.is_empty() {
            return self.window_split(text);
        }

        let mut final_chunks = Vec::new();
        let mut good: Vec<&str> = Vec::new();

        for piece in text.split(separator) {
            if piece.len() < self.chunk_size {
                good.push(piece);
                continue;
            }

            // Oversized piece: flush what we have, then re-split it with the
            // finer separators.
            if !good.is_empty() {
                final_chunks.extend(self.merge_pieces(&good, separator));
                good.clear();
            }

            if remaining.is_empty() {
                final_chunks.push(piece.to_string());
            } else {
                final_chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !good.is_empty() {
            final_chunks.extend(self.merge_pieces(&good, separator));
        }

        final_chunks
    }

    /// Greedily merge small pieces into chunks, carrying overlap between them
    fn merge_pieces(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let sep_len = separator.len();
        let joined_len =
            |sum: usize, count: usize| sum + count.saturating_sub(1) * sep_len;

        let mut chunks = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut sum = 0usize;

        for &piece in pieces {
            let added_sep = if current.is_empty() { 0 } else { sep_len };

            if joined_len(sum, current.len()) + piece.len() + added_sep > self.chunk_size
                && !current.is_empty()
            {
                if let Some(chunk) = join_trimmed(&current, separator) {
                    chunks.push(chunk);
                }

                // Shrink the window from the front until it fits the overlap
                // budget and leaves room for the incoming piece.
                loop {
                    let total = joined_len(sum, current.len());
                    let added_sep = if current.is_empty() { 0 } else { sep_len };
                    let keep_shrinking = total > self.overlap
                        || (total + piece.len() + added_sep > self.chunk_size && total > 0);

                    if !keep_shrinking {
                        break;
                    }
                    match current.pop_front() {
                        Some(first) => sum -= first.len(),
                        None => break,
                    }
                }
            }

            current.push_back(piece);
            sum += piece.len();
        }

        if let Some(chunk) = join_trimmed(&current, separator) {
            chunks.push(chunk);
        }

        chunks
    }

    /// Fallback for text with no usable separators: fixed-size character
    /// windows with overlap
    fn window_split(&self, text: &str) -> Vec<String> {
        let step = self.chunk_size.saturating_sub(self.overlap).max(1);
        let boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        let n_chars = boundaries.len();

        let mut out = Vec::new();
        let mut start = 0usize;

        while start < n_chars {
            let end = (start + self.chunk_size).min(n_chars);
            let start_byte = boundaries[start];
            let end_byte = if end == n_chars {
                text.len()
            } else {
                boundaries[end]
            };

            let piece = text[start_byte..end_byte].trim();
            if !piece.is_empty() {
                out.push(piece.to_string());
            }

            if end == n_chars {
                break;
            }
            start += step;
        }

        out
    }
}

/// Join pieces with the separator and trim; None when nothing remains
fn join_trimmed(pieces: &VecDeque<&str>, separator: &str) -> Option<String> {
    if pieces.is_empty() {
        return None;
    }
    let joined = pieces
        .iter()
        .copied()
        .collect::<Vec<_>>()
        .join(separator);
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Document;

    fn parsed(content: &str) -> ParsedDocument {
        ParsedDocument {
            content: content.to_string(),
            content_hash: "hash".to_string(),
            total_pages: Some(1),
        }
    }

    fn doc() -> Document {
        Document::new("report.pdf".to_string(), "hash".to_string(), 0)
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunker = TextChunker::new(800, 150);
        let chunks = chunker.split_text("A short paragraph of text.");
        assert_eq!(chunks, vec!["A short paragraph of text.".to_string()]);
    }

    #[test]
    fn chunks_respect_the_size_limit() {
        let chunker = TextChunker::new(100, 20);
        let words: Vec<String> = (0..200).map(|i| format!("word{:03}", i)).collect();
        let text = words.join(" ");

        let chunks = chunker.split_text(&text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= 100, "chunk too large: {}", chunk.len());
        }
    }

    #[test]
    fn consecutive_chunks_overlap() {
        let chunker = TextChunker::new(100, 30);
        let words: Vec<String> = (0..100).map(|i| format!("word{:03}", i)).collect();
        let text = words.join(" ");

        let chunks = chunker.split_text(&text);
        assert!(chunks.len() > 1);

        for pair in chunks.windows(2) {
            let first_word = pair[1].split(' ').next().unwrap();
            assert!(
                pair[0].contains(first_word),
                "no overlap between '{}' and '{}'",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn paragraph_boundaries_are_preferred() {
        let chunker = TextChunker::new(40, 0);
        let text = "First paragraph, fairly short.\n\nSecond paragraph, also short.";
        let chunks = chunker.split_text(text);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "First paragraph, fairly short.");
        assert_eq!(chunks[1], "Second paragraph, also short.");
    }

    #[test]
    fn unbroken_text_is_window_split() {
        let chunker = TextChunker::new(50, 10);
        let text = "x".repeat(200);
        let chunks = chunker.split_text(&text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= 50);
        }
    }

    #[test]
    fn multibyte_text_does_not_panic() {
        let chunker = TextChunker::new(40, 10);
        let text = "日本語のテキスト ".repeat(30);
        let chunks = chunker.split_text(&text);
        assert!(!chunks.is_empty());
    }

    #[test]
    fn chunk_offsets_point_into_the_document() {
        let chunker = TextChunker::new(100, 20);
        let words: Vec<String> = (0..80).map(|i| format!("word{:03}", i)).collect();
        let text = words.join(" ");

        let parsed = parsed(&text);
        let doc = doc();
        let chunks = chunker.chunk_document(&doc, &parsed);

        assert!(!chunks.is_empty());
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i as u32);
            assert_eq!(chunk.document_id, doc.id);
            assert_eq!(&text[chunk.char_start..chunk.char_end], chunk.content);
        }
    }

    #[test]
    fn oversized_overlap_is_clamped() {
        // must not loop forever or panic
        let chunker = TextChunker::new(50, 50);
        let text = "word ".repeat(100);
        let chunks = chunker.split_text(&text);
        assert!(!chunks.is_empty());
    }

    #[test]
    fn whitespace_only_text_produces_no_chunks() {
        let chunker = TextChunker::new(800, 150);
        assert!(chunker.split_text("  \n\n   \n ").is_empty());
    }
}
