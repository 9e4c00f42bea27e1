//! Sentence-aware text chunking with overlap continuity.
//!
//! [`SentenceChunker`] turns normalized plain text into ordered, size-bounded
//! chunks that never cut a sentence in half. Lines are first converted into
//! *sentence units*: a short line, or one that does not end in terminal
//! punctuation, stays atomic (protecting headings, list items, and code),
//! while long prose lines are split at every `.`/`!`/`?` followed by
//! whitespace. Units are then greedily packed into chunks; whenever a chunk
//! fills up, the tail of it reseeds the next chunk so adjacent chunks share
//! context across the boundary.

use crate::types::RagError;

/// Lines shorter than this stay atomic even when they end in punctuation.
const ATOMIC_LINE_LIMIT: usize = 100;

const SENTENCE_ENDERS: [char; 3] = ['.', '!', '?'];

/// Deterministic, sentence-aware splitter.
///
/// Construction validates the size contract: `chunk_size` must be positive and
/// `overlap` strictly smaller than `chunk_size`. All lengths are Unicode
/// scalar counts, not bytes.
///
/// # Examples
///
/// ```
/// use ragmill::chunking::SentenceChunker;
///
/// let chunker = SentenceChunker::new(1000, 200).unwrap();
/// assert!(chunker.chunk("").is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct SentenceChunker {
    chunk_size: usize,
    overlap: usize,
}

impl SentenceChunker {
    /// Creates a chunker for the given size bound and overlap window.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, RagError> {
        if chunk_size == 0 {
            return Err(RagError::Validation(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(RagError::Validation(format!(
                "overlap ({overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    /// Configured chunk size bound in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Configured overlap window in characters.
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Splits `text` into ordered, trimmed, non-empty chunks.
    ///
    /// Chunk length is bounded by `chunk_size` except when a single
    /// indivisible sentence unit exceeds it; such a unit becomes its own
    /// oversized chunk rather than being truncated mid-sentence. Empty or
    /// whitespace-only input yields an empty vector. Output order is source
    /// order; chunks are never reordered.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let mut chunks = Vec::new();
        let mut buffer = String::new();

        for unit in sentence_units(text) {
            let buffered = char_len(&buffer);
            // +1 for the joining space written below.
            let incoming = char_len(&unit) + 1;
            if buffered > 0 && buffered + incoming > self.chunk_size {
                chunks.push(buffer.clone());
                buffer = self.overlap_seed(&buffer);
            }
            if !buffer.is_empty() {
                buffer.push(' ');
            }
            buffer.push_str(&unit);
        }

        if !buffer.is_empty() {
            chunks.push(buffer);
        }

        chunks
            .into_iter()
            .map(|chunk| chunk.trim().to_string())
            .filter(|chunk| !chunk.is_empty())
            .collect()
    }

    /// Builds the seed that carries trailing context into the next chunk.
    ///
    /// Takes the trailing `overlap` characters of the finalized chunk and
    /// re-splits them into sentence units. When more than one unit results the
    /// first (likely clipped) unit is dropped so the seed starts on a sentence
    /// boundary. When exactly one unit results the raw substring is reused
    /// verbatim, even if it starts mid-sentence — a quirk kept deliberately so
    /// the overlap window is never silently empty.
    fn overlap_seed(&self, finalized: &str) -> String {
        if self.overlap == 0 {
            return String::new();
        }
        let total = char_len(finalized);
        if total <= self.overlap {
            return finalized.to_string();
        }
        let tail: String = finalized.chars().skip(total - self.overlap).collect();
        let units = sentence_units(&tail);
        if units.len() > 1 {
            units[1..].join(" ")
        } else {
            tail
        }
    }
}

/// Converts text into sentence units, line by line.
///
/// Blank lines are discarded. A line shorter than [`ATOMIC_LINE_LIMIT`]
/// characters, or one that does not end in `.`/`!`/`?`, is kept whole.
/// Longer prose lines are split at each terminal mark that is followed by
/// whitespace or end-of-line; every piece keeps its punctuation.
fn sentence_units(text: &str) -> Vec<String> {
    let mut units = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let chars: Vec<char> = line.chars().collect();
        let ends_terminal = chars.last().is_some_and(|c| SENTENCE_ENDERS.contains(c));
        if chars.len() < ATOMIC_LINE_LIMIT || !ends_terminal {
            units.push(line.to_string());
            continue;
        }

        let mut current = String::new();
        for (i, &c) in chars.iter().enumerate() {
            current.push(c);
            if SENTENCE_ENDERS.contains(&c) {
                let at_end = i + 1 == chars.len();
                let before_whitespace = chars.get(i + 1).is_some_and(|n| n.is_whitespace());
                if at_end || before_whitespace {
                    let piece = current.trim();
                    if !piece.is_empty() {
                        units.push(piece.to_string());
                    }
                    current.clear();
                }
            }
        }
        let rest = current.trim();
        if !rest.is_empty() {
            units.push(rest.to_string());
        }
    }

    units
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_prose() -> String {
        // A single line well past the atomic limit so sentence splitting kicks in.
        "The quick brown fox jumps over the lazy dog near the river bank. \
         A second sentence follows with more detail about the crossing. \
         Finally a third sentence wraps the paragraph up neatly."
            .to_string()
    }

    #[test]
    fn empty_and_whitespace_input_yield_no_chunks() {
        let chunker = SentenceChunker::new(100, 20).unwrap();
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk("   \n\t  \n").is_empty());
    }

    #[test]
    fn rejects_invalid_parameters() {
        assert!(SentenceChunker::new(0, 0).is_err());
        assert!(SentenceChunker::new(100, 100).is_err());
        assert!(SentenceChunker::new(100, 150).is_err());
        assert!(SentenceChunker::new(1, 0).is_ok());
    }

    #[test]
    fn short_line_stays_atomic() {
        let chunker = SentenceChunker::new(200, 0).unwrap();
        let chunks = chunker.chunk("One. Two. Three.");
        // Under the atomic limit the whole line is a single unit, so one chunk.
        assert_eq!(chunks, vec!["One. Two. Three.".to_string()]);
    }

    #[test]
    fn long_prose_splits_into_bounded_chunks() {
        let chunker = SentenceChunker::new(80, 0).unwrap();
        let chunks = chunker.chunk(&long_prose());
        assert!(chunks.len() >= 2, "expected multiple chunks, got {chunks:?}");
        for chunk in &chunks {
            assert!(!chunk.trim().is_empty());
        }
    }

    #[test]
    fn no_sentence_is_lost() {
        let chunker = SentenceChunker::new(80, 20).unwrap();
        let text = long_prose();
        let chunks = chunker.chunk(&text);
        let joined = chunks.join(" ");
        for sentence in [
            "The quick brown fox jumps over the lazy dog near the river bank.",
            "A second sentence follows with more detail about the crossing.",
            "Finally a third sentence wraps the paragraph up neatly.",
        ] {
            assert!(joined.contains(sentence), "missing sentence: {sentence}");
        }
    }

    #[test]
    fn adjacent_chunks_share_overlap_context() {
        let chunker = SentenceChunker::new(80, 70).unwrap();
        let chunks = chunker.chunk(&long_prose());
        assert!(chunks.len() >= 2);
        // The second chunk must open with text already seen at the tail of the
        // first chunk (the overlap seed), aligned to a sentence boundary when
        // the window held more than one unit.
        let seed_start: String = chunks[1].chars().take(20).collect();
        assert!(
            chunks[0].contains(seed_start.trim()),
            "chunk 1 tail should contain the start of chunk 2: {chunks:?}"
        );
    }

    #[test]
    fn oversized_single_sentence_is_never_truncated() {
        let chunker = SentenceChunker::new(20, 5).unwrap();
        let sentence = "This heading-like line has no terminal punctuation and is long";
        let chunks = chunker.chunk(sentence);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], sentence);
    }

    #[test]
    fn headings_and_code_lines_stay_whole() {
        let chunker = SentenceChunker::new(50, 10).unwrap();
        let text = "Introduction\nfn main() { println!(\"hi\"); }\nA short closing line.";
        let chunks = chunker.chunk(&text);
        let joined = chunks.join(" ");
        assert!(joined.contains("Introduction"));
        assert!(joined.contains("fn main() { println!(\"hi\"); }"));
    }

    #[test]
    fn zero_overlap_produces_disjoint_chunks() {
        let chunker = SentenceChunker::new(80, 0).unwrap();
        let chunks = chunker.chunk(&long_prose());
        assert!(chunks.len() >= 2);
        // With no overlap the first sentence must not reappear.
        let first_sentence = "The quick brown fox";
        let occurrences = chunks
            .iter()
            .filter(|c| c.contains(first_sentence))
            .count();
        assert_eq!(occurrences, 1);
    }

    #[test]
    fn overlap_seed_drops_clipped_leading_unit() {
        let chunker = SentenceChunker::new(400, 120).unwrap();
        let s1 = "The opening sentence sets the scene with plenty of words to spare.";
        let s2 = "The middle sentence carries the detail forward across the line.";
        let s3 = "The closing sentence ends the chunk.";
        let finalized = format!("{s1} {s2} {s3}");
        // The 120-char window starts mid-s1; the clipped fragment must be
        // discarded so the seed starts on a sentence boundary.
        let seed = chunker.overlap_seed(&finalized);
        assert_eq!(seed, format!("{s2} {s3}"));
    }

    #[test]
    fn lone_overlap_unit_is_reused_verbatim() {
        let chunker = SentenceChunker::new(200, 10).unwrap();
        // Window lands mid-sentence with no internal boundary: the raw
        // substring survives, mid-word start and all.
        let seed = chunker.overlap_seed("A rather long sentence without any break");
        assert_eq!(seed.chars().count(), 10);
        assert!("A rather long sentence without any break".ends_with(&seed));
    }

    #[test]
    fn unicode_lengths_are_counted_in_chars() {
        let chunker = SentenceChunker::new(20, 0).unwrap();
        let text = "héllo wörld ünïcode. encore une phrase ici.";
        // Must not panic on non-ASCII boundaries.
        let chunks = chunker.chunk(text);
        assert!(!chunks.is_empty());
    }
}
