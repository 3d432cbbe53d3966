//! Paragraph-boundary transcript chunker.
//!
//! A transcript body becomes a list of chunk texts: consecutive paragraphs
//! (`\n\n`-separated) are packed into one chunk until the next paragraph
//! would push it past the `max_tokens` budget, and a single paragraph wider
//! than the whole budget is cut into budget-sized pieces on its own.
//!
//! Chunks come back with contiguous ordinals starting at 0 and a SHA-256
//! hash of their text; the index builder attaches embedding vectors
//! afterwards.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::IndexedChunk;

/// Approximate chars-per-token ratio used to convert the token budget.
const CHARS_PER_TOKEN: usize = 4;

/// Split a document body into chunks on paragraph boundaries, respecting
/// max_tokens. The returned chunks carry empty vectors.
pub fn chunk_text(document_id: &str, text: &str, max_tokens: usize) -> Vec<IndexedChunk> {
    let max_chars = max_tokens * CHARS_PER_TOKEN;

    let mut bodies: Vec<String> = Vec::new();
    let mut buffer = String::new();

    for para in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        if para.len() > max_chars {
            // Oversized paragraph: flush whatever is buffered, then cut
            // the paragraph into budget-sized pieces of its own.
            if !buffer.is_empty() {
                bodies.push(std::mem::take(&mut buffer));
            }
            bodies.extend(split_oversized(para, max_chars).into_iter().map(String::from));
            continue;
        }

        let separator = if buffer.is_empty() { 0 } else { 2 };
        if !buffer.is_empty() && buffer.len() + separator + para.len() > max_chars {
            bodies.push(std::mem::take(&mut buffer));
        }

        if !buffer.is_empty() {
            buffer.push_str("\n\n");
        }
        buffer.push_str(para);
    }

    if !buffer.is_empty() {
        bodies.push(buffer);
    }

    // A document always yields at least one chunk, even when blank.
    if bodies.is_empty() {
        bodies.push(text.trim().to_string());
    }

    bodies
        .iter()
        .enumerate()
        .map(|(ordinal, body)| make_chunk(document_id, ordinal as i64, body))
        .collect()
}

/// Cut a paragraph wider than `max_chars` into pieces no wider than that,
/// preferring to end a piece at whitespace. Cut positions are clamped to
/// UTF-8 character boundaries, so multi-byte text never splits mid-char.
fn split_oversized(paragraph: &str, max_chars: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut rest = paragraph;

    while rest.len() > max_chars {
        let mut cut = max_chars;
        while cut > 0 && !rest.is_char_boundary(cut) {
            cut -= 1;
        }

        // End at the last space or newline inside the budget, if any.
        if let Some(ws) = rest[..cut].rfind([' ', '\n']) {
            if ws > 0 {
                cut = ws + 1;
            }
        }

        if cut == 0 {
            // One character is wider than the whole budget; emit it whole.
            cut = rest
                .chars()
                .next()
                .map(char::len_utf8)
                .unwrap_or(rest.len());
        }

        let piece = rest[..cut].trim_end();
        if !piece.is_empty() {
            pieces.push(piece);
        }
        rest = &rest[cut..];
    }

    let rest = rest.trim_end();
    if !rest.is_empty() {
        pieces.push(rest);
    }

    pieces
}

fn make_chunk(document_id: &str, ordinal: i64, text: &str) -> IndexedChunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    IndexedChunk {
        id: Uuid::new_v4().to_string(),
        document_id: document_id.to_string(),
        ordinal,
        text: text.to_string(),
        hash,
        vector: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(chunks: &[IndexedChunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn test_short_transcript_stays_whole() {
        let chunks = chunk_text("ep1.txt", "Welcome back to the show.", 700);
        assert_eq!(texts(&chunks), vec!["Welcome back to the show."]);
        assert_eq!(chunks[0].ordinal, 0);
        assert!(chunks[0].vector.is_empty());
    }

    #[test]
    fn test_blank_transcript_yields_one_chunk() {
        let chunks = chunk_text("ep1.txt", "", 700);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].ordinal, 0);
        assert_eq!(chunks[0].text, "");
    }

    #[test]
    fn test_paragraphs_pack_into_one_chunk_under_budget() {
        let body = "Intro music fades.\n\nGuest introduction.\n\nFirst question.";
        let chunks = chunk_text("ep1.txt", body, 700);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, body);
    }

    #[test]
    fn test_budget_overflow_starts_a_new_chunk() {
        // max_tokens 6 puts the budget at 24 chars, enough for one
        // paragraph at a time but never two.
        let body = "The host opens the show.\n\nThe guest tells a story.\n\nThey take a question.";
        let chunks = chunk_text("ep1.txt", body, 6);
        assert_eq!(chunks.len(), 3);
        for (position, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.ordinal, position as i64);
        }
    }

    #[test]
    fn test_oversized_paragraph_cut_at_whitespace() {
        let body = "one two three four five six seven eight nine ten";
        let chunks = chunk_text("ep1.txt", body, 4);
        assert!(chunks.len() > 1);
        // No piece exceeds the 16-char budget and no word is torn apart.
        for chunk in &chunks {
            assert!(chunk.text.len() <= 16, "too wide: {:?}", chunk.text);
            assert!(body.contains(&chunk.text));
        }
    }

    #[test]
    fn test_multibyte_text_never_splits_mid_char() {
        // Three-byte characters with a budget of 4 bytes force a cut
        // position inside a character unless it gets clamped.
        let chunks = chunk_text("ep1.txt", "€€€€€€", 1);
        let rejoined: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(rejoined, "€€€€€€");
    }

    #[test]
    fn test_accented_transcript_chunks_cleanly() {
        let body = "L'invité raconte son séjour à Besançon, où il a enregistré \
                    l'épisode précédent près de la citadelle.";
        let chunks = chunk_text("ep1.txt", body, 5);
        assert!(chunks.len() > 1);
        for (position, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.ordinal, position as i64);
            assert!(!chunk.text.is_empty());
        }
    }

    #[test]
    fn test_same_text_same_hashes() {
        let body = "Segment one.\n\nSegment two.\n\nSegment three.";
        let first = chunk_text("ep1.txt", body, 4);
        let second = chunk_text("ep1.txt", body, 4);
        let hashes =
            |chunks: &[IndexedChunk]| chunks.iter().map(|c| c.hash.clone()).collect::<Vec<_>>();
        assert_eq!(hashes(&first), hashes(&second));
        assert_eq!(texts(&first), texts(&second));
    }
}
