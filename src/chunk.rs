use log::debug;

use crate::error::PipelineError;
use crate::{Chunk, Document};

pub const DEFAULT_CHUNK_SIZE: usize = 3000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Preferred break points, strongest first
const SEPARATORS: &[&str] = &["\n\n", "\n", " "];

/// Split documents into chunks of at most `chunk_size` chars, each repeating the
/// last `overlap` chars of its predecessor.
///
/// Dropping every chunk's leading `overlap` chars and concatenating the rest
/// gives back the original document text.
pub fn split(documents: &[Document], chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>, PipelineError> {
    if chunk_size == 0 {
        return Err(PipelineError::invalid("chunk size must be greater than zero"));
    }
    if overlap >= chunk_size {
        return Err(PipelineError::invalid(format!(
            "chunk overlap ({overlap}) must be smaller than chunk size ({chunk_size})"
        )));
    }

    let mut chunks = Vec::new();
    for (index, doc) in documents.iter().enumerate() {
        split_text(&doc.text, chunk_size, overlap, index, &mut chunks);
    }
    debug!(
        "Split {} document(s) into {} chunk(s) (size={chunk_size}, overlap={overlap})",
        documents.len(),
        chunks.len()
    );
    Ok(chunks)
}

fn split_text(text: &str, chunk_size: usize, overlap: usize, document_index: usize, out: &mut Vec<Chunk>) {
    // Byte offset of each char, plus the end of the text
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total = bounds.len() - 1;
    if total == 0 {
        return;
    }

    let mut start = 0;
    let mut carried = 0;
    loop {
        let limit = (start + chunk_size).min(total);
        let end = if limit == total {
            total
        } else {
            let min_end = start + overlap.max(chunk_size / 2) + 1;
            break_point(text, &bounds, start, min_end.min(limit), limit)
        };

        out.push(Chunk {
            text: text[bounds[start]..bounds[end]].to_string(),
            document_index,
            start,
            overlap: carried,
        });

        if end == total {
            break;
        }
        carried = overlap;
        start = end - overlap;
    }
}

/// Char index in `min_end..=limit` right after the strongest separator, or `limit`.
fn break_point(text: &str, bounds: &[usize], start: usize, min_end: usize, limit: usize) -> usize {
    let window = &text[bounds[start]..bounds[limit]];
    for sep in SEPARATORS {
        if let Some(pos) = window.rfind(sep) {
            let end_byte = bounds[start] + pos + sep.len();
            match bounds.binary_search(&end_byte) {
                Ok(end) if end >= min_end => return end,
                _ => {}
            }
        }
    }
    limit
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rebuild(chunks: &[Chunk], document_index: usize) -> String {
        chunks
            .iter()
            .filter(|c| c.document_index == document_index)
            .map(|c| c.text.chars().skip(c.overlap).collect::<String>())
            .collect()
    }

    fn prose(words: usize) -> String {
        let vocab = ["alpha", "beta", "gamma", "delta", "epsilon", "zeta", "eta", "theta"];
        let mut out = String::new();
        for i in 0..words {
            if i > 0 {
                out.push_str(if i % 97 == 0 { "\n\n" } else if i % 31 == 0 { "\n" } else { " " });
            }
            out.push_str(vocab[i % vocab.len()]);
        }
        out
    }

    #[test]
    fn test_default_window_reconstructs_text() {
        let text = prose(4000);
        let len = text.chars().count();
        let chunks = split(&[Document::new(text.clone())], 3000, 200).unwrap();

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 3000));
        let rebuilt = rebuild(&chunks, 0);
        assert_eq!(rebuilt.chars().count(), len);
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_overlap_repeats_previous_tail() {
        let text = prose(2000);
        let chunks = split(&[Document::new(text)], 1000, 100).unwrap();
        assert_eq!(chunks[0].overlap, 0);
        for pair in chunks.windows(2) {
            let prev_tail: String = pair[0]
                .text
                .chars()
                .skip(pair[0].text.chars().count() - 100)
                .collect();
            let next_head: String = pair[1].text.chars().take(100).collect();
            assert_eq!(pair[1].overlap, 100);
            assert_eq!(prev_tail, next_head);
        }
    }

    #[test]
    fn test_prefers_whitespace_breaks() {
        let text = prose(1000);
        let chunks = split(&[Document::new(text)], 500, 50).unwrap();
        for c in &chunks[..chunks.len() - 1] {
            assert!(c.text.ends_with(' ') || c.text.ends_with('\n'), "chunk ends mid-word: {:?}", c.text);
        }
    }

    #[test]
    fn test_hard_split_without_separators() {
        let text = "x".repeat(7000);
        let chunks = split(&[Document::new(text.clone())], 3000, 200).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text.len(), 3000);
        assert_eq!(chunks[1].start, 2800);
        assert_eq!(rebuild(&chunks, 0), text);
    }

    #[test]
    fn test_multibyte_text() {
        let text = "héllo wörld ✨ ".repeat(300);
        let chunks = split(&[Document::new(text.clone())], 256, 32).unwrap();
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 256));
        assert_eq!(rebuild(&chunks, 0), text);
    }

    #[test]
    fn test_short_and_empty_documents() {
        let docs = [Document::new("short text"), Document::new(""), Document::new("another")];
        let chunks = split(&docs, 3000, 200).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "short text");
        assert_eq!(chunks[0].document_index, 0);
        assert_eq!(chunks[1].text, "another");
        assert_eq!(chunks[1].document_index, 2);
        assert_eq!(chunks[1].overlap, 0);
    }

    #[test]
    fn test_zero_overlap() {
        let text = prose(600);
        let chunks = split(&[Document::new(text.clone())], 400, 0).unwrap();
        assert!(chunks.iter().all(|c| c.overlap == 0));
        assert_eq!(chunks.iter().map(|c| c.text.as_str()).collect::<String>(), text);
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let docs = [Document::new("text")];
        assert!(matches!(split(&docs, 0, 0), Err(PipelineError::InvalidInput(_))));
        assert!(matches!(split(&docs, 200, 200), Err(PipelineError::InvalidInput(_))));
        assert!(matches!(split(&docs, 100, 300), Err(PipelineError::InvalidInput(_))));
    }
}
