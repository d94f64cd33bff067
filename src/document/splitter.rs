//! Recursive character splitter
//!
//! Splits text on the coarsest separator that occurs in it (paragraphs, then
//! lines, then words, then characters) and packs the pieces into chunks of at
//! most `chunk_size` characters, repeating up to `chunk_overlap` characters of
//! the previous chunk at the start of the next one.

use super::Document;
use log::warn;
use std::collections::VecDeque;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum SplitterError {
    #[error("Invalid splitter config: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Clone)]
pub struct RecursiveCharacterTextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl Default for RecursiveCharacterTextSplitter {
    fn default() -> Self {
        Self {
            chunk_size: crate::config::CHUNK_SIZE,
            chunk_overlap: crate::config::CHUNK_OVERLAP,
            separators: default_separators(),
        }
    }
}

fn default_separators() -> Vec<String> {
    ["\n\n", "\n", " ", ""].iter().map(|s| s.to_string()).collect()
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

impl RecursiveCharacterTextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, SplitterError> {
        Self::with_separators(chunk_size, chunk_overlap, default_separators())
    }

    pub fn with_separators(
        chunk_size: usize,
        chunk_overlap: usize,
        separators: Vec<String>,
    ) -> Result<Self, SplitterError> {
        if chunk_size == 0 {
            return Err(SplitterError::InvalidConfig("chunk size must be positive".to_string()));
        }
        if chunk_overlap > chunk_size {
            return Err(SplitterError::InvalidConfig(format!(
                "chunk overlap ({}) is larger than chunk size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators,
        })
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    /// Splits every document, each chunk keeping its parent's metadata.
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Document> {
        documents
            .iter()
            .flat_map(|doc| {
                self.split_text(&doc.page_content)
                    .into_iter()
                    .map(move |chunk| Document {
                        page_content: chunk,
                        metadata: doc.metadata.clone(),
                    })
            })
            .collect()
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut remaining: &[String] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate.as_str();
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut small: Vec<&str> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                small.push(piece);
                continue;
            }
            if !small.is_empty() {
                chunks.extend(self.merge_splits(&small));
                small.clear();
            }
            if remaining.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }
        if !small.is_empty() {
            chunks.extend(self.merge_splits(&small));
        }
        chunks
    }

    fn merge_splits(&self, splits: &[&str]) -> Vec<String> {
        let mut docs = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0;

        for &piece in splits {
            let len = char_len(piece);
            if total + len > self.chunk_size {
                if total > self.chunk_size {
                    warn!(
                        "Created a chunk of size {}, which is longer than the specified {}",
                        total, self.chunk_size
                    );
                }
                if !current.is_empty() {
                    if let Some(doc) = join_pieces(&current) {
                        docs.push(doc);
                    }
                    // keep at most `chunk_overlap` characters for the next chunk
                    while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                        match current.pop_front() {
                            Some(first) => total -= char_len(first),
                            None => break,
                        }
                    }
                }
            }
            current.push_back(piece);
            total += len;
        }

        if let Some(doc) = join_pieces(&current) {
            docs.push(doc);
        }
        docs
    }
}

/// Splits before every occurrence of `separator`, so the separator starts the
/// following piece. Empty pieces are dropped. An empty separator splits into
/// characters.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        pieces.push(&text[start..idx]);
        start = idx;
    }
    pieces.push(&text[start..]);
    pieces.retain(|p| !p.is_empty());
    pieces
}

fn join_pieces(pieces: &VecDeque<&str>) -> Option<String> {
    let joined: String = pieces.iter().copied().collect();
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

    #[test]
    fn test_invalid_config() {
        assert!(RecursiveCharacterTextSplitter::new(0, 0).is_err());
        assert!(RecursiveCharacterTextSplitter::new(50, 100).is_err());
        assert!(RecursiveCharacterTextSplitter::new(500, 50).is_ok());
    }

    #[test]
    fn test_empty_text() {
        let splitter = RecursiveCharacterTextSplitter::default();
        assert!(splitter.split_text("").is_empty());
        assert!(splitter.split_text("  \n\n ").is_empty());
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let splitter = RecursiveCharacterTextSplitter::default();
        assert_eq!(splitter.split_text("  Short text.\n"), vec!["Short text.".to_string()]);
    }

    #[test]
    fn test_separator_starts_following_piece() {
        assert_eq!(split_keeping_separator("a b  c", " "), vec!["a", " b", " ", " c"]);
        assert_eq!(split_keeping_separator("héllo", ""), vec!["h", "é", "l", "l", "o"]);
    }

    #[test]
    fn test_thousand_chars_without_separators() {
        let splitter = RecursiveCharacterTextSplitter::new(500, 50).unwrap();
        let text = "0123456789".repeat(100);
        let chars: Vec<char> = text.chars().collect();

        let chunks = splitter.split_text(&text);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], chars[0..500].iter().collect::<String>());
        assert_eq!(chunks[1], chars[450..950].iter().collect::<String>());
        assert_eq!(chunks[2], chars[900..1000].iter().collect::<String>());

        // dropping each chunk's 50-char overlap reassembles the input
        let mut rebuilt = chunks[0].clone();
        for chunk in &chunks[1..] {
            rebuilt.extend(chunk.chars().skip(50));
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_thousand_chars_of_words_overlap_and_cover() {
        let splitter = RecursiveCharacterTextSplitter::new(500, 50).unwrap();
        let words: Vec<String> = (0..200).map(|i| format!("w{:03}", i)).collect();
        let text = format!("{}!", words.join(" "));
        assert_eq!(text.chars().count(), 1000);

        let chunks = splitter.split_text(&text);
        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 500, "chunk too long: {}", chunk.len());
        }
        for pair in chunks.windows(2) {
            let first_word = pair[1].split(' ').next().unwrap();
            assert!(pair[0].contains(first_word), "no overlap between {:?} and {:?}", pair[0], pair[1]);
        }
        for word in &words {
            assert!(chunks.iter().any(|c| c.contains(word.as_str())), "{} not covered", word);
        }
        assert!(chunks.last().unwrap().ends_with("w199!"));
    }

    #[test]
    fn test_paragraph_boundaries_preferred() {
        let splitter = RecursiveCharacterTextSplitter::new(500, 50).unwrap();
        let first = "a".repeat(300);
        let second = "b".repeat(300);
        let text = format!("{}\n\n{}", first, second);

        assert_eq!(splitter.split_text(&text), vec![first, second]);
    }

    #[test]
    fn test_split_documents_keeps_metadata() {
        let splitter = RecursiveCharacterTextSplitter::new(10, 0).unwrap();
        let doc = Document::new("alpha beta gamma delta", "./docs/a.pdf", Some(3));

        let chunks = splitter.split_documents(&[doc]);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert_eq!(chunk.metadata.source, "./docs/a.pdf");
            assert_eq!(chunk.metadata.page, Some(3));
            assert!(chunk.page_content.chars().count() <= 10);
        }
    }
}
