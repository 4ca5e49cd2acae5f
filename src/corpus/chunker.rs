//! Paragraph-based text chunking for corpus building.
//!
//! Splits documents at blank lines and packs paragraphs into chunks of at most
//! `max_chars` characters. Paragraphs longer than the limit are split at word
//! boundaries. Lengths are counted in characters, not bytes, since Tamil text is
//! multi-byte in UTF-8.

use super::ChunkRecord;
use regex::Regex;
use std::sync::OnceLock;

fn paragraph_break() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n").expect("valid paragraph regex"))
}

/// Splits documents into chunk records.
#[derive(Debug, Clone)]
pub struct TextChunker {
    max_chars: usize,
}

impl TextChunker {
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars: max_chars.max(1),
        }
    }

    /// Chunk `text`, naming chunks `<source>-<n>` starting from 1.
    pub fn chunk(&self, source: &str, text: &str) -> Vec<ChunkRecord> {
        let mut pieces: Vec<String> = Vec::new();
        let mut current = String::new();

        for paragraph in paragraph_break().split(text) {
            let paragraph = normalize_whitespace(paragraph);
            if paragraph.is_empty() {
                continue;
            }

            for part in self.split_long(&paragraph) {
                let joined_len = char_len(&current) + 2 + char_len(&part);
                if !current.is_empty() && joined_len > self.max_chars {
                    pieces.push(std::mem::take(&mut current));
                }
                if !current.is_empty() {
                    current.push_str("\n\n");
                }
                current.push_str(&part);
            }
        }

        if !current.is_empty() {
            pieces.push(current);
        }

        pieces
            .into_iter()
            .enumerate()
            .map(|(i, text)| ChunkRecord {
                id: format!("{}-{}", source, i + 1),
                text,
            })
            .collect()
    }

    /// Split a single paragraph at word boundaries so no part exceeds the limit.
    fn split_long(&self, paragraph: &str) -> Vec<String> {
        if char_len(paragraph) <= self.max_chars {
            return vec![paragraph.to_string()];
        }

        let mut parts = Vec::new();
        let mut current = String::new();

        for word in paragraph.split_whitespace() {
            if !current.is_empty() && char_len(&current) + 1 + char_len(word) > self.max_chars {
                parts.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }

        if !current.is_empty() {
            parts.push(current);
        }
        parts
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(800)
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Collapse runs of whitespace inside a paragraph to single spaces.
fn normalize_whitespace(paragraph: &str) -> String {
    paragraph.split_whitespace().collect::<Vec<_>>().join(" ")
}
