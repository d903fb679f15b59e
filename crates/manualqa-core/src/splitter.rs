//! Recursive separator-priority text splitter.
//!
//! The first separator (in priority order) that occurs in the text is used to
//! cut it; pieces that are still too large are cut again with the remaining
//! separators. Small neighbouring pieces are merged back up to `chunk_size`
//! with `chunk_overlap` characters of trailing context carried forward.
//! Separators stay attached to the start of the piece that follows them, so
//! a `WARNING:` marker is never separated from the text it qualifies.
//! Lengths are counted in characters.

use std::collections::VecDeque;

/// Separators for manual prose, most structurally significant first.
pub const MANUAL_SEPARATORS: [&str; 11] = [
    "\n\n\n",        // major section break
    "\nProcedure\n", // procedure boundary
    "\nChecklist\n", // checklist boundary
    "\nWARNING:",
    "\nCAUTION:",
    "\nNote:",
    "\n\n", // paragraph
    "\n",   // line
    ". ",   // sentence
    " ",    // word
    "",     // hard character cut
];

/// Structural breaks only; tables must not be torn at sentence level.
pub const TABLE_SEPARATORS: [&str; 3] = ["\n\n\n", "\n\n", "\n"];

#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize, separators: &[&str]) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            separators: separators.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_with(text, &self.separators)
    }

    fn split_with(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut separator = separators.last().map_or("", String::as_str);
        let mut remaining: &[String] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();
        for piece in split_keep_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                fitting.push(piece);
                continue;
            }
            if !fitting.is_empty() {
                chunks.extend(self.merge(&fitting));
                fitting.clear();
            }
            if remaining.is_empty() {
                chunks.extend(trimmed(piece));
            } else {
                chunks.extend(self.split_with(piece, remaining));
            }
        }
        if !fitting.is_empty() {
            chunks.extend(self.merge(&fitting));
        }
        chunks
    }

    /// Greedily packs pieces into windows of at most `chunk_size`, retaining
    /// up to `chunk_overlap` characters of the previous window.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut merged = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;
        for &piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                merged.extend(join(&window));
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match window.pop_front() {
                        Some((_, dropped)) => total -= dropped,
                        None => break,
                    }
                }
            }
            window.push_back((piece, len));
            total += len;
        }
        merged.extend(join(&window));
        merged
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn join(window: &VecDeque<(&str, usize)>) -> Option<String> {
    let text: String = window.iter().map(|(piece, _)| *piece).collect();
    trimmed(&text)
}

/// Trimmed text, or `None` when only whitespace remains.
fn trimmed(text: &str) -> Option<String> {
    let t = text.trim();
    if t.is_empty() { None } else { Some(t.to_string()) }
}

/// Cuts before every occurrence of `separator`; empty pieces are dropped.
/// An empty separator cuts between characters.
fn split_keep_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text.char_indices().map(|(i, c)| &text[i..i + c.len_utf8()]).collect();
    }
    let mut pieces = Vec::new();
    let mut start = 0;
    for (at, _) in text.match_indices(separator) {
        if at > start {
            pieces.push(&text[start..at]);
        }
        start = at;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}
