//! Search pool backed by ropey.

use ropey::Rope;
use std::fs;
use std::path::Path;

use crate::error::{Result, SearchError};

/// A read-only snapshot of text to search.
///
/// The contiguous text is what patterns run over; the rope answers line and
/// character questions about byte offsets returned by the matcher. Lines end
/// at `\n` only, so a pool numbers lines exactly as a file search does.
#[derive(Debug, Clone, Default)]
pub struct TextPool {
    text: String,
    rope: Rope,
}

impl TextPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a pool from a string.
    pub fn from_str(text: &str) -> Self {
        Self {
            text: text.to_owned(),
            rope: Rope::from_str(text),
        }
    }

    /// Loads a pool from a file. Invalid UTF-8 is replaced, not rejected.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| SearchError::io(path, e))?;
        Ok(Self::from(String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Returns the pool text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Returns the length of the pool in bytes.
    pub fn len_bytes(&self) -> usize {
        self.text.len()
    }

    /// Returns the length of the pool in characters.
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// Returns the number of lines. An empty pool has one line.
    pub fn len_lines(&self) -> usize {
        self.rope.len_lines()
    }

    /// Returns true if the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Converts a byte offset to a character index, clamping to the end.
    pub fn byte_to_char(&self, byte_idx: usize) -> usize {
        self.rope.byte_to_char(byte_idx.min(self.len_bytes()))
    }

    /// Converts a character index to a byte offset, clamping to the end.
    pub fn char_to_byte(&self, char_idx: usize) -> usize {
        self.rope.char_to_byte(char_idx.min(self.len_chars()))
    }

    /// Returns the 0-indexed line containing the byte offset.
    pub fn byte_to_line(&self, byte_idx: usize) -> usize {
        self.rope.byte_to_line(byte_idx.min(self.len_bytes()))
    }

    /// Returns the byte offset where a line starts.
    pub fn line_start_byte(&self, line: usize) -> usize {
        if line >= self.len_lines() {
            self.len_bytes()
        } else {
            self.rope.line_to_byte(line)
        }
    }

    /// Returns the line at the given index without its terminator.
    pub fn line(&self, line: usize) -> Option<String> {
        if line >= self.len_lines() {
            return None;
        }
        let mut s = self.rope.line(line).to_string();
        trim_line_ending(&mut s);
        Some(s)
    }

    /// Moves `byte_idx` forward to the nearest character boundary.
    pub(crate) fn ceil_char_boundary(&self, byte_idx: usize) -> usize {
        let mut idx = byte_idx.min(self.len_bytes());
        while !self.text.is_char_boundary(idx) {
            idx += 1;
        }
        idx
    }
}

impl From<String> for TextPool {
    fn from(text: String) -> Self {
        let rope = Rope::from_str(&text);
        Self { text, rope }
    }
}

impl From<&str> for TextPool {
    fn from(text: &str) -> Self {
        Self::from_str(text)
    }
}

pub(crate) fn trim_line_ending(s: &mut String) {
    if s.ends_with('\n') {
        s.pop();
        if s.ends_with('\r') {
            s.pop();
        }
    } else if s.ends_with('\r') {
        s.pop();
    }
}
