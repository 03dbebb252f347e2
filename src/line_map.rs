//! Line lookups for consumers that only hold flat text.

use std::sync::{Arc, OnceLock};

use crate::{
    chunk::{self, LineBreak},
    error::{LineIndexError, Result},
    text::TextSnapshot,
    tree::LineCol,
};

/// Offset <-> line conversion over a flat string. Line starts are computed on first use and
/// cached; lookups are a binary search over them. Offsets are in chars and use the same line
/// break rules as [`LineIndex`](crate::LineIndex).
#[derive(Debug, Clone)]
pub struct LineMap {
    text: Arc<str>,
    lines: OnceLock<ComputedLines>,
}

#[derive(Debug, Clone)]
struct ComputedLines {
    line_starts: Vec<usize>,
    len_chars: usize,
}

impl LineMap {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self {
            text: text.into(),
            lines: OnceLock::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Char offsets where each line starts. `line_starts()[0]` is always 0.
    pub fn line_starts(&self) -> &[usize] {
        &self.computed().line_starts
    }

    pub fn line_count(&self) -> usize {
        self.line_starts().len()
    }

    pub fn len_chars(&self) -> usize {
        self.computed().len_chars
    }

    pub fn offset_to_line_col(&self, offset: usize) -> Result<LineCol> {
        if offset > self.len_chars() {
            return Err(LineIndexError::out_of_range(
                "offset",
                offset,
                0..self.len_chars() + 1,
            ));
        }

        let line_starts = self.line_starts();
        let line_idx = match line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        Ok(LineCol {
            line: line_idx + 1,
            column: offset - line_starts[line_idx],
        })
    }

    pub fn line_to_offset(&self, line: usize) -> Result<usize> {
        line.checked_sub(1)
            .and_then(|line_idx| self.line_starts().get(line_idx).copied())
            .ok_or_else(|| LineIndexError::out_of_range("line", line, 1..self.line_count() + 1))
    }

    fn computed(&self) -> &ComputedLines {
        self.lines.get_or_init(|| {
            let mut line_starts = vec![0];
            let mut len_chars = 0;
            for line in chunk::split_lines(&self.text) {
                len_chars += line.chars().count();
                if LineBreak::of(line).is_terminated() {
                    line_starts.push(len_chars);
                }
            }
            ComputedLines {
                line_starts,
                len_chars,
            }
        })
    }
}

impl TextSnapshot for LineMap {
    fn get_text(&self, start: usize, len: usize) -> Result<String> {
        let end = start
            .checked_add(len)
            .ok_or_else(|| LineIndexError::out_of_range("length", len, 0..self.len_chars()))?;
        let range = chunk::resolve_range(start..end, 0..self.len_chars())?;
        let byte_start = chunk::char_to_byte_idx(&self.text, range.start);
        let byte_end = byte_start + chunk::char_to_byte_idx(&self.text[byte_start..], range.len());
        Ok(self.text[byte_start..byte_end].to_string())
    }

    fn len_chars(&self) -> usize {
        LineMap::len_chars(self)
    }
}
