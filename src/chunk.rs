use std::ops::{Range, RangeBounds};

use crate::error::{LineIndexError, Result};

/// How a line ends. A document can only have one unterminated line: its last one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineBreak {
    #[default]
    None,
    Lf,
    Cr,
    CrLf,
}

impl LineBreak {
    pub fn of(line: &str) -> Self {
        let bytes = line.as_bytes();
        match bytes {
            [.., b'\r', b'\n'] => LineBreak::CrLf,
            [.., b'\n'] => LineBreak::Lf,
            [.., b'\r'] => LineBreak::Cr,
            _ => LineBreak::None,
        }
    }

    pub fn len_chars(self) -> usize {
        match self {
            LineBreak::None => 0,
            LineBreak::Lf | LineBreak::Cr => 1,
            LineBreak::CrLf => 2,
        }
    }

    pub fn is_terminated(self) -> bool {
        self != LineBreak::None
    }
}

/// LineChunk is a single line of text, including its line terminator, together with its
/// precomputed character count. Leaves of the line index tree store these.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LineChunk {
    text: String,
    chars: usize,
    line_break: LineBreak,
}

impl LineChunk {
    /// `line` must hold at most one line break and only at its very end. Use [`split_lines`] to
    /// get such slices out of arbitrary text.
    pub fn new(line: &str) -> Self {
        let line_break = LineBreak::of(line);
        debug_assert!(
            split_lines(line).nth(1).is_none(),
            "chunk must hold a single line: {line:?}"
        );
        Self {
            chars: line.chars().count(),
            text: line.to_string(),
            line_break,
        }
    }

    pub fn as_str(&self) -> &str {
        self.text.as_str()
    }

    pub fn len_bytes(&self) -> usize {
        self.text.len()
    }

    pub fn len_chars(&self) -> usize {
        self.chars
    }

    pub fn line_break(&self) -> LineBreak {
        self.line_break
    }

    pub fn line_breaks(&self) -> usize {
        self.line_break.is_terminated() as usize
    }

    pub fn is_terminated(&self) -> bool {
        self.line_break.is_terminated()
    }

    /// true when the chunk ends with a `\n`, i.e. nothing appended after it can ever be glued
    /// onto this line
    pub fn ends_with_lf(&self) -> bool {
        matches!(self.line_break, LineBreak::Lf | LineBreak::CrLf)
    }

    pub fn starts_with_lf(&self) -> bool {
        self.text.starts_with('\n')
    }

    /// Content of the line without its terminator.
    pub fn content(&self) -> &str {
        &self.text[..self.text.len() - self.line_break.len_chars()]
    }

    pub fn slice_chars<R: RangeBounds<usize>>(&self, char_range: R) -> Result<&str> {
        let char_range = resolve_range(char_range, 0..self.len_chars())?;
        let byte_range = self.resolve_char_to_byte_range(char_range);
        Ok(&self.text[byte_range])
    }

    fn resolve_char_to_byte_range(&self, char_range: Range<usize>) -> Range<usize> {
        // ascii-only lines are the common case and need no scanning
        if self.chars == self.text.len() {
            return char_range;
        }
        let start = char_to_byte_idx(&self.text, char_range.start);
        let end = start + char_to_byte_idx(&self.text[start..], char_range.len());
        start..end
    }
}

impl std::fmt::Display for LineChunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for LineChunk {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Splits `text` into lines, keeping each line's terminator. `\r\n` is one terminator, a lone
/// `\r` or `\n` is one as well. The last line is only yielded when it is non-empty, so an empty
/// text produces no lines at all.
pub fn split_lines(text: &str) -> Lines<'_> {
    Lines { rest: text }
}

#[derive(Debug, Clone)]
pub struct Lines<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Lines<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        let bytes = self.rest.as_bytes();
        let end = match bytes.iter().position(|&b| b == b'\n' || b == b'\r') {
            None => bytes.len(),
            Some(idx) if bytes[idx] == b'\r' && bytes.get(idx + 1) == Some(&b'\n') => idx + 2,
            Some(idx) => idx + 1,
        };
        let (line, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(line)
    }
}

impl<'a> std::iter::FusedIterator for Lines<'a> {}

/// Byte index of the `char_idx`-th char of `s`, or `s.len()` when `char_idx` is one past the last
/// char.
pub(crate) fn char_to_byte_idx(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(byte_idx, _)| byte_idx)
        .unwrap_or(s.len())
}

pub fn resolve_range<R: RangeBounds<usize>>(r: R, valid: Range<usize>) -> Result<Range<usize>> {
    let start = match r.start_bound() {
        std::ops::Bound::Included(&n) => n,
        std::ops::Bound::Excluded(&n) => n.saturating_add(1),
        std::ops::Bound::Unbounded => valid.start,
    };
    let end = match r.end_bound() {
        std::ops::Bound::Included(&n) => n.saturating_add(1),
        std::ops::Bound::Excluded(&n) => n,
        std::ops::Bound::Unbounded => valid.end,
    };

    // unlike a plain Range::contains, the end of the valid range is an acceptable start
    if start < valid.start || start > valid.end {
        return Err(LineIndexError::out_of_range("start", start, valid));
    }

    if end > valid.end {
        return Err(LineIndexError::out_of_range("end", end, valid));
    }

    if start > end {
        return Err(LineIndexError::out_of_range("start", start, valid));
    }

    Ok(start..end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_lines_1() {
        let lines: Vec<_> = split_lines("ab\r\ncd\r\nef").collect();
        assert_eq!(lines, ["ab\r\n", "cd\r\n", "ef"]);

        let lines: Vec<_> = split_lines("a\rb\n\n\r\r\n").collect();
        assert_eq!(lines, ["a\r", "b\n", "\n", "\r", "\r\n"]);

        assert_eq!(split_lines("").count(), 0);
        assert_eq!(split_lines("\n").collect::<Vec<_>>(), ["\n"]);
    }

    #[test]
    fn test_split_lines_trailing_cr() {
        // a trailing \r is a complete terminator on its own
        let lines: Vec<_> = split_lines("x\r").collect();
        assert_eq!(lines, ["x\r"]);
    }

    #[test]
    fn test_chunk_1() {
        let chunk = LineChunk::new("h\u{c3a9}llo\r\n");
        assert_eq!(chunk.len_chars(), 7);
        assert_eq!(chunk.len_bytes(), 9);
        assert_eq!(chunk.line_break(), LineBreak::CrLf);
        assert_eq!(chunk.line_breaks(), 1);
        assert_eq!(chunk.content(), "h\u{c3a9}llo");
        assert!(chunk.ends_with_lf());

        let chunk = LineChunk::new("tail");
        assert_eq!(chunk.line_break(), LineBreak::None);
        assert_eq!(chunk.line_breaks(), 0);
        assert!(!chunk.is_terminated());

        let chunk = LineChunk::new("cr\r");
        assert!(chunk.is_terminated());
        assert!(!chunk.ends_with_lf());
    }

    #[test]
    fn test_chunk_slice() {
        let chunk = LineChunk::new("h\u{c3a9}llo\n");
        assert_eq!(chunk.slice_chars(1..2).unwrap(), "\u{c3a9}");
        assert_eq!(chunk.slice_chars(2..).unwrap(), "llo\n");
        assert_eq!(chunk.slice_chars(..).unwrap(), "h\u{c3a9}llo\n");
        assert_eq!(chunk.slice_chars(6..6).unwrap(), "");
        assert!(chunk.slice_chars(1..8).is_err());

        let ascii = LineChunk::new("hello da");
        assert_eq!(ascii.slice_chars(1..7).unwrap(), "ello d");
    }

    #[test]
    fn test_resolve_range() {
        assert_eq!(resolve_range(.., 0..4).unwrap(), 0..4);
        assert_eq!(resolve_range(4..4, 0..4).unwrap(), 4..4);
        assert_eq!(resolve_range(1..=2, 0..4).unwrap(), 1..3);
        assert!(matches!(
            resolve_range(3..5, 0..4),
            Err(LineIndexError::OutOfRange { which: "end", .. })
        ));
        assert!(resolve_range(5.., 0..4).is_err());
    }
}
