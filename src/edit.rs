use log::trace;

use crate::{
    chunk::{self, LineBreak, LineChunk},
    error::{LineIndexError, Result},
    tree::{DimensionCharIdx, DimensionChunkIdx, LineIndex},
};

/// Structural shape of an edit, as seen from the line layout of the text it applies to. The shape
/// is descriptive only: it is reported to observers and logs, while every edit goes through the
/// same region splice whatever its shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EditShape {
    /// Stays inside one line and neither adds nor removes line breaks.
    WithinLine,
    /// Deletes exactly one line break, joining two lines.
    JoinLines,
    /// Deletes several line breaks while inserting none.
    DeleteAcrossLines,
    /// Puts a `\r` right next to a `\n`, or pulls a `\r\n` apart.
    ReglueLineEnding,
    /// Inserts one line break.
    SplitLine,
    /// Inserts several line breaks.
    InsertManyLines,
    /// Touches the very start or the very end of the text.
    Boundary,
}

impl EditShape {
    pub const ALL: [EditShape; 7] = [
        EditShape::WithinLine,
        EditShape::JoinLines,
        EditShape::DeleteAcrossLines,
        EditShape::ReglueLineEnding,
        EditShape::SplitLine,
        EditShape::InsertManyLines,
        EditShape::Boundary,
    ];
}

/// Walks a [`LineIndex`] to apply one replace-range edit. The walker finds the chunks spanning
/// the edited range, splices the edit into their text, segments the result into new chunks and
/// hands the replacement to the tree, which rebuilds the path(s) down to the touched leaves.
#[derive(Debug)]
pub struct EditWalker<'a> {
    index: &'a LineIndex,
    start: usize,
    delete_len: usize,
    insert: &'a str,
}

/// The run of chunks an edit has to rewrite.
#[derive(Debug)]
struct Region {
    first_chunk: usize,
    end_chunk: usize,
    start_offset: usize,
    text: String,
}

impl<'a> EditWalker<'a> {
    pub fn new(index: &'a LineIndex, start: usize, delete_len: usize, insert: &'a str) -> Result<Self> {
        let len = index.len_chars();
        if start > len {
            return Err(LineIndexError::out_of_range("start", start, 0..len + 1));
        }
        match start.checked_add(delete_len) {
            Some(end) if end <= len => {}
            _ => {
                return Err(LineIndexError::out_of_range(
                    "delete_len",
                    delete_len,
                    0..len - start + 1,
                ))
            }
        }

        Ok(Self {
            index,
            start,
            delete_len,
            insert,
        })
    }

    fn end(&self) -> usize {
        self.start + self.delete_len
    }

    fn is_noop(&self) -> bool {
        self.delete_len == 0 && self.insert.is_empty()
    }

    pub fn shape(&self) -> Result<EditShape> {
        if self.is_noop() {
            return Ok(EditShape::WithinLine);
        }
        if self.touches_crlf()? {
            return Ok(EditShape::ReglueLineEnding);
        }
        if self.start == 0 || self.end() == self.index.len_chars() {
            return Ok(EditShape::Boundary);
        }

        let inserted_breaks = chunk::split_lines(self.insert)
            .filter(|line| LineBreak::of(line).is_terminated())
            .count();
        let deleted_breaks = self.index.char_offset_to_line_col(self.end())?.line
            - self.index.char_offset_to_line_col(self.start)?.line;

        let shape = match (inserted_breaks, deleted_breaks) {
            (2.., _) => EditShape::InsertManyLines,
            (1, _) => EditShape::SplitLine,
            (0, 2..) => EditShape::DeleteAcrossLines,
            (0, 1) => EditShape::JoinLines,
            (0, 0) => EditShape::WithinLine,
        };
        Ok(shape)
    }

    /// Applies the edit and returns the new tree.
    pub fn apply(self) -> Result<LineIndex> {
        if log::log_enabled!(log::Level::Trace) {
            trace!(
                "edit {:?}: start: {}, delete_len: {}, insert: {:?}",
                self.shape()?,
                self.start,
                self.delete_len,
                self.insert
            );
        }
        if self.is_noop() {
            return Ok(self.index.clone());
        }

        let Region {
            first_chunk,
            mut end_chunk,
            start_offset,
            text,
        } = self.locate()?;

        let local_start = self.start - start_offset;
        let splice_start = chunk::char_to_byte_idx(&text, local_start);
        let splice_end =
            splice_start + chunk::char_to_byte_idx(&text[splice_start..], self.delete_len);

        let mut new_text = String::with_capacity(text.len() + self.insert.len());
        new_text.push_str(&text[..splice_start]);
        new_text.push_str(self.insert);
        new_text.push_str(&text[splice_end..]);

        // an unterminated last line has to absorb the line that follows it, and so does a
        // trailing \r whose \n starts the next line
        if let Some(next) = self.index.seek(DimensionChunkIdx(end_chunk)) {
            let needs_next = match LineBreak::of(&new_text) {
                _ if new_text.is_empty() => false,
                LineBreak::None => true,
                LineBreak::Cr => next.chunk.starts_with_lf(),
                LineBreak::Lf | LineBreak::CrLf => false,
            };
            if needs_next {
                new_text.push_str(next.chunk.as_str());
                end_chunk += 1;
            }
        }

        let new_chunks: Vec<LineChunk> = chunk::split_lines(&new_text).map(LineChunk::new).collect();
        Ok(self.index.replace_chunks(first_chunk..end_chunk, new_chunks))
    }

    fn locate(&self) -> Result<Region> {
        let index = self.index;

        let (mut first_chunk, mut start_offset) = match index.seek(DimensionCharIdx(self.start)) {
            Some(seek) => (seek.before.chunks, seek.before.chars),
            None => (index.chunk_count(), index.len_chars()),
        };
        // an edit at the very start of a line may have to be glued onto the previous line: it
        // either ends in a lone \r or has no terminator at all
        if self.start == start_offset && first_chunk > 0 {
            if let Some(prev) = index.seek(DimensionChunkIdx(first_chunk - 1)) {
                if !prev.chunk.ends_with_lf() {
                    first_chunk -= 1;
                    start_offset = prev.before.chars;
                }
            }
        }

        let (end_chunk, end_offset) = match index.seek(DimensionCharIdx(self.end())) {
            Some(seek) if seek.before.chars < self.end() => (
                seek.before.chunks + 1,
                seek.before.chars + seek.chunk.len_chars(),
            ),
            Some(seek) => (seek.before.chunks, seek.before.chars),
            None => (index.chunk_count(), index.len_chars()),
        };
        debug_assert!(first_chunk <= end_chunk);

        Ok(Region {
            first_chunk,
            end_chunk,
            start_offset,
            text: index.slice(start_offset..end_offset)?,
        })
    }

    fn touches_crlf(&self) -> Result<bool> {
        let index = self.index;
        let char_at = |pos: usize| -> Result<Option<char>> {
            if pos >= index.len_chars() {
                return Ok(None);
            }
            Ok(index.get_text(pos, 1)?.chars().next())
        };

        let before = match self.start {
            0 => None,
            start => char_at(start - 1)?,
        };
        let after = char_at(self.end())?;
        let first_removed = char_at(self.start)?.filter(|_| self.delete_len > 0);
        let last_removed = match self.delete_len {
            0 => None,
            _ => char_at(self.end() - 1)?,
        };
        let new_first = self.insert.chars().next().or(after);
        let new_last = self.insert.chars().next_back().or(before);

        let is_crlf = |a: Option<char>, b: Option<char>| a == Some('\r') && b == Some('\n');
        let formed = is_crlf(before, new_first) || is_crlf(new_last, after);
        let split = is_crlf(before, first_removed.or(after)) || is_crlf(last_removed, after);
        Ok(formed != split || (split && !self.insert.is_empty()))
    }
}
