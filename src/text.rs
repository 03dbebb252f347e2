use crate::error::Result;

/// Read-only access to the text of one immutable version of a document.
pub trait TextSnapshot {
    /// `len` chars starting at char offset `start`.
    fn get_text(&self, start: usize, len: usize) -> Result<String>;

    fn len_chars(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len_chars() == 0
    }
}

impl TextSnapshot for crate::LineIndex {
    fn get_text(&self, start: usize, len: usize) -> Result<String> {
        crate::LineIndex::get_text(self, start, len)
    }

    fn len_chars(&self) -> usize {
        crate::LineIndex::len_chars(self)
    }
}
