use std::collections::VecDeque;

use log::debug;

use crate::{
    config::CacheConfig,
    edit::EditWalker,
    error::{LineIndexError, Result},
    observer::{CacheObserver, NoopObserver},
    text::TextSnapshot,
    tree::{LineCol, LineIndex},
};

/// Half open span of chars: [start, start + length)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextSpan {
    pub start: usize,
    pub length: usize,
}

impl TextSpan {
    pub fn new(start: usize, length: usize) -> Self {
        Self { start, length }
    }

    pub fn end(&self) -> usize {
        self.start + self.length
    }
}

/// The chars in `span` of the old text were replaced by `new_length` chars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChangeRange {
    pub span: TextSpan,
    pub new_length: usize,
}

impl std::fmt::Display for TextChangeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}--{}) -> {} chars",
            self.span.start,
            self.span.end(),
            self.new_length
        )
    }
}

impl TextChangeRange {
    pub fn new(span: TextSpan, new_length: usize) -> Self {
        Self { span, new_length }
    }

    /// End of the replacement in the new text.
    pub fn new_end(&self) -> usize {
        self.span.start + self.new_length
    }

    /// Merges consecutive changes, each expressed against the text the previous one produced,
    /// into a single range of the first text that covers all of them. Returns `None` when there
    /// are no changes.
    pub fn collapse<'a, I>(changes: I) -> Option<TextChangeRange>
    where
        I: IntoIterator<Item = &'a TextChangeRange>,
    {
        let mut changes = changes.into_iter();
        let first = changes.next()?;
        let mut old_start = first.span.start;
        let mut old_end = first.span.end();
        let mut new_end = first.new_end();

        for next in changes {
            let (next_old_end, next_new_end) = (next.span.end(), next.new_end());
            old_start = old_start.min(next.span.start);
            // whatever `next` deleted past the previous replacement existed in the old text
            // too, just shifted by the length difference of the previous changes
            let extended_old_end = old_end + next_old_end.saturating_sub(new_end);
            let extended_new_end = next_new_end + new_end.saturating_sub(next_old_end);
            old_end = extended_old_end;
            new_end = extended_new_end;
        }

        Some(TextChangeRange::new(
            TextSpan::new(old_start, old_end - old_start),
            new_end - old_start,
        ))
    }
}

/// Net change between two versions of a [`ScriptVersionCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeBetweenVersions {
    Unchanged,
    Changed(TextChangeRange),
}

/// An immutable version of the document. Holding on to a snapshot is cheap and it never changes,
/// whatever happens to the cache it came from.
#[derive(Debug, Clone)]
pub struct Snapshot {
    index: LineIndex,
    version: u64,
}

impl Snapshot {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn index(&self) -> &LineIndex {
        &self.index
    }

    pub fn line_count(&self) -> usize {
        self.index.line_count()
    }

    pub fn char_offset_to_line_col(&self, offset: usize) -> Result<LineCol> {
        self.index.char_offset_to_line_col(offset)
    }

    pub fn line_to_char_offset(&self, line: usize) -> Result<usize> {
        self.index.line_to_char_offset(line)
    }

    pub fn line_text(&self, line: usize) -> Result<String> {
        self.index.line_text(line)
    }
}

impl TextSnapshot for Snapshot {
    fn get_text(&self, start: usize, len: usize) -> Result<String> {
        self.index.get_text(start, len)
    }

    fn len_chars(&self) -> usize {
        self.index.len_chars()
    }
}

impl std::fmt::Display for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.index, f)
    }
}

/// Keeps a bounded history of document versions. Every edit produces a new version backed by a
/// tree that shares all untouched nodes with the previous one, so retaining old versions costs
/// O(log N) nodes per edit.
#[derive(Debug)]
pub struct ScriptVersionCache<O = NoopObserver> {
    config: CacheConfig,
    // oldest first, the current version last. never empty
    versions: VecDeque<Snapshot>,
    // the change that produced each retained version but the oldest one
    changes: VecDeque<(u64, TextChangeRange)>,
    observer: O,
}

impl Default for ScriptVersionCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl ScriptVersionCache {
    pub fn new(config: CacheConfig) -> Self {
        Self::with_observer(config, NoopObserver)
    }

    /// A cache whose version 0 holds `text`.
    pub fn from_text(text: &str, config: CacheConfig) -> Self {
        Self::from_text_with_observer(text, config, NoopObserver)
    }
}

impl<O: CacheObserver> ScriptVersionCache<O> {
    /// An empty document as version 0.
    pub fn with_observer(config: CacheConfig, observer: O) -> Self {
        Self::from_index(LineIndex::new(), config, observer)
    }

    pub fn from_text_with_observer(text: &str, config: CacheConfig, observer: O) -> Self {
        Self::from_index(LineIndex::from_text(text), config, observer)
    }

    fn from_index(index: LineIndex, config: CacheConfig, observer: O) -> Self {
        let initial = Snapshot { index, version: 0 };
        Self {
            config,
            versions: VecDeque::from([initial]),
            changes: VecDeque::new(),
            observer,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    pub fn current_version(&self) -> u64 {
        self.current().version
    }

    /// Oldest version that is still retained.
    pub fn min_version(&self) -> u64 {
        self.versions.front().map_or(0, |snapshot| snapshot.version)
    }

    /// Replaces the whole content with `text` as a new version. History is dropped: the new
    /// version becomes the oldest retained one.
    pub fn reload(&mut self, text: &str) -> u64 {
        self.reset(LineIndex::from_text(text))
    }

    /// Like [`reload`](Self::reload), for text that is already split into lines.
    pub fn load<I, S>(&mut self, lines: I) -> u64
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.reset(LineIndex::load(lines))
    }

    /// Replaces `delete_len` chars at `start` with `insert` and makes the result the new current
    /// version. On error nothing changes.
    pub fn edit(&mut self, start: usize, delete_len: usize, insert: &str) -> Result<u64> {
        let current = self.current();
        let walker = EditWalker::new(&current.index, start, delete_len, insert)?;
        let shape = walker.shape()?;
        let index = walker.apply()?;

        let version = current.version + 1;
        let change = TextChangeRange::new(
            TextSpan::new(start, delete_len),
            insert.chars().count(),
        );
        self.versions.push_back(Snapshot { index, version });
        self.changes.push_back((version, change));
        self.observer.on_edit(shape, version);
        debug!("version {version}: {shape:?} {change}");

        self.evict();
        Ok(version)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.current().clone()
    }

    pub fn snapshot_at(&mut self, version: u64) -> Result<Snapshot> {
        let found = self.lookup(version).cloned();
        self.observer.on_snapshot_lookup(found.is_some());
        found.ok_or_else(|| self.unknown_version(version))
    }

    /// The single change range that turns the text of version `old` into the text of version
    /// `new`.
    pub fn get_text_changes_between_versions(
        &self,
        old: u64,
        new: u64,
    ) -> Result<ChangeBetweenVersions> {
        if old > new {
            return Err(LineIndexError::InvalidVersionRange { old, new });
        }
        if old < self.min_version() {
            return Err(self.unknown_version(old));
        }
        if new > self.current_version() {
            return Err(self.unknown_version(new));
        }
        if old == new {
            return Ok(ChangeBetweenVersions::Unchanged);
        }

        let changes = self
            .changes
            .iter()
            .filter(|(version, _)| (old + 1..=new).contains(version))
            .map(|(_, change)| change);
        Ok(TextChangeRange::collapse(changes)
            .map_or(ChangeBetweenVersions::Unchanged, ChangeBetweenVersions::Changed))
    }

    pub fn len_chars(&self) -> usize {
        self.current().index.len_chars()
    }

    pub fn line_count(&self) -> usize {
        self.current().index.line_count()
    }

    pub fn get_text(&self, start: usize, len: usize) -> Result<String> {
        self.current().index.get_text(start, len)
    }

    pub fn char_offset_to_line_col(&self, offset: usize) -> Result<LineCol> {
        self.current().index.char_offset_to_line_col(offset)
    }

    pub fn line_to_char_offset(&self, line: usize) -> Result<usize> {
        self.current().index.line_to_char_offset(line)
    }

    pub fn line_text(&self, line: usize) -> Result<String> {
        self.current().index.line_text(line)
    }

    fn current(&self) -> &Snapshot {
        self.versions
            .back()
            .expect("the cache always holds its current version")
    }

    fn lookup(&self, version: u64) -> Option<&Snapshot> {
        let idx = version.checked_sub(self.min_version())?;
        self.versions.get(usize::try_from(idx).ok()?)
    }

    fn unknown_version(&self, version: u64) -> LineIndexError {
        LineIndexError::UnknownVersion {
            version,
            retained: self.min_version()..=self.current_version(),
        }
    }

    fn reset(&mut self, index: LineIndex) -> u64 {
        let version = self.current_version() + 1;
        for snapshot in self.versions.drain(..) {
            self.observer.on_evict(snapshot.version);
        }
        self.changes.clear();
        self.versions.push_back(Snapshot { index, version });
        debug!("version {version}: reloaded");
        version
    }

    fn evict(&mut self) {
        while self.versions.len() > self.config.retained_versions() {
            let Some(evicted) = self.versions.pop_front() else {
                break;
            };
            self.observer.on_evict(evicted.version);
            debug!("evicted version {}", evicted.version);
        }
        let min_version = self.min_version();
        while let Some((version, _)) = self.changes.front() {
            if *version > min_version {
                break;
            }
            self.changes.pop_front();
        }
    }
}
