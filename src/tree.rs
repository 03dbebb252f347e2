use std::{
    ops::{Range, RangeBounds},
    sync::Arc,
};

use arrayvec::ArrayVec;

use crate::{
    chunk::{self, LineChunk},
    edit::EditWalker,
    error::{LineIndexError, Result},
};

// smaller nodes in tests to get deep trees out of small inputs
#[cfg(test)]
const TREE_BASE: usize = 2;
#[cfg(not(test))]
const TREE_BASE: usize = 8;

const MIN_CHILDREN: usize = TREE_BASE;
const MAX_CHILDREN: usize = TREE_BASE * 2;

/// A persistent B+-like tree of lines. Every leaf stores up to `MAX_CHILDREN` line chunks and
/// every node caches the character, byte and line break totals of its children, so seeking to an
/// offset or a line is O(log N).
///
/// Nodes are never mutated once built. Edits produce a new tree that shares every untouched
/// subtree with the old one, which makes cloning a LineIndex (taking a snapshot) O(1) and keeps
/// old clones valid forever.
#[derive(Debug, Clone)]
pub struct LineIndex {
    root: Arc<Node>,
}

/// 1-based line number and 0-based column, both in chars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LineCol {
    pub line: usize,
    pub column: usize,
}

impl std::fmt::Display for LineIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for chunk in self.chunks() {
            f.write_str(chunk.as_str())?;
        }
        Ok(())
    }
}

impl Default for LineIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for LineIndex {
    fn from(text: &str) -> Self {
        Self::from_text(text)
    }
}

impl LineIndex {
    pub fn new() -> Self {
        let root = Node::new_leaf([]);
        Self { root }
    }

    pub fn from_text(text: &str) -> Self {
        let chunks: Vec<LineChunk> = chunk::split_lines(text).map(LineChunk::new).collect();
        Self::from_nodes(Node::leaves_from(chunks))
    }

    /// Builds a tree out of a sequence of lines. The lines are joined before being segmented
    /// again, so they may or may not carry their terminators.
    pub fn load<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let text: String = lines.into_iter().fold(String::new(), |mut acc, line| {
            acc.push_str(line.as_ref());
            acc
        });
        Self::from_text(&text)
    }

    pub fn len_bytes(&self) -> usize {
        self.root.node_summary().bytes
    }

    pub fn len_chars(&self) -> usize {
        self.root.node_summary().chars
    }

    pub fn is_empty(&self) -> bool {
        self.len_chars() == 0
    }

    pub fn line_break_count(&self) -> usize {
        self.root.node_summary().line_breaks
    }

    /// Number of lines, counting the (possibly empty) line after the last line break.
    pub fn line_count(&self) -> usize {
        self.line_break_count() + 1
    }

    pub fn chunk_count(&self) -> usize {
        self.root.node_summary().chunks
    }

    pub fn height(&self) -> usize {
        self.root.height()
    }

    pub fn get_text(&self, start: usize, len: usize) -> Result<String> {
        let end = start
            .checked_add(len)
            .ok_or_else(|| LineIndexError::out_of_range("length", len, 0..self.len_chars()))?;
        self.slice(start..end)
    }

    pub fn slice<R: RangeBounds<usize>>(&self, char_range: R) -> Result<String> {
        let char_range = chunk::resolve_range(char_range, 0..self.len_chars())?;
        let mut out = String::with_capacity(char_range.len());
        self.root.collect_text(char_range, &mut out)?;
        Ok(out)
    }

    pub fn char_offset_to_line_col(&self, offset: usize) -> Result<LineCol> {
        match self.seek(DimensionCharIdx(offset)) {
            Some(seek) => Ok(LineCol {
                line: seek.before.line_breaks + 1,
                column: offset - seek.before.chars,
            }),
            None if offset == self.len_chars() => Ok(LineCol {
                line: self.line_count(),
                column: self.trailing_line_len(),
            }),
            None => Err(LineIndexError::out_of_range(
                "offset",
                offset,
                0..self.len_chars() + 1,
            )),
        }
    }

    pub fn line_to_char_offset(&self, line: usize) -> Result<usize> {
        self.check_line(line)?;
        match self.seek(DimensionLineIdx(line - 1)) {
            Some(seek) => Ok(seek.before.chars),
            None => Ok(self.len_chars() - self.trailing_line_len()),
        }
    }

    /// Text of the 1-based `line`, including its terminator.
    pub fn line_text(&self, line: usize) -> Result<String> {
        self.check_line(line)?;
        match self.seek(DimensionLineIdx(line - 1)) {
            Some(seek) => Ok(seek.chunk.as_str().to_string()),
            None => Ok(self
                .last_chunk()
                .filter(|chunk| !chunk.is_terminated())
                .map(|chunk| chunk.as_str().to_string())
                .unwrap_or_default()),
        }
    }

    /// Returns a new tree with `delete_len` chars at `start` replaced by `insert`. `self` is left
    /// untouched and stays valid.
    pub fn edit(&self, start: usize, delete_len: usize, insert: &str) -> Result<LineIndex> {
        EditWalker::new(self, start, delete_len, insert)?.apply()
    }

    /// Lazily iterates over the line chunks, in order.
    pub fn chunks(&self) -> iter::ChunkIter<'_> {
        iter::ChunkIter::new(&self.root)
    }

    pub(crate) fn last_chunk(&self) -> Option<&LineChunk> {
        let mut node = &*self.root;
        loop {
            match node {
                Node::Leaf { children, .. } => return children.last(),
                Node::Internal { children, .. } => node = children.last()?,
            }
        }
    }

    /// Replaces the chunks with indices in `range` with `new_chunks`.
    pub(crate) fn replace_chunks(&self, range: Range<usize>, new_chunks: Vec<LineChunk>) -> Self {
        debug_assert!(range.end <= self.chunk_count());
        Self::from_nodes(self.root.splice(range, new_chunks))
    }

    /// Checks every structural invariant of the tree and panics on the first violation.
    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        self.root.assert_invariants(true);

        let mut prev: Option<&LineChunk> = None;
        for (idx, chunk) in self.chunks().enumerate() {
            assert!(chunk.len_chars() > 0, "chunk {idx} is empty");
            if let Some(prev) = prev {
                assert!(prev.is_terminated(), "unterminated chunk before chunk {idx}");
                assert!(
                    prev.ends_with_lf() || !chunk.starts_with_lf(),
                    "crlf split before chunk {idx}"
                );
            }
            prev = Some(chunk);
        }
    }

    fn from_nodes(mut nodes: Vec<Arc<Node>>) -> Self {
        loop {
            match nodes.len() {
                0 => return Self::new(),
                1 => {
                    let mut root = nodes.pop().expect("checked len");
                    while let Node::Internal { children, .. } = &*root {
                        if children.len() != 1 {
                            break;
                        }
                        root = children[0].clone();
                    }
                    return Self { root };
                }
                _ => {
                    let height = nodes[0].height() + 1;
                    nodes = Node::internals_from(height, nodes);
                }
            }
        }
    }

    pub(crate) fn seek<D: Dimension>(&self, target: D) -> Option<Seek<'_>> {
        let mut node = &*self.root;
        if target >= D::from(node.node_summary()) {
            return None;
        }

        let mut before = TextSummary::default();
        let mut target = target;
        loop {
            let (child_idx, rem) = node.child_position(target);
            before += summarize(&node.child_summaries()[..child_idx]);
            target = rem;
            match node {
                Node::Leaf { children, .. } => {
                    return Some(Seek {
                        chunk: &children[child_idx],
                        before,
                    })
                }
                Node::Internal { children, .. } => node = &children[child_idx],
            }
        }
    }

    fn check_line(&self, line: usize) -> Result<()> {
        if line == 0 || line > self.line_count() {
            return Err(LineIndexError::out_of_range(
                "line",
                line,
                1..self.line_count() + 1,
            ));
        }
        Ok(())
    }

    // chars on the last line, which is the one that has no terminator
    fn trailing_line_len(&self) -> usize {
        self.last_chunk()
            .filter(|chunk| !chunk.is_terminated())
            .map_or(0, LineChunk::len_chars)
    }
}

/// Result of seeking to a chunk: the chunk itself and the totals of everything before it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Seek<'a> {
    pub chunk: &'a LineChunk,
    pub before: TextSummary,
}

pub mod iter {
    use crate::chunk::LineChunk;

    use super::Node;

    #[derive(Debug, Clone)]
    pub struct ChunkIter<'a> {
        root: Option<&'a Node>,
        stack: Vec<(&'a Node, usize)>,
    }

    impl<'a> ChunkIter<'a> {
        pub(super) fn new(node: &'a Node) -> Self {
            let root = Some(node);
            let stack = vec![];
            Self { root, stack }
        }

        // establish the invariant that top of the stack is always pointing to a leaf node and the
        // index is valid within that node
        fn fixup(&mut self) {
            let is_not_valid = |(node, index): &&mut (&Node, usize)| {
                !node.is_leaf() || *index >= node.child_summaries().len()
            };
            while let Some((node, index)) = self.stack.last_mut().filter(is_not_valid) {
                match node {
                    Node::Leaf { children, .. } => {
                        debug_assert!(*index >= children.len());
                        self.stack.pop();
                    }
                    Node::Internal { children, .. } => {
                        if *index >= children.len() {
                            self.stack.pop();
                            continue;
                        }
                        *index += 1;
                        let child = children[*index - 1].as_ref();
                        self.stack.push((child, 0));
                    }
                }
            }
        }
    }

    impl<'a> Iterator for ChunkIter<'a> {
        type Item = &'a LineChunk;

        fn next(&mut self) -> Option<Self::Item> {
            if let Some(root) = self.root.take() {
                self.stack.push((root, 0));
            }

            self.fixup();

            let (node, child_idx) = self.stack.last_mut()?;
            let node: &'a Node = node;
            let ret = node
                .child_chunks()
                .get(*child_idx)
                .expect("top of stack should always be valid");
            *child_idx += 1;
            Some(ret)
        }
    }

    impl<'a> std::iter::FusedIterator for ChunkIter<'a> {}
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        node_summary: TextSummary,
        children: ArrayVec<LineChunk, MAX_CHILDREN>,
        child_summaries: ArrayVec<TextSummary, MAX_CHILDREN>,
    },
    Internal {
        height: usize,
        node_summary: TextSummary,
        children: ArrayVec<Arc<Node>, MAX_CHILDREN>,
        child_summaries: ArrayVec<TextSummary, MAX_CHILDREN>,
    },
}

impl Node {
    fn height(&self) -> usize {
        match *self {
            Node::Leaf { .. } => 0,
            Node::Internal { height, .. } => height,
        }
    }

    fn node_summary(&self) -> &TextSummary {
        match *self {
            Node::Leaf {
                ref node_summary, ..
            } => node_summary,
            Node::Internal {
                ref node_summary, ..
            } => node_summary,
        }
    }

    fn new_leaf<I: IntoIterator<Item = LineChunk>>(children: I) -> Arc<Node> {
        let children: ArrayVec<LineChunk, MAX_CHILDREN> = children.into_iter().collect();
        let mut n = Node::Leaf {
            children,
            node_summary: TextSummary::default(),
            child_summaries: ArrayVec::new(),
        };
        n.recompute_summaries();
        Arc::new(n)
    }

    fn new_internal<I: IntoIterator<Item = Arc<Node>>>(height: usize, children: I) -> Arc<Node> {
        let children: ArrayVec<Arc<Node>, MAX_CHILDREN> = children.into_iter().collect();
        debug_assert!(children.iter().all(|c| c.height() + 1 == height));
        let mut n = Self::Internal {
            height,
            children,
            node_summary: TextSummary::default(),
            child_summaries: ArrayVec::new(),
        };
        n.recompute_summaries();
        Arc::new(n)
    }

    /// Packs chunks into as few leaves as possible, spreading them evenly so that every leaf
    /// holds at least MIN_CHILDREN chunks whenever more than one leaf is needed.
    fn leaves_from(chunks: Vec<LineChunk>) -> Vec<Arc<Node>> {
        let mut chunks = chunks.into_iter();
        group_sizes(chunks.len())
            .map(|size| Node::new_leaf(chunks.by_ref().take(size)))
            .collect()
    }

    fn internals_from(height: usize, children: Vec<Arc<Node>>) -> Vec<Arc<Node>> {
        let mut children = children.into_iter();
        group_sizes(children.len())
            .map(|size| Node::new_internal(height, children.by_ref().take(size)))
            .collect()
    }

    fn recompute_summaries(&mut self) {
        match self {
            Node::Leaf {
                children,
                child_summaries,
                node_summary,
                ..
            } => {
                *node_summary = TextSummary::default();
                child_summaries.clear();
                children
                    .iter()
                    .map(TextSummary::from)
                    .for_each(|cs| {
                        child_summaries.push(cs);
                        *node_summary += cs;
                    })
            }
            Node::Internal {
                children,
                child_summaries,
                node_summary,
                ..
            } => {
                *node_summary = TextSummary::default();
                child_summaries.clear();
                children
                    .iter()
                    .map(|c| *c.node_summary())
                    .for_each(|cs| {
                        child_summaries.push(cs);
                        *node_summary += cs;
                    })
            }
        }
    }

    /// scans this node's children from left to right while the running sum of dimension is less
    /// than the passed in `seek_target`. Returns the index of the child that will cause the
    /// running sum to exceed the target and the remaining seek_target.
    fn child_position<D: Dimension>(&self, seek_target: D) -> (usize, D) {
        debug_assert!(
            seek_target < D::from(self.node_summary()),
            "seek_target is outside bounds: {seek_target:?} / {:?}",
            D::from(self.node_summary())
        );

        let mut running_sum = D::default();
        for (child_idx, child_summary) in self.child_summaries().iter().enumerate() {
            let next_sum = running_sum + D::from(child_summary);
            if next_sum > seek_target {
                return (child_idx, seek_target - running_sum);
            }
            running_sum = next_sum;
        }

        unreachable!("validated that seek_target is within range earlier")
    }

    fn collect_text(&self, char_range: Range<usize>, out: &mut String) -> Result<()> {
        let mut offset = 0;
        for (child_idx, child_summary) in self.child_summaries().iter().enumerate() {
            if offset >= char_range.end {
                break;
            }
            let child_end = offset + child_summary.chars;
            let start = char_range.start.max(offset);
            let end = char_range.end.min(child_end);
            if start < end {
                let local = start - offset..end - offset;
                match self {
                    Node::Leaf { children, .. } => {
                        out.push_str(children[child_idx].slice_chars(local)?)
                    }
                    Node::Internal { children, .. } => {
                        children[child_idx].collect_text(local, out)?
                    }
                }
            }
            offset = child_end;
        }
        Ok(())
    }

    /// Replaces the chunks in `range` (indices relative to this node) with `new_chunks`. Returns
    /// the nodes that take the place of `self`: all of them have the same height as `self`, there
    /// may be none (everything was removed) or several (the node overflowed). A lone returned
    /// node may be underfull; the caller is responsible for merging it with a sibling.
    fn splice(&self, range: Range<usize>, new_chunks: Vec<LineChunk>) -> Vec<Arc<Node>> {
        match self {
            Node::Leaf { children, .. } => {
                let mut chunks =
                    Vec::with_capacity(children.len() - range.len() + new_chunks.len());
                chunks.extend(children[..range.start].iter().cloned());
                chunks.extend(new_chunks);
                chunks.extend(children[range.end..].iter().cloned());
                Node::leaves_from(chunks)
            }
            Node::Internal {
                height, children, ..
            } => {
                let ((first, first_offset), (last, last_offset)) = self.child_span(&range);

                let mut new_children = Vec::with_capacity(children.len() + 2);
                new_children.extend(children[..first].iter().cloned());
                if first == last {
                    let local = range.start - first_offset..range.end - first_offset;
                    new_children.extend(children[first].splice(local, new_chunks));
                } else {
                    // everything strictly between first and last is dropped
                    let first_len = self.child_summaries()[first].chunks;
                    new_children.extend(
                        children[first].splice(range.start - first_offset..first_len, new_chunks),
                    );
                    new_children
                        .extend(children[last].splice(0..range.end - last_offset, Vec::new()));
                }
                new_children.extend(children[last + 1..].iter().cloned());

                fix_underfull(&mut new_children);
                Node::internals_from(*height, new_children)
            }
        }
    }

    /// Finds the children covering chunk `range` together with the number of chunks before each
    /// of them. An empty range at the very end of the node is assigned to the last child.
    fn child_span(&self, range: &Range<usize>) -> ((usize, usize), (usize, usize)) {
        let summaries = self.child_summaries();
        debug_assert!(!summaries.is_empty());

        let mut first = None;
        let mut last = None;
        let mut offset = 0;
        for (child_idx, summary) in summaries.iter().enumerate() {
            let child_end = offset + summary.chunks;
            if first.is_none() && range.start < child_end {
                first = Some((child_idx, offset));
            }
            if !range.is_empty() && range.end <= child_end {
                last = Some((child_idx, offset));
                break;
            }
            offset = child_end;
        }

        let last_child = summaries.len() - 1;
        let first = first.unwrap_or_else(|| (last_child, offset - summaries[last_child].chunks));
        let last = last.unwrap_or(first);
        (first, last)
    }

    fn len(&self) -> usize {
        self.child_summaries().len()
    }

    fn is_underfull(&self) -> bool {
        self.len() < MIN_CHILDREN
    }

    fn child_chunks(&self) -> &ArrayVec<LineChunk, MAX_CHILDREN> {
        match self {
            Node::Leaf { children, .. } => children,
            Node::Internal { .. } => panic!("cannot call child_chunks on internal nodes"),
        }
    }

    fn child_summaries(&self) -> &[TextSummary] {
        match *self {
            Node::Leaf {
                ref child_summaries,
                ..
            } => child_summaries,
            Node::Internal {
                ref child_summaries,
                ..
            } => child_summaries,
        }
    }

    fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    fn assert_invariants(&self, is_root: bool) {
        let recomputed = summarize(self.child_summaries());
        assert_eq!(&recomputed, self.node_summary(), "stale node summary");
        assert!(self.len() <= MAX_CHILDREN, "node has {} children", self.len());
        if !is_root {
            assert!(
                !self.is_underfull(),
                "non-root node at height {} has {} children",
                self.height(),
                self.len()
            );
        }

        match self {
            Node::Leaf {
                children,
                child_summaries,
                ..
            } => {
                for (chunk, summary) in children.iter().zip(child_summaries) {
                    assert_eq!(&TextSummary::from(chunk), summary, "stale chunk summary");
                }
            }
            Node::Internal {
                height,
                children,
                child_summaries,
                ..
            } => {
                assert!(!is_root || children.len() > 1, "internal root with one child");
                for (child, summary) in children.iter().zip(child_summaries) {
                    assert_eq!(child.height() + 1, *height, "unbalanced tree");
                    assert_eq!(child.node_summary(), summary, "stale child summary");
                    child.assert_invariants(false);
                }
            }
        }
    }
}

/// Merges every underfull node in `nodes` into one of its neighbours. All nodes must share the
/// same height. A single remaining node is left alone, however small.
fn fix_underfull(nodes: &mut Vec<Arc<Node>>) {
    let mut idx = 0;
    while nodes.len() > 1 && idx < nodes.len() {
        if !nodes[idx].is_underfull() {
            idx += 1;
            continue;
        }
        let left = if idx + 1 < nodes.len() { idx } else { idx - 1 };
        let merged = merge_siblings(&nodes[left], &nodes[left + 1]);
        nodes.splice(left..left + 2, merged);
        idx = left;
    }
}

/// Combines two adjacent nodes of the same height into one node, or into two evenly filled ones
/// when their children don't fit into one.
fn merge_siblings(left: &Node, right: &Node) -> Vec<Arc<Node>> {
    match (left, right) {
        (Node::Leaf { children: l, .. }, Node::Leaf { children: r, .. }) => {
            Node::leaves_from(l.iter().chain(r.iter()).cloned().collect())
        }
        (
            Node::Internal {
                height,
                children: l,
                ..
            },
            Node::Internal { children: r, .. },
        ) => {
            let mut children: Vec<Arc<Node>> = l.iter().chain(r.iter()).cloned().collect();
            // a node that was underfull itself can bring along an underfull only-child
            fix_underfull(&mut children);
            Node::internals_from(*height, children)
        }
        _ => unreachable!("siblings must have the same height"),
    }
}

/// Splits `n` items into the fewest groups of at most MAX_CHILDREN, sizes differing by at most
/// one.
fn group_sizes(n: usize) -> impl Iterator<Item = usize> {
    let groups = n.div_ceil(MAX_CHILDREN);
    let (base, extra) = if groups == 0 {
        (0, 0)
    } else {
        (n / groups, n % groups)
    };
    (0..groups).map(move |idx| base + (idx < extra) as usize)
}

/// Any type that can be used to seek to a specific leaf node via searching `TextSummary`-s.
pub(crate) trait Dimension:
    for<'a> From<&'a TextSummary>
    + Default
    + Clone
    + Copy
    + std::ops::Add<Output = Self>
    + std::ops::Sub<Output = Self>
    + std::cmp::Ord
    + std::fmt::Debug
{
}

macro_rules! dimension {
    ($name:ident, $field:ident) => {
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
        pub(crate) struct $name(pub usize);
        impl Dimension for $name {}

        impl<'a> From<&'a TextSummary> for $name {
            fn from(value: &'a TextSummary) -> Self {
                Self(value.$field)
            }
        }
        impl std::ops::Add for $name {
            type Output = Self;

            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }
        impl std::ops::Sub for $name {
            type Output = Self;

            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }
    };
}

dimension!(DimensionCharIdx, chars);
dimension!(DimensionLineIdx, line_breaks);
dimension!(DimensionChunkIdx, chunks);

fn summarize<'a, T: IntoIterator<Item = &'a TextSummary>>(summaries: T) -> TextSummary {
    summaries
        .into_iter()
        .fold(TextSummary::default(), |agg, s| agg + s)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TextSummary {
    pub chars: usize,
    pub bytes: usize,
    pub line_breaks: usize,
    pub chunks: usize,
}
impl std::ops::Add<&TextSummary> for TextSummary {
    type Output = TextSummary;

    fn add(self, rhs: &TextSummary) -> Self::Output {
        TextSummary {
            chars: self.chars + rhs.chars,
            bytes: self.bytes + rhs.bytes,
            line_breaks: self.line_breaks + rhs.line_breaks,
            chunks: self.chunks + rhs.chunks,
        }
    }
}
impl std::ops::AddAssign for TextSummary {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + &rhs;
    }
}
impl<'a> From<&'a LineChunk> for TextSummary {
    fn from(value: &'a LineChunk) -> Self {
        Self {
            chars: value.len_chars(),
            bytes: value.len_bytes(),
            line_breaks: value.line_breaks(),
            chunks: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOY: &str = "ab\r\ncd\r\nef";

    fn numbered_lines(n: usize) -> String {
        (0..n).map(|i| format!("line {i}\n")).collect()
    }

    #[test]
    fn test_tree_1() {
        let tree = LineIndex::new();
        assert_eq!(tree.len_bytes(), 0);
        assert_eq!(tree.len_chars(), 0);
        assert_eq!(tree.line_count(), 1);
        assert_eq!(tree.get_text(0, 0).unwrap(), "");
        assert_eq!(
            tree.char_offset_to_line_col(0).unwrap(),
            LineCol { line: 1, column: 0 }
        );
        assert_eq!(tree.line_to_char_offset(1).unwrap(), 0);
        assert_eq!(tree.line_text(1).unwrap(), "");
        tree.assert_invariants();

        let tree = LineIndex::from_text("hello \u{0d30}\u{0d4b}\u{0d39}\u{0d3f}!\n");
        assert_eq!(tree.len_bytes(), 20);
        assert_eq!(tree.len_chars(), 12);
        assert_eq!(tree.line_count(), 2);
        assert_eq!(tree.get_text(6, 2).unwrap(), "\u{0d30}\u{0d4b}");
    }

    #[test]
    fn test_toy_queries() {
        let tree = LineIndex::from(TOY);
        assert_eq!(tree.len_chars(), 10);
        assert_eq!(tree.line_count(), 3);
        assert_eq!(tree.chunk_count(), 3);
        assert_eq!(tree.to_string(), TOY);

        assert_eq!(tree.line_to_char_offset(1).unwrap(), 0);
        assert_eq!(tree.line_to_char_offset(2).unwrap(), 4);
        assert_eq!(tree.line_to_char_offset(3).unwrap(), 8);
        assert!(tree.line_to_char_offset(0).is_err());
        assert!(tree.line_to_char_offset(4).is_err());

        assert_eq!(
            tree.char_offset_to_line_col(3).unwrap(),
            LineCol { line: 1, column: 3 }
        );
        assert_eq!(
            tree.char_offset_to_line_col(4).unwrap(),
            LineCol { line: 2, column: 0 }
        );
        assert_eq!(
            tree.char_offset_to_line_col(10).unwrap(),
            LineCol { line: 3, column: 2 }
        );
        assert!(tree.char_offset_to_line_col(11).is_err());

        assert_eq!(tree.line_text(2).unwrap(), "cd\r\n");
        assert_eq!(tree.line_text(3).unwrap(), "ef");
    }

    #[test]
    fn test_trailing_line_break() {
        let tree = LineIndex::from_text("a\nb\n");
        assert_eq!(tree.line_count(), 3);
        assert_eq!(tree.line_to_char_offset(3).unwrap(), 4);
        assert_eq!(tree.line_text(3).unwrap(), "");
        assert_eq!(
            tree.char_offset_to_line_col(4).unwrap(),
            LineCol { line: 3, column: 0 }
        );
    }

    #[test]
    fn test_load_lines() {
        let tree = LineIndex::load(["ab\r\n", "cd\r\n", "ef"]);
        assert_eq!(tree.to_string(), TOY);

        // lines without terminators are simply joined
        let tree = LineIndex::load(["ab", "cd"]);
        assert_eq!(tree.to_string(), "abcd");
        assert_eq!(tree.line_count(), 1);
    }

    #[test]
    fn test_deep_tree() {
        let text = numbered_lines(500);
        let tree = LineIndex::from_text(&text);
        tree.assert_invariants();
        assert!(tree.height() > 3);
        assert_eq!(tree.line_count(), 501);
        assert_eq!(tree.to_string(), text);

        let offset = tree.line_to_char_offset(321).unwrap();
        assert_eq!(tree.get_text(offset, 9).unwrap(), "line 320\n");
        assert_eq!(
            tree.char_offset_to_line_col(offset + 5).unwrap(),
            LineCol {
                line: 321,
                column: 5
            }
        );
        assert_eq!(tree.chunks().count(), 500);
    }

    #[test]
    fn test_slice_across_leaves() {
        let text = numbered_lines(40);
        let tree = LineIndex::from_text(&text);
        assert_eq!(tree.slice(3..100).unwrap(), &text[3..100]);
        assert_eq!(tree.slice(..).unwrap(), text);
        assert_eq!(tree.slice(text.len()..).unwrap(), "");
        assert!(tree.slice(..text.len() + 1).is_err());
        assert!(tree.get_text(usize::MAX, 2).is_err());
    }

    #[test]
    fn test_replace_chunks_keeps_balance() {
        let tree = LineIndex::from_text(&numbered_lines(100));
        let chunks = |n: usize| -> Vec<LineChunk> {
            (0..n).map(|i| LineChunk::new(&format!("new {i}\n"))).collect()
        };

        let removed = tree.replace_chunks(10..90, Vec::new());
        removed.assert_invariants();
        assert_eq!(removed.chunk_count(), 20);

        let grown = tree.replace_chunks(50..50, chunks(300));
        grown.assert_invariants();
        assert_eq!(grown.chunk_count(), 400);
        assert_eq!(grown.line_text(51).unwrap(), "new 0\n");

        let emptied = tree.replace_chunks(0..100, Vec::new());
        emptied.assert_invariants();
        assert!(emptied.is_empty());
        assert_eq!(emptied.height(), 0);

        // the original is untouched
        tree.assert_invariants();
        assert_eq!(tree.chunk_count(), 100);
    }

    #[test]
    fn test_child_span() {
        let tree = LineIndex::from_text(&numbered_lines(40));
        let root = &tree.root;
        let summaries = root.child_summaries();
        assert!(summaries.len() > 1);
        let first_len = summaries[0].chunks;
        let last_child = summaries.len() - 1;

        // ranges that stop before the last child
        assert_eq!(root.child_span(&(0..1)), ((0, 0), (0, 0)));
        assert_eq!(
            root.child_span(&(first_len - 1..first_len + 1)),
            ((0, 0), (1, first_len))
        );

        // an empty range at the very end belongs to the last child
        let last_offset = 40 - summaries[last_child].chunks;
        assert_eq!(
            root.child_span(&(40..40)),
            ((last_child, last_offset), (last_child, last_offset))
        );
        assert_eq!(
            root.child_span(&(39..40)),
            ((last_child, last_offset), (last_child, last_offset))
        );
    }

    #[test]
    fn test_replace_chunks_in_the_middle() {
        let text = numbered_lines(60);
        let tree = LineIndex::from_text(&text);
        for start in (0..60).step_by(7) {
            for end in [start, start + 1, (start + 13).min(60), 60] {
                let replaced =
                    tree.replace_chunks(start..end, vec![LineChunk::new("replaced\n")]);
                replaced.assert_invariants();
                assert_eq!(replaced.chunk_count(), 60 - (end - start) + 1);
                assert_eq!(replaced.line_text(start + 1).unwrap(), "replaced\n");
            }
        }
        assert_eq!(tree.to_string(), text);
    }

    #[test]
    fn test_group_sizes() {
        assert_eq!(group_sizes(0).count(), 0);
        assert_eq!(group_sizes(3).collect::<Vec<_>>(), [3]);
        assert_eq!(group_sizes(MAX_CHILDREN + 1).collect::<Vec<_>>(), [3, 2]);
        assert!(group_sizes(101).all(|size| (MIN_CHILDREN..=MAX_CHILDREN).contains(&size)));
        assert_eq!(group_sizes(101).sum::<usize>(), 101);
    }

    #[test]
    fn test_chunk_iter_is_restartable() {
        let tree = LineIndex::from_text(&numbered_lines(25));
        let first: Vec<_> = tree.chunks().map(LineChunk::as_str).collect();
        let second: Vec<_> = tree.chunks().map(LineChunk::as_str).collect();
        assert_eq!(first, second);
        assert_eq!(first[7], "line 7\n");
    }
}
