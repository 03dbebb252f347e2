mod edit;
mod error;
mod line_map;
mod observer;
mod text;
mod tree;
mod version_cache;

pub mod buffer;
pub mod chunk;
pub mod config;
pub mod host;

pub use config::CacheConfig;
pub use edit::{EditShape, EditWalker};
pub use error::{LineIndexError, Result};
pub use line_map::LineMap;
pub use observer::{CacheObserver, EditStats, NoopObserver};
pub use text::TextSnapshot;
pub use tree::{iter::ChunkIter, LineCol, LineIndex};
pub use version_cache::{
    ChangeBetweenVersions, ScriptVersionCache, Snapshot, TextChangeRange, TextSpan,
};
