use std::sync::{Mutex, PoisonError, RwLock};

use crate::{
    config::CacheConfig,
    observer::{CacheObserver, NoopObserver},
    version_cache::{ScriptVersionCache, Snapshot},
};

/// Shares one [`ScriptVersionCache`] between a writer (typically the thread applying edits from
/// the host) and any number of reader threads.
///
/// Readers never wait on an edit in progress: they get a clone of the last committed
/// [`Snapshot`], which shares its tree with the cache and stays valid however many edits follow.
/// Writers take turns mutating the cache and then commit its current version as the snapshot
/// handed to readers.
#[derive(Debug)]
pub struct SharedCache<O = NoopObserver> {
    snapshot: RwLock<Snapshot>,
    cache: Mutex<ScriptVersionCache<O>>,
}

impl SharedCache {
    pub fn from_text(text: &str, config: CacheConfig) -> Self {
        Self::new(ScriptVersionCache::from_text(text, config))
    }
}

impl<O: CacheObserver> SharedCache<O> {
    pub fn new(cache: ScriptVersionCache<O>) -> Self {
        Self {
            snapshot: RwLock::new(cache.snapshot()),
            cache: Mutex::new(cache),
        }
    }

    /// Latest committed version. Edits made by later calls to `write` are not visible to it.
    pub fn read(&self) -> Snapshot {
        let guard = self.snapshot.read().unwrap_or_else(PoisonError::into_inner);
        guard.clone()
    }

    /// Runs `f` with exclusive access to the cache and commits whatever version it leaves current.
    /// The commit happens even if `f` returns an error, since a failed edit leaves the cache as it
    /// was.
    pub fn write<F, U>(&self, f: F) -> U
    where
        F: FnOnce(&mut ScriptVersionCache<O>) -> U,
    {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        let u = f(&mut cache);

        let current = cache.snapshot();
        let mut commit_guard = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        *commit_guard = current;
        u
    }

    pub fn into_inner(self) -> ScriptVersionCache<O> {
        self.cache.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::EditStats;

    #[test]
    fn test_concurrent_edits() {
        let config = CacheConfig { max_versions: 4 };
        let buf = SharedCache::new(ScriptVersionCache::with_observer(
            config,
            EditStats::default(),
        ));

        const N: usize = 100;
        const WRITERS: usize = 2;
        const READERS: usize = 10;

        std::thread::scope(|s| {
            for i in 0..WRITERS {
                let buf = &buf;
                s.spawn(move || {
                    for j in 0..N {
                        let line = format!("line{j} from writer #{i}\n");
                        buf.write(|cache| {
                            let end = cache.len_chars();
                            cache.edit(end, 0, &line).unwrap();
                        });
                        std::thread::yield_now();
                    }
                });
            }

            for _i in 0..READERS {
                let buf = &buf;
                s.spawn(move || {
                    let mut last_version = 0;
                    for _j in 0..N {
                        let snapshot = buf.read();
                        // committed versions only move forward and are always whole lines
                        assert!(snapshot.version() >= last_version);
                        assert_eq!(snapshot.line_count(), snapshot.version() as usize + 1);
                        last_version = snapshot.version();
                        std::thread::yield_now();
                    }
                });
            }
        });

        let snapshot = buf.read();
        assert_eq!(snapshot.line_count(), WRITERS * N + 1);
        let cache = buf.into_inner();
        assert_eq!(cache.observer().total_edits(), WRITERS * N);
        assert_eq!(cache.current_version(), snapshot.version());
    }

    #[test]
    fn test_failed_write_keeps_snapshot() {
        let buf = SharedCache::from_text("ab\r\ncd", CacheConfig::default());
        let before = buf.read();
        let result = buf.write(|cache| cache.edit(100, 0, "x"));
        assert!(result.is_err());
        assert_eq!(buf.read().version(), before.version());
        assert_eq!(buf.read().to_string(), "ab\r\ncd");
    }
}
