//! In-memory chunk cache for art transfers in progress.
//!
//! A client reads an image through repeated `albumart <uri> <offset>`
//! calls. The first call fetches the whole image and parks it here under
//! the requested identifier; later calls slice it. The entry is dropped
//! once the final chunk has been handed out, or by [`ChunkCache::sweep_idle`]
//! if the client never comes back for it.
//!
//! Each entry carries a [`OnceCell`], so concurrent first requests for the
//! same identifier share one fetch instead of racing.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::OnceCell;

/// Bytes served per `albumart` call.
pub const CHUNK_SIZE: usize = 8192;

/// A fully fetched image, keyed by the identifier the client asked for.
#[derive(Debug)]
pub struct CachedBlob {
    key: String,
    bytes: Vec<u8>,
}

impl CachedBlob {
    pub fn new(key: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            key: key.into(),
            bytes,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn total_size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Slice the chunk starting at `offset`.
    ///
    /// Offsets at or past the end yield an empty, final chunk.
    pub fn chunk(&self, offset: u64) -> Chunk<'_> {
        let total_size = self.total_size();
        let size = total_size.saturating_sub(offset).min(CHUNK_SIZE as u64);
        let data = if size == 0 {
            &[][..]
        } else {
            // offset < total_size here, so both bounds fit in usize
            let start = offset as usize;
            &self.bytes[start..start + size as usize]
        };

        Chunk {
            total_size,
            offset,
            data,
        }
    }
}

/// One slice of a [`CachedBlob`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub total_size: u64,
    pub offset: u64,
    pub data: &'a [u8],
}

impl Chunk<'_> {
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Whether this chunk reaches the end of the image.
    pub fn is_final(&self) -> bool {
        self.offset.saturating_add(self.size()) >= self.total_size
    }
}

/// Cache entry: a ready blob, or an in-flight fetch when the cell is empty.
#[derive(Debug)]
struct Slot {
    blob: OnceCell<Arc<CachedBlob>>,
    last_read: Mutex<Instant>,
}

impl Slot {
    fn pending() -> Self {
        Self {
            blob: OnceCell::new(),
            last_read: Mutex::new(Instant::now()),
        }
    }

    fn ready(blob: Arc<CachedBlob>) -> Self {
        Self {
            blob: OnceCell::from(blob),
            last_read: Mutex::new(Instant::now()),
        }
    }

    fn touch(&self) {
        *self.last_read.lock() = Instant::now();
    }
}

/// Process-wide cache of in-progress art transfers.
///
/// The index lock is only held for map operations, never across a fetch.
#[derive(Debug, Default)]
pub struct ChunkCache {
    entries: Mutex<HashMap<String, Arc<Slot>>>,
}

impl ChunkCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the ready blob for an identifier, if any.
    pub fn get(&self, key: &str) -> Option<Arc<CachedBlob>> {
        let slot = self.entries.lock().get(key).cloned()?;
        let blob = slot.blob.get().cloned()?;
        slot.touch();
        Some(blob)
    }

    /// Store a blob, replacing whatever was cached for the identifier.
    pub fn put(&self, key: &str, bytes: Vec<u8>) -> Arc<CachedBlob> {
        let blob = Arc::new(CachedBlob::new(key, bytes));
        let previous = self
            .entries
            .lock()
            .insert(key.to_string(), Arc::new(Slot::ready(blob.clone())));
        if previous.is_some() {
            tracing::debug!("Replaced cached art for {}", key);
        }
        blob
    }

    /// Remove the entry for an identifier. Returns whether one existed.
    pub fn evict(&self, key: &str) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// Get the blob for an identifier, running `fetch` on a miss.
    ///
    /// Callers arriving while a fetch for the same identifier is running
    /// wait for it instead of starting their own. A failed fetch is not
    /// remembered: a waiter queued behind it runs its own fetch on the same
    /// entry, and the entry goes away once nobody is left to retry.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &str, fetch: F) -> Result<Arc<CachedBlob>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<u8>, E>>,
    {
        let slot = self
            .entries
            .lock()
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Slot::pending()))
            .clone();

        let result = slot
            .blob
            .get_or_try_init(|| async move {
                let bytes = fetch().await?;
                tracing::debug!("Cached {} bytes of art for {}", bytes.len(), key);
                Ok::<_, E>(Arc::new(CachedBlob::new(key, bytes)))
            })
            .await
            .cloned();

        match result {
            Ok(blob) => {
                // Not re-inserted: an entry evicted meanwhile stays evicted
                slot.touch();
                Ok(blob)
            }
            Err(e) => {
                // Keep the slot while waiters hold it, so the one that retries
                // stays visible to late arrivals. Holders: the map and us.
                let mut entries = self.entries.lock();
                if Arc::strong_count(&slot) == 2
                    && entries
                        .get(key)
                        .is_some_and(|current| Arc::ptr_eq(current, &slot) && !current.blob.initialized())
                {
                    entries.remove(key);
                }
                Err(e)
            }
        }
    }

    /// Drop ready entries nobody has read for `max_idle`.
    ///
    /// Returns the number of entries removed. In-flight fetches are kept;
    /// empty entries nobody is fetching into are dropped.
    pub fn sweep_idle(&self, max_idle: Duration) -> usize {
        self.sweep_idle_at(Instant::now(), max_idle)
    }

    fn sweep_idle_at(&self, now: Instant, max_idle: Duration) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|key, slot| {
            let idle = now.saturating_duration_since(*slot.last_read.lock());
            let keep = if slot.blob.initialized() {
                idle < max_idle
            } else {
                Arc::strong_count(slot) > 1
            };
            if !keep {
                tracing::debug!("Dropping abandoned art transfer for {} (idle {:?})", key, idle);
            }
            keep
        });
        before - entries.len()
    }

    /// Whether a ready blob is cached for the identifier.
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .lock()
            .get(key)
            .is_some_and(|slot| slot.blob.initialized())
    }

    /// Number of entries, including in-flight fetches.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Total bytes held by ready entries.
    pub fn size_bytes(&self) -> u64 {
        self.entries
            .lock()
            .values()
            .filter_map(|slot| slot.blob.get())
            .map(|blob| blob.total_size())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_chunk_sizes() {
        let blob = CachedBlob::new("k", vec![7u8; 20_000]);

        let first = blob.chunk(0);
        assert_eq!(first.size(), 8192);
        assert_eq!(first.total_size, 20_000);
        assert!(!first.is_final());

        let last = blob.chunk(16_384);
        assert_eq!(last.size(), 20_000 - 16_384);
        assert!(last.is_final());
    }

    #[test]
    fn test_chunk_past_end_is_empty_and_final() {
        let blob = CachedBlob::new("k", vec![1, 2, 3]);

        let at_end = blob.chunk(3);
        assert_eq!(at_end.size(), 0);
        assert!(at_end.is_final());

        let beyond = blob.chunk(u64::MAX);
        assert_eq!(beyond.size(), 0);
        assert!(beyond.is_final());
    }

    #[test]
    fn test_chunk_data_matches_slice() {
        let bytes: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        let blob = CachedBlob::new("k", bytes.clone());

        assert_eq!(blob.chunk(8192).data, &bytes[8192..]);
        assert_eq!(blob.chunk(100).data, &bytes[100..8292]);
    }

    #[test]
    fn test_put_get_evict() {
        let cache = ChunkCache::new();
        assert!(cache.get("a").is_none());

        cache.put("a", vec![1, 2, 3]);
        let blob = cache.get("a").unwrap();
        assert_eq!(blob.key(), "a");
        assert_eq!(blob.total_size(), 3);
        assert_eq!(cache.size_bytes(), 3);

        assert!(cache.evict("a"));
        assert!(!cache.evict("a"));
        assert!(cache.get("a").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_put_overwrites_stale_entry() {
        let cache = ChunkCache::new();
        cache.put("a", vec![1]);
        cache.put("a", vec![1, 2]);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a").unwrap().total_size(), 2);
    }

    #[tokio::test]
    async fn test_get_or_fetch_fetches_once() {
        let cache = ChunkCache::new();
        let fetches = AtomicUsize::new(0);

        for _ in 0..3 {
            let blob = cache
                .get_or_fetch("a", || async {
                    fetches.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(vec![9; 10])
                })
                .await
                .unwrap();
            assert_eq!(blob.total_size(), 10);
        }

        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert!(cache.contains("a"));
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_no_entry() {
        let cache = ChunkCache::new();

        let result = cache
            .get_or_fetch("a", || async { Err::<Vec<u8>, _>("boom".to_string()) })
            .await;
        assert_eq!(result.unwrap_err(), "boom");
        assert!(cache.is_empty());

        // Failures are not remembered
        let blob = cache
            .get_or_fetch("a", || async { Ok::<_, String>(vec![1]) })
            .await
            .unwrap();
        assert_eq!(blob.total_size(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_requests_share_one_fetch() {
        let cache = Arc::new(ChunkCache::new());
        let fetches = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let fetches = fetches.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_fetch("shared", || async move {
                        fetches.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok::<_, String>(vec![0; 1000])
                    })
                    .await
                    .map(|blob| blob.total_size())
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(1000));
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_waiter_retry_after_failure_stays_single_flight() {
        let cache = Arc::new(ChunkCache::new());
        let fetches = Arc::new(AtomicUsize::new(0));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_in_flight = Arc::new(AtomicUsize::new(0));

        let request = |delay_ms: u64| {
            let cache = cache.clone();
            let fetches = fetches.clone();
            let in_flight = in_flight.clone();
            let max_in_flight = max_in_flight.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                cache
                    .get_or_fetch("shared", || async move {
                        let attempt = fetches.fetch_add(1, Ordering::SeqCst);
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        max_in_flight.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        if attempt == 0 {
                            Err("boom".to_string())
                        } else {
                            Ok(vec![0; 100])
                        }
                    })
                    .await
                    .map(|blob| blob.total_size())
            })
        };

        // First fetch fails at ~50ms; the waiter retries until ~100ms and
        // the late request lands during that retry.
        let first = request(0);
        let waiter = request(10);
        let late = request(75);

        assert!(first.await.unwrap().is_err());
        assert_eq!(waiter.await.unwrap(), Ok(100));
        assert_eq!(late.await.unwrap(), Ok(100));

        assert_eq!(fetches.load(Ordering::SeqCst), 2);
        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
        assert!(cache.contains("shared"));
    }

    #[tokio::test]
    async fn test_eviction_during_fetch_is_not_undone() {
        let cache = ChunkCache::new();

        let blob = cache
            .get_or_fetch("a", || async {
                // Another client finishes the transfer before we get back
                cache.evict("a");
                Ok::<_, String>(vec![1, 2, 3])
            })
            .await
            .unwrap();

        assert_eq!(blob.total_size(), 3);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_sweep_idle_drops_only_stale_ready_entries() {
        let cache = ChunkCache::new();
        cache.put("stale", vec![1]);
        cache.put("fresh", vec![2]);
        let in_flight = Arc::new(Slot::pending());
        cache
            .entries
            .lock()
            .insert("pending".to_string(), in_flight.clone());
        cache
            .entries
            .lock()
            .insert("orphan".to_string(), Arc::new(Slot::pending()));

        let later = Instant::now() + Duration::from_secs(600);
        // Touch "fresh" so it is young relative to `later`
        *cache.entries.lock()["fresh"].last_read.lock() = later;

        let removed = cache.sweep_idle_at(later, Duration::from_secs(300));
        assert_eq!(removed, 2);
        assert!(!cache.contains("stale"));
        assert!(cache.contains("fresh"));
        assert!(cache.entries.lock().contains_key("pending"));
        assert!(!cache.entries.lock().contains_key("orphan"));
        assert_eq!(cache.len(), 2);
        drop(in_flight);
    }

    #[test]
    fn test_sweep_idle_keeps_recent_entries() {
        let cache = ChunkCache::new();
        cache.put("a", vec![1]);
        assert_eq!(cache.sweep_idle(Duration::from_secs(300)), 0);
        assert!(cache.contains("a"));
    }
}
