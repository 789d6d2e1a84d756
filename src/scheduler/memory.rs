//! Chunk memory manager.
//!
//! Tracks materialized chunk data together with pin counts. Pinned chunks are
//! held strongly and never evicted; a pin is held by a [`PinGuard`] and
//! released when the guard is dropped. Unpinned chunks are only observed, so
//! their data goes away with the last table that references it.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tracing::{debug, trace};

use crate::table::LocalTable;

static NEXT_CHUNK_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier of one unit of chunk data, pending or materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId(u64);

impl ChunkId {
    /// Allocate a fresh, process-unique id.
    pub fn next() -> Self {
        Self(NEXT_CHUNK_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chunk-{}", self.0)
    }
}

#[derive(Debug)]
struct StoreEntry {
    table: Weak<LocalTable>,
    /// Strong reference kept while `pins > 0`.
    held: Option<Arc<LocalTable>>,
    pins: usize,
}

impl StoreEntry {
    fn observed(table: &Arc<LocalTable>) -> Self {
        Self {
            table: Arc::downgrade(table),
            held: None,
            pins: 0,
        }
    }

    fn table(&self) -> Option<Arc<LocalTable>> {
        self.held.clone().or_else(|| self.table.upgrade())
    }

    fn is_live(&self) -> bool {
        self.pins > 0 || self.table.strong_count() > 0
    }
}

/// Metrics for chunk store usage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreMetrics {
    /// Chunks whose data is still alive
    pub resident: usize,
    /// Chunks with at least one pin
    pub pinned: usize,
    /// Total pins taken since creation
    pub total_pins: usize,
    /// Chunks dropped by eviction
    pub evicted: usize,
}

/// Reference-counted registry of materialized chunk data.
#[derive(Debug, Default)]
pub struct ChunkStore {
    entries: Mutex<HashMap<ChunkId, StoreEntry>>,
    metrics: Mutex<StoreMetrics>,
}

impl ChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record freshly materialized chunk data without pinning it. The store
    /// keeps no strong reference; entries whose data has been dropped are
    /// pruned here.
    pub fn insert(&self, id: ChunkId, table: &Arc<LocalTable>) {
        let mut entries = self.lock_entries();
        entries.retain(|_, entry| entry.is_live());
        entries
            .entry(id)
            .or_insert_with(|| StoreEntry::observed(table));
    }

    /// Pin chunk data so it survives eviction until the guard is dropped.
    pub fn pin(self: &Arc<Self>, id: ChunkId, table: Arc<LocalTable>) -> PinGuard {
        {
            let mut entries = self.lock_entries();
            let entry = entries
                .entry(id)
                .or_insert_with(|| StoreEntry::observed(&table));
            entry.held.get_or_insert(table);
            entry.pins += 1;
            trace!("Pinned {} ({} pins)", id, entry.pins);
        }
        if let Ok(mut metrics) = self.metrics.lock() {
            metrics.total_pins += 1;
        }
        PinGuard {
            store: Arc::clone(self),
            id,
        }
    }

    /// Drop one pin. The last pin frees the chunk from the store.
    fn release(&self, id: ChunkId) {
        let mut entries = self.lock_entries();
        let Some(entry) = entries.get_mut(&id) else {
            return;
        };
        entry.pins = entry.pins.saturating_sub(1);
        trace!("Released {} ({} pins left)", id, entry.pins);
        if entry.pins == 0 {
            entries.remove(&id);
            debug!("Freed {}", id);
        }
    }

    /// Current pin count of a chunk; zero if unknown.
    pub fn pin_count(&self, id: ChunkId) -> usize {
        self.lock_entries().get(&id).map(|e| e.pins).unwrap_or(0)
    }

    /// Returns the stored data for a chunk, if still resident.
    pub fn get(&self, id: ChunkId) -> Option<Arc<LocalTable>> {
        self.lock_entries().get(&id).and_then(StoreEntry::table)
    }

    /// Forget every chunk that has no pins. Returns how many of them still
    /// had live data.
    pub fn evict_unpinned(&self) -> usize {
        let mut evicted = 0;
        self.lock_entries().retain(|_, entry| {
            if entry.pins > 0 {
                return true;
            }
            if entry.is_live() {
                evicted += 1;
            }
            false
        });

        if let Ok(mut metrics) = self.metrics.lock() {
            metrics.evicted += evicted;
        }
        debug!("Evicted {} unpinned chunks", evicted);
        evicted
    }

    pub fn metrics(&self) -> StoreMetrics {
        let (resident, pinned) = {
            let entries = self.lock_entries();
            (
                entries.values().filter(|e| e.is_live()).count(),
                entries.values().filter(|e| e.pins > 0).count(),
            )
        };
        let mut metrics = self
            .metrics
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default();
        metrics.resident = resident;
        metrics.pinned = pinned;
        metrics
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, HashMap<ChunkId, StoreEntry>> {
        // A panic while holding the lock cannot leave an entry half-updated
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// RAII pin on one chunk in a [`ChunkStore`].
pub struct PinGuard {
    store: Arc<ChunkStore>,
    id: ChunkId,
}

impl PinGuard {
    pub fn id(&self) -> ChunkId {
        self.id
    }
}

impl fmt::Debug for PinGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinGuard").field("id", &self.id).finish()
    }
}

impl Drop for PinGuard {
    fn drop(&mut self) {
        self.store.release(self.id);
    }
}
