//! Buffer pool manager for page-level caching, pluggable eviction, and the
//! table heap built on top of it.
//!
//! Sits between the single-file [`storage::DiskManager`] and the executor:
//! pages are fetched/pinned/unpinned through here, and a [`TableHeap`] turns
//! pinned pages into an append-only, scannable row store.

#[cfg(test)]
mod tests;

use std::num::NonZeroUsize;

use bincode::config::{self, Config};
use bincode::serde::{decode_from_slice, encode_to_vec};
use common::{DbError, DbResult, PageId, RecordId, Row};
use hashbrown::{HashMap, HashSet};
use lru::LruCache;
use storage::{DiskManager, Page};

fn bincode_config() -> impl Config {
    config::legacy()
}

/// Snapshot of the buffer pool's running counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BufferStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub flushes: u64,
}

/// A pluggable victim-selection strategy for buffer pool eviction.
pub trait EvictionPolicy: std::fmt::Debug {
    fn on_access(&mut self, page_id: u64);
    fn on_insert(&mut self, page_id: u64);
    fn on_remove(&mut self, page_id: u64);
    /// Choose an unpinned victim, or `None` if every resident page is pinned.
    fn choose_victim(&mut self, pinned: &HashSet<u64>) -> Option<u64>;
}

/// Required baseline policy: evict the least recently accessed unpinned page.
#[derive(Debug)]
pub struct LruPolicy {
    order: LruCache<u64, ()>,
}

impl LruPolicy {
    pub fn new(capacity: usize) -> Self {
        Self {
            order: LruCache::new(NonZeroUsize::new(capacity.max(1)).unwrap()),
        }
    }
}

impl EvictionPolicy for LruPolicy {
    fn on_access(&mut self, page_id: u64) {
        self.order.get(&page_id);
    }
    fn on_insert(&mut self, page_id: u64) {
        self.order.put(page_id, ());
    }
    fn on_remove(&mut self, page_id: u64) {
        self.order.pop(&page_id);
    }
    fn choose_victim(&mut self, pinned: &HashSet<u64>) -> Option<u64> {
        self.order
            .iter()
            .rev()
            .map(|(id, _)| *id)
            .find(|id| !pinned.contains(id))
    }
}

/// Evict the earliest-inserted unpinned page, regardless of later accesses.
#[derive(Debug, Default)]
pub struct FifoPolicy {
    order: Vec<u64>,
}

impl EvictionPolicy for FifoPolicy {
    fn on_access(&mut self, _page_id: u64) {}
    fn on_insert(&mut self, page_id: u64) {
        self.order.push(page_id);
    }
    fn on_remove(&mut self, page_id: u64) {
        self.order.retain(|&id| id != page_id);
    }
    fn choose_victim(&mut self, pinned: &HashSet<u64>) -> Option<u64> {
        self.order.iter().copied().find(|id| !pinned.contains(id))
    }
}

/// Second-chance sweep over an insertion-ordered ring with a per-page reference bit.
#[derive(Debug, Default)]
pub struct ClockPolicy {
    ring: Vec<u64>,
    ref_bits: HashMap<u64, bool>,
    hand: usize,
}

impl EvictionPolicy for ClockPolicy {
    fn on_access(&mut self, page_id: u64) {
        self.ref_bits.insert(page_id, true);
    }
    fn on_insert(&mut self, page_id: u64) {
        self.ring.push(page_id);
        self.ref_bits.insert(page_id, true);
    }
    fn on_remove(&mut self, page_id: u64) {
        if let Some(pos) = self.ring.iter().position(|&id| id == page_id) {
            self.ring.remove(pos);
            if self.hand > pos {
                self.hand -= 1;
            }
        }
        self.ref_bits.remove(&page_id);
    }
    fn choose_victim(&mut self, pinned: &HashSet<u64>) -> Option<u64> {
        if self.ring.is_empty() {
            return None;
        }
        let sweeps = 2 * self.ring.len();
        for _ in 0..sweeps {
            let pos = self.hand % self.ring.len();
            let id = self.ring[pos];
            self.hand = pos + 1;
            if pinned.contains(&id) {
                continue;
            }
            let referenced = self.ref_bits.get(&id).copied().unwrap_or(false);
            if referenced {
                self.ref_bits.insert(id, false);
                continue;
            }
            return Some(id);
        }
        None
    }
}

/// Evict the unpinned page with the lowest access-frequency count; ties
/// broken by recency (the less-recently-touched of the tied pages loses).
#[derive(Debug, Default)]
pub struct LfuPolicy {
    freq: HashMap<u64, u64>,
    recency: HashMap<u64, u64>,
    tick: u64,
}

impl EvictionPolicy for LfuPolicy {
    fn on_access(&mut self, page_id: u64) {
        *self.freq.entry(page_id).or_insert(0) += 1;
        self.tick += 1;
        self.recency.insert(page_id, self.tick);
    }
    fn on_insert(&mut self, page_id: u64) {
        self.freq.insert(page_id, 1);
        self.tick += 1;
        self.recency.insert(page_id, self.tick);
    }
    fn on_remove(&mut self, page_id: u64) {
        self.freq.remove(&page_id);
        self.recency.remove(&page_id);
    }
    fn choose_victim(&mut self, pinned: &HashSet<u64>) -> Option<u64> {
        self.freq
            .iter()
            .filter(|(id, _)| !pinned.contains(*id))
            .min_by_key(|(id, freq)| (**freq, self.recency.get(*id).copied().unwrap_or(0)))
            .map(|(id, _)| *id)
    }
}

/// Page cache sitting on top of the disk manager: tracks pin counts and
/// dirty state, and delegates victim selection to an [`EvictionPolicy`].
pub struct BufferPool {
    disk: DiskManager,
    capacity: usize,
    pages: HashMap<u64, Page>,
    pinned: HashSet<u64>,
    dirty: HashSet<u64>,
    policy: Box<dyn EvictionPolicy + Send>,
    stats: BufferStats,
    tick: u64,
}

impl BufferPool {
    pub fn new(disk: DiskManager, capacity: usize) -> Self {
        Self::with_policy(disk, capacity, Box::new(LruPolicy::new(capacity)))
    }

    pub fn with_policy(disk: DiskManager, capacity: usize, policy: Box<dyn EvictionPolicy + Send>) -> Self {
        assert!(capacity > 0, "buffer pool capacity must be > 0");
        Self {
            disk,
            capacity,
            pages: HashMap::new(),
            pinned: HashSet::new(),
            dirty: HashSet::new(),
            policy,
            stats: BufferStats::default(),
            tick: 0,
        }
    }

    pub fn stats(&self) -> BufferStats {
        self.stats
    }

    pub fn get_page(&mut self, page_id: u64) -> DbResult<&mut Page> {
        self.tick += 1;
        let tick = self.tick;
        if self.pages.contains_key(&page_id) {
            self.stats.hits += 1;
            self.policy.on_access(page_id);
            let page = self.pages.get_mut(&page_id).unwrap();
            page.touch(tick);
            return Ok(page);
        }

        self.stats.misses += 1;
        let page = match self.disk.read_page(page_id)? {
            Some(bytes) => Page::from_bytes(&bytes)?,
            None => Page::new(page_id as u32, "DATA"),
        };
        self.install(page_id, page)?;
        let page = self.pages.get_mut(&page_id).unwrap();
        page.touch(tick);
        Ok(page)
    }

    pub fn pin_page(&mut self, page_id: u64) -> DbResult<&mut Page> {
        let page = self.get_page(page_id)?;
        page.pin();
        self.pinned.insert(page_id);
        Ok(page)
    }

    pub fn unpin_page(&mut self, page_id: u64, is_dirty: bool) -> DbResult<()> {
        if let Some(page) = self.pages.get_mut(&page_id) {
            page.unpin();
            if is_dirty {
                page.mark_dirty();
                self.dirty.insert(page_id);
            }
            if !page.is_pinned() {
                self.pinned.remove(&page_id);
            }
        }
        Ok(())
    }

    /// Allocate a fresh page via the disk manager and install it, pinned-free
    /// and dirty, ready for the caller to pin and populate.
    pub fn allocate_page(&mut self, page_type: &str) -> DbResult<u64> {
        let page_id = self.disk.allocate_page()?;
        let mut page = Page::new(page_id as u32, page_type);
        page.mark_dirty();
        self.install(page_id, page)?;
        self.dirty.insert(page_id);
        Ok(page_id)
    }

    pub fn flush_page(&mut self, page_id: u64) -> DbResult<()> {
        if let Some(page) = self.pages.get_mut(&page_id) {
            if page.is_dirty() {
                self.disk.write_page(page_id, &page.to_bytes())?;
                page.clear_dirty();
                self.dirty.remove(&page_id);
                self.stats.flushes += 1;
            }
        }
        Ok(())
    }

    pub fn flush_all(&mut self) -> DbResult<()> {
        let ids: Vec<u64> = self.dirty.iter().copied().collect();
        for id in ids {
            self.flush_page(id)?;
        }
        self.disk.flush()?;
        Ok(())
    }

    pub fn shutdown(&mut self) -> DbResult<()> {
        self.flush_all()
    }

    fn install(&mut self, page_id: u64, page: Page) -> DbResult<()> {
        if self.pages.len() >= self.capacity && !self.pages.contains_key(&page_id) {
            self.evict_one()?;
        }
        self.pages.insert(page_id, page);
        self.policy.on_insert(page_id);
        Ok(())
    }

    fn evict_one(&mut self) -> DbResult<()> {
        let victim = self
            .policy
            .choose_victim(&self.pinned)
            .ok_or_else(|| DbError::Storage("buffer pool full: all pages pinned".into()))?;
        if let Some(page) = self.pages.get(&victim) {
            if page.is_dirty() {
                self.disk.write_page(victim, &page.to_bytes())?;
                self.stats.flushes += 1;
            }
        }
        self.pages.remove(&victim);
        self.dirty.remove(&victim);
        self.policy.on_remove(victim);
        self.stats.evictions += 1;
        Ok(())
    }
}

/// An append-only row store backed by a list of pages. Coarse delete/update:
/// both scan, partition matching rows, clear the table, and re-insert
/// survivors (see SPEC_FULL.md §4.4 and §9 for the row-identity tradeoff
/// this implies).
#[derive(Debug, Clone, Default)]
pub struct TableHeap {
    page_ids: Vec<u64>,
}

impl TableHeap {
    pub fn new(page_ids: Vec<u64>) -> Self {
        Self { page_ids }
    }

    pub fn page_ids(&self) -> &[u64] {
        &self.page_ids
    }

    pub fn insert(&mut self, pool: &mut BufferPool, row: &Row) -> DbResult<RecordId> {
        let bytes = encode_to_vec(row, bincode_config())
            .map_err(|err| DbError::Storage(format!("serialize row failed: {err}")))?;

        if let Some(&tail) = self.page_ids.last() {
            let fits = {
                let page = pool.pin_page(tail)?;
                page.free_space() >= bytes.len() + 4
            };
            if fits {
                let page = pool.get_page(tail)?;
                let slot = page.append_tuple(&bytes)?;
                pool.unpin_page(tail, true)?;
                return Ok(RecordId {
                    page_id: PageId(tail),
                    slot,
                });
            }
            pool.unpin_page(tail, false)?;
        }

        let new_id = pool.allocate_page("DATA")?;
        self.page_ids.push(new_id);
        let page = pool.pin_page(new_id)?;
        let slot = page.append_tuple(&bytes)?;
        pool.unpin_page(new_id, true)?;
        Ok(RecordId {
            page_id: PageId(new_id),
            slot,
        })
    }

    /// Restartable full scan in page-list order.
    pub fn scan(&self, pool: &mut BufferPool) -> DbResult<Vec<Row>> {
        let mut rows = Vec::new();
        for &page_id in &self.page_ids {
            let page = pool.pin_page(page_id)?;
            for bytes in page.iter_tuples() {
                let (row, _): (Row, usize) = decode_from_slice(bytes, bincode_config())
                    .map_err(|err| DbError::Storage(format!("deserialize row failed: {err}")))?;
                rows.push(row);
            }
            pool.unpin_page(page_id, false)?;
        }
        Ok(rows)
    }

    pub fn delete<F>(&mut self, pool: &mut BufferPool, matches: F) -> DbResult<usize>
    where
        F: Fn(&Row) -> bool,
    {
        let rows = self.scan(pool)?;
        let mut deleted = 0;
        let mut survivors = Vec::with_capacity(rows.len());
        for row in rows {
            if matches(&row) {
                deleted += 1;
            } else {
                survivors.push(row);
            }
        }
        self.clear(pool)?;
        for row in &survivors {
            self.insert(pool, row)?;
        }
        Ok(deleted)
    }

    pub fn update<F, G>(&mut self, pool: &mut BufferPool, matches: F, apply: G) -> DbResult<usize>
    where
        F: Fn(&Row) -> bool,
        G: Fn(&Row) -> Row,
    {
        let rows = self.scan(pool)?;
        let mut updated = 0;
        let mut next_rows = Vec::with_capacity(rows.len());
        for row in rows {
            if matches(&row) {
                updated += 1;
                next_rows.push(apply(&row));
            } else {
                next_rows.push(row);
            }
        }
        self.clear(pool)?;
        for row in &next_rows {
            self.insert(pool, row)?;
        }
        Ok(updated)
    }

    /// Drop all rows. The underlying pages are not reclaimed by the disk
    /// manager (it maintains no free list in the baseline); they simply stop
    /// being part of this table's page list.
    pub fn clear(&mut self, _pool: &mut BufferPool) -> DbResult<()> {
        self.page_ids.clear();
        Ok(())
    }
}
