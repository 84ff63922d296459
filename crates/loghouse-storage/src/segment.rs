//! Log Segment
//!
//! A segment pairs one store with one index under a shared base offset:
//!
//! ```text
//! <base_offset>.store    variable-width frames (the record payloads)
//! <base_offset>.index    fixed-width entries (relative offset -> position)
//! ```
//!
//! `base_offset` is the absolute offset of the segment's first record;
//! `next_offset` is the offset the next append will receive. Entry `i` of
//! the index always describes the record at `base_offset + i`, so the
//! committed record count is `next_offset - base_offset`.
//!
//! A segment is *maxed* once its store has reached `max_store_bytes` or its
//! index has no room for another entry. The log seals maxed segments and
//! rotates appends to a fresh one.
//!
//! ## Recovery
//!
//! Reopening a segment derives its state from the files. A clean shutdown
//! leaves the index truncated to its written prefix, which is validated
//! against the store in O(1). Anything else (the process died before
//! `close`, the index file is missing or damaged) falls back to walking the
//! store framing: a torn trailing frame is cut off and the index is rebuilt
//! from the walk. The index is derived data; the store is the source of
//! truth.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use loghouse_core::record::LEN_WIDTH;
use loghouse_core::{Error, Record, Result};

use crate::config::SegmentConfig;
use crate::index::{Index, ENTRY_WIDTH};
use crate::store::Store;

/// One store + one index under a base offset.
pub struct Segment {
    store: Arc<Store>,
    index: Index,
    base_offset: u64,
    next_offset: u64,
    config: SegmentConfig,
}

impl Segment {
    /// Open the segment for `base_offset` in `dir`, creating the files if
    /// they do not exist, or recovering state from them if they do.
    pub fn open(dir: impl AsRef<Path>, base_offset: u64, config: &SegmentConfig) -> Result<Self> {
        let dir = dir.as_ref();
        let store_path = dir.join(format!("{base_offset}.store"));
        let index_path = dir.join(format!("{base_offset}.index"));

        // Captured before `Index::open` pre-sizes the file: the on-disk
        // length is what distinguishes a clean shutdown from a crash.
        let index_disk_len = std::fs::metadata(&index_path).map(|m| m.len()).unwrap_or(0);

        let store = Arc::new(Store::open(&store_path)?);
        let index = Index::open(&index_path, config.max_index_bytes)?;

        let mut segment = Self {
            store,
            index,
            base_offset,
            next_offset: base_offset,
            config: config.clone(),
        };
        segment.recover(index_disk_len)?;
        segment.next_offset = base_offset + segment.index.entries();

        Ok(segment)
    }

    /// Append a payload, assigning it the segment's next offset.
    ///
    /// Fails with `Error::SegmentFull` when the index has no room; the
    /// check runs before the store write so a refused append leaves no
    /// orphan frame behind.
    pub fn append(&mut self, value: &[u8]) -> Result<u64> {
        if self.index.is_full() {
            return Err(Error::SegmentFull);
        }

        let offset = self.next_offset;
        let (_, position) = self.store.append(value)?;
        self.index
            .write((offset - self.base_offset) as u32, position)?;
        self.next_offset += 1;

        Ok(offset)
    }

    /// Read the record at an absolute offset.
    pub fn read(&self, offset: u64) -> Result<Record> {
        if offset < self.base_offset || offset >= self.next_offset {
            return Err(Error::OffsetOutOfRange(offset));
        }

        let relative = (offset - self.base_offset) as u32;
        let (_, position) = self.index.read(relative).map_err(|err| match err {
            Error::EndOfIndex => Error::OffsetOutOfRange(offset),
            other => other,
        })?;
        let value = self.store.read(position)?;

        Ok(Record { offset, value })
    }

    /// Whether `offset` falls inside `[base_offset, next_offset)`.
    pub fn contains(&self, offset: u64) -> bool {
        offset >= self.base_offset && offset < self.next_offset
    }

    /// Whether either size cap has been reached.
    pub fn is_maxed(&self) -> bool {
        self.store.size() >= self.config.max_store_bytes || self.index.is_full()
    }

    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    /// The absolute offset the next append will receive.
    pub fn next_offset(&self) -> u64 {
        self.next_offset
    }

    /// Shared handle on the store, for the sequential reader.
    pub(crate) fn store(&self) -> Arc<Store> {
        Arc::clone(&self.store)
    }

    /// Close the index (truncating it to its written prefix), then the
    /// store. Idempotent.
    pub fn close(&self) -> Result<()> {
        self.index.close()?;
        self.store.close()?;
        Ok(())
    }

    /// Close, then delete both files.
    pub fn remove(&self) -> Result<()> {
        self.index.remove()?;
        self.store.remove()?;
        Ok(())
    }

    fn recover(&mut self, index_disk_len: u64) -> Result<()> {
        if self.tail_consistent(index_disk_len)? {
            return Ok(());
        }
        self.rebuild_index()
    }

    /// O(1) clean-shutdown check: the index was truncated below capacity to
    /// whole entries, its first entry sits at store position 0, and its
    /// last entry's frame ends exactly at the store's end.
    fn tail_consistent(&self, index_disk_len: u64) -> Result<bool> {
        if index_disk_len >= self.config.max_index_bytes
            || index_disk_len % ENTRY_WIDTH as u64 != 0
        {
            return Ok(false);
        }

        let store_size = self.store.size();
        if self.index.entries() == 0 {
            return Ok(store_size == 0);
        }

        let (first_rel, first_pos) = self.index.read(0)?;
        if first_rel != 0 || first_pos != 0 {
            return Ok(false);
        }
        let (last_rel, last_pos) = match self.index.read_last()? {
            Some(entry) => entry,
            None => return Ok(false),
        };
        if u64::from(last_rel) != self.index.entries() - 1 {
            return Ok(false);
        }

        if last_pos + LEN_WIDTH as u64 > store_size {
            return Ok(false);
        }
        let mut len_buf = [0u8; LEN_WIDTH];
        if self.store.read_at(&mut len_buf, last_pos)? != LEN_WIDTH {
            return Ok(false);
        }
        let last_len = u64::from_be_bytes(len_buf);

        Ok(last_pos + LEN_WIDTH as u64 + last_len == store_size)
    }

    /// Walk the store framing from position 0, truncate a torn trailing
    /// frame, and rewrite the index from the surviving frames.
    fn rebuild_index(&mut self) -> Result<()> {
        let store_size = self.store.size();

        let mut positions = Vec::new();
        let mut pos = 0u64;
        let mut len_buf = [0u8; LEN_WIDTH];
        while pos + (LEN_WIDTH as u64) <= store_size {
            if self.store.read_at(&mut len_buf, pos)? != LEN_WIDTH {
                break;
            }
            let len = u64::from_be_bytes(len_buf);
            if pos + LEN_WIDTH as u64 + len > store_size {
                break;
            }
            positions.push(pos);
            pos += LEN_WIDTH as u64 + len;
        }

        if positions.len() as u64 * ENTRY_WIDTH as u64 > self.config.max_index_bytes {
            return Err(Error::Corrupt(format!(
                "store {} holds {} records but the index fits {}",
                self.store.path().display(),
                positions.len(),
                self.config.max_index_bytes / ENTRY_WIDTH as u64,
            )));
        }

        if pos < store_size {
            warn!(
                store = %self.store.path().display(),
                from = store_size,
                to = pos,
                "truncating torn frame at store tail"
            );
            self.store.truncate(pos)?;
        }

        self.index.clear()?;
        for (i, position) in positions.iter().enumerate() {
            self.index.write(i as u32, *position)?;
        }
        debug!(
            index = %self.index.path().display(),
            entries = positions.len(),
            "index rebuilt from store walk"
        );

        Ok(())
    }
}
