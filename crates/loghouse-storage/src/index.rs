//! Index File
//!
//! The index is the fixed-width half of a segment: it maps each record's
//! offset relative to the segment base to the position of that record's
//! frame in the paired store.
//!
//! ## File Format
//!
//! ```text
//! ┌──────────────────┬──────────────────┬────
//! │ Relative offset  │ Store position   │ ...
//! │ (4 bytes, BE)    │ (8 bytes, BE)    │
//! └──────────────────┴──────────────────┴────
//! ```
//!
//! Entry `i` corresponds to the record at absolute offset `base + i`.
//!
//! ## Sizing discipline
//!
//! The file is memory-mapped, and a mapping cannot grow after creation, so
//! the file is extended to its full capacity (`max_index_bytes`) before the
//! map is made. Only the prefix up to `size` holds data. On close the map is
//! flushed and dropped and the file is truncated back down to `size`, so a
//! reopen can derive the entry count from the file length alone.
//!
//! ## Concurrency
//!
//! One `RwLock` guards the mapping and `size`: writes are exclusive, reads
//! shared.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use memmap2::{MmapMut, MmapOptions};

use loghouse_core::{Error, Result};

/// Width of the relative-offset half of an entry.
pub const REL_WIDTH: usize = 4;
/// Width of the store-position half of an entry.
pub const POS_WIDTH: usize = 8;
/// Width of one index entry.
pub const ENTRY_WIDTH: usize = REL_WIDTH + POS_WIDTH;

/// Memory-mapped file of `(relative_offset, position)` entries.
pub struct Index {
    path: PathBuf,
    cap: u64,
    inner: RwLock<Option<IndexInner>>,
}

struct IndexInner {
    file: File,
    mmap: MmapMut,
    size: u64,
}

impl Index {
    /// Open or create the index at `path` with capacity `max_index_bytes`.
    ///
    /// The logical size is derived from the on-disk length before the file
    /// is extended for mapping; a trailing partial entry is excluded. The
    /// caller (segment recovery) decides whether the derived size can be
    /// trusted.
    pub fn open(path: impl AsRef<Path>, max_index_bytes: u64) -> Result<Self> {
        if max_index_bytes < ENTRY_WIDTH as u64 {
            return Err(Error::Config(format!(
                "max_index_bytes {} cannot hold a single {}-byte entry",
                max_index_bytes, ENTRY_WIDTH
            )));
        }

        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)?;

        let disk_len = file.metadata()?.len();
        if disk_len < max_index_bytes {
            file.set_len(max_index_bytes)?;
        }
        let mmap = unsafe {
            MmapOptions::new()
                .len(max_index_bytes as usize)
                .map_mut(&file)?
        };

        let entry_width = ENTRY_WIDTH as u64;
        let size = (disk_len.min(max_index_bytes) / entry_width) * entry_width;

        Ok(Self {
            path,
            cap: max_index_bytes,
            inner: RwLock::new(Some(IndexInner { file, mmap, size })),
        })
    }

    /// Append one entry. Fails with `Error::SegmentFull` when no entry fits.
    pub fn write(&self, relative_offset: u32, position: u64) -> Result<()> {
        let mut guard = self.inner.write().unwrap();
        let inner = guard.as_mut().ok_or(Error::Closed)?;

        if inner.size + ENTRY_WIDTH as u64 > self.cap {
            return Err(Error::SegmentFull);
        }

        let at = inner.size as usize;
        inner.mmap[at..at + REL_WIDTH].copy_from_slice(&relative_offset.to_be_bytes());
        inner.mmap[at + REL_WIDTH..at + ENTRY_WIDTH].copy_from_slice(&position.to_be_bytes());
        inner.size += ENTRY_WIDTH as u64;

        Ok(())
    }

    /// Read entry `n`. Fails with `Error::EndOfIndex` past the written
    /// prefix.
    pub fn read(&self, n: u32) -> Result<(u32, u64)> {
        let guard = self.inner.read().unwrap();
        let inner = guard.as_ref().ok_or(Error::Closed)?;

        if u64::from(n) >= inner.size / ENTRY_WIDTH as u64 {
            return Err(Error::EndOfIndex);
        }

        let at = n as usize * ENTRY_WIDTH;
        let rel = u32::from_be_bytes(inner.mmap[at..at + REL_WIDTH].try_into().unwrap());
        let pos = u64::from_be_bytes(inner.mmap[at + REL_WIDTH..at + ENTRY_WIDTH].try_into().unwrap());

        Ok((rel, pos))
    }

    /// The last written entry, or `None` when the index is empty.
    pub fn read_last(&self) -> Result<Option<(u32, u64)>> {
        let entries = self.entries();
        if entries == 0 {
            return Ok(None);
        }
        self.read((entries - 1) as u32).map(Some)
    }

    /// Number of written entries.
    pub fn entries(&self) -> u64 {
        self.size() / ENTRY_WIDTH as u64
    }

    /// Written prefix in bytes.
    pub fn size(&self) -> u64 {
        self.inner
            .read()
            .unwrap()
            .as_ref()
            .map_or(0, |inner| inner.size)
    }

    /// Whether another entry still fits.
    pub fn is_full(&self) -> bool {
        self.size() + ENTRY_WIDTH as u64 > self.cap
    }

    /// Forget all entries. Used by segment recovery before a rebuild.
    pub(crate) fn clear(&self) -> Result<()> {
        let mut guard = self.inner.write().unwrap();
        let inner = guard.as_mut().ok_or(Error::Closed)?;
        inner.size = 0;
        Ok(())
    }

    /// Flush the mapping, drop it, truncate the file down to the written
    /// prefix, and sync. Idempotent; further operations fail with
    /// `Error::Closed`.
    ///
    /// The truncation is what lets a reopen derive the entry count from the
    /// file length.
    pub fn close(&self) -> Result<()> {
        let mut guard = self.inner.write().unwrap();
        if let Some(inner) = guard.take() {
            inner.mmap.flush()?;
            let IndexInner { file, mmap, size } = inner;
            drop(mmap);
            file.set_len(size)?;
            file.sync_all()?;
        }
        Ok(())
    }

    /// Close, then delete the file.
    pub fn remove(&self) -> Result<()> {
        self.close()?;
        std::fs::remove_file(&self.path)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
