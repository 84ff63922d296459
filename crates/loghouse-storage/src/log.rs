//! The Log
//!
//! The log is the public face of the engine: an ordered collection of
//! segments covering a contiguous offset range with no gaps or overlaps.
//! The segment with the greatest base offset is the *active* segment and
//! the only one receiving appends; every earlier segment is sealed.
//!
//! ## Responsibilities
//!
//! - Route appends to the active segment and rotate to a fresh segment
//!   once it maxes out
//! - Route reads to the owning segment by binary search on base offset
//! - Enumerate and reopen existing segments on startup
//! - Truncate the prefix below a retention watermark
//! - Expose a sequential byte stream over all segments for
//!   replication/snapshotting
//!
//! ## Locking
//!
//! One reader-writer lock. `append`, `truncate`, `close`, `remove` and
//! `reset` take it exclusively; `read`, `lowest_offset`, `highest_offset`
//! and `reader` take it shared. For two appends A then B in program order,
//! any read that observes B's offset also observes A's record.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use bytes::Bytes;
use tracing::{debug, info};

use loghouse_core::{Error, Record, Result};

use crate::config::LogConfig;
use crate::index::ENTRY_WIDTH;
use crate::reader::LogReader;
use crate::segment::Segment;

/// A durable, append-only commit log backed by a directory of segments.
pub struct Log {
    dir: PathBuf,
    config: LogConfig,
    inner: RwLock<LogInner>,
}

struct LogInner {
    /// Ordered by base offset; never empty while the log is usable; the
    /// last entry is the active segment.
    segments: Vec<Segment>,
}

impl Log {
    /// Open the log rooted at `dir`, reopening any existing segments. An
    /// empty directory gets one segment at `config.segment.initial_offset`.
    pub fn open(dir: impl AsRef<Path>, config: LogConfig) -> Result<Self> {
        if config.segment.max_index_bytes < ENTRY_WIDTH as u64 {
            return Err(Error::Config(format!(
                "segment.max_index_bytes {} cannot hold a single {}-byte entry",
                config.segment.max_index_bytes, ENTRY_WIDTH
            )));
        }

        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let mut segments = Vec::new();
        for base in Self::list_base_offsets(&dir)? {
            segments.push(Segment::open(&dir, base, &config.segment)?);
        }
        if segments.is_empty() {
            segments.push(Segment::open(
                &dir,
                config.segment.initial_offset,
                &config.segment,
            )?);
        }

        info!(
            dir = %dir.display(),
            segments = segments.len(),
            lowest = segments[0].base_offset(),
            next = segments[segments.len() - 1].next_offset(),
            "log opened"
        );

        Ok(Self {
            dir,
            config,
            inner: RwLock::new(LogInner { segments }),
        })
    }

    /// Enumerate segment base offsets in `dir`: parse file stems as
    /// integers, deduplicate (every base has a store and an index file),
    /// sort numerically.
    fn list_base_offsets(dir: &Path) -> Result<Vec<u64>> {
        let mut bases = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Ok(base) = stem.parse::<u64>() {
                bases.push(base);
            }
        }
        bases.sort_unstable();
        bases.dedup();
        Ok(bases)
    }

    /// Append a payload, returning its assigned absolute offset. The record
    /// is visible to `read` as soon as this returns.
    pub fn append(&self, value: Bytes) -> Result<u64> {
        let mut inner = self.inner.write().unwrap();
        let active = match inner.segments.last_mut() {
            Some(segment) => segment,
            None => return Err(Error::Closed),
        };

        let offset = active.append(&value)?;

        // Rotate eagerly: the append that maxes a segment still succeeds,
        // and the next one lands in a fresh segment.
        if active.is_maxed() {
            let base = active.next_offset();
            debug!(base, "rotating to new segment");
            let segment = Segment::open(&self.dir, base, &self.config.segment)?;
            inner.segments.push(segment);
        }

        Ok(offset)
    }

    /// Read the record at `offset`. Fails with `Error::OffsetOutOfRange`
    /// when no segment covers it.
    pub fn read(&self, offset: u64) -> Result<Record> {
        let inner = self.inner.read().unwrap();
        let i = inner
            .segments
            .partition_point(|s| s.base_offset() <= offset);
        if i == 0 {
            return Err(Error::OffsetOutOfRange(offset));
        }
        inner.segments[i - 1].read(offset)
    }

    /// The base offset of the first segment.
    pub fn lowest_offset(&self) -> u64 {
        let inner = self.inner.read().unwrap();
        inner
            .segments
            .first()
            .map_or(self.config.segment.initial_offset, Segment::base_offset)
    }

    /// The offset of the most recently appended record, or `None` while
    /// the log has never held a record.
    pub fn highest_offset(&self) -> Option<u64> {
        let inner = self.inner.read().unwrap();
        let active = inner.segments.last()?;
        if inner.segments.len() == 1 && active.next_offset() == active.base_offset() {
            return None;
        }
        Some(active.next_offset() - 1)
    }

    /// Remove every sealed segment whose records all sit at or below
    /// `lowest`. The active segment is never removed, so the log always
    /// keeps a writable tail.
    pub fn truncate(&self, lowest: u64) -> Result<()> {
        let mut inner = self.inner.write().unwrap();

        let segments = std::mem::take(&mut inner.segments);
        let count = segments.len();
        for (i, segment) in segments.into_iter().enumerate() {
            let highest = segment.next_offset().saturating_sub(1);
            if i + 1 < count && highest <= lowest {
                info!(
                    base = segment.base_offset(),
                    highest, "removing segment below retention watermark"
                );
                segment.remove()?;
            } else {
                inner.segments.push(segment);
            }
        }

        Ok(())
    }

    /// A `std::io::Read` over the raw bytes of every store in base-offset
    /// order, length prefixes included. Consumers decode the store framing
    /// themselves.
    pub fn reader(&self) -> LogReader {
        let inner = self.inner.read().unwrap();
        LogReader::new(inner.segments.iter().map(Segment::store).collect())
    }

    /// Close every segment. Idempotent.
    pub fn close(&self) -> Result<()> {
        let inner = self.inner.write().unwrap();
        for segment in inner.segments.iter() {
            segment.close()?;
        }
        Ok(())
    }

    /// Close, then delete the log's directory. The log is unusable
    /// afterwards.
    pub fn remove(&self) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        for segment in inner.segments.drain(..) {
            segment.close()?;
        }
        fs::remove_dir_all(&self.dir)?;
        info!(dir = %self.dir.display(), "log removed");
        Ok(())
    }

    /// Remove, then recreate empty at the configured initial offset.
    pub fn reset(&self) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        for segment in inner.segments.drain(..) {
            segment.close()?;
        }
        fs::remove_dir_all(&self.dir)?;
        fs::create_dir_all(&self.dir)?;
        inner.segments.push(Segment::open(
            &self.dir,
            self.config.segment.initial_offset,
            &self.config.segment,
        )?);
        info!(dir = %self.dir.display(), "log reset");
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SegmentConfig;
    use tempfile::TempDir;

    fn small_config() -> LogConfig {
        LogConfig {
            segment: SegmentConfig {
                max_store_bytes: 32,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_append_read() {
        let dir = TempDir::new().unwrap();
        let log = Log::open(dir.path(), small_config()).unwrap();

        let offset = log.append(Bytes::from("hello world")).unwrap();
        assert_eq!(offset, 0);

        let record = log.read(offset).unwrap();
        assert_eq!(record.value, Bytes::from("hello world"));
        assert_eq!(record.offset, 0);
    }

    #[test]
    fn test_append_read_many() {
        let dir = TempDir::new().unwrap();
        let log = Log::open(dir.path(), small_config()).unwrap();

        for i in 0..5u64 {
            let value = Bytes::from(format!("Hello World {i} !"));
            let offset = log.append(value.clone()).unwrap();
            assert_eq!(offset, i);

            let record = log.read(offset).unwrap();
            assert_eq!(record.value, value);
        }
    }

    #[test]
    fn test_out_of_range_read() {
        let dir = TempDir::new().unwrap();
        let log = Log::open(dir.path(), small_config()).unwrap();

        assert!(matches!(log.read(1), Err(Error::OffsetOutOfRange(1))));

        log.append(Bytes::from("hello world")).unwrap();
        assert!(matches!(log.read(1), Err(Error::OffsetOutOfRange(1))));
    }

    #[test]
    fn test_init_existing() {
        let dir = TempDir::new().unwrap();
        let log = Log::open(dir.path(), small_config()).unwrap();
        for _ in 0..3 {
            log.append(Bytes::from("hello world")).unwrap();
        }
        assert_eq!(log.lowest_offset(), 0);
        assert_eq!(log.highest_offset(), Some(2));
        log.close().unwrap();

        let reopened = Log::open(dir.path(), small_config()).unwrap();
        assert_eq!(reopened.lowest_offset(), 0);
        assert_eq!(reopened.highest_offset(), Some(2));
        for i in 0..3 {
            assert_eq!(
                reopened.read(i).unwrap().value,
                Bytes::from("hello world")
            );
        }
    }

    #[test]
    fn test_highest_offset_empty() {
        let dir = TempDir::new().unwrap();
        let log = Log::open(dir.path(), small_config()).unwrap();
        assert_eq!(log.highest_offset(), None);

        log.append(Bytes::from("first")).unwrap();
        assert_eq!(log.highest_offset(), Some(0));
    }

    #[test]
    fn test_initial_offset() {
        let dir = TempDir::new().unwrap();
        let config = LogConfig {
            segment: SegmentConfig {
                initial_offset: 16,
                ..Default::default()
            },
        };
        let log = Log::open(dir.path(), config).unwrap();

        assert_eq!(log.lowest_offset(), 16);
        let offset = log.append(Bytes::from("first")).unwrap();
        assert_eq!(offset, 16);
        assert_eq!(log.highest_offset(), Some(16));
    }

    #[test]
    fn test_rotation_produces_expected_segments() {
        let dir = TempDir::new().unwrap();
        let log = Log::open(dir.path(), small_config()).unwrap();

        // Each "hello world" frame is 19 bytes; the second append reaches
        // the 32-byte cap, so segments hold two records each.
        for _ in 0..5 {
            log.append(Bytes::from("hello world")).unwrap();
        }

        let inner = log.inner.read().unwrap();
        assert_eq!(inner.segments.len(), 3);
        assert!(inner.segments[0].is_maxed());
        assert!(inner.segments[1].is_maxed());
        assert!(!inner.segments[2].is_maxed());
        assert_eq!(inner.segments[0].base_offset(), 0);
        assert_eq!(inner.segments[1].base_offset(), 2);
        assert_eq!(inner.segments[2].base_offset(), 4);
    }

    #[test]
    fn test_truncate() {
        let dir = TempDir::new().unwrap();
        let log = Log::open(dir.path(), small_config()).unwrap();
        for _ in 0..3 {
            log.append(Bytes::from("hello world")).unwrap();
        }

        log.truncate(1).unwrap();

        assert!(matches!(log.read(0), Err(Error::OffsetOutOfRange(0))));
        assert!(log.read(2).is_ok());
        assert!(log.lowest_offset() >= 1);
    }

    #[test]
    fn test_truncate_keeps_active_segment() {
        let dir = TempDir::new().unwrap();
        let log = Log::open(dir.path(), small_config()).unwrap();
        for _ in 0..3 {
            log.append(Bytes::from("hello world")).unwrap();
        }

        // A watermark beyond the highest offset must not strand the log
        // without a writable segment.
        log.truncate(100).unwrap();

        let offset = log.append(Bytes::from("after")).unwrap();
        assert_eq!(offset, 3);
        assert_eq!(log.read(3).unwrap().value, Bytes::from("after"));
    }

    #[test]
    fn test_remove() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log");
        let log = Log::open(&path, small_config()).unwrap();
        log.append(Bytes::from("x")).unwrap();

        log.remove().unwrap();
        assert!(!path.exists());
        assert!(matches!(
            log.append(Bytes::from("y")),
            Err(Error::Closed)
        ));
    }

    #[test]
    fn test_reset() {
        let dir = TempDir::new().unwrap();
        let log = Log::open(dir.path(), small_config()).unwrap();
        for _ in 0..3 {
            log.append(Bytes::from("hello world")).unwrap();
        }

        log.reset().unwrap();

        assert_eq!(log.highest_offset(), None);
        let offset = log.append(Bytes::from("fresh")).unwrap();
        assert_eq!(offset, 0);
    }

    #[test]
    fn test_ignores_foreign_files_in_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"not a segment").unwrap();

        let log = Log::open(dir.path(), small_config()).unwrap();
        let offset = log.append(Bytes::from("x")).unwrap();
        assert_eq!(offset, 0);
    }
}
