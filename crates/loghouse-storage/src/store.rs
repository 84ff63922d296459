//! Store File
//!
//! The store is the append-only, variable-width half of a segment: a flat
//! sequence of frames, one per record.
//!
//! ## File Format
//!
//! ```text
//! ┌────────────┬─────────┬────────────┬─────────┬────
//! │ Length     │ Payload │ Length     │ Payload │ ...
//! │ (8 B, BE)  │ (N B)   │ (8 B, BE)  │ (M B)   │
//! └────────────┴─────────┴────────────┴─────────┴────
//! ```
//!
//! Positions are absolute byte offsets into the file. After appending a
//! payload of length L at position P the file has grown by `8 + L` bytes and
//! the next frame begins at `P + 8 + L`.
//!
//! ## Visibility barrier
//!
//! Appends go through a `BufWriter` to amortize syscalls, so recently
//! written frames may still sit in the process buffer. Every read path
//! flushes that buffer before touching the file. Together with the single
//! mutex this guarantees a reader never observes a length prefix without its
//! payload.
//!
//! ## Concurrency
//!
//! One mutex guards the buffered writer and `size`. Concurrent appenders see
//! consistent positions; readers briefly take the same mutex to flush and
//! read.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use bytes::Bytes;
use loghouse_core::record::{encode_frame, LEN_WIDTH};
use loghouse_core::{Error, Result};

/// Append-only frame file with positional reads.
pub struct Store {
    path: PathBuf,
    inner: Mutex<Option<StoreInner>>,
}

struct StoreInner {
    writer: BufWriter<File>,
    size: u64,
}

impl Store {
    /// Open or create the store at `path`, picking up the current file
    /// length as the append position.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            path,
            inner: Mutex::new(Some(StoreInner {
                writer: BufWriter::new(file),
                size,
            })),
        })
    }

    /// Append one payload as a frame.
    ///
    /// Returns `(bytes_written, position)`: the total frame size
    /// (`8 + payload.len()`) and the position the frame starts at.
    pub fn append(&self, value: &[u8]) -> Result<(u64, u64)> {
        let mut guard = self.inner.lock().unwrap();
        let inner = guard.as_mut().ok_or(Error::Closed)?;

        let position = inner.size;
        let frame = encode_frame(value);
        inner.writer.write_all(&frame)?;
        inner.size += frame.len() as u64;

        Ok((frame.len() as u64, position))
    }

    /// Read the payload of the frame starting at `position`.
    pub fn read(&self, position: u64) -> Result<Bytes> {
        let mut guard = self.inner.lock().unwrap();
        let inner = guard.as_mut().ok_or(Error::Closed)?;
        inner.writer.flush()?;

        let file = inner.writer.get_mut();
        file.seek(SeekFrom::Start(position))?;

        let mut len_buf = [0u8; LEN_WIDTH];
        file.read_exact(&mut len_buf)?;
        let len = u64::from_be_bytes(len_buf);

        let mut value = vec![0u8; len as usize];
        file.read_exact(&mut value)?;

        Ok(Bytes::from(value))
    }

    /// Positional read for the sequential reader. Flushes the write buffer,
    /// then fills `buf` from `offset`, clamped to the written size. Returns
    /// the number of bytes read; 0 signals end of data.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        let mut guard = self.inner.lock().unwrap();
        let inner = guard.as_mut().ok_or(Error::Closed)?;
        inner.writer.flush()?;

        if offset >= inner.size || buf.is_empty() {
            return Ok(0);
        }
        let want = buf.len().min((inner.size - offset) as usize);

        let file = inner.writer.get_mut();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut buf[..want])?;

        Ok(want)
    }

    /// Current file length, including frames still in the write buffer.
    pub fn size(&self) -> u64 {
        self.inner
            .lock()
            .unwrap()
            .as_ref()
            .map_or(0, |inner| inner.size)
    }

    /// Drop everything at and after `size`. Used by segment recovery to cut
    /// a torn trailing frame.
    pub(crate) fn truncate(&self, size: u64) -> Result<()> {
        let mut guard = self.inner.lock().unwrap();
        let inner = guard.as_mut().ok_or(Error::Closed)?;
        inner.writer.flush()?;
        inner.writer.get_mut().set_len(size)?;
        inner.size = size;
        Ok(())
    }

    /// Flush the write buffer and sync the file. Idempotent; further
    /// operations fail with `Error::Closed`.
    pub fn close(&self) -> Result<()> {
        let mut guard = self.inner.lock().unwrap();
        if let Some(mut inner) = guard.take() {
            inner.writer.flush()?;
            inner.writer.get_mut().sync_all()?;
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
