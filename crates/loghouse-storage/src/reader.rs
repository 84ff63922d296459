//! Sequential Log Reader
//!
//! `LogReader` concatenates the raw bytes of every segment's store in base
//! offset order and exposes them as one `std::io::Read` stream. The length
//! prefixes are part of the stream: consumers (replication, snapshotting)
//! decode the store framing themselves.
//!
//! The reader holds shared handles on the stores it was created over, so it
//! keeps working after the log's read lock is released. It observes the
//! data present when each read call happens; it does not follow segments
//! created later.

use std::io::{self, Read};
use std::sync::Arc;

use loghouse_core::Error;

use crate::store::Store;

/// `std::io::Read` over the concatenated store files of a log.
pub struct LogReader {
    stores: Vec<Arc<Store>>,
    current: usize,
    position: u64,
}

impl LogReader {
    pub(crate) fn new(stores: Vec<Arc<Store>>) -> Self {
        Self {
            stores,
            current: 0,
            position: 0,
        }
    }
}

impl Read for LogReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.current < self.stores.len() {
            let n = self.stores[self.current]
                .read_at(buf, self.position)
                .map_err(|err| match err {
                    Error::Io(io_err) => io_err,
                    other => io::Error::new(io::ErrorKind::Other, other),
                })?;
            if n > 0 {
                self.position += n as u64;
                return Ok(n);
            }
            self.current += 1;
            self.position = 0;
        }
        Ok(0)
    }
}
