//! Error Types for loghouse
//!
//! One enum covers the whole engine so that lower components can propagate
//! their errors upward without rewrapping; callers match on the variant, not
//! on message text.
//!
//! ## Error Categories
//!
//! ### Caller-visible
//! - `OffsetOutOfRange`: the requested offset is not covered by any segment.
//!   Carries the offset verbatim.
//! - `Io`: underlying file I/O failed. Fatal for the in-flight operation.
//! - `Corrupt`: reopen found on-disk state that cannot be repaired.
//! - `Config`: the supplied configuration cannot produce a working log.
//!
//! ### Internal
//! - `SegmentFull`: the index has no room for another entry. Drives segment
//!   rotation; `Log::append` never surfaces it.
//! - `EndOfIndex`: an index read past the written prefix. Converted to
//!   `OffsetOutOfRange` at the segment boundary.
//! - `Closed`: an operation on a store or index that has already been closed.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("offset out of range: {0}")]
    OffsetOutOfRange(u64),

    /// The segment can take no further appends.
    #[error("segment is full")]
    SegmentFull,

    /// Read past the last written index entry.
    #[error("end of index")]
    EndOfIndex,

    #[error("corrupt log state: {0}")]
    Corrupt(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("log component is closed")]
    Closed,
}
