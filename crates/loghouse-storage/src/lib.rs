//! loghouse Storage Engine
//!
//! This crate implements the on-disk storage engine for loghouse: a durable,
//! append-only commit log that persists an ordered sequence of opaque byte
//! records, assigns each a monotonically increasing offset, and survives
//! restarts.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌───────────────┐
//! │    Callers    │  (RPC adapter, replicator, tests)
//! └───────┬───────┘
//!         │ append(value) / read(offset) / reader()
//!         ▼
//! ┌───────────────┐
//! │      Log      │  ordered set of segments, rotation, truncation
//! └───────┬───────┘
//!         │ routes by base offset
//!         ▼
//! ┌───────────────┐
//! │    Segment    │  one store + one index under a base offset
//! └───┬───────┬───┘
//!     │       │
//!     ▼       ▼
//! ┌───────┐ ┌───────┐
//! │ Store │ │ Index │
//! └───────┘ └───────┘
//! ```
//!
//! ## Main Components
//!
//! ### Store
//! An append-only file of length-prefixed frames with positional reads.
//! Writes are buffered; any read flushes the buffer first so a committed
//! record is always visible.
//!
//! ### Index
//! A memory-mapped file of fixed-width entries mapping each record's
//! relative offset to its frame position in the store. Pre-sized before
//! mapping; truncated back down to its written prefix on close.
//!
//! ### Segment
//! Pairs one store with one index under a shared base offset and enforces
//! the configured size caps. Reopening a segment recovers its state from
//! the files, repairing a torn tail if the process died mid-append.
//!
//! ### Log
//! The public entry point. Owns the segments, routes appends to the active
//! segment, rotates when it maxes out, routes reads by binary search on
//! base offset, and supports prefix truncation and a sequential byte
//! reader over all segments.
//!
//! ## Usage
//!
//! ```ignore
//! use loghouse_storage::{Log, LogConfig};
//! use bytes::Bytes;
//!
//! let log = Log::open("./data/orders-0", LogConfig::default())?;
//!
//! let offset = log.append(Bytes::from("hello world"))?;
//! let record = log.read(offset)?;
//! assert_eq!(record.value, Bytes::from("hello world"));
//!
//! log.close()?;
//! ```

pub mod config;
pub mod index;
pub mod log;
pub mod reader;
pub mod segment;
pub mod store;

pub use config::{LogConfig, SegmentConfig};
pub use index::Index;
pub use log::Log;
pub use reader::LogReader;
pub use segment::Segment;
pub use store::Store;

pub use loghouse_core::{Error, Record, Result};
