//! Shared types for the loghouse commit log.
//!
//! This crate holds the pieces every other loghouse crate needs:
//!
//! - [`Record`]: the unit of data in the log (an opaque payload plus its
//!   assigned offset)
//! - [`Error`]/[`Result`]: the error taxonomy for the whole engine
//! - The on-disk frame constants ([`record::LEN_WIDTH`])
//!
//! The storage engine itself lives in `loghouse-storage`.

pub mod error;
pub mod record;

pub use error::{Error, Result};
pub use record::Record;
