//! Log Configuration
//!
//! Controls how segments are sized and where the offset space starts:
//!
//! - **max_store_bytes**: Seal a segment once its store reaches this size
//!   (default: 1024)
//! - **max_index_bytes**: Capacity reserved for a segment's index; the
//!   segment is sealed when no further entry fits (default: 1024)
//! - **initial_offset**: Base offset of the very first segment when the log
//!   starts from an empty directory (default: 0)
//!
//! ## Usage
//!
//! ```ignore
//! use loghouse_storage::{LogConfig, SegmentConfig};
//!
//! // Small segments for tests
//! let config = LogConfig {
//!     segment: SegmentConfig {
//!         max_store_bytes: 32,
//!         ..Default::default()
//!     },
//! };
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub segment: SegmentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// Store bytes before the segment is sealed (default: 1024)
    #[serde(default = "default_max_store_bytes")]
    pub max_store_bytes: u64,

    /// Index bytes reserved per segment (default: 1024)
    #[serde(default = "default_max_index_bytes")]
    pub max_index_bytes: u64,

    /// Base offset of the first segment in an empty directory (default: 0)
    #[serde(default)]
    pub initial_offset: u64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            max_store_bytes: default_max_store_bytes(),
            max_index_bytes: default_max_index_bytes(),
            initial_offset: 0,
        }
    }
}

fn default_max_store_bytes() -> u64 {
    1024
}

fn default_max_index_bytes() -> u64 {
    1024
}
