use serde::{Deserialize, Serialize};

/// Bucket count used when nothing else is configured.
pub const DEFAULT_BUCKETS: usize = 512;

/// Upper bound on buckets: the bucket hash is 16 bits wide.
pub const MAX_BUCKETS: usize = 1 << 16;

/// Table construction parameters, the `[table]` section of the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Number of buckets, fixed for the life of a table
    pub buckets: usize,
    /// Trace the whole table when a lookup misses (expensive)
    pub dump_on_miss: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            buckets: DEFAULT_BUCKETS,
            dump_on_miss: false,
        }
    }
}

impl TableConfig {
    pub fn bucket_count_valid(&self) -> bool {
        (1..=MAX_BUCKETS).contains(&self.buckets)
    }
}
