//! # fhash
//!
//! Concurrent index from file name to shared file handle.
//!
//! Worker threads of a workload generator open files by name. Before opening,
//! a worker asks the index whether another thread already holds a handle for
//! that name, so the same file is never opened twice:
//!
//! ```
//! use std::sync::Arc;
//! use fhash::{FileHashTable, FileObject, InsertOutcome};
//!
//! let table = FileHashTable::new();
//! let file = Arc::new(FileObject::opened("job.0.0", 3));
//!
//! let handle = match table.insert(&file).unwrap() {
//!     InsertOutcome::Alias(existing) => existing,
//!     _ => Arc::clone(&file),
//! };
//! assert!(table.lookup("job.0.0").unwrap().is_some());
//! table.remove(&handle).unwrap();
//! ```
//!
//! ## Locking
//!
//! One mutex guards the whole table. Lookups, inserts and removes on any
//! bucket are mutually exclusive. A file belongs to at most one table; the
//! membership claim is atomic, so tables racing to insert the same file
//! cannot both succeed.

pub mod config;
pub mod error;
pub mod file;
pub mod hash;
pub mod table;

pub use config::{TableConfig, DEFAULT_BUCKETS, MAX_BUCKETS};
pub use error::{CorruptKind, HashError, Result};
pub use file::{FileFlags, FileObject, CLOSED_FD};
pub use hash::{bucket_hash, bucket_index};
pub use table::{FileHashTable, InsertOutcome, TableStats};
