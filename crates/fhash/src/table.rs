//! The file-name index.
//!
//! A fixed number of buckets behind one table-wide mutex. Every public
//! operation takes the lock; the shared bucket scan borrows the locked bucket
//! array, so it is only reachable while the lock is held.

use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::config::{TableConfig, DEFAULT_BUCKETS, MAX_BUCKETS};
use crate::error::{CorruptKind, HashError, Result};
use crate::file::{FileObject, NO_TABLE};
use crate::hash::bucket_index;

type Bucket = Vec<Arc<FileObject>>;

/// Source of table ids; 0 is `NO_TABLE`.
static NEXT_TABLE_ID: AtomicU64 = AtomicU64::new(1);

/// Result of [`FileHashTable::insert`].
#[derive(Debug, Clone)]
pub enum InsertOutcome {
    /// The file is now indexed.
    Inserted,
    /// The file was already indexed; nothing changed.
    AlreadyHashed,
    /// Another file with the same name is indexed. The new file was not
    /// inserted; callers should use this one instead.
    Alias(Arc<FileObject>),
}

impl InsertOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, InsertOutcome::Inserted)
    }

    pub fn alias(&self) -> Option<&Arc<FileObject>> {
        match self {
            InsertOutcome::Alias(f) => Some(f),
            _ => None,
        }
    }
}

/// Occupancy snapshot of a table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableStats {
    pub members: usize,
    pub buckets: usize,
    pub occupied_buckets: usize,
    pub longest_chain: usize,
}

/// Concurrent index from file name to [`FileObject`].
pub struct FileHashTable {
    id: u64,
    buckets: Mutex<Vec<Bucket>>,
    bucket_count: usize,
    dump_on_miss: bool,
}

impl Default for FileHashTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FileHashTable {
    /// A table with [`DEFAULT_BUCKETS`] empty buckets.
    pub fn new() -> Self {
        Self::build(DEFAULT_BUCKETS, false)
    }

    /// A table with `bucket_count` empty buckets, in `1..=MAX_BUCKETS`.
    pub fn with_buckets(bucket_count: usize) -> Result<Self> {
        if bucket_count == 0 || bucket_count > MAX_BUCKETS {
            return Err(HashError::InvalidBucketCount {
                count: bucket_count,
                max: MAX_BUCKETS,
            });
        }
        Ok(Self::build(bucket_count, false))
    }

    pub fn from_config(config: &TableConfig) -> Result<Self> {
        let mut table = Self::with_buckets(config.buckets)?;
        table.dump_on_miss = config.dump_on_miss;
        Ok(table)
    }

    fn build(bucket_count: usize, dump_on_miss: bool) -> Self {
        Self {
            id: NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed),
            buckets: Mutex::new(vec![Vec::new(); bucket_count]),
            bucket_count,
            dump_on_miss,
        }
    }

    pub fn bucket_count(&self) -> usize {
        self.bucket_count
    }

    /// Bucket slot `name` maps to in this table.
    pub fn bucket_of(&self, name: &str) -> usize {
        bucket_index(name, self.bucket_count)
    }

    /// Bytes reserved for bucket heads.
    pub fn footprint(&self) -> usize {
        self.bucket_count * std::mem::size_of::<Bucket>()
    }

    /// Find the indexed file called `name`.
    ///
    /// A miss is `Ok(None)`. With `dump_on_miss` set, a miss also traces every
    /// member of the table.
    pub fn lookup(&self, name: &str) -> Result<Option<Arc<FileObject>>> {
        let idx = self.bucket_of(name);
        let buckets = self.buckets.lock();

        let found = scan_bucket(&buckets[idx], name)?.cloned();
        if found.is_none() && self.dump_on_miss {
            trace!(file = name, "Lookup miss, dumping table");
            for (i, member) in members(&buckets) {
                trace!(bucket = i, file = member.name(), "Table member");
            }
        }
        Ok(found)
    }

    /// Index `file` under its name.
    ///
    /// A file is a member of at most one table at a time. If another table
    /// claims it first, even concurrently, the result is `AlreadyHashed`.
    pub fn insert(&self, file: &Arc<FileObject>) -> Result<InsertOutcome> {
        let idx = self.bucket_of(file.name());
        let mut buckets = self.buckets.lock();

        if file.is_hashed() {
            return Ok(InsertOutcome::AlreadyHashed);
        }

        if let Some(alias) = scan_bucket(&buckets[idx], file.name())? {
            debug!(file = file.name(), bucket = idx, "Insert found alias");
            return Ok(InsertOutcome::Alias(Arc::clone(alias)));
        }

        // Other tables only hold their own lock, so the check above can race.
        if let Err(owner) = file.claim(self.id) {
            debug!(file = file.name(), owner, "Insert lost claim to another table");
            return Ok(InsertOutcome::AlreadyHashed);
        }
        buckets[idx].push(Arc::clone(file));
        debug!(file = file.name(), bucket = idx, "Inserted file");
        Ok(InsertOutcome::Inserted)
    }

    /// Drop `file` from the index.
    ///
    /// Returns `Ok(false)` if the file is not a member of this table, either
    /// because it is unindexed or because another table holds it.
    pub fn remove(&self, file: &FileObject) -> Result<bool> {
        let idx = self.bucket_of(file.name());
        let mut buckets = self.buckets.lock();

        match file.owner() {
            NO_TABLE => return Ok(false),
            owner if owner != self.id => {
                debug!(file = file.name(), owner, "Remove of file owned by another table");
                return Ok(false);
            }
            _ => {}
        }

        let bucket = &mut buckets[idx];
        let Some(pos) = bucket.iter().position(|f| std::ptr::eq(Arc::as_ptr(f), file)) else {
            warn!(file = file.name(), bucket = idx, "Hashed file missing from bucket");
            return Err(HashError::corrupt(CorruptKind::NotInBucket, file.name()));
        };

        bucket.remove(pos);
        file.release(self.id);
        debug!(file = file.name(), bucket = idx, "Removed file");
        Ok(true)
    }

    pub fn contains(&self, name: &str) -> bool {
        let idx = self.bucket_of(name);
        let buckets = self.buckets.lock();
        buckets[idx].iter().any(|f| f.name() == name)
    }

    pub fn len(&self) -> usize {
        self.buckets.lock().iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.lock().iter().all(Vec::is_empty)
    }

    /// Every member as `(bucket, name)`, in bucket order then insertion order.
    pub fn dump(&self) -> Vec<(usize, String)> {
        let buckets = self.buckets.lock();
        members(&buckets)
            .map(|(i, f)| (i, f.name().to_string()))
            .collect()
    }

    /// Write one `<bucket>: <name>` line per member.
    pub fn dump_to<W: Write>(&self, mut out: W) -> io::Result<()> {
        let buckets = self.buckets.lock();
        for (i, f) in members(&buckets) {
            writeln!(out, "{}: {}", i, f.name())?;
        }
        Ok(())
    }

    pub fn stats(&self) -> TableStats {
        let buckets = self.buckets.lock();
        let mut stats = TableStats {
            buckets: self.bucket_count,
            ..TableStats::default()
        };
        for bucket in buckets.iter().filter(|b| !b.is_empty()) {
            stats.members += bucket.len();
            stats.occupied_buckets += 1;
            stats.longest_chain = stats.longest_chain.max(bucket.len());
        }
        stats
    }
}

impl Drop for FileHashTable {
    fn drop(&mut self) {
        // Files can outlive the table; they are no longer members of anything.
        let id = self.id;
        for bucket in self.buckets.get_mut().iter() {
            for f in bucket {
                f.release(id);
            }
        }
    }
}

impl std::fmt::Debug for FileHashTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileHashTable")
            .field("bucket_count", &self.bucket_count)
            .field("id", &self.id)
            .field("dump_on_miss", &self.dump_on_miss)
            .finish_non_exhaustive()
    }
}

/// Find `name` in one bucket. Caller holds the table lock.
fn scan_bucket<'a>(bucket: &'a [Arc<FileObject>], name: &str) -> Result<Option<&'a Arc<FileObject>>> {
    match bucket.iter().find(|f| f.name() == name) {
        Some(f) if !f.is_open() => {
            warn!(file = name, "Hashed file has closed descriptor");
            Err(HashError::corrupt(CorruptKind::ClosedDescriptor, name))
        }
        found => Ok(found),
    }
}

fn members(buckets: &[Bucket]) -> impl Iterator<Item = (usize, &Arc<FileObject>)> {
    buckets
        .iter()
        .enumerate()
        .flat_map(|(i, b)| b.iter().map(move |f| (i, f)))
}
