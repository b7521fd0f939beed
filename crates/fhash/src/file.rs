//! File objects referenced by the index.
//!
//! A `FileObject` is created and closed by whoever drives the workload. The
//! index only reads the name and descriptor and records which table the file
//! belongs to, reported as [`FileFlags::HASHED`].

use std::fmt;
use std::os::fd::RawFd;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};

use bitflags::bitflags;

/// Descriptor value of a file that is not open.
pub const CLOSED_FD: RawFd = -1;

/// Owner id of a file that is in no table. Table ids start at 1.
pub(crate) const NO_TABLE: u64 = 0;

bitflags! {
    /// Per-file state bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FileFlags: u32 {
        /// The file is currently a member of a `FileHashTable`.
        const HASHED = 1 << 0;
    }
}

/// A named file handle shared between worker threads.
pub struct FileObject {
    name: String,
    fd: AtomicI32,
    /// Id of the table this file is a member of, or `NO_TABLE`.
    owner: AtomicU64,
}

impl FileObject {
    /// A file that has not been opened yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fd: AtomicI32::new(CLOSED_FD),
            owner: AtomicU64::new(NO_TABLE),
        }
    }

    /// A file already open on `fd`.
    pub fn opened(name: impl Into<String>, fd: RawFd) -> Self {
        let file = Self::new(name);
        file.set_fd(fd);
        file
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fd(&self) -> RawFd {
        self.fd.load(Ordering::Acquire)
    }

    pub fn set_fd(&self, fd: RawFd) {
        self.fd.store(fd, Ordering::Release);
    }

    pub fn is_open(&self) -> bool {
        self.fd() != CLOSED_FD
    }

    /// Reset the descriptor to [`CLOSED_FD`], returning the previous one.
    ///
    /// Callers remove the file from any table first.
    pub fn close(&self) -> RawFd {
        self.fd.swap(CLOSED_FD, Ordering::AcqRel)
    }

    pub fn flags(&self) -> FileFlags {
        if self.owner() == NO_TABLE {
            FileFlags::empty()
        } else {
            FileFlags::HASHED
        }
    }

    pub fn is_hashed(&self) -> bool {
        self.flags().contains(FileFlags::HASHED)
    }

    pub(crate) fn owner(&self) -> u64 {
        self.owner.load(Ordering::Acquire)
    }

    /// Make table `id` the owner. Fails with the current owner if the file is
    /// already a member somewhere.
    ///
    /// Tables only call this under their own lock, right before linking.
    pub(crate) fn claim(&self, id: u64) -> std::result::Result<(), u64> {
        self.owner
            .compare_exchange(NO_TABLE, id, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
    }

    /// Give up membership, if table `id` holds it.
    pub(crate) fn release(&self, id: u64) -> bool {
        self.owner
            .compare_exchange(id, NO_TABLE, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl fmt::Debug for FileObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileObject")
            .field("name", &self.name)
            .field("fd", &self.fd())
            .field("flags", &self.flags())
            .finish()
    }
}
