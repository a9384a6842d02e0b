//! Error taxonomy.
//!
//! User-caused errors fail a syscall with `-1` or terminate the process with
//! exit code `-1`; scheduler-internal invariant violations are never routed
//! through this type — they assert and halt.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// A user pointer was null, not a user address, or didn't resolve in the
    /// current page table.
    BadUserPointer,
    /// `FileSystem::open` (or a path-taking op) found nothing at that path.
    NoSuchFile,
    /// Frame/descriptor allocation failed and eviction could not recover.
    OutOfMemory,
    /// TCB magic sentinel corrupted — kernel stack overflow.
    StackOverflow,
    /// `claim` found a hardware mapping already installed at the target VA.
    DoubleMap,
    /// Page fault was a protection fault (`not_present == false`); this
    /// design has no copy-on-write, so it is unconditionally unresolvable.
    NotPresentButProtected,
    /// `wait`/fork bookkeeping referenced a tid with no matching child.
    ChildNotFound,
    /// A `LockId`/`Tid` did not resolve to a live arena entry, or the
    /// caller tried to release a lock it does not hold.
    NoSuchLock,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            KernelError::BadUserPointer => "bad user pointer",
            KernelError::NoSuchFile => "no such file",
            KernelError::OutOfMemory => "out of memory",
            KernelError::StackOverflow => "kernel stack overflow",
            KernelError::DoubleMap => "address already mapped",
            KernelError::NotPresentButProtected => "protection fault (no COW)",
            KernelError::ChildNotFound => "no such child",
            KernelError::NoSuchLock => "no such lock",
        };
        f.write_str(msg)
    }
}

pub type Result<T> = core::result::Result<T, KernelError>;
