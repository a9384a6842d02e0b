//! Filesystem collaborator contract.
//!
//! This crate never implements a filesystem; it only specifies the trait the
//! VM subsystem's file-backed mapping (`vm::file`) and the thread file
//! descriptor table need, plus the coarse global lock this crate mandates:
//! the filesystem sits behind one global exclusive mutex held across every
//! `filesys_*` call.

use alloc::string::String;
use alloc::sync::Arc;
use spin::Mutex;

/// Guards every call into a [`FileHandle`]/[`FileSystem`] implementation.
/// Retained as a single coarse lock ("do not attempt
/// fine-grained file locking — it is out of the core's scope").
pub static FILESYS_LOCK: Mutex<()> = Mutex::new(());

/// An open file. Implementations are expected to be independent per
/// `open`/`reopen` call.
pub trait FileHandle: Send + Sync {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> usize;
    fn write_at(&self, offset: u64, buf: &[u8]) -> usize;
    fn length(&self) -> u64;
    /// Produce an independent handle to the same underlying file ("reopen"),
    /// with its own cursor/lifetime.
    fn reopen(&self) -> Arc<dyn FileHandle>;
}

/// A minimal namespace used to open files by path. Real path resolution,
/// directories, and on-disk layout are out of scope.
pub trait FileSystem: Send + Sync {
    fn open(&self, path: &str) -> Option<Arc<dyn FileHandle>>;
}

/// An in-memory filesystem used by the hosted test suite.
pub struct MemFs {
    files: Mutex<alloc::collections::BTreeMap<String, Arc<Mutex<alloc::vec::Vec<u8>>>>>,
}

impl MemFs {
    pub fn new() -> Self {
        MemFs { files: Mutex::new(alloc::collections::BTreeMap::new()) }
    }

    pub fn create(&self, path: &str, contents: &[u8]) {
        self.files
            .lock()
            .insert(String::from(path), Arc::new(Mutex::new(alloc::vec::Vec::from(contents))));
    }
}

impl Default for MemFs {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for MemFs {
    fn open(&self, path: &str) -> Option<Arc<dyn FileHandle>> {
        let files = self.files.lock();
        files.get(path).map(|buf| {
            Arc::new(MemFile { buf: buf.clone() }) as Arc<dyn FileHandle>
        })
    }
}

struct MemFile {
    buf: Arc<Mutex<alloc::vec::Vec<u8>>>,
}

impl FileHandle for MemFile {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> usize {
        let src = self.buf.lock();
        let offset = offset as usize;
        if offset >= src.len() {
            return 0;
        }
        let n = core::cmp::min(buf.len(), src.len() - offset);
        buf[..n].copy_from_slice(&src[offset..offset + n]);
        n
    }

    fn write_at(&self, offset: u64, buf: &[u8]) -> usize {
        let mut dst = self.buf.lock();
        let offset = offset as usize;
        if dst.len() < offset + buf.len() {
            dst.resize(offset + buf.len(), 0);
        }
        dst[offset..offset + buf.len()].copy_from_slice(buf);
        buf.len()
    }

    fn length(&self) -> u64 {
        self.buf.lock().len() as u64
    }

    fn reopen(&self) -> Arc<dyn FileHandle> {
        Arc::new(MemFile { buf: self.buf.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_write_roundtrip() {
        let fs = MemFs::new();
        fs.create("/a.txt", b"hello world");
        let f = fs.open("/a.txt").unwrap();
        let mut buf = [0u8; 5];
        assert_eq!(f.read_at(6, &mut buf), 5);
        assert_eq!(&buf, b"world");
        assert_eq!(f.length(), 11);
    }

    #[test]
    fn reopen_shares_storage_independent_cursor() {
        let fs = MemFs::new();
        fs.create("/a.txt", b"0123456789");
        let f1 = fs.open("/a.txt").unwrap();
        let f2 = f1.reopen();
        f2.write_at(0, b"AB");
        let mut buf = [0u8; 2];
        f1.read_at(0, &mut buf);
        assert_eq!(&buf, b"AB");
    }
}
