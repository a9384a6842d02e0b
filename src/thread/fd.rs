//! Per-process file descriptor table. Slots 0
//! and 1 are reserved for stdio and never allocated here.

use crate::fs::FileHandle;
use alloc::sync::Arc;
use alloc::vec::Vec;

pub struct FdEntry {
    pub file: Arc<dyn FileHandle>,
    pub cursor: u64,
}

#[derive(Default)]
pub struct FdTable {
    entries: Vec<Option<FdEntry>>,
}

const FIRST_FD: i32 = 2;

impl FdTable {
    pub fn new() -> Self {
        FdTable { entries: Vec::new() }
    }

    pub fn insert(&mut self, file: Arc<dyn FileHandle>) -> i32 {
        for (i, slot) in self.entries.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = Some(FdEntry { file, cursor: 0 });
                return i as i32 + FIRST_FD;
            }
        }
        self.entries.push(Some(FdEntry { file, cursor: 0 }));
        self.entries.len() as i32 - 1 + FIRST_FD
    }

    fn index(fd: i32) -> Option<usize> {
        if fd < FIRST_FD {
            return None;
        }
        Some((fd - FIRST_FD) as usize)
    }

    pub fn get(&self, fd: i32) -> Option<&FdEntry> {
        self.entries.get(Self::index(fd)?)?.as_ref()
    }

    pub fn get_mut(&mut self, fd: i32) -> Option<&mut FdEntry> {
        self.entries.get_mut(Self::index(fd)?)?.as_mut()
    }

    pub fn close(&mut self, fd: i32) -> bool {
        match Self::index(fd).and_then(|i| self.entries.get_mut(i)) {
            Some(slot @ Some(_)) => {
                *slot = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemFs;
    use crate::fs::FileSystem;

    #[test]
    fn insert_reuses_closed_slots() {
        let fs = MemFs::new();
        fs.create("/a", b"x");
        let mut table = FdTable::new();
        let a = table.insert(fs.open("/a").unwrap());
        table.close(a);
        let b = table.insert(fs.open("/a").unwrap());
        assert_eq!(a, b);
    }
}
