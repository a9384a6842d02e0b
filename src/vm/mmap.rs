//! File-backed memory mapping: `mmap` lazily maps a file's
//! pages as UNINIT/FILE descriptors; `munmap` writes back dirty pages and
//! tears the mapping down.

use crate::config::PAGE_SIZE;
use crate::error::{KernelError, Result};
use crate::fs::FileHandle;
use crate::ids::Tid;
use crate::mmu::VirtAddr;
use crate::sched::Scheduler;
use crate::thread::MmapRegion;
use crate::vm::page::PageDescriptor;
use alloc::sync::Arc;

impl Scheduler {
    /// Map `file` (reopened so the mapping owns an independent cursor)
    /// starting at `va`, covering `length` bytes, as a run
    /// of page-aligned UNINIT descriptors. Fails if any covered page is
    /// already mapped, or `va`/`length` is not page-aligned.
    pub fn mmap(&mut self, tid: Tid, va: VirtAddr, length: u64, file: &Arc<dyn FileHandle>) -> Result<i32> {
        if va % PAGE_SIZE as u64 != 0 || length == 0 {
            return Err(KernelError::BadUserPointer);
        }
        let page_count = (length as usize).div_ceil(PAGE_SIZE) as u32;
        let handle = file.reopen();

        for i in 0..page_count {
            let page_va = va + (i as u64) * PAGE_SIZE as u64;
            if self.runq.get(tid).and_then(|t| t.spt.find(page_va)).is_some() {
                return Err(KernelError::DoubleMap);
            }
        }

        let id = self.next_mapid();
        for i in 0..page_count {
            let page_va = va + (i as u64) * PAGE_SIZE as u64;
            let offset = (i as u64) * PAGE_SIZE as u64;
            let remaining = length.saturating_sub(offset);
            let read_bytes = core::cmp::min(remaining, PAGE_SIZE as u64) as u32;
            let backing = Arc::clone(&handle);
            let desc = PageDescriptor::uninit_file(page_va, true, backing, offset, read_bytes);
            self.runq
                .get_mut(tid)
                .ok_or(KernelError::BadUserPointer)?
                .spt
                .insert(desc);
        }

        if let Some(t) = self.runq.get_mut(tid) {
            t.mappings.push(MmapRegion { id, va_start: va, page_count });
        }
        Ok(id)
    }

    /// Unmap `id`: write back every dirty resident page,
    /// release its frame, and remove the descriptor.
    pub fn munmap(&mut self, tid: Tid, id: i32) -> Result<()> {
        let region = self
            .runq
            .get_mut(tid)
            .and_then(|t| {
                let idx = t.mappings.iter().position(|m| m.id == id)?;
                Some(t.mappings.swap_remove(idx))
            })
            .ok_or(KernelError::BadUserPointer)?;

        for i in 0..region.page_count {
            let page_va = region.va_start + (i as u64) * PAGE_SIZE as u64;
            self.unmap_one_page(tid, page_va)?;
        }
        Ok(())
    }

    fn unmap_one_page(&mut self, tid: Tid, page_va: VirtAddr) -> Result<()> {
        let frame_id = self
            .runq
            .get(tid)
            .and_then(|t| t.spt.find(page_va))
            .and_then(|d| d.frame);

        if let Some(frame_id) = frame_id {
            let dirty = self
                .runq
                .get_mut(tid)
                .and_then(|t| t.pml4.as_ref())
                .map(|mmu| mmu.is_dirty(page_va))
                .unwrap_or(false);
            let bytes = self.frames.frame_bytes(frame_id).to_vec();
            let swap = &mut *self.swap;
            if let Some(desc) = self.runq.get_mut(tid).and_then(|t| t.spt.find_mut(page_va)) {
                desc.swap_out(&bytes, dirty, swap)?;
                desc.frame = None;
            }
            self.frames.release(frame_id, &mut *self.pool);
            if let Some(mmu) = self.runq.get_mut(tid).and_then(|t| t.pml4.as_mut()) {
                mmu.unmap(page_va).ok();
            }
        }

        if let Some(t) = self.runq.get_mut(tid) {
            t.spt.remove(page_va);
        }
        Ok(())
    }
}
