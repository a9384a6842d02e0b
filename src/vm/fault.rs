//! Page-fault resolution and stack growth.

use crate::config::{KERN_BASE, PAGE_SIZE, STACK_GROWTH_LIMIT, USER_STACK_TOP};
use crate::error::{KernelError, Result};
use crate::ids::Tid;
use crate::mmu::VirtAddr;
use crate::sched::Scheduler;
use crate::vm::page::PageDescriptor;

/// Round down to the containing page.
fn page_floor(va: VirtAddr) -> VirtAddr {
    va & !((PAGE_SIZE as u64) - 1)
}

impl Scheduler {
    /// Resolve a hardware page fault for `tid` at `fault_va`. A write to
    /// a read-only page, or any fault on a
    /// present-but-protected mapping, is unresolvable and propagates as
    /// [`KernelError::NotPresentButProtected`] — the caller terminates the
    /// process. `not_present` distinguishes a missing mapping from a
    /// protection violation on an existing one.
    pub fn page_fault(&mut self, tid: Tid, fault_va: VirtAddr, write: bool, not_present: bool) -> Result<()> {
        if fault_va >= KERN_BASE {
            return Err(KernelError::BadUserPointer);
        }
        if !not_present {
            return Err(KernelError::NotPresentButProtected);
        }
        let page_va = page_floor(fault_va);

        let has_entry = self
            .runq
            .get(tid)
            .map(|t| t.spt.find(page_va).is_some())
            .unwrap_or(false);

        if !has_entry {
            if self.looks_like_stack_growth(tid, fault_va) {
                self.grow_stack(tid, page_va)?;
            } else {
                return Err(KernelError::BadUserPointer);
            }
        }

        let writable = self
            .runq
            .get(tid)
            .and_then(|t| t.spt.find(page_va))
            .map(|d| d.writable)
            .unwrap_or(false);
        if write && !writable {
            return Err(KernelError::NotPresentButProtected);
        }

        self.claim(tid, page_va)
    }

    /// Heuristic for whether an unmapped fault just below the current stack
    /// should grow it rather than be treated as a bad access: the fault
    /// address must be within one page of the stack
    /// pointer's plausible range and within [`STACK_GROWTH_LIMIT`] of the
    /// top of the user stack.
    fn looks_like_stack_growth(&self, tid: Tid, fault_va: VirtAddr) -> bool {
        if fault_va >= USER_STACK_TOP {
            return false;
        }
        let distance_from_top = USER_STACK_TOP - fault_va;
        distance_from_top <= STACK_GROWTH_LIMIT
            && self.runq.get(tid).map(|t| t.pml4.is_some()).unwrap_or(false)
    }

    fn grow_stack(&mut self, tid: Tid, page_va: VirtAddr) -> Result<()> {
        let desc = PageDescriptor::anon(page_va, true, true);
        let inserted = self
            .runq
            .get_mut(tid)
            .map(|t| t.spt.insert(desc))
            .unwrap_or(false);
        if !inserted {
            return Err(KernelError::DoubleMap);
        }
        Ok(())
    }

    /// Bring `page_va` resident for `tid`: obtain a frame (possibly
    /// evicting), run the descriptor's backing-kind initializer, and
    /// install the hardware mapping.
    pub fn claim(&mut self, tid: Tid, page_va: VirtAddr) -> Result<()> {
        let already_resident = self
            .runq
            .get(tid)
            .and_then(|t| t.spt.find(page_va))
            .map(|d| d.resident())
            .unwrap_or(false);
        if already_resident {
            return Ok(());
        }

        let writable = self
            .runq
            .get(tid)
            .and_then(|t| t.spt.find(page_va))
            .map(|d| d.writable)
            .ok_or(KernelError::BadUserPointer)?;

        let frame_id = {
            let mut sink = crate::sched::FaultSink { runq: &mut self.runq, swap: &mut *self.swap };
            self.frames.get_frame(tid, page_va, &mut *self.pool, &mut sink)?
        };
        {
            let bytes = self.frames.frame_bytes_mut(frame_id);
            let swap = &mut *self.swap;
            let desc = self
                .runq
                .get_mut(tid)
                .and_then(|t| t.spt.find_mut(page_va))
                .ok_or(KernelError::BadUserPointer)?;
            desc.swap_in(bytes, swap)?;
            desc.frame = Some(frame_id);
        }

        let phys = frame_id.0 as u64;
        let mmu = self
            .runq
            .get_mut(tid)
            .and_then(|t| t.pml4.as_mut())
            .ok_or(KernelError::BadUserPointer)?;
        mmu.map(page_va, phys, writable).map_err(|_| KernelError::DoubleMap)?;
        Ok(())
    }
}
