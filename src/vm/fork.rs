//! Address-space duplication for `fork`: every resident
//! page is physically copied into a fresh frame, every swapped-out ANON
//! page gets its own new slot, and FILE/UNINIT-FILE pages get an
//! independently reopened handle — nothing is shared between parent and
//! child, since this design has no copy-on-write.

use crate::config::PAGE_SIZE;
use crate::error::{KernelError, Result};
use crate::ids::Tid;
use crate::mmu::Mmu;
use crate::sched::{FaultSink, Scheduler};
use crate::vm::page::{AnonState, Kind, PageDescriptor, UninitBacking};
use alloc::boxed::Box;
use alloc::vec::Vec;

impl Scheduler {
    /// Spawn a child of `parent` named `name`, owning `child_pml4` (an
    /// empty page table the caller constructs — the same boundary
    /// `spawn`'s `entry` crosses: this crate never instantiates hardware
    /// collaborators itself), with an independent copy of `parent`'s
    /// address space.
    pub fn fork(&mut self, parent: Tid, name: &str, child_pml4: Box<dyn Mmu>) -> Result<Tid> {
        let (priority, entry, entry_arg) = self
            .runq
            .get(parent)
            .map(|t| (t.base_priority, t.entry, t.entry_arg))
            .ok_or(KernelError::ChildNotFound)?;
        let entry = entry.unwrap_or(|_| {});
        let child = self.runq.spawn(name, priority, entry, entry_arg);
        if let Some(t) = self.runq.get_mut(child) {
            t.pml4 = Some(child_pml4);
            t.parent = Some(parent);
        }
        if let Some(t) = self.runq.get_mut(parent) {
            t.children.push(child);
        }

        let parent_pages: Vec<PageDescriptor> = self
            .runq
            .get(parent)
            .map(|t| t.spt.iter().cloned().collect())
            .unwrap_or_default();

        for page in &parent_pages {
            if let Err(e) = self.duplicate_page(child, page) {
                self.abort_fork(parent, child);
                return Err(e);
            }
        }
        Ok(child)
    }

    /// Unwind a half-built child after `duplicate_page` fails partway
    /// through: release whatever frames/swap slots it had already been
    /// given, drop it from `parent`'s children, and reap its arena slot so
    /// the failed fork leaves no trace for the parent to `wait` on.
    fn abort_fork(&mut self, parent: Tid, child: Tid) {
        let had_pml4 = self.runq.get(child).map(|t| t.pml4.is_some()).unwrap_or(false);
        if had_pml4 {
            if let Some(mut mmu_box) = self.runq.get_mut(child).and_then(|t| t.pml4.take()) {
                let frames = &mut self.frames;
                let pool = &mut *self.pool;
                let swap = &mut *self.swap;
                if let Some(t) = self.runq.get_mut(child) {
                    t.spt.kill(mmu_box.as_mut(), frames, pool, swap);
                }
            }
        }
        if let Some(t) = self.runq.get_mut(parent) {
            t.children.retain(|&c| c != child);
        }
        self.runq.reap(child);
    }

    /// Duplicate one of `parent`'s descriptors into `child`'s address
    /// space: a resident page gets its own frame and a byte-for-byte copy,
    /// a swapped-out ANON page gets its own new slot, and anything else
    /// (UNINIT, or a FILE page re-read from its own reopened handle) can
    /// simply be cloned.
    fn duplicate_page(&mut self, child: Tid, page: &PageDescriptor) -> Result<()> {
        let mut child_desc = page.clone();
        child_desc.frame = None;

        match &mut child_desc.kind {
            Kind::Uninit(UninitBacking::File { file, .. }) => *file = file.reopen(),
            Kind::File(f) => f.file = f.file.reopen(),
            _ => {}
        }

        match page.frame {
            Some(parent_frame) => {
                let new_frame = {
                    let mut sink = FaultSink { runq: &mut self.runq, swap: &mut *self.swap };
                    self.frames.get_frame(child, page.va, &mut *self.pool, &mut sink)?
                };
                let parent_bytes = self.frames.frame_bytes(parent_frame).to_vec();
                self.frames.frame_bytes_mut(new_frame).copy_from_slice(&parent_bytes);
                child_desc.frame = Some(new_frame);
                if let Kind::Anon(a) = &mut child_desc.kind {
                    *a = AnonState { swap_slot: None };
                }

                let phys = new_frame.0 as u64;
                let writable = child_desc.writable;
                let mmu = self
                    .runq
                    .get_mut(child)
                    .and_then(|t| t.pml4.as_mut())
                    .ok_or(KernelError::ChildNotFound)?;
                mmu.map(page.va, phys, writable).map_err(|_| KernelError::DoubleMap)?;
            }
            None => {
                if let Kind::Anon(a) = &page.kind {
                    if let Some(slot) = a.swap_slot {
                        let mut buf = alloc::vec![0u8; PAGE_SIZE];
                        self.swap.read(slot, &mut buf);
                        let new_slot =
                            self.swap.alloc_and_write(&buf).map_err(|_| KernelError::OutOfMemory)?;
                        child_desc.kind = Kind::Anon(AnonState { swap_slot: Some(new_slot) });
                    }
                }
            }
        }

        self.runq
            .get_mut(child)
            .ok_or(KernelError::ChildNotFound)?
            .spt
            .insert(child_desc);
        Ok(())
    }
}
