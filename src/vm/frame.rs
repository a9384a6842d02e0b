//! Physical frame registry and FIFO eviction.

use crate::config::PAGE_SIZE;
use crate::error::{KernelError, Result};
use crate::ids::{FrameId, Tid};
use crate::mmu::{Mmu, VirtAddr};
use crate::vm::page::PageDescriptor;
use crate::vm::swap::SwapBackend;
use alloc::boxed::Box;
use alloc::collections::VecDeque;

pub type FrameBuf = Box<[u8]>;

/// The generic physical-page pool. [`FixedPagePool`] is a bounded stand-in used by tests to
/// force eviction deterministically.
pub trait PagePool: Send {
    fn try_alloc(&mut self) -> Option<FrameBuf>;
    fn free(&mut self, buf: FrameBuf);
}

pub struct FixedPagePool {
    free: VecDeque<FrameBuf>,
}

impl FixedPagePool {
    pub fn with_capacity(frames: usize) -> Self {
        let free = (0..frames).map(|_| alloc::vec![0u8; PAGE_SIZE].into_boxed_slice()).collect();
        FixedPagePool { free }
    }
}

impl PagePool for FixedPagePool {
    fn try_alloc(&mut self) -> Option<FrameBuf> {
        self.free.pop_front()
    }

    fn free(&mut self, buf: FrameBuf) {
        self.free.push_back(buf);
    }
}

/// Callback the frame table uses to reach into the owning thread's address
/// space when it must evict a victim. Implemented by
/// [`crate::sched::Scheduler`], which owns the thread arena `FrameTable`
/// itself cannot see.
pub trait EvictSink {
    fn mmu_of(&mut self, tid: Tid) -> &mut dyn Mmu;
    fn descriptor_of(&mut self, tid: Tid, va: VirtAddr) -> Option<&mut PageDescriptor>;
    fn swap(&mut self) -> &mut dyn SwapBackend;
}

struct FrameEntry {
    buf: FrameBuf,
    owner: Option<(Tid, VirtAddr)>,
}

/// Global registry of resident physical frames, FIFO-ordered by allocation
/// time. A `FrameId` is an arena index into `entries`, handed out to
/// `PageDescriptor::frame` back-links that outlive any single call into this
/// table; slots are never relocated, so a `FrameId` stays valid until its
/// owning frame is explicitly released.
pub struct FrameTable {
    entries: alloc::vec::Vec<Option<FrameEntry>>,
    free: alloc::vec::Vec<FrameId>,
    /// Index order doubling as the FIFO queue: front is the oldest frame.
    order: VecDeque<FrameId>,
}

impl FrameTable {
    pub fn new() -> Self {
        FrameTable { entries: alloc::vec::Vec::new(), free: alloc::vec::Vec::new(), order: VecDeque::new() }
    }

    pub fn frame_bytes(&self, id: FrameId) -> &[u8] {
        &self.entries[id.0 as usize].as_ref().expect("frame_bytes: stale FrameId").buf
    }

    pub fn frame_bytes_mut(&mut self, id: FrameId) -> &mut [u8] {
        &mut self.entries[id.0 as usize].as_mut().expect("frame_bytes_mut: stale FrameId").buf
    }

    fn insert(&mut self, entry: FrameEntry) -> FrameId {
        let id = match self.free.pop() {
            Some(id) => {
                self.entries[id.0 as usize] = Some(entry);
                id
            }
            None => {
                let id = FrameId(self.entries.len() as u32);
                self.entries.push(Some(entry));
                id
            }
        };
        self.order.push_back(id);
        id
    }

    /// Obtain a frame for `owner` at `va`, evicting the oldest resident
    /// frame if the pool is exhausted.
    pub fn get_frame(
        &mut self,
        owner: Tid,
        va: VirtAddr,
        pool: &mut dyn PagePool,
        sink: &mut dyn EvictSink,
    ) -> Result<FrameId> {
        if let Some(buf) = pool.try_alloc() {
            return Ok(self.insert(FrameEntry { buf, owner: Some((owner, va)) }));
        }
        self.evict_one(pool, sink)?;
        let buf = pool.try_alloc().ok_or(KernelError::OutOfMemory)?;
        Ok(self.insert(FrameEntry { buf, owner: Some((owner, va)) }))
    }

    fn evict_one(&mut self, pool: &mut dyn PagePool, sink: &mut dyn EvictSink) -> Result<()> {
        let victim = self.order.pop_front().ok_or(KernelError::OutOfMemory)?;
        log::debug!("evicting frame {}", victim.0);
        let entry = self.entries[victim.0 as usize].take().ok_or(KernelError::OutOfMemory)?;
        let (tid, va) = entry.owner.ok_or(KernelError::OutOfMemory)?;
        let dirty = sink.mmu_of(tid).is_dirty(va);
        // `descriptor_of` and `swap` borrow disjoint fields on every real
        // `EvictSink` impl (see `FaultSink`), but both take `&mut dyn
        // EvictSink`, so the borrow checker can't see they don't alias.
        // Routing through a function boundary that returns a raw pointer
        // (rather than a reference) erases the borrow once the call
        // returns, so `descriptor_of`'s borrow doesn't overlap with it.
        fn swap_ptr_of(sink: &mut dyn EvictSink) -> *mut dyn SwapBackend {
            let p: *mut (dyn SwapBackend + '_) = sink.swap();
            // SAFETY: only the address/vtable bits are kept; erasing the
            // lifetime here is what lets the caller re-borrow `sink`
            // through `descriptor_of` afterwards (see comment above).
            unsafe { core::mem::transmute(p) }
        }
        let swap_ptr = swap_ptr_of(sink);
        if let Some(desc) = sink.descriptor_of(tid, va) {
            desc.swap_out(&entry.buf, dirty, unsafe { &mut *swap_ptr })?;
            desc.frame = None;
        }
        sink.mmu_of(tid).unmap(va).ok();
        pool.free(entry.buf);
        self.free.push(victim);
        Ok(())
    }

    pub fn release(&mut self, id: FrameId, pool: &mut dyn PagePool) {
        if let Some(Some(entry)) = self.entries.get_mut(id.0 as usize).map(Option::take) {
            pool.free(entry.buf);
            self.order.retain(|&f| f != id);
            self.free.push(id);
        }
    }
}

impl Default for FrameTable {
    fn default() -> Self {
        Self::new()
    }
}
