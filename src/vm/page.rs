//! Polymorphic page descriptor.
//!
//! UNINIT carries the same data FILE would once materialized (or nothing,
//! for a zero-fill ANON page) rather than an opaque closure: every UNINIT
//! page in this crate is either a not-yet-touched FILE mapping or a
//! not-yet-touched zero page, and keeping the backing data directly
//! inspectable (instead of hidden inside a boxed thunk) is what lets
//! `vm::fork` duplicate an unfaulted page without materializing it first.

use crate::error::{KernelError, Result};
use crate::fs::FileHandle;
use crate::ids::{FrameId, SlotId};
use crate::vm::swap::SwapBackend;
use alloc::sync::Arc;

#[derive(Clone)]
pub enum UninitBacking {
    Anon,
    File { file: Arc<dyn FileHandle>, offset: u64, read_bytes: u32 },
}

#[derive(Clone)]
pub struct AnonState {
    pub swap_slot: Option<SlotId>,
}

#[derive(Clone)]
pub struct FileState {
    pub file: Arc<dyn FileHandle>,
    pub offset: u64,
    pub read_bytes: u32,
}

#[derive(Clone)]
pub enum Kind {
    Uninit(UninitBacking),
    Anon(AnonState),
    File(FileState),
}

/// One page-sized virtual-memory region inside a process address space.
#[derive(Clone)]
pub struct PageDescriptor {
    pub va: u64,
    pub writable: bool,
    /// Marks a page that may grow the stack on a near-miss fault rather
    /// than faulting.
    pub stack: bool,
    pub kind: Kind,
    /// Resident iff `Some`; invariant checked against the frame table's
    /// back-link by `vm::frame::FrameTable`.
    pub frame: Option<FrameId>,
}

impl PageDescriptor {
    pub fn uninit_anon(va: u64, writable: bool, stack: bool) -> Self {
        PageDescriptor { va, writable, stack, kind: Kind::Uninit(UninitBacking::Anon), frame: None }
    }

    pub fn uninit_file(va: u64, writable: bool, file: Arc<dyn FileHandle>, offset: u64, read_bytes: u32) -> Self {
        PageDescriptor {
            va,
            writable,
            stack: false,
            kind: Kind::Uninit(UninitBacking::File { file, offset, read_bytes }),
            frame: None,
        }
    }

    pub fn anon(va: u64, writable: bool, stack: bool) -> Self {
        PageDescriptor {
            va,
            writable,
            stack,
            kind: Kind::Anon(AnonState { swap_slot: None }),
            frame: None,
        }
    }

    pub fn resident(&self) -> bool {
        self.frame.is_some()
    }

    /// Fill a freshly-claimed frame's contents. Reads an
    /// UNINIT page's backing for the first time, reloads an ANON page from
    /// swap, or re-reads a FILE page from its backing file.
    pub fn swap_in(&mut self, frame: &mut [u8], swap: &mut dyn SwapBackend) -> Result<()> {
        match &self.kind {
            Kind::Uninit(UninitBacking::Anon) => {
                frame.fill(0);
                self.kind = Kind::Anon(AnonState { swap_slot: None });
                Ok(())
            }
            Kind::Uninit(UninitBacking::File { file, offset, read_bytes }) => {
                let read_bytes = *read_bytes;
                let n = file.read_at(*offset, &mut frame[..read_bytes as usize]);
                frame[n..].fill(0);
                self.kind = Kind::File(FileState { file: file.clone(), offset: *offset, read_bytes });
                Ok(())
            }
            Kind::Anon(a) => {
                if let Some(slot) = a.swap_slot {
                    swap.read(slot, frame);
                    swap.free(slot);
                    self.kind = Kind::Anon(AnonState { swap_slot: None });
                } else {
                    frame.fill(0);
                }
                Ok(())
            }
            Kind::File(f) => {
                let read_bytes = f.read_bytes as usize;
                let n = f.file.read_at(f.offset, &mut frame[..read_bytes]);
                frame[n..].fill(0);
                Ok(())
            }
        }
    }

    /// Evict a resident frame. `dirty` reflects the hardware
    /// dirty bit sampled by the caller before unmapping. UNINIT can never be
    /// resident, so it is a caller bug, not a runtime condition.
    pub fn swap_out(&mut self, frame: &[u8], dirty: bool, swap: &mut dyn SwapBackend) -> Result<()> {
        match &mut self.kind {
            Kind::Uninit(_) => Err(KernelError::NotPresentButProtected),
            Kind::Anon(a) => {
                let slot = swap.alloc_and_write(frame).map_err(|_| KernelError::OutOfMemory)?;
                a.swap_slot = Some(slot);
                Ok(())
            }
            Kind::File(f) => {
                if dirty {
                    let read_bytes = f.read_bytes as usize;
                    f.file.write_at(f.offset, &frame[..read_bytes]);
                }
                Ok(())
            }
        }
    }

    /// Release any storage the page still owns. Frame release is the caller's responsibility —
    /// the frame table, not the page, owns the physical resource.
    pub fn destroy(&mut self, swap: &mut dyn SwapBackend) {
        if let Kind::Anon(a) = &mut self.kind {
            if let Some(slot) = a.swap_slot.take() {
                swap.free(slot);
            }
        }
    }
}
