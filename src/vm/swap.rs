//! Swap backend collaborator.

use crate::config::PAGE_SIZE;
use crate::ids::SlotId;
use alloc::vec::Vec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapError {
    /// Every slot is in use.
    Exhausted,
    BadSlot,
}

/// A flat array of page-sized slots. Real targets back this with a disk
/// partition; [`MemSwap`] backs it with a `Vec` for the hosted test suite.
pub trait SwapBackend: Send {
    /// Reserve a free slot and write `page` into it.
    fn alloc_and_write(&mut self, page: &[u8]) -> Result<SlotId, SwapError>;
    /// Read a previously-written slot into `page`.
    fn read(&self, slot: SlotId, page: &mut [u8]);
    /// Release a slot for reuse.
    fn free(&mut self, slot: SlotId);
}

/// In-memory swap device sized to a fixed slot count, used by tests to
/// exercise both the happy path and [`SwapError::Exhausted`].
pub struct MemSwap {
    slots: Vec<Option<[u8; PAGE_SIZE]>>,
}

impl MemSwap {
    pub fn with_capacity(slot_count: usize) -> Self {
        MemSwap { slots: (0..slot_count).map(|_| None).collect() }
    }
}

impl SwapBackend for MemSwap {
    fn alloc_and_write(&mut self, page: &[u8]) -> Result<SlotId, SwapError> {
        let idx = self.slots.iter().position(Option::is_none).ok_or(SwapError::Exhausted)?;
        let mut buf = [0u8; PAGE_SIZE];
        buf[..page.len()].copy_from_slice(page);
        self.slots[idx] = Some(buf);
        Ok(SlotId(idx as u32))
    }

    fn read(&self, slot: SlotId, page: &mut [u8]) {
        if let Some(Some(buf)) = self.slots.get(slot.0 as usize) {
            let n = core::cmp::min(page.len(), buf.len());
            page[..n].copy_from_slice(&buf[..n]);
        }
    }

    fn free(&mut self, slot: SlotId) {
        if let Some(entry) = self.slots.get_mut(slot.0 as usize) {
            *entry = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_a_page() {
        let mut swap = MemSwap::with_capacity(2);
        let page = [7u8; PAGE_SIZE];
        let slot = swap.alloc_and_write(&page).unwrap();
        let mut out = [0u8; PAGE_SIZE];
        swap.read(slot, &mut out);
        assert_eq!(&out[..], &page[..]);
    }

    #[test]
    fn exhaustion_is_reported() {
        let mut swap = MemSwap::with_capacity(1);
        swap.alloc_and_write(&[1u8; PAGE_SIZE]).unwrap();
        assert_eq!(swap.alloc_and_write(&[2u8; PAGE_SIZE]), Err(SwapError::Exhausted));
    }

    #[test]
    fn freed_slot_is_reusable() {
        let mut swap = MemSwap::with_capacity(1);
        let slot = swap.alloc_and_write(&[1u8; PAGE_SIZE]).unwrap();
        swap.free(slot);
        assert!(swap.alloc_and_write(&[2u8; PAGE_SIZE]).is_ok());
    }
}
