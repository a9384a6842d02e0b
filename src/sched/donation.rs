//! Priority donation: acquiring a held lock donates the
//! acquirer's priority up the holder chain; releasing recomputes the
//! releaser's priority from its remaining held locks.

use crate::config::MAX_DONATION_CHAIN;
use crate::error::{KernelError, Result};
use crate::ids::{LockId, Tid};
use crate::sched::Scheduler;
use arrayvec::ArrayVec;

impl Scheduler {
    /// Acquire `lock` for `tid`, donating priority along the holder chain
    /// if it is already held. Returns `true` if `tid` got
    /// the lock immediately, `false` if it was queued and blocked — in
    /// which case a later [`Scheduler::lock_release`] grants it directly
    /// (this crate models blocking as a discrete state transition, not a
    /// resumable call stack, so there is no "wake up and keep going" point
    /// inside this function to resume into).
    pub fn lock_acquire(&mut self, tid: Tid, lock: LockId) -> Result<bool> {
        if self.locks.get(lock.0 as usize).is_none() {
            return Err(KernelError::NoSuchLock);
        }
        if self.locks[lock.0 as usize].holder.is_none() {
            self.grant(tid, lock);
            return Ok(true);
        }
        if !self.runq.mlfqs {
            self.donate_chain(tid, lock);
        }
        if let Some(t) = self.runq.get_mut(tid) {
            t.waiting_on_lock = Some(lock);
        }
        self.locks[lock.0 as usize].waiters.push_back(tid);
        self.runq.block(tid);
        Ok(false)
    }

    pub(crate) fn grant(&mut self, tid: Tid, lock: LockId) {
        self.locks[lock.0 as usize].holder = Some(tid);
        if let Some(t) = self.runq.get_mut(tid) {
            t.waiting_on_lock = None;
            t.locks_held.push(lock);
        }
    }

    /// Walk from `tid` through whatever locks its holders are themselves
    /// waiting on, collecting the chain of holders to raise, then
    /// donates `tid`'s priority to each in order.
    fn donate_chain(&mut self, tid: Tid, lock: LockId) {
        let donor_priority = self.runq.get(tid).map(|t| t.priority).unwrap_or(i32::MIN);
        let mut chain: ArrayVec<Tid, MAX_DONATION_CHAIN> = ArrayVec::new();

        let mut current_lock = lock;
        while !chain.is_full() {
            let holder = match self.locks.get(current_lock.0 as usize).and_then(|l| l.holder) {
                Some(h) => h,
                None => break,
            };
            let holder_priority = self.runq.get(holder).map(|t| t.priority).unwrap_or(i32::MIN);
            if holder_priority >= donor_priority {
                break;
            }
            chain.push(holder);
            match self.runq.get(holder).and_then(|t| t.waiting_on_lock) {
                Some(next_lock) => current_lock = next_lock,
                None => break,
            }
        }
        if chain.is_full() {
            log::warn!("donation chain from {:?} hit the {}-hop cap", tid, MAX_DONATION_CHAIN);
        }

        for holder in chain {
            if let Some(t) = self.runq.get_mut(holder) {
                t.priority = donor_priority;
            }
            self.runq.maybe_preempt();
        }
    }

    /// Release `lock`, restoring the releasing thread's priority to the max
    /// of its base priority and any donations still owed by its other held
    /// locks.
    pub fn lock_release(&mut self, tid: Tid, lock: LockId) -> Result<()> {
        let lock_idx = lock.0 as usize;
        if self.locks.get(lock_idx).and_then(|l| l.holder) != Some(tid) {
            return Err(KernelError::NoSuchLock);
        }
        self.locks[lock_idx].holder = None;
        if let Some(t) = self.runq.get_mut(tid) {
            t.locks_held.retain(|&l| l != lock);
        }

        if let Some(next) = self.locks[lock_idx].waiters.pop_front() {
            self.grant(next, lock);
            self.runq.unblock(next);
        }

        self.recompute_priority(tid);
        Ok(())
    }

    /// Recompute `tid`'s effective priority as the max of its base priority
    /// and the highest priority among threads waiting on locks it still
    /// holds.
    fn recompute_priority(&mut self, tid: Tid) {
        let base = self.runq.get(tid).map(|t| t.base_priority).unwrap_or(0);
        let held: alloc::vec::Vec<LockId> =
            self.runq.get(tid).map(|t| t.locks_held.clone()).unwrap_or_default();

        let mut effective = base;
        for held_lock in held {
            for other in self.runq.iter() {
                if other.waiting_on_lock == Some(held_lock) && other.priority > effective {
                    effective = other.priority;
                }
            }
        }
        if let Some(t) = self.runq.get_mut(tid) {
            t.priority = effective;
        }
        self.runq.maybe_preempt();
    }

    /// Apply a new base priority, then
    /// recompute the effective priority in case of outstanding donations.
    /// A no-op under MLFQ, which derives priority from `recent_cpu`/`nice`
    /// instead of letting threads set their own.
    pub fn set_priority(&mut self, tid: Tid, new_base: i32) {
        if self.runq.mlfqs {
            return;
        }
        let new_base = new_base.clamp(crate::config::PRI_MIN, crate::config::PRI_MAX);
        if let Some(t) = self.runq.get_mut(tid) {
            t.base_priority = new_base;
        }
        self.recompute_priority(tid);
    }
}
