//! Condition variable. `cond_wait` releases the caller's lock and blocks it; since
//! this crate has no resumable call stack to wake back into, each waiter
//! records which lock it must be reacquired onto, and `cond_signal`/
//! `cond_broadcast` (`sched::condvar`) do the reacquire themselves —
//! granting the lock directly if free, or re-queuing the waiter on it
//! exactly as a fresh contender would. This struct only tracks FIFO waiter
//! order.

use crate::ids::{LockId, Tid};
use alloc::collections::VecDeque;
use alloc::vec::Vec;

#[derive(Default)]
pub struct Condvar {
    waiters: VecDeque<(Tid, LockId)>,
}

impl Condvar {
    pub fn new() -> Self {
        Condvar { waiters: VecDeque::new() }
    }

    pub fn push(&mut self, tid: Tid, lock: LockId) {
        self.waiters.push_back((tid, lock));
    }

    pub fn pop_one(&mut self) -> Option<(Tid, LockId)> {
        self.waiters.pop_front()
    }

    pub fn pop_all(&mut self) -> Vec<(Tid, LockId)> {
        self.waiters.drain(..).collect()
    }
}
