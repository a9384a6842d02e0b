//! Lock data. `release` hands
//! the lock directly to the longest-waiting thread rather than reopening it
//! for general contention — this crate models kernel state transitions as
//! discrete operations rather than truly resumable blocked call stacks, so
//! a released lock must name its next holder explicitly instead of relying
//! on whichever caller happens to retry first. The acquire/release
//! algorithm itself lives in `sched::donation`, where it has access to the
//! thread arena needed to walk a donation chain.

use crate::ids::Tid;
use alloc::collections::VecDeque;

#[derive(Default)]
pub struct LockState {
    pub holder: Option<Tid>,
    pub waiters: VecDeque<Tid>,
}

impl LockState {
    pub fn new() -> Self {
        LockState { holder: None, waiters: VecDeque::new() }
    }
}
