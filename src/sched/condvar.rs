//! Condition variable operations. `cond_wait` releases the caller's lock and blocks; the crate's
//! discrete-event model has no call stack to resume into once the thread is
//! woken, so `cond_signal`/`cond_broadcast` perform the reacquire
//! themselves — granting the lock immediately if it's free, or re-queuing
//! the waiter on it exactly as a fresh contender would (`lock_acquire`'s
//! own slow path, mirrored here rather than called directly since the
//! thread is already blocked and must not be re-blocked a second time).

use crate::error::{KernelError, Result};
use crate::ids::{CondvarId, LockId, Tid};
use crate::sched::Scheduler;

impl Scheduler {
    /// Atomically release `lock` and block `tid` on `cv`.
    /// `tid` must hold `lock`.
    pub fn cond_wait(&mut self, tid: Tid, cv: CondvarId, lock: LockId) -> Result<()> {
        self.lock_release(tid, lock)?;
        self.condvars
            .get_mut(cv.0 as usize)
            .ok_or(KernelError::NoSuchLock)?
            .push(tid, lock);
        self.runq.block(tid);
        Ok(())
    }

    /// Wake the longest-waiting thread on `cv`, if any.
    pub fn cond_signal(&mut self, cv: CondvarId) -> Result<()> {
        let woken = self.condvars.get_mut(cv.0 as usize).ok_or(KernelError::NoSuchLock)?.pop_one();
        if let Some((tid, lock)) = woken {
            self.reacquire_after_wait(tid, lock);
        }
        Ok(())
    }

    /// Wake every thread waiting on `cv`.
    pub fn cond_broadcast(&mut self, cv: CondvarId) -> Result<()> {
        let woken = self.condvars.get_mut(cv.0 as usize).ok_or(KernelError::NoSuchLock)?.pop_all();
        for (tid, lock) in woken {
            self.reacquire_after_wait(tid, lock);
        }
        Ok(())
    }

    fn reacquire_after_wait(&mut self, tid: Tid, lock: LockId) {
        if self.locks[lock.0 as usize].holder.is_none() {
            self.grant(tid, lock);
            self.runq.unblock(tid);
        } else {
            if let Some(t) = self.runq.get_mut(tid) {
                t.waiting_on_lock = Some(lock);
            }
            self.locks[lock.0 as usize].waiters.push_back(tid);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::sched::Scheduler;
    use crate::thread::Status;
    use crate::vm::frame::FixedPagePool;
    use crate::vm::swap::MemSwap;
    use alloc::boxed::Box;

    fn fresh() -> Scheduler {
        Scheduler::new(&Config::default(), Box::new(FixedPagePool::with_capacity(4)), Box::new(MemSwap::with_capacity(4)))
    }

    #[test]
    fn signal_hands_the_lock_back_to_the_waiter() {
        let mut s = fresh();
        let t = s.spawn("t", 31, |_| {}, 0);
        let lock = s.new_lock();
        let cv = s.new_condvar();
        assert!(s.lock_acquire(t, lock).unwrap());

        s.cond_wait(t, cv, lock).unwrap();
        assert_eq!(s.locks[lock.0 as usize].holder, None);
        assert_eq!(s.runq.get(t).unwrap().status, Status::Blocked);

        s.cond_signal(cv).unwrap();
        assert_eq!(s.locks[lock.0 as usize].holder, Some(t));
        assert_ne!(s.runq.get(t).unwrap().status, Status::Blocked);
    }

    #[test]
    fn broadcast_wakes_every_waiter() {
        let mut s = fresh();
        let lock = s.new_lock();
        let cv = s.new_condvar();
        let a = s.spawn("a", 31, |_| {}, 0);
        let b = s.spawn("b", 31, |_| {}, 0);
        assert!(s.lock_acquire(a, lock).unwrap());
        s.cond_wait(a, cv, lock).unwrap();
        assert!(s.lock_acquire(b, lock).unwrap());
        s.cond_wait(b, cv, lock).unwrap();

        s.cond_broadcast(cv).unwrap();
        // One of them gets the lock directly; the other re-queues on it.
        let holder = s.locks[lock.0 as usize].holder;
        assert!(holder == Some(a) || holder == Some(b));
        assert_eq!(s.locks[lock.0 as usize].waiters.len(), 1);
    }
}
