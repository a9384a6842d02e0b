//! Scheduler core: thread arena, ready queue, sleepers, and the tick/yield/
//! block/unblock/schedule operations. Lock donation
//! (`donation`) and MLFQ recompute (`mlfq`) are implemented as additional
//! `impl Scheduler` blocks in their own files, all sharing the state
//! defined here, mirroring how tightly the original couples scheduler and
//! thread-control-block state.

pub mod condvar;
pub mod donation;
pub mod mlfq;

use crate::config::Config;
use crate::error::{KernelError, Result};
use crate::fixed::Fixed;
use crate::ids::{CondvarId, FrameId, LockId, Tid};
use crate::mmu::{Mmu, VirtAddr};
use crate::sync::condvar::Condvar;
use crate::sync::lock::LockState;
use crate::sync::Semaphore;
use crate::thread::{Status, Thread};
use crate::vm::frame::{EvictSink, FrameTable, PagePool};
use crate::vm::page::PageDescriptor;
use crate::vm::swap::SwapBackend;
use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;

/// Thread arena plus the scheduling queues.
pub struct RunQueue {
    threads: Vec<Option<Thread>>,
    ready: VecDeque<Tid>,
    running: Option<Tid>,
    next_tid: u32,
    pub ticks: u64,
    pub mlfqs: bool,
    pub load_avg: Fixed,
}

impl RunQueue {
    pub fn new(mlfqs: bool) -> Self {
        RunQueue {
            threads: Vec::new(),
            ready: VecDeque::new(),
            running: None,
            next_tid: 0,
            ticks: 0,
            mlfqs,
            load_avg: Fixed::from_int(0),
        }
    }

    pub fn spawn(&mut self, name: &str, priority: i32, entry: fn(usize), arg: usize) -> Tid {
        let tid = Tid(self.next_tid);
        self.next_tid += 1;
        let mut t = Thread::new(tid, String::from(name), priority);
        t.entry = Some(entry);
        t.entry_arg = arg;
        self.threads.push(Some(t));
        if self.running.is_none() {
            self.running = Some(tid);
            self.get_mut(tid).unwrap().status = Status::Running;
        } else {
            self.ready.push_back(tid);
        }
        tid
    }

    pub fn get(&self, tid: Tid) -> Option<&Thread> {
        self.threads.get(tid.0 as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, tid: Tid) -> Option<&mut Thread> {
        self.threads.get_mut(tid.0 as usize)?.as_mut()
    }

    pub fn current(&self) -> Tid {
        self.running.expect("RunQueue::current called with no thread running")
    }

    pub fn iter(&self) -> impl Iterator<Item = &Thread> {
        self.threads.iter().filter_map(|t| t.as_ref())
    }

    /// Reap a thread's arena slot once its parent has acknowledged its exit.
    pub fn reap(&mut self, tid: Tid) {
        if let Some(slot) = self.threads.get_mut(tid.0 as usize) {
            *slot = None;
        }
    }

    pub fn block(&mut self, tid: Tid) {
        self.ready.retain(|&t| t != tid);
        if let Some(t) = self.get_mut(tid) {
            t.status = Status::Blocked;
        }
        if self.running == Some(tid) {
            self.schedule();
        }
    }

    pub fn unblock(&mut self, tid: Tid) {
        let already_runnable = matches!(
            self.get(tid).map(|t| t.status),
            Some(Status::Ready) | Some(Status::Running)
        );
        if already_runnable {
            return;
        }
        if let Some(t) = self.get_mut(tid) {
            t.status = Status::Ready;
        }
        self.ready.push_back(tid);
        self.maybe_preempt();
    }

    pub fn sleep_until(&mut self, tid: Tid, wake_tick: u64) {
        self.ready.retain(|&t| t != tid);
        if let Some(t) = self.get_mut(tid) {
            t.status = Status::Sleeping;
            t.wake_at_tick = wake_tick;
        }
        if self.running == Some(tid) {
            self.schedule();
        }
    }

    pub fn yield_now(&mut self) {
        if let Some(cur) = self.running {
            if let Some(t) = self.get_mut(cur) {
                t.status = Status::Ready;
            }
            self.ready.push_back(cur);
        }
        self.schedule();
    }

    /// Pick the highest-priority ready thread, breaking ties in FIFO order.
    fn pick_next(&mut self) -> Option<Tid> {
        let mut best_idx = None;
        let mut best_pri = i32::MIN;
        for (i, &tid) in self.ready.iter().enumerate() {
            let pri = self.get(tid).map(|t| t.priority).unwrap_or(i32::MIN);
            if pri > best_pri {
                best_pri = pri;
                best_idx = Some(i);
            }
        }
        best_idx.map(|i| self.ready.remove(i).unwrap())
    }

    pub fn schedule(&mut self) {
        let next = match self.pick_next() {
            Some(t) => t,
            None => return,
        };
        self.running = Some(next);
        if let Some(t) = self.get_mut(next) {
            t.status = Status::Running;
        }
    }

    /// If some ready thread now outranks the running thread, switch to it
    /// immediately.
    pub fn maybe_preempt(&mut self) {
        let cur_pri = match self.running.and_then(|t| self.get(t)) {
            Some(t) => t.priority,
            None => {
                self.schedule();
                return;
            }
        };
        let outranked = self
            .ready
            .iter()
            .filter_map(|&tid| self.get(tid))
            .any(|t| t.priority > cur_pri);
        if outranked {
            if let Some(cur) = self.running {
                if let Some(t) = self.get_mut(cur) {
                    t.status = Status::Ready;
                }
                self.ready.push_back(cur);
            }
            self.schedule();
        }
    }

    pub fn sema_down(&mut self, tid: Tid, sema: &mut Semaphore) {
        if sema.value > 0 {
            sema.value -= 1;
        } else {
            sema.waiters.push_back(tid);
            self.block(tid);
        }
    }

    /// Returns the thread woken, if any, so callers (lock release, donation
    /// recompute) can react to who now owns the resource.
    pub fn sema_up(&mut self, sema: &mut Semaphore) -> Option<Tid> {
        if let Some(w) = sema.waiters.pop_front() {
            self.unblock(w);
            Some(w)
        } else {
            sema.value += 1;
            None
        }
    }
}

/// Top-level kernel scheduling + VM context: a [`RunQueue`] of threads, the
/// lock arena donation walks through, and the frame table/pool/swap device
/// page faults and eviction need.
pub struct Scheduler {
    pub runq: RunQueue,
    pub locks: Vec<LockState>,
    pub condvars: Vec<Condvar>,
    pub frames: FrameTable,
    pub pool: Box<dyn PagePool>,
    pub swap: Box<dyn SwapBackend>,
    next_mapid: i32,
}

impl Scheduler {
    pub fn new(config: &Config, pool: Box<dyn PagePool>, swap: Box<dyn SwapBackend>) -> Self {
        Scheduler {
            runq: RunQueue::new(config.mlfqs_enabled),
            locks: Vec::new(),
            condvars: Vec::new(),
            frames: FrameTable::new(),
            pool,
            swap,
            next_mapid: 0,
        }
    }

    pub fn spawn(&mut self, name: &str, priority: i32, entry: fn(usize), arg: usize) -> Tid {
        self.runq.spawn(name, priority, entry, arg)
    }

    pub fn current(&self) -> Tid {
        self.runq.current()
    }

    pub fn tick(&mut self) {
        self.runq.tick_runqueue();
    }

    pub fn new_lock(&mut self) -> LockId {
        self.locks.push(LockState::new());
        LockId(self.locks.len() as u32 - 1)
    }

    pub fn new_condvar(&mut self) -> CondvarId {
        self.condvars.push(Condvar::new());
        CondvarId(self.condvars.len() as u32 - 1)
    }

    pub fn next_mapid(&mut self) -> i32 {
        self.next_mapid += 1;
        self.next_mapid
    }

    /// Tear down an exiting thread's address space,
    /// and wake the parent's `wait` if it is blocked on this thread's exit.
    pub fn exit_thread(&mut self, tid: Tid, exit_code: i32) -> Result<()> {
        let had_pml4 = self.runq.get(tid).map(|t| t.pml4.is_some()).unwrap_or(false);
        if had_pml4 {
            let mut mmu_box = self
                .runq
                .get_mut(tid)
                .and_then(|t| t.pml4.take())
                .ok_or(KernelError::ChildNotFound)?;
            let frames = &mut self.frames;
            let pool = &mut *self.pool;
            let swap = &mut *self.swap;
            if let Some(t) = self.runq.get_mut(tid) {
                t.spt.kill(mmu_box.as_mut(), frames, pool, swap);
            }
            if let Some(t) = self.runq.get_mut(tid) {
                t.pml4 = Some(mmu_box);
            }
        }
        if let Some(t) = self.runq.get_mut(tid) {
            log::info!("{}: exit({})", t.name, exit_code);
            t.exit_code = exit_code;
            t.status = Status::Dying;
        }
        self.runq.ready.retain(|&t| t != tid);
        let mut sema = Semaphore::new(0);
        core::mem::swap(
            &mut sema,
            &mut self.runq.get_mut(tid).ok_or(KernelError::ChildNotFound)?.exit_signal,
        );
        self.runq.sema_up(&mut sema);
        core::mem::swap(
            &mut sema,
            &mut self.runq.get_mut(tid).ok_or(KernelError::ChildNotFound)?.exit_signal,
        );
        if self.runq.running == Some(tid) {
            self.runq.schedule();
        }
        Ok(())
    }

    /// Begin waiting for `child`. Returns `true` if
    /// `child` has already exited — the caller may collect its exit code
    /// immediately with [`Scheduler::wait_collect`] without blocking.
    /// Otherwise the caller is blocked; a later [`Scheduler::exit_thread`]
    /// on `child` wakes it, after which the caller calls `wait_collect`.
    pub fn wait_begin(&mut self, caller: Tid, child: Tid) -> Result<bool> {
        let status = self.runq.get(child).map(|t| t.status).ok_or(KernelError::ChildNotFound)?;
        if status == Status::Dying {
            return Ok(true);
        }
        let mut sema = Semaphore::new(0);
        core::mem::swap(
            &mut sema,
            &mut self.runq.get_mut(child).ok_or(KernelError::ChildNotFound)?.exit_signal,
        );
        self.runq.sema_down(caller, &mut sema);
        core::mem::swap(
            &mut sema,
            &mut self.runq.get_mut(child).ok_or(KernelError::ChildNotFound)?.exit_signal,
        );
        Ok(false)
    }

    /// Collect a reaped child's exit code. Caller must already know `child`
    /// is `Dying` (either `wait_begin` returned `true`, or the caller was
    /// woken after blocking in it).
    pub fn wait_collect(&mut self, child: Tid) -> Result<i32> {
        let code = self.runq.get(child).map(|t| t.exit_code).ok_or(KernelError::ChildNotFound)?;
        self.runq.reap(child);
        Ok(code)
    }
}

/// Bridges [`FrameTable::get_frame`]'s eviction callback to whichever
/// thread owns the victim frame, borrowing only `runq` and `swap` —
/// disjoint from the `frames`/`pool` fields `get_frame` itself borrows, so
/// `Scheduler` never needs to hand out a whole `&mut self` mid-call.
pub(crate) struct FaultSink<'a> {
    pub runq: &'a mut RunQueue,
    pub swap: &'a mut dyn SwapBackend,
}

impl<'a> EvictSink for FaultSink<'a> {
    fn mmu_of(&mut self, tid: Tid) -> &mut dyn Mmu {
        self.runq
            .get_mut(tid)
            .and_then(|t| t.pml4.as_mut())
            .expect("evicted frame's owner has no page table")
            .as_mut()
    }

    fn descriptor_of(&mut self, tid: Tid, va: VirtAddr) -> Option<&mut PageDescriptor> {
        self.runq.get_mut(tid)?.spt.find_mut(va)
    }

    fn swap(&mut self) -> &mut dyn SwapBackend {
        self.swap
    }
}

/// Release a resident frame back to the pool, used by both eviction and
/// explicit `munmap`/process teardown.
pub fn release_frame(frames: &mut FrameTable, id: FrameId, pool: &mut dyn PagePool) {
    frames.release(id, pool);
}
