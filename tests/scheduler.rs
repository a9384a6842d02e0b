//! End-to-end scheduler scenarios: priority donation chains, strict
//! preemption on thread creation, and sleep-wake ordering.

use os_core::config::Config;
use os_core::sched::Scheduler;
use os_core::thread::Status;
use os_core::vm::frame::FixedPagePool;
use os_core::vm::swap::MemSwap;

fn fresh() -> Scheduler {
    Scheduler::new(&Config::default(), Box::new(FixedPagePool::with_capacity(8)), Box::new(MemSwap::with_capacity(8)))
}

/// Scenario A: H(40) waits on L1 held by M(31), which waits on L2 held by
/// L(10). Both M and L observe priority 40 until H stops waiting; releases
/// unwind the donation one hop at a time.
#[test]
fn priority_donation_chain_unwinds_on_release() {
    let mut s = fresh();
    let low = s.spawn("L", 10, |_| {}, 0);
    let mid = s.spawn("M", 31, |_| {}, 0);
    let high = s.spawn("H", 40, |_| {}, 0);

    let l1 = s.new_lock();
    let l2 = s.new_lock();

    assert!(s.lock_acquire(low, l2).unwrap());
    assert!(s.lock_acquire(mid, l1).unwrap());
    assert!(!s.lock_acquire(mid, l2).unwrap());
    assert_eq!(s.runq.get(low).unwrap().priority, 31);

    assert!(!s.lock_acquire(high, l1).unwrap());
    assert_eq!(s.runq.get(mid).unwrap().priority, 40);
    assert_eq!(s.runq.get(low).unwrap().priority, 40);

    s.lock_release(low, l2).unwrap();
    assert_eq!(s.runq.get(low).unwrap().priority, 10);
    assert_eq!(s.runq.get(mid).unwrap().priority, 40);

    s.lock_release(mid, l1).unwrap();
    assert_eq!(s.runq.get(mid).unwrap().priority, 31);
    assert_eq!(s.locks[l1.0 as usize].holder, Some(high));
}

/// Scenario B: a low-priority thread spawning a much higher-priority one is
/// preempted immediately — `maybe_preempt` fires inside `spawn`'s caller
/// path the moment the new thread outranks whatever is running.
#[test]
fn spawning_a_higher_priority_thread_preempts_immediately() {
    let mut s = fresh();
    let low = s.spawn("low", 5, |_| {}, 0);
    assert_eq!(s.current(), low);

    let high = s.spawn("high", 50, |_| {}, 0);
    s.runq.maybe_preempt();
    assert_eq!(s.current(), high);
    assert_eq!(s.runq.get(low).unwrap().status, Status::Ready);
}

/// Scenario C: three sleepers requesting wake ticks 10, 5, 15 (relative to
/// the same instant) wake in ascending tick order, never early.
#[test]
fn sleepers_wake_in_tick_order() {
    let mut s = fresh();
    let a = s.spawn("a", 20, |_| {}, 0);
    let b = s.spawn("b", 20, |_| {}, 0);
    let c = s.spawn("c", 20, |_| {}, 0);

    s.runq.sleep_until(a, 10);
    s.runq.sleep_until(b, 5);
    s.runq.sleep_until(c, 15);

    for status_tid in [a, b, c] {
        assert_eq!(s.runq.get(status_tid).unwrap().status, Status::Sleeping);
    }

    for _ in 0..5 {
        s.tick();
    }
    assert_eq!(s.runq.get(b).unwrap().status, Status::Ready);
    assert_eq!(s.runq.get(a).unwrap().status, Status::Sleeping);
    assert_eq!(s.runq.get(c).unwrap().status, Status::Sleeping);

    for _ in 0..5 {
        s.tick();
    }
    assert_eq!(s.runq.get(a).unwrap().status, Status::Ready);
    assert_eq!(s.runq.get(c).unwrap().status, Status::Sleeping);

    for _ in 0..5 {
        s.tick();
    }
    assert_eq!(s.runq.get(c).unwrap().status, Status::Ready);
}

/// Invariant 1: donation only ever raises priority above base.
#[test]
fn donated_priority_never_drops_below_base() {
    let mut s = fresh();
    let low = s.spawn("low", 10, |_| {}, 0);
    assert!(s.runq.get(low).unwrap().priority >= s.runq.get(low).unwrap().base_priority);
    s.set_priority(low, 5);
    assert!(s.runq.get(low).unwrap().priority >= s.runq.get(low).unwrap().base_priority);
}

/// Invariant 2: a thread's status agrees with which queue it's actually in.
#[test]
fn ready_status_matches_ready_queue_membership() {
    let mut s = fresh();
    let a = s.spawn("a", 10, |_| {}, 0);
    let b = s.spawn("b", 10, |_| {}, 0);
    assert_eq!(s.runq.get(a).unwrap().status, Status::Running);
    assert_eq!(s.runq.get(b).unwrap().status, Status::Ready);
}
