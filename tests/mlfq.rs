//! Invariant 6: under MLFQ, 4-tick-aligned priority recomputation always
//! produces priorities within `[PRI_MIN, PRI_MAX]`, however recent_cpu/nice
//! drift over a long run.

use os_core::config::{Config, NICE_MAX, NICE_MIN, PRI_MAX, PRI_MIN};
use os_core::sched::Scheduler;
use os_core::vm::frame::FixedPagePool;
use os_core::vm::swap::MemSwap;

fn mlfq_scheduler() -> Scheduler {
    let cfg = Config { mlfqs_enabled: true, ..Config::default() };
    Scheduler::new(&cfg, Box::new(FixedPagePool::with_capacity(4)), Box::new(MemSwap::with_capacity(4)))
}

#[test]
fn recomputed_priorities_stay_in_range_over_many_ticks() {
    let mut s = mlfq_scheduler();
    let busy = s.spawn("busy", 31, |_| {}, 0);
    let idle = s.spawn("idle", 31, |_| {}, 0);
    s.runq.set_nice(busy, NICE_MAX);
    s.runq.set_nice(idle, NICE_MIN);

    for _ in 0..400 {
        s.tick();
        for tid in [busy, idle] {
            let pri = s.runq.get(tid).unwrap().priority;
            assert!(pri >= PRI_MIN && pri <= PRI_MAX, "priority {pri} out of range");
        }
    }
}

#[test]
fn niceness_is_clamped_to_its_range() {
    let mut s = mlfq_scheduler();
    let t = s.spawn("t", 31, |_| {}, 0);
    s.runq.set_nice(t, 1000);
    assert_eq!(s.runq.get(t).unwrap().nice, NICE_MAX);
    s.runq.set_nice(t, -1000);
    assert_eq!(s.runq.get(t).unwrap().nice, NICE_MIN);
}
