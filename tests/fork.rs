//! Scenario F: fork isolation. A byte written into the parent's address
//! space before forking is visible to both parent and child; after the
//! fork, each process's writes to the same virtual address are invisible
//! to the other.

use os_core::config::Config;
use os_core::mmu::MockMmu;
use os_core::sched::Scheduler;
use os_core::vm::frame::FixedPagePool;
use os_core::vm::page::PageDescriptor;
use os_core::vm::swap::MemSwap;

fn fresh() -> Scheduler {
    Scheduler::new(&Config::default(), Box::new(FixedPagePool::with_capacity(8)), Box::new(MemSwap::with_capacity(8)))
}

fn write_byte(s: &mut Scheduler, tid: os_core::ids::Tid, va: u64, value: u8) {
    let phys = s
        .runq
        .get(tid)
        .unwrap()
        .pml4
        .as_ref()
        .unwrap()
        .translate(va)
        .unwrap()
        .phys;
    s.frames.frame_bytes_mut(os_core::ids::FrameId(phys as u32))[0] = value;
}

fn read_byte(s: &Scheduler, tid: os_core::ids::Tid, va: u64) -> u8 {
    let phys = s
        .runq
        .get(tid)
        .unwrap()
        .pml4
        .as_ref()
        .unwrap()
        .translate(va)
        .unwrap()
        .phys;
    s.frames.frame_bytes(os_core::ids::FrameId(phys as u32))[0]
}

#[test]
fn fork_isolates_writes_between_parent_and_child() {
    let mut s = fresh();
    let parent = s.spawn("parent", 20, |_| {}, 0);
    s.runq.get_mut(parent).unwrap().pml4 = Some(Box::new(MockMmu::new()));

    let va = 0x40_0000;
    s.runq.get_mut(parent).unwrap().spt.insert(PageDescriptor::anon(va, true, false));
    s.claim(parent, va).unwrap();
    write_byte(&mut s, parent, va, b'A');

    let child = s.fork(parent, "child", Box::new(MockMmu::new())).unwrap();
    assert_eq!(read_byte(&s, child, va), b'A');

    write_byte(&mut s, child, va, b'B');
    assert_eq!(read_byte(&s, parent, va), b'A');
    assert_eq!(read_byte(&s, child, va), b'B');
}

#[test]
fn fork_records_parent_child_relationship() {
    let mut s = fresh();
    let parent = s.spawn("parent", 20, |_| {}, 0);
    s.runq.get_mut(parent).unwrap().pml4 = Some(Box::new(MockMmu::new()));
    let child = s.fork(parent, "child", Box::new(MockMmu::new())).unwrap();
    assert_eq!(s.runq.get(child).unwrap().parent, Some(parent));
    assert!(s.runq.get(parent).unwrap().children.contains(&child));
}
