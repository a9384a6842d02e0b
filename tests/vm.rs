//! End-to-end VM scenarios: lazy mmap with dirty write-back, stack growth,
//! and the SPT/frame-table residency invariant.

use os_core::config::Config;
use os_core::fs::{FileSystem, MemFs};
use os_core::mmu::MockMmu;
use os_core::sched::Scheduler;
use os_core::vm::frame::FixedPagePool;
use os_core::vm::swap::MemSwap;

fn fresh() -> Scheduler {
    Scheduler::new(&Config::default(), Box::new(FixedPagePool::with_capacity(8)), Box::new(MemSwap::with_capacity(8)))
}

/// Scenario D: mmap a file spanning two pages; a read fault on page 0
/// pulls the first byte in from the file; a write to offset 2000 (still
/// page 0) followed by munmap writes that byte back, leaving the untouched
/// second page's tail bytes alone.
#[test]
fn mmap_lazily_faults_in_and_writes_back_dirty_pages() {
    let mut s = fresh();
    let t = s.spawn("t", 20, |_| {}, 0);
    s.runq.get_mut(t).unwrap().pml4 = Some(Box::new(MockMmu::new()));

    let fs = MemFs::new();
    let mut contents = vec![b'x'; 5000];
    contents[0] = 1;
    fs.create("/data.bin", &contents);
    let file = fs.open("/data.bin").unwrap();

    let id = s.mmap(t, 0x10_0000, 5000, &file).unwrap();

    s.page_fault(t, 0x10_0000, false, true).unwrap();
    let byte0 = {
        let frame = s
            .runq
            .get(t)
            .unwrap()
            .pml4
            .as_ref()
            .unwrap()
            .translate(0x10_0000)
            .unwrap();
        s.frames.frame_bytes(os_core::ids::FrameId(frame.phys as u32))[0]
    };
    assert_eq!(byte0, 1);

    {
        let mapping = s.runq.get(t).unwrap().pml4.as_ref().unwrap().translate(0x10_0000).unwrap();
        let frame_bytes = s.frames.frame_bytes_mut(os_core::ids::FrameId(mapping.phys as u32));
        frame_bytes[2000] = 99;
    }
    s.runq.get_mut(t).unwrap().pml4.as_mut().unwrap().set_dirty(0x10_0000, true);

    s.munmap(t, id).unwrap();

    let mut buf = [0u8; 1];
    assert_eq!(file.read_at(2000, &mut buf), 1);
    assert_eq!(buf[0], 99);

    // Second page never faulted in, so its tail bytes are untouched.
    let mut tail = [0u8; 1];
    file.read_at(4999, &mut tail);
    assert_eq!(tail[0], b'x');
}

/// Scenario E: a near-miss fault just below the current stack grows it by
/// one page; a fault far below the growth limit fails outright.
#[test]
fn stack_growth_within_limit_succeeds_beyond_it_fails() {
    let mut s = fresh();
    let t = s.spawn("t", 20, |_| {}, 0);
    s.runq.get_mut(t).unwrap().pml4 = Some(Box::new(MockMmu::new()));

    let near_fault = os_core::config::USER_STACK_TOP - 5000;
    assert!(s.page_fault(t, near_fault, true, true).is_ok());
    assert!(s.runq.get(t).unwrap().spt.find(near_fault & !(os_core::config::PAGE_SIZE as u64 - 1)).is_some());

    let far_fault = os_core::config::USER_STACK_TOP - 2_000_000;
    assert!(s.page_fault(t, far_fault, true, true).is_err());
}

/// Invariant 3: an SPT entry is resident exactly when some frame points
/// back at it.
#[test]
fn residency_matches_frame_backlink() {
    let mut s = fresh();
    let t = s.spawn("t", 20, |_| {}, 0);
    s.runq.get_mut(t).unwrap().pml4 = Some(Box::new(MockMmu::new()));

    let va = 0x20_0000;
    s.runq.get_mut(t).unwrap().spt.insert(os_core::vm::page::PageDescriptor::anon(va, true, false));
    assert!(!s.runq.get(t).unwrap().spt.find(va).unwrap().resident());

    s.claim(t, va).unwrap();
    assert!(s.runq.get(t).unwrap().spt.find(va).unwrap().resident());
}
