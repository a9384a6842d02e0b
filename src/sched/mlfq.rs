//! MLFQ recompute formulas, ported from the original's
//! fixed-point arithmetic onto [`Fixed`]. Only active when `mlfqs` is set;
//! otherwise `tick_runqueue` just advances the clock and wakes sleepers.

use crate::config::{NICE_MAX, NICE_MIN, PRI_MAX, PRI_MIN};
use crate::fixed::Fixed;
use crate::sched::RunQueue;
use crate::thread::Status;

/// Timer interrupts per second, matching the original's `TIMER_FREQ`:
/// load average and recent CPU recompute once per second of ticks.
const TIMER_FREQ: u64 = 100;

impl RunQueue {
    /// Advance the clock by one tick: wake due sleepers, do MLFQ accounting
    /// if enabled, then resolve any preemption the accounting caused.
    pub fn tick_runqueue(&mut self) {
        self.ticks += 1;
        self.wake_sleepers();

        if self.mlfqs {
            self.mlfq_account_running_thread();
            if self.ticks % 4 == 0 {
                self.mlfq_recompute_all_priorities();
            }
            if self.ticks % TIMER_FREQ == 0 {
                self.mlfq_update_load_avg();
                self.mlfq_recompute_all_recent_cpu();
                self.mlfq_recompute_all_priorities();
            }
        }

        self.maybe_preempt();
    }

    fn wake_sleepers(&mut self) {
        let ticks = self.ticks;
        let due: alloc::vec::Vec<_> = self
            .iter()
            .filter(|t| t.status == Status::Sleeping && t.wake_at_tick <= ticks)
            .map(|t| t.tid)
            .collect();
        for tid in due {
            if let Some(t) = self.get_mut(tid) {
                t.status = Status::Ready;
            }
            self.ready.push_back(tid);
        }
    }

    fn mlfq_account_running_thread(&mut self) {
        let running = match self.running {
            Some(t) => t,
            None => return,
        };
        if let Some(t) = self.get_mut(running) {
            t.recent_cpu = t.recent_cpu + Fixed::from_int(1);
        }
    }

    /// `recent_cpu' = (2*load_avg)/(2*load_avg+1) * recent_cpu + nice`
    fn mlfq_recompute_all_recent_cpu(&mut self) {
        let load_avg = self.load_avg;
        let two_la = load_avg.mul_int(2);
        let coeff = two_la / (two_la.add_int(1));
        let tids: alloc::vec::Vec<_> = self.iter().map(|t| t.tid).collect();
        for tid in tids {
            if let Some(t) = self.get_mut(tid) {
                t.recent_cpu = (coeff * t.recent_cpu).add_int(t.nice);
            }
        }
    }

    /// `load_avg' = (59/60)*load_avg + (1/60)*ready_threads`
    fn mlfq_update_load_avg(&mut self) {
        let ready_threads = self
            .iter()
            .filter(|t| t.status == Status::Ready || t.status == Status::Running)
            .count() as i32;
        let fifty_nine_sixtieths = Fixed::from_int(59) / Fixed::from_int(60);
        let one_sixtieth = Fixed::from_int(1) / Fixed::from_int(60);
        self.load_avg = fifty_nine_sixtieths * self.load_avg + one_sixtieth.mul_int(ready_threads);
    }

    /// `priority = PRI_MAX - (recent_cpu/4) - (nice*2)`, clamped.
    fn mlfq_recompute_all_priorities(&mut self) {
        let tids: alloc::vec::Vec<_> = self.iter().map(|t| t.tid).collect();
        for tid in tids {
            if let Some(t) = self.get_mut(tid) {
                let cpu_term = t.recent_cpu.div_int(4).trunc_to_int();
                let nice_term = t.nice * 2;
                let pri = PRI_MAX - cpu_term - nice_term;
                t.priority = pri.clamp(PRI_MIN, PRI_MAX);
            }
        }
        self.maybe_preempt();
    }

    /// Apply a new niceness, clamped to `[NICE_MIN, NICE_MAX]`, and
    /// recompute that thread's priority immediately.
    pub fn set_nice(&mut self, tid: crate::ids::Tid, nice: i32) {
        let nice = nice.clamp(NICE_MIN, NICE_MAX);
        if let Some(t) = self.get_mut(tid) {
            t.nice = nice;
        }
        self.mlfq_recompute_all_priorities();
    }
}
