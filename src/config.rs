//! Boot-time configuration: scheduler policy constants and the
//! kernel-command-line parsing that selects MLFQ vs. strict priority
//! scheduling (the `-o mlfqs` token).

/// Lowest legal thread priority.
pub const PRI_MIN: i32 = 0;
/// Default priority assigned to a newly created thread absent an explicit one.
pub const PRI_DEFAULT: i32 = 31;
/// Highest legal thread priority.
pub const PRI_MAX: i32 = 63;

/// Bound on a niceness value under MLFQ.
pub const NICE_MIN: i32 = -20;
pub const NICE_MAX: i32 = 20;

/// Maximum donation-chain depth walked by `lock_acquire`.
pub const MAX_DONATION_CHAIN: usize = 8;

/// Page size assumed throughout the VM subsystem.
pub const PAGE_SIZE: usize = 4096;

/// Topmost user virtual address; the initial stack page ends here.
pub const USER_STACK_TOP: u64 = 0x0000_4747_4747_0000;

/// Lowest address belonging to the kernel's half of the address space. Any
/// fault at or above this line is never a user page table's problem.
pub const KERN_BASE: u64 = 0x0000_8004_0000_0000;

/// How far below `USER_STACK_TOP` the stack is allowed to grow.
pub const STACK_GROWTH_LIMIT: u64 = 1024 * 1024;

/// Kernel-wide scheduling/configuration knobs, parsed once at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Multi-level feedback queue policy enabled (else strict priority + donation).
    pub mlfqs_enabled: bool,
    /// Scheduler timer ticks per second; drives the MLFQ 1-second/4-tick cadence.
    pub ticks_per_second: u32,
    pub pri_min: i32,
    pub pri_max: i32,
    pub pri_default: i32,
    pub user_stack_top: u64,
    pub stack_growth_limit: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            mlfqs_enabled: false,
            ticks_per_second: 100,
            pri_min: PRI_MIN,
            pri_max: PRI_MAX,
            pri_default: PRI_DEFAULT,
            user_stack_top: USER_STACK_TOP,
            stack_growth_limit: STACK_GROWTH_LIMIT,
        }
    }
}

impl Config {
    /// Parse a kernel command line given as already-tokenized argv-style
    /// words (the bootloader's job, out of scope here, is to produce this
    /// slice from the raw command-line string).
    ///
    /// Recognizes `-o mlfqs` anywhere in the token stream; every other token
    /// is ignored by this core (it belongs to collaborators we don't model).
    pub fn from_args(args: &[&str]) -> Self {
        let mut cfg = Config::default();
        let mut i = 0;
        while i < args.len() {
            if args[i] == "-o" && args.get(i + 1).copied() == Some("mlfqs") {
                cfg.mlfqs_enabled = true;
                i += 2;
            } else {
                i += 1;
            }
        }
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_strict_priority() {
        assert!(!Config::default().mlfqs_enabled);
    }

    #[test]
    fn parses_mlfqs_token() {
        let cfg = Config::from_args(&["-q", "-o", "mlfqs", "-f"]);
        assert!(cfg.mlfqs_enabled);
    }

    #[test]
    fn ignores_unrelated_tokens() {
        let cfg = Config::from_args(&["-o", "bochs", "-o", "something"]);
        assert!(!cfg.mlfqs_enabled);
    }
}
