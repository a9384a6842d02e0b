//! Small index/handle newtypes shared across the scheduler and VM modules.
//!
//! Kept in one place (rather than defined next to the arena each indexes)
//! so `thread` and `sync` — which reference each other's identifiers but
//! must not depend on each other's full module — can both depend on this
//! leaf module instead.

/// Thread identifier. `-1` (see [`TID_ERROR`]) is reserved for "no such
/// thread" at the public API boundary; internally a valid `Tid` is always
/// backed by an arena slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tid(pub u32);

/// Sentinel returned by fallible creation APIs.
pub const TID_ERROR: i32 = -1;

/// Index into a [`crate::sched::Scheduler`]'s lock arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LockId(pub u32);

/// Index into a [`crate::vm::frame::FrameTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameId(pub u32);

/// Index into a [`crate::vm::swap::SwapBackend`]'s slot space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId(pub u32);

/// Index into a [`crate::sched::Scheduler`]'s condvar arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CondvarId(pub u32);
