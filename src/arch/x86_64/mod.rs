//! x86_64 architecture glue.
//!
//! This crate's core (scheduler + VM) never touches hardware directly; the
//! only arch-specific surface it keeps is a serial console used as the
//! default production sink for the [`crate::log`] facade. Everything else
//! the teaching kernel eventually needs (GDT/IDT, APIC, paging bring-up) is
//! out of scope — the bootloader and low-level CPU bring-up, and the MMU
//! hardware interface, both live with whatever binary links this crate.

pub mod serial;
