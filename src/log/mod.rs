//! Kernel logging facade, built on the `log` crate rather than a hand-rolled
//! severity/record type. Production installs
//! `arch::x86_64::serial::SerialLogger` as the [`logger::Sink`];
//! the test build never installs one, so [`logger::take_captured`] is the
//! only thing scenario tests need to assert on emitted lines (e.g. the
//! `"<name>: exit(<status>)\n"` line emitted on thread exit).
//!
//! Call sites use the `log` crate's own `info!`/`warn!`/`error!`/`debug!`
//! macros directly; `logger::init` must run once (typically at boot, or at
//! the top of a test) before anything is recorded.

pub mod logger;

pub use logger::{init, set_sink, take_captured, Sink};
