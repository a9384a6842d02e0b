//! The `log` facade's global dispatcher: every record is always captured
//! into an in-memory ring (so scenario tests can assert on emitted lines,
//! e.g. the `"<name>: exit(<status>)\n"` line) and, if a production
//! [`Sink`] has been installed, also forwarded there.

use alloc::collections::VecDeque;
use alloc::string::String;
use log::{Log, Metadata, Record};
use spin::Mutex;

/// How many rendered lines the in-memory capture ring keeps. Bounded so a
/// runaway logging loop can't exhaust kernel heap.
const CAPTURE_CAPACITY: usize = 512;

/// A production log destination. Production wires this to the serial port
/// (`arch::x86_64::serial::SerialLogger`); hosted tests never install one,
/// since `take_captured` already gives them everything emitted.
pub trait Sink: Sync {
    fn write_line(&self, line: &str);
}

static SINK: Mutex<Option<&'static dyn Sink>> = Mutex::new(None);
static CAPTURE: Mutex<VecDeque<String>> = Mutex::new(VecDeque::new());

struct Dispatcher;

impl Log for Dispatcher {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = alloc::format!("[{}] {}", record.level(), record.args());

        {
            let mut cap = CAPTURE.lock();
            if cap.len() >= CAPTURE_CAPACITY {
                cap.pop_front();
            }
            cap.push_back(line.clone());
        }

        if let Some(sink) = *SINK.lock() {
            sink.write_line(&line);
        }
    }

    fn flush(&self) {}
}

static DISPATCHER: Dispatcher = Dispatcher;

/// Install the global `log` backend at `Trace` level. Idempotent — a second
/// call is a harmless no-op per `log::set_logger`'s own contract.
pub fn init() {
    let _ = log::set_logger(&DISPATCHER);
    log::set_max_level(log::LevelFilter::Trace);
}

/// Install the production sink (e.g. a serial-port writer). Call after
/// [`init`]. Never called by the test build.
pub fn set_sink(sink: &'static dyn Sink) {
    *SINK.lock() = Some(sink);
}

/// Snapshot and clear the capture ring. Used by tests to assert on the
/// sequence of lines emitted during a scenario.
pub fn take_captured() -> alloc::vec::Vec<String> {
    let mut cap = CAPTURE.lock();
    cap.drain(..).collect()
}
