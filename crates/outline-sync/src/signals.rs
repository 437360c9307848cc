//! Process-wide conditions under which no build may run.

use std::sync::atomic::{AtomicBool, Ordering};

/// External shutdown signals. Any raised flag makes the coordinator's
/// abandon predicate true.
#[derive(Debug, Default)]
pub struct ShutdownSignals {
    process_exiting: AtomicBool,
    headless: AtomicBool,
    collecting_garbage: AtomicBool,
}

impl ShutdownSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process is tearing down.
    pub fn set_process_exiting(&self, value: bool) {
        self.process_exiting.store(value, Ordering::SeqCst);
    }

    /// Running as a batch job without a consumer.
    pub fn set_headless(&self, value: bool) {
        self.headless.store(value, Ordering::SeqCst);
    }

    /// A collection pass may free document entities.
    pub fn set_collecting_garbage(&self, value: bool) {
        self.collecting_garbage.store(value, Ordering::SeqCst);
    }

    /// Returns true if any signal is raised.
    pub fn any_raised(&self) -> bool {
        self.process_exiting.load(Ordering::SeqCst)
            || self.headless.load(Ordering::SeqCst)
            || self.collecting_garbage.load(Ordering::SeqCst)
    }
}
