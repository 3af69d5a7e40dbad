//! Logging abstraction.
//!
//! The geometry core never calls `tracing`'s macros (or anything else)
//! directly; every log-shaped call site takes a `&dyn Diagnostics` so a
//! test can swap in [`RecordingDiagnostics`] and assert on exactly what
//! was emitted, the way the original's `SG_LOG` call sites could not be
//! intercepted at all.

use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Alert,
}

pub trait Diagnostics: Send + Sync {
    fn log(&self, level: Level, message: &str);

    fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }
    fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }
    fn warn(&self, message: &str) {
        self.log(Level::Warn, message);
    }
    fn alert(&self, message: &str) {
        self.log(Level::Alert, message);
    }
}

/// Default production implementation: forwards to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::Debug => tracing::debug!("{}", message),
            Level::Info => tracing::info!("{}", message),
            Level::Warn => tracing::warn!("{}", message),
            Level::Alert => tracing::error!("{}", message),
        }
    }
}

/// Discards everything. Useful when a caller has no logging infrastructure
/// wired up yet and doesn't want to pay for `tracing`'s dispatch.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDiagnostics;

impl Diagnostics for NullDiagnostics {
    fn log(&self, _level: Level, _message: &str) {}
}

/// Captures every emitted record in order. Not `#[cfg(test)]`-gated since
/// downstream crates embedding this one may want the same assertion
/// ability in their own test suites.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    records: Mutex<Vec<(Level, String)>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<(Level, String)> {
        self.records.lock().expect("diagnostics mutex poisoned").clone()
    }

    pub fn contains(&self, level: Level, substring: &str) -> bool {
        self.records()
            .iter()
            .any(|(l, m)| *l == level && m.contains(substring))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_diagnostics_captures_messages() {
        let diag = RecordingDiagnostics::new();
        diag.warn("corner has zero constraints");
        diag.info("tile ok");
        assert!(diag.contains(Level::Warn, "zero constraints"));
        assert!(!diag.contains(Level::Warn, "tile ok"));
    }

    #[test]
    fn test_null_diagnostics_is_silent() {
        let diag = NullDiagnostics;
        diag.alert("should not panic");
    }
}
