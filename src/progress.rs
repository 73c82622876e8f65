use std::path::Path;

/// Trait for reporting scan progress.
///
/// The CLI implements it with an indicatif bar. Called from pool worker threads,
/// so implementations must be `Send + Sync`. All methods default to no-ops.
pub trait ScanReporter: Send + Sync {
    fn on_scan_start(&self, _units: usize) {}
    fn on_unit_start(&self, _unit: &Path) {}
    fn on_unit_complete(&self, _unit: &Path, _ok: bool) {}
    fn on_scan_complete(&self, _failed: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ScanReporter for SilentReporter {}
