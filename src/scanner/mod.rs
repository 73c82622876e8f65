mod orchestrator;
mod scan_set;
mod worker;

pub use orchestrator::{ScanOrchestrator, ScanReport, UnitReport};
pub use scan_set::{build_scan_set, resolve_excludes};
pub use worker::{unit_name, ScanParams, ScanWorker, UnitFiles, UnitOutcome};
