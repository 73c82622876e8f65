use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{error, info};

use super::worker::{ScanParams, ScanWorker, UnitOutcome};
use crate::config::ScanConfig;
use crate::error::{Error, Result};
use crate::progress::ScanReporter;

/// Result of one unit, keyed by its directory.
#[derive(Debug)]
pub struct UnitReport {
    pub unit: PathBuf,
    pub outcome: Result<UnitOutcome>,
}

#[derive(Debug)]
pub struct ScanReport {
    pub units: Vec<UnitReport>,
    pub duration: Duration,
}

impl ScanReport {
    pub fn failures(&self) -> impl Iterator<Item = (&PathBuf, &Error)> {
        self.units.iter().filter_map(|r| match &r.outcome {
            Err(e) => Some((&r.unit, e)),
            Ok(_) => None,
        })
    }

    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }

    /// Text exports written by this run, sorted by path.
    pub fn candidate_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self
            .units
            .iter()
            .filter_map(|r| match &r.outcome {
                Ok(UnitOutcome::Candidates { text }) => Some(text.clone()),
                _ => None,
            })
            .collect();
        files.sort();
        files
    }
}

/// Runs one scan worker per unit on a fixed-size pool.
pub struct ScanOrchestrator<'a> {
    config: &'a ScanConfig,
    params: ScanParams,
    threads: usize,
}

impl<'a> ScanOrchestrator<'a> {
    pub fn new(config: &'a ScanConfig, params: ScanParams, threads: usize) -> Self {
        Self {
            config,
            params,
            threads: threads.max(1),
        }
    }

    /// Scan every unit. A failing unit never cancels its siblings; failures are
    /// collected in the report once the pool has drained. A dry run leaves the
    /// output directory untouched.
    pub fn run(&self, units: &HashSet<PathBuf>, reporter: &dyn ScanReporter) -> Result<ScanReport> {
        if !self.params.dry_run {
            fs::create_dir_all(&self.config.output_dir)?;
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .thread_name(|i| format!("scan-worker-{}", i))
            .build()?;

        let units: Vec<&PathBuf> = units.iter().collect();
        info!(
            "Scanning {} directories with {} workers",
            units.len(),
            self.threads
        );
        reporter.on_scan_start(units.len());
        let start = Instant::now();

        let worker = ScanWorker::new(self.config, &self.params);
        let reports: Vec<UnitReport> = pool.install(|| {
            units
                .par_iter()
                .with_max_len(1)
                .map(|unit| {
                    reporter.on_unit_start(unit);
                    let outcome = worker.scan(unit);
                    if let Err(e) = &outcome {
                        error!("Scan of {} failed: {}", unit.display(), e);
                    }
                    reporter.on_unit_complete(unit, outcome.is_ok());
                    UnitReport {
                        unit: (*unit).clone(),
                        outcome,
                    }
                })
                .collect()
        });

        let report = ScanReport {
            units: reports,
            duration: start.elapsed(),
        };
        reporter.on_scan_complete(report.failed_count(), report.duration.as_secs_f64());
        Ok(report)
    }
}
