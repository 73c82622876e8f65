use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use purgetools::ScanReporter;
use std::path::Path;
use std::sync::Mutex;

/// Scan progress bar: one tick per finished unit.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                f(pb);
            }
        }
    }
}

impl ScanReporter for CliReporter {
    fn on_scan_start(&self, units: usize) {
        let pb = ProgressBar::new(units as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "  {spinner:.cyan} Scanning [{bar:30.cyan/dim}] {pos}/{len} directories {msg}",
        ) {
            pb.set_style(
                style
                    .progress_chars("━╸─")
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
            );
        }
        pb.enable_steady_tick(std::time::Duration::from_millis(80));
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.replace(pb) {
                old.finish_and_clear();
            }
        }
    }

    fn on_unit_start(&self, unit: &Path) {
        self.with_bar(|pb| pb.set_message(purgetools::scanner::unit_name(unit)));
    }

    fn on_unit_complete(&self, unit: &Path, ok: bool) {
        self.with_bar(|pb| {
            if !ok {
                pb.println(format!("  {} {}", "✗".red(), unit.display()));
            }
            pb.inc(1);
        });
    }

    fn on_scan_complete(&self, failed: usize, duration_secs: f64) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
        eprintln!(
            "  {} Scan complete: {} failed in {:.2}s",
            "✓".green(),
            failed,
            duration_secs
        );
    }
}
