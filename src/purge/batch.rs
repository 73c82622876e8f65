use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{error, info, warn};

use super::rules::PurgeRules;
use super::target::{PurgeOutcome, PurgeTarget};
use crate::error::Result;
use crate::record;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PurgeTally {
    pub purged: usize,
    pub staged: usize,
    pub exempt: usize,
    pub under_age: usize,
    /// Target already gone: staged, purged or removed by its owner.
    pub missing: usize,
    pub failed: usize,
}

impl PurgeTally {
    pub fn total(&self) -> usize {
        self.purged + self.staged + self.exempt + self.under_age + self.missing + self.failed
    }

    fn record(&mut self, result: Result<PurgeOutcome>, path: &Path) {
        match result {
            Ok(PurgeOutcome::Purged { .. }) => self.purged += 1,
            Ok(PurgeOutcome::Staged { .. }) => self.staged += 1,
            Ok(PurgeOutcome::Exempt { .. }) => self.exempt += 1,
            Err(e) if e.is_under_age() => {
                info!("{}", e);
                self.under_age += 1;
            }
            Err(e) if e.is_not_found() => {
                info!("{}", e);
                self.missing += 1;
            }
            Err(e) => {
                error!("Failed to handle {}: {}", path.display(), e);
                self.failed += 1;
            }
        }
    }
}

/// Run the decision engine over every record of a ledger, one file at a time.
pub fn purge_list(list: &Path, rules: &PurgeRules, dry_run: bool) -> Result<PurgeTally> {
    let mut reader = BufReader::new(File::open(list)?);
    let mut tally = PurgeTally::default();
    let mut line = Vec::new();
    let mut line_no = 0;

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        line_no += 1;
        if record::is_blank(&line) {
            continue;
        }
        let Some(path) = record::file_path(&line) else {
            warn!(
                "No path in {}:{}: {:?}",
                list.display(),
                line_no,
                String::from_utf8_lossy(&line).trim_end()
            );
            tally.failed += 1;
            continue;
        };

        let result = PurgeTarget::open(path).and_then(|t| t.apply(rules, dry_run));
        tally.record(result, path);
    }

    info!(
        "{}: {} purged, {} staged, {} exempt, {} under age, {} already handled, {} failed",
        list.display(),
        tally.purged,
        tally.staged,
        tally.exempt,
        tally.under_age,
        tally.missing,
        tally.failed
    );
    Ok(tally)
}
