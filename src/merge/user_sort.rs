use glob::glob;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::handle_cache::{CacheStats, EvictionPolicy, LedgerCache};
use crate::error::{Error, Result};
use crate::record;

/// Per-unit text exports for `scanident` in `dir`, in a fixed (sorted) order.
/// Ledgers from an earlier merge of the same scan are skipped.
pub fn find_scan_results(dir: &Path, scanident: &str) -> Result<Vec<PathBuf>> {
    let pattern = format!(
        "{}/{}*.txt",
        glob::Pattern::escape(&dir.to_string_lossy()),
        glob::Pattern::escape(scanident)
    );

    let mut paths = Vec::new();
    for entry in glob(&pattern)? {
        let path = entry.map_err(|e| Error::Io(e.into_error()))?;
        let is_ledger = path
            .file_name()
            .map(|n| n.to_string_lossy().ends_with(".purge.txt"))
            .unwrap_or(false);
        if path.is_file() && !is_ledger {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

#[derive(Debug)]
pub struct MergeSummary {
    pub files: usize,
    pub records: usize,
    pub users: usize,
    pub cache: CacheStats,
    pub duration: Duration,
}

/// Shards candidate records into one ledger per owning user.
pub struct UserSort {
    cache: LedgerCache,
    users: std::collections::HashSet<String>,
}

impl UserSort {
    pub fn new(
        output_dir: &Path,
        scanident: &str,
        cache_limit: usize,
        policy: Box<dyn EvictionPolicy>,
    ) -> Self {
        Self {
            cache: LedgerCache::new(output_dir, scanident, cache_limit, policy),
            users: Default::default(),
        }
    }

    /// Append every record of every input to its owner's ledger.
    ///
    /// Stops at the first malformed record. Ledgers are flushed and closed
    /// before returning, on success or failure.
    pub fn sort(mut self, paths: &[PathBuf]) -> Result<MergeSummary> {
        let start = Instant::now();
        let sorted = self.sort_inner(paths);
        let closed = self.cache.close_all();
        let records = sorted?;
        closed?;

        let summary = MergeSummary {
            files: paths.len(),
            records,
            users: self.users.len(),
            cache: self.cache.stats(),
            duration: start.elapsed(),
        };
        info!(
            "Merged {} records from {} files into {} ledgers ({} opens, {} evictions)",
            summary.records,
            summary.files,
            summary.users,
            summary.cache.opens,
            summary.cache.evictions
        );
        Ok(summary)
    }

    fn sort_inner(&mut self, paths: &[PathBuf]) -> Result<usize> {
        let mut records = 0;
        let mut line = Vec::new();

        for path in paths {
            debug!("Merging {}", path.display());
            let mut reader = BufReader::new(File::open(path)?);
            let mut line_no = 0;

            loop {
                line.clear();
                if reader.read_until(b'\n', &mut line)? == 0 {
                    break;
                }
                line_no += 1;
                if line.last() != Some(&b'\n') {
                    line.push(b'\n');
                }

                let user = record::require_owner(&line, path, line_no)?;
                if !self.users.contains(user) {
                    self.users.insert(user.to_string());
                }
                self.cache.write_line(user, &line)?;
                records += 1;
            }
        }

        Ok(records)
    }
}
