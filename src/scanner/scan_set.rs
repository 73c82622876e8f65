use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Resolve exclude names to directories directly under `root`.
///
/// A name that is not an existing directory is a configuration error unless
/// `ignore_missing` is set, in which case it is dropped.
pub fn resolve_excludes(
    root: &Path,
    names: &[String],
    ignore_missing: bool,
) -> Result<HashSet<PathBuf>> {
    let mut resolved = HashSet::new();

    for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        let candidate = root.join(name);
        if candidate.is_dir() {
            resolved.insert(candidate);
        } else if ignore_missing {
            debug!("Ignoring missing exclude {}", candidate.display());
        } else {
            return Err(Error::Config(format!(
                "{} doesn't exist in {}",
                candidate.display(),
                root.display()
            )));
        }
    }

    Ok(resolved)
}

/// Build the set of directories to scan.
///
/// With `dont_walk` the result is just `root`; otherwise every immediate
/// subdirectory of `root` that is not excluded.
pub fn build_scan_set(
    root: &Path,
    excludes: &[String],
    dont_walk: bool,
    ignore_missing: bool,
) -> Result<HashSet<PathBuf>> {
    if !root.is_dir() {
        return Err(Error::PathNotFound(root.to_path_buf()));
    }
    info!("Path {} exists", root.display());

    let excluded = resolve_excludes(root, excludes, ignore_missing)?;

    let mut scan_set = HashSet::new();
    if dont_walk {
        scan_set.insert(root.to_path_buf());
        return Ok(scan_set);
    }

    for entry in fs::read_dir(root)? {
        let path = entry?.path();
        if path.is_dir() && !excluded.contains(&path) {
            scan_set.insert(path);
        }
    }

    Ok(scan_set)
}
