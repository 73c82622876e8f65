//! Publishing finished ledgers to their owners.
//!
//! Each `{scanident}-{user}.purge.txt` is copied to the notify root, handed to
//! the user and locked down to the configured mode. Mail rendering and
//! delivery happen elsewhere; this module only produces the notice list.

use chrono::Local;
use serde::Serialize;
use std::fs;
use std::os::unix::fs::{chown, PermissionsExt};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::users;

/// One published ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub username: String,
    pub path: PathBuf,
    pub date: String,
}

pub struct Notifier {
    notify_path: PathBuf,
    mode: u32,
}

impl Notifier {
    pub fn new(notify_path: Option<&Path>, mode: u32) -> Result<Self> {
        let notify_path = notify_path
            .ok_or_else(|| Error::Config("no path given for notification user logs".to_string()))?;
        Ok(Self {
            notify_path: notify_path.to_path_buf(),
            mode,
        })
    }

    /// Copy every ledger of `scanident` found in `source_dir` to the notify root.
    pub fn publish(&self, source_dir: &Path, scanident: &str, dry_run: bool) -> Result<Vec<Notice>> {
        let pattern = format!(
            "{}/{}-*.purge.txt",
            glob::Pattern::escape(&source_dir.to_string_lossy()),
            glob::Pattern::escape(scanident)
        );
        let mut ledgers = Vec::new();
        for entry in glob::glob(&pattern)? {
            ledgers.push(entry.map_err(|e| Error::Io(e.into_error()))?);
        }
        ledgers.sort();

        let date = Local::now().format("%B %-d, %Y").to_string();
        let mut notices = Vec::with_capacity(ledgers.len());
        for ledger in ledgers {
            let Some(username) = ledger_user(&ledger, scanident) else {
                warn!("Problem parsing user in {}", ledger.display());
                continue;
            };
            let path = self.copy(&ledger, &username, dry_run)?;
            notices.push(Notice {
                username,
                path,
                date: date.clone(),
            });
        }

        info!("Published {} ledgers to {}", notices.len(), self.notify_path.display());
        Ok(notices)
    }

    fn copy(&self, ledger: &Path, username: &str, dry_run: bool) -> Result<PathBuf> {
        let file_name = ledger
            .file_name()
            .ok_or_else(|| Error::FileNotFound(ledger.to_path_buf()))?;
        let destination = self.notify_path.join(file_name);
        debug!("Copying {} to {}", ledger.display(), destination.display());
        if dry_run {
            return Ok(destination);
        }

        fs::copy(ledger, &destination)?;

        match users::uid_for_username(username) {
            Some(uid) => {
                debug!("Change {} owner to {}", destination.display(), username);
                chown(&destination, Some(uid), None)?;
            }
            None => warn!("User {} not found, leaving owner of {}", username, destination.display()),
        }

        debug!("Set permissions on {} to {:o}", destination.display(), self.mode);
        fs::set_permissions(&destination, fs::Permissions::from_mode(self.mode))?;
        Ok(destination)
    }
}

/// User part of `{scanident}-{user}.purge.txt`.
pub fn ledger_user(ledger: &Path, scanident: &str) -> Option<String> {
    let name = ledger.file_name()?.to_str()?;
    let user = name
        .strip_prefix(scanident)?
        .strip_prefix('-')?
        .strip_suffix(".purge.txt")?;
    if user.is_empty() {
        None
    } else {
        Some(user.to_string())
    }
}

/// Write the notice list handed to the mail system.
pub fn write_notices(path: &Path, notices: &[Notice]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for notice in notices {
        writer.serialize(notice)?;
    }
    writer.flush()?;
    Ok(())
}
