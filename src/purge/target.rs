use chrono::{DateTime, Local, NaiveDate};
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

use super::rules::{stage_destination, PurgeAction, PurgeRules};
use crate::error::{Error, Result, TimeAttr};
use crate::users;

/// What the engine did with a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurgeOutcome {
    /// Owner is in the ignore list; nothing done.
    Exempt { user: String },
    Purged { dry_run: bool },
    Staged { destination: PathBuf, dry_run: bool },
}

/// One candidate file with the attributes read when it was opened.
#[derive(Debug, Clone)]
pub struct PurgeTarget {
    path: PathBuf,
    atime: SystemTime,
    ctime: SystemTime,
    mtime: SystemTime,
    uid: u32,
}

impl PurgeTarget {
    /// Stat `path`, which must be an existing regular file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let metadata = match fs::metadata(path) {
            Ok(m) if m.is_file() => m,
            _ => return Err(Error::FileNotFound(path.to_path_buf())),
        };

        Ok(Self {
            path: std::path::absolute(path)?,
            atime: system_time(metadata.atime(), metadata.atime_nsec()),
            ctime: system_time(metadata.ctime(), metadata.ctime_nsec()),
            mtime: system_time(metadata.mtime(), metadata.mtime_nsec()),
            uid: metadata.uid(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn uid(&self) -> u32 {
        self.uid
    }

    /// Owner name, falling back to the numeric id when there is no passwd entry.
    pub fn owner(&self) -> String {
        users::username_for_uid(self.uid).unwrap_or_else(|| self.uid.to_string())
    }

    /// Apply `rules` using today's date. Not idempotent: a second call on a
    /// staged or purged path fails when the file is gone.
    pub fn apply(&self, rules: &PurgeRules, dry_run: bool) -> Result<PurgeOutcome> {
        if let Some(ignore) = rules.users_ignore() {
            let user = self.owner();
            debug!("{} owned by {}", self.path.display(), user);
            if ignore.contains(&user) {
                info!(
                    "Skipping {} owned by {} in ignore list",
                    self.path.display(),
                    user
                );
                return Ok(PurgeOutcome::Exempt { user });
            }
        }

        self.check_age(rules, Local::now().date_naive())?;

        match rules.action() {
            PurgeAction::Purge => self.purge(dry_run),
            PurgeAction::Stage(root) => self.stage(root, dry_run),
        }
    }

    /// Fail with `UnderAge` if any checked timestamp is after the cutoff.
    pub fn check_age(&self, rules: &PurgeRules, today: NaiveDate) -> Result<()> {
        let cutoff = rules.cutoff(today);
        debug!("Today: {} Cutoff: {}", today, cutoff);
        let cutoff = SystemTime::from(cutoff);

        let mut checks = vec![(TimeAttr::Atime, self.atime)];
        if rules.check_ctime() {
            checks.push((TimeAttr::Ctime, self.ctime));
        }
        checks.push((TimeAttr::Mtime, self.mtime));

        for (attribute, timestamp) in checks {
            if timestamp > cutoff {
                debug!(
                    "File underage: {} {}: {:?}",
                    self.path.display(),
                    attribute,
                    timestamp
                );
                return Err(Error::UnderAge {
                    path: self.path.clone(),
                    attribute,
                    timestamp: DateTime::<Local>::from(timestamp),
                    today,
                });
            }
        }
        Ok(())
    }

    fn purge(&self, dry_run: bool) -> Result<PurgeOutcome> {
        info!("Deleting {}", self.path.display());
        if dry_run {
            info!("Dryrun requested skipping purge {}", self.path.display());
        } else {
            fs::remove_file(&self.path).map_err(|e| self.not_found_or(e))?;
        }
        Ok(PurgeOutcome::Purged { dry_run })
    }

    fn stage(&self, stage_root: &Path, dry_run: bool) -> Result<PurgeOutcome> {
        let destination = stage_destination(stage_root, &self.path);
        info!(
            "Staging {} to {}",
            self.path.display(),
            destination.display()
        );

        if dry_run {
            info!("Dryrun requested skipping stage/rename");
        } else {
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::rename(&self.path, &destination).map_err(|e| self.not_found_or(e))?;
        }
        Ok(PurgeOutcome::Staged {
            destination,
            dry_run,
        })
    }

    // Source vanished between open and action: someone else handled it.
    fn not_found_or(&self, e: std::io::Error) -> Error {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound(self.path.clone())
        } else {
            Error::Io(e)
        }
    }
}

fn system_time(secs: i64, nsec: i64) -> SystemTime {
    let nsec = nsec.clamp(0, 999_999_999) as u32;
    if secs >= 0 {
        UNIX_EPOCH + Duration::new(secs as u64, nsec)
    } else {
        UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs()) + Duration::new(0, nsec)
    }
}
