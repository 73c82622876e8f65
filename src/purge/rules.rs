use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// What happens to a file that passes the age rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurgeAction {
    /// Delete in place.
    Purge,
    /// Move under this root, mirroring the absolute path.
    Stage(PathBuf),
}

/// Validated rule set for the decision engine.
#[derive(Debug, Clone)]
pub struct PurgeRules {
    days: u32,
    action: PurgeAction,
    users_ignore: Option<HashSet<String>>,
    check_ctime: bool,
}

impl PurgeRules {
    /// Exactly one of `purge` and `stage_path` must be given, together with a
    /// non-zero age threshold. Nothing destructive is ever assumed by default.
    pub fn new(days: Option<u32>, purge: bool, stage_path: Option<PathBuf>) -> Result<Self> {
        if purge && stage_path.is_some() {
            return Err(Error::Config(
                "Cannot specify stage path and purge at same time".to_string(),
            ));
        }
        let days = match days {
            Some(d) if d > 0 => d,
            _ => return Err(Error::Config("Must specify days for purge/stage".to_string())),
        };
        let action = match (purge, stage_path) {
            (true, None) => PurgeAction::Purge,
            (false, Some(stage)) => PurgeAction::Stage(stage),
            _ => {
                return Err(Error::Config(
                    "Must provide purge or a path to stage data".to_string(),
                ))
            }
        };

        Ok(Self {
            days,
            action,
            users_ignore: None,
            check_ctime: true,
        })
    }

    /// Owners whose files are never touched. An empty list disables the lookup.
    pub fn with_users_ignore<I>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let users: HashSet<String> = users.into_iter().collect();
        self.users_ignore = if users.is_empty() { None } else { Some(users) };
        self
    }

    pub fn with_ctime_check(mut self, check_ctime: bool) -> Self {
        self.check_ctime = check_ctime;
        self
    }

    pub fn days(&self) -> u32 {
        self.days
    }

    pub fn action(&self) -> &PurgeAction {
        &self.action
    }

    pub fn users_ignore(&self) -> Option<&HashSet<String>> {
        self.users_ignore.as_ref()
    }

    pub fn check_ctime(&self) -> bool {
        self.check_ctime
    }

    /// Local midnight `days` before `today`. Timestamps after this are too recent.
    pub fn cutoff(&self, today: NaiveDate) -> DateTime<Local> {
        cutoff(today, self.days)
    }
}

pub fn cutoff(today: NaiveDate, days: u32) -> DateTime<Local> {
    let midnight = (today - Duration::days(i64::from(days))).and_time(NaiveTime::default());
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .unwrap_or_else(|| Local.from_utc_datetime(&midnight))
}

/// `stage_root` joined with `path` minus its leading root.
pub fn stage_destination(stage_root: &Path, path: &Path) -> PathBuf {
    let relative = path.strip_prefix("/").unwrap_or(path);
    stage_root.join(relative)
}
