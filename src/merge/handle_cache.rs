use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

use crate::error::Result;

/// Picks which open ledger to close when the cache is full.
pub trait EvictionPolicy {
    /// A handle for `user` was opened.
    fn on_insert(&mut self, user: &str);
    /// An already open handle for `user` was written to.
    fn on_access(&mut self, _user: &str) {}
    /// Remove and return the next user to evict.
    fn victim(&mut self) -> Option<String>;
}

/// Evicts the handle opened earliest, ignoring how recently it was written.
#[derive(Debug, Default)]
pub struct InsertionOrder {
    order: VecDeque<String>,
}

impl EvictionPolicy for InsertionOrder {
    fn on_insert(&mut self, user: &str) {
        self.order.push_back(user.to_string());
    }

    fn victim(&mut self) -> Option<String> {
        self.order.pop_front()
    }
}

/// Evicts the handle written least recently.
#[derive(Debug, Default)]
pub struct LeastRecentlyUsed {
    order: VecDeque<String>,
}

impl EvictionPolicy for LeastRecentlyUsed {
    fn on_insert(&mut self, user: &str) {
        self.order.push_back(user.to_string());
    }

    fn on_access(&mut self, user: &str) {
        // Sorted input means the hot user is almost always at the back.
        if self.order.back().map(String::as_str) == Some(user) {
            return;
        }
        if let Some(pos) = self.order.iter().position(|u| u == user) {
            if let Some(u) = self.order.remove(pos) {
                self.order.push_back(u);
            }
        }
    }

    fn victim(&mut self) -> Option<String> {
        self.order.pop_front()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionKind {
    Insertion,
    Lru,
}

impl EvictionKind {
    pub fn policy(self) -> Box<dyn EvictionPolicy> {
        match self {
            EvictionKind::Insertion => Box::<InsertionOrder>::default(),
            EvictionKind::Lru => Box::<LeastRecentlyUsed>::default(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub opens: usize,
    pub evictions: usize,
}

/// Bounded set of open per-user ledger files.
///
/// Not thread safe. At most `capacity` ledgers are open at once; an evicted
/// ledger is flushed and closed, and reopened in append mode on the next write.
/// The first open of a ledger in the cache's lifetime truncates it, so a rerun
/// replaces the ledgers of an earlier merge instead of extending them.
pub struct LedgerCache {
    dir: PathBuf,
    scanident: String,
    capacity: usize,
    handles: HashMap<String, BufWriter<File>>,
    created: HashSet<String>,
    policy: Box<dyn EvictionPolicy>,
    stats: CacheStats,
}

impl LedgerCache {
    pub fn new(
        dir: &Path,
        scanident: &str,
        capacity: usize,
        policy: Box<dyn EvictionPolicy>,
    ) -> Self {
        Self {
            dir: dir.to_path_buf(),
            scanident: scanident.to_string(),
            capacity: capacity.max(1),
            handles: HashMap::new(),
            created: HashSet::new(),
            policy,
            stats: CacheStats::default(),
        }
    }

    pub fn ledger_path(&self, user: &str) -> PathBuf {
        ledger_path(&self.dir, &self.scanident, user)
    }

    /// Append `line` verbatim to `user`'s ledger.
    pub fn write_line(&mut self, user: &str, line: &[u8]) -> Result<()> {
        if let Some(handle) = self.handles.get_mut(user) {
            handle.write_all(line)?;
            self.policy.on_access(user);
            return Ok(());
        }

        if self.handles.len() >= self.capacity {
            self.evict()?;
        }

        let path = self.ledger_path(user);
        let mut options = OpenOptions::new();
        if self.created.insert(user.to_string()) {
            trace!("Creating ledger {}", path.display());
            options.write(true).create(true).truncate(true);
        } else {
            trace!("Reopening ledger {}", path.display());
            options.append(true);
        }
        let mut handle = BufWriter::new(options.open(&path)?);
        handle.write_all(line)?;
        self.handles.insert(user.to_string(), handle);
        self.policy.on_insert(user);
        self.stats.opens += 1;
        Ok(())
    }

    fn evict(&mut self) -> Result<()> {
        while let Some(user) = self.policy.victim() {
            if let Some(mut handle) = self.handles.remove(&user) {
                debug!("Evicting ledger handle for {}", user);
                handle.flush()?;
                self.stats.evictions += 1;
                return Ok(());
            }
        }
        Ok(())
    }

    pub fn open_handles(&self) -> usize {
        self.handles.len()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Flush and close every open ledger.
    pub fn close_all(&mut self) -> Result<()> {
        for (user, mut handle) in self.handles.drain() {
            trace!("Closing ledger handle for {}", user);
            handle.flush()?;
        }
        while self.policy.victim().is_some() {}
        Ok(())
    }
}

impl Drop for LedgerCache {
    fn drop(&mut self) {
        if let Err(e) = self.close_all() {
            warn!("Error flushing ledgers: {}", e);
        }
    }
}

/// `{dir}/{scanident}-{user}.purge.txt`
pub fn ledger_path(dir: &Path, scanident: &str, user: &str) -> PathBuf {
    dir.join(format!("{}-{}.purge.txt", scanident, user))
}
