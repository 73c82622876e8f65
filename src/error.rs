use chrono::{DateTime, Local, NaiveDate};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Timestamp attribute checked by the age rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeAttr {
    Atime,
    Ctime,
    Mtime,
}

impl fmt::Display for TimeAttr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimeAttr::Atime => "st_atime",
            TimeAttr::Ctime => "st_ctime",
            TimeAttr::Mtime => "st_mtime",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Path {} does not exist or is not a directory", .0.display())]
    PathNotFound(PathBuf),

    #[error("File {} does not exist or is not a regular file", .0.display())]
    FileNotFound(PathBuf),

    #[error("{attribute}: {timestamp} Today: {today} {} file underage", .path.display())]
    UnderAge {
        path: PathBuf,
        attribute: TimeAttr,
        timestamp: DateTime<Local>,
        today: NaiveDate,
    },

    #[error("Malformed record at {}:{line}: {content:?}", .file.display())]
    MalformedRecord {
        file: PathBuf,
        line: usize,
        content: String,
    },

    #[error("External tool failed scanning {unit} ({status}): {stderr}")]
    ExternalTool {
        unit: String,
        status: String,
        stderr: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("Glob pattern error: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Worker pool error: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    /// Missing root, exclude entry or target; recoverable per unit or per file.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::PathNotFound(_) | Error::FileNotFound(_) => true,
            Error::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    pub fn is_under_age(&self) -> bool {
        matches!(self, Error::UnderAge { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
