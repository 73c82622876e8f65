pub mod config;
pub mod error;
pub mod merge;
pub mod notify;
pub mod progress;
pub mod purge;
pub mod record;
pub mod scanner;
pub mod users;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use progress::{ScanReporter, SilentReporter};

/// Default scan identifier: today's date as `dd-mm-yyyy`, taken at call time.
pub fn default_scanident() -> String {
    chrono::Local::now().format("%d-%m-%Y").to_string()
}
