use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "purgetools")]
#[command(about = "Find, collect and stage stale files on shared filesystems", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub verbosity: Verbosity,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Args)]
pub struct Verbosity {
    /// Increase messages, including files as added
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,
    /// Decrease messages
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build candidate lists for each directory under PATH
    Scan(ScanArgs),
    /// Collect each user's purge candidates into a single list
    Merge(MergeArgs),
    /// Final check and action on a single file
    Purge(PurgeArgs),
    /// Run the final check over every file in a purge list
    PurgeList(PurgeListArgs),
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Path to scan
    pub path: PathBuf,
    /// Number of days
    #[arg(long, default_value_t = 60)]
    pub days: u32,
    /// Number of ranks for the indexing tool
    #[arg(long, value_name = "N", default_value_t = 4)]
    pub np: u32,
    /// Number of scans at a time (total np * threads)
    #[arg(long, value_name = "N", default_value_t = 4)]
    pub threads: usize,
    /// How often to print scan progress
    #[arg(long, value_name = "S", default_value_t = 60)]
    pub progress: u32,
    /// Print list to scan and quit
    #[arg(long)]
    pub dryrun: bool,
    /// Don't split PATH into each directory
    #[arg(long)]
    pub dontwalk: bool,
    /// Unique identifier for scan to append to logs/files (default dd-mm-yyyy)
    #[arg(long)]
    pub scanident: Option<String>,
}

#[derive(Debug, Args)]
pub struct MergeArgs {
    /// Unique identifier of the scan to merge
    #[arg(long)]
    pub scanident: String,
    /// Number of file handles to hold open
    #[arg(long)]
    pub cachelimit: Option<usize>,
    /// Print list to merge and quit
    #[arg(long)]
    pub dryrun: bool,
    /// Publish purge lists and write the notice list for mailing
    #[arg(long)]
    pub email: bool,
}

#[derive(Debug, Args)]
pub struct RuleArgs {
    /// Number of days to check timestamps against
    #[arg(long)]
    pub days: u32,
    /// Don't stage, delete in place
    #[arg(long)]
    pub purge: bool,
    /// Stage root, overrides the configured one
    #[arg(long, value_name = "PATH")]
    pub stage: Option<PathBuf>,
    /// Comma list of usernames whose files are skipped
    #[arg(long)]
    pub users_ignore: Option<String>,
    /// Don't check st_ctime
    #[arg(long)]
    pub ignore_ctime: bool,
    /// Print what would be done but don't do it
    #[arg(long)]
    pub dryrun: bool,
}

#[derive(Debug, Args)]
pub struct PurgeArgs {
    /// File to check and take action on
    #[arg(long)]
    pub file: PathBuf,
    #[command(flatten)]
    pub rules: RuleArgs,
}

#[derive(Debug, Args)]
pub struct PurgeListArgs {
    /// Purge list produced by merge
    #[arg(long)]
    pub list: PathBuf,
    #[command(flatten)]
    pub rules: RuleArgs,
}
