use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};

use crate::config::ScanConfig;
use crate::error::{Error, Result};

/// Parameters shared by every unit of one scan run.
#[derive(Debug, Clone)]
pub struct ScanParams {
    pub scanident: String,
    /// Rank count handed to the launcher.
    pub np: u32,
    /// Seconds between progress lines from the tool.
    pub progress: u32,
    /// Only files not accessed for at least this many days.
    pub days: u32,
    pub dry_run: bool,
}

/// How one unit finished.
#[derive(Debug)]
pub enum UnitOutcome {
    /// Candidates found and exported to the text file.
    Candidates { text: PathBuf },
    /// The tool wrote no cache: nothing matched.
    Empty,
    /// Dry run: commands were logged only.
    Planned,
}

/// Files produced for one unit, all under the configured output directory.
#[derive(Debug, Clone)]
pub struct UnitFiles {
    pub cache: PathBuf,
    pub text: PathBuf,
    pub log: PathBuf,
}

impl UnitFiles {
    pub fn new(output_dir: &Path, scanident: &str, unit: &Path) -> Self {
        let name = unit_name(unit);
        Self {
            cache: output_dir.join(format!("{}-{}.cache", scanident, name)),
            text: output_dir.join(format!("{}-{}.txt", scanident, name)),
            log: output_dir.join(format!("{}-{}.log", scanident, name)),
        }
    }
}

/// Last path component of the unit, used to name its output files.
pub fn unit_name(unit: &Path) -> String {
    unit.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "root".to_string())
}

/// Drives the external indexing tool for single units.
pub struct ScanWorker<'a> {
    config: &'a ScanConfig,
    params: &'a ScanParams,
}

impl<'a> ScanWorker<'a> {
    pub fn new(config: &'a ScanConfig, params: &'a ScanParams) -> Self {
        Self { config, params }
    }

    /// Index `unit` into its cache file, then export sorted text if anything matched.
    pub fn scan(&self, unit: &Path) -> Result<UnitOutcome> {
        let files = UnitFiles::new(&self.config.output_dir, &self.params.scanident, unit);

        let mut walk = self.base_command();
        walk.arg("--output").arg(&files.cache).arg(unit);
        info!("Scanning {}: {:?}", unit.display(), walk);

        if self.params.dry_run {
            info!("--dryrun given not scanning {}", unit.display());
            return Ok(UnitOutcome::Planned);
        }

        let log = File::create(&files.log)?;
        debug!("Opened log file {}", files.log.display());
        run(walk, log, unit)?;

        // No cache file is the tool's signal for zero matches.
        if !files.cache.is_file() {
            info!("No purge candidates for {}", unit_name(unit));
            return Ok(UnitOutcome::Empty);
        }

        info!("Purge candidates found in {}, sorting", unit_name(unit));
        let mut export = self.base_command();
        export
            .args(["--sort", "user,name"])
            .arg("--input")
            .arg(&files.cache)
            .arg("--text-output")
            .arg(&files.text);
        debug!("Exporting {}: {:?}", unit.display(), export);

        let log = OpenOptions::new().append(true).open(&files.log)?;
        run(export, log, unit)?;

        Ok(UnitOutcome::Candidates { text: files.text })
    }

    fn base_command(&self) -> Command {
        let mut command = match &self.config.launcher {
            Some(launcher) => {
                let mut c = Command::new(launcher);
                c.args(&self.config.launcher_args);
                if let Some(romio) = &self.config.romio {
                    c.args(["--mca", "io", romio.as_str()]);
                }
                c.arg("-np").arg(self.params.np.to_string());
                c.arg(&self.config.dwalk);
                c
            }
            None => Command::new(&self.config.dwalk),
        };

        command
            .arg("--progress")
            .arg(self.params.progress.to_string())
            .args(["--type", "f"])
            .arg("--atime")
            .arg(format!("+{}", self.params.days))
            .arg("--distribution")
            .arg(&self.config.distribution);
        command
    }
}

fn run(mut command: Command, log: File, unit: &Path) -> Result<()> {
    let output = command
        .stdin(Stdio::null())
        .stdout(Stdio::from(log))
        .stderr(Stdio::piped())
        .output()?;

    if output.status.success() {
        return Ok(());
    }

    Err(Error::ExternalTool {
        unit: unit.display().to_string(),
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}
