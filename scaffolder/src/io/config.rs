//! Run options, optionally stored in a `scaffolder.toml` file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Default file name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "scaffolder.toml";

/// Highest accepted `log_level` (trace).
pub const MAX_LOG_LEVEL: u8 = 5;

/// Run-wide options shared by every context of a run (TOML).
///
/// Missing fields fall back to [`RunOptions::default`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunOptions {
    /// Stage and report every file, but never touch the disk.
    pub dry_run: bool,

    /// Suppress all log output. Equivalent to `log_level = 0` with errors muted too.
    pub silent: bool,

    /// Directory staged paths are resolved against. Relative values are
    /// resolved against the context working directory.
    pub out_dir: PathBuf,

    /// Verbosity: 0 error, 1 warn, 2 and 3 info, 4 debug, 5 trace.
    pub log_level: u8,

    /// Keep a per-path history of every staged write.
    pub log_changes: bool,

    /// Forces `log_level = 5` and `log_changes = true`.
    pub debug: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            silent: false,
            out_dir: PathBuf::from("./"),
            log_level: 3,
            log_changes: false,
            debug: false,
        }
    }
}

impl RunOptions {
    pub fn validate(&self) -> Result<()> {
        if self.log_level > MAX_LOG_LEVEL {
            return Err(anyhow!(
                "log_level must be between 0 and {MAX_LOG_LEVEL} (got {})",
                self.log_level
            ));
        }
        if self.out_dir.as_os_str().is_empty() {
            return Err(anyhow!("out_dir must not be empty"));
        }
        Ok(())
    }

    /// Whether staged writes are recorded in the change log.
    pub fn tracks_changes(&self) -> bool {
        self.debug || self.log_changes
    }

    /// Log level after applying `debug`.
    pub fn effective_log_level(&self) -> u8 {
        if self.debug {
            MAX_LOG_LEVEL
        } else {
            self.log_level
        }
    }
}

/// Load options from a TOML file.
///
/// If the file is missing, returns `RunOptions::default()`.
pub fn load_config(path: &Path) -> Result<RunOptions> {
    if !path.exists() {
        let cfg = RunOptions::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: RunOptions =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write options to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &RunOptions) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
