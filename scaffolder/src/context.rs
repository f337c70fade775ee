//! Execution context: one node of a run's provenance tree.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::io::config::RunOptions;
use crate::output::{OutputCollection, OutputSettings};

/// Name of the context a run starts from.
pub const ROOT_CONTEXT: &str = "root";

/// Immutable bag handed to every hook.
///
/// Children are derived with [`Context::derive_child`]; they share the run's
/// options and output collection and differ only in naming and origin.
#[derive(Debug, Clone)]
pub struct Context {
    cwd: PathBuf,
    name: String,
    lineage: Vec<String>,
    options: Arc<RunOptions>,
    files: OutputCollection,
}

impl Context {
    /// Root context for a run in the process working directory.
    pub fn root(options: RunOptions) -> Result<Self> {
        let cwd = env::current_dir().context("resolve current directory")?;
        Self::root_in(cwd, options)
    }

    /// Root context for a run in `cwd`.
    pub fn root_in(cwd: impl Into<PathBuf>, options: RunOptions) -> Result<Self> {
        options.validate()?;
        let cwd = cwd.into();
        let files = OutputCollection::new(OutputSettings::from_options(&cwd, &options));
        Ok(Self {
            cwd,
            name: ROOT_CONTEXT.to_string(),
            lineage: vec![ROOT_CONTEXT.to_string()],
            options: Arc::new(options),
            files,
        })
    }

    /// A child context named `name` whose writes are attributed to `name`.
    pub fn derive_child(&self, name: impl Into<String>) -> Self {
        let name = name.into();
        let mut lineage = self.lineage.clone();
        lineage.push(name.clone());
        Self {
            cwd: self.cwd.clone(),
            files: self.files.with_origin(name.clone()),
            name,
            lineage,
            options: Arc::clone(&self.options),
        }
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_root(&self) -> bool {
        self.lineage.len() == 1
    }

    /// Names from the root down to this context.
    pub fn lineage(&self) -> &[String] {
        &self.lineage
    }

    /// Lineage joined with `/`, e.g. `root/init`.
    pub fn path(&self) -> String {
        self.lineage.join("/")
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    pub fn files(&self) -> &OutputCollection {
        &self.files
    }
}
