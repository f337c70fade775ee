//! `scaffolder` command line.
//!
//! `new` runs the built-in starter pipeline; `config init` writes a default
//! `scaffolder.toml`. Options come from the config file first, then flags.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, bail};
use clap::{Args, Parser, Subcommand};
use scaffolder::exit_codes;
use scaffolder::io::config::{CONFIG_FILE_NAME, load_config, write_config};
use scaffolder::starter::{StarterOptions, starter_actions};
use scaffolder::{RunOptions, WriteFailed, logging};

#[derive(Parser)]
#[command(name = "scaffolder", version, about = "Phased project scaffolding")]
struct Cli {
    /// Config file (defaults to `scaffolder.toml` in the working directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a new Rust library skeleton.
    New(NewArgs),
    /// Manage the config file.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Write a config file with default values.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
struct NewArgs {
    /// Project (and crate) name.
    name: String,

    /// Directory the project files are written into.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Report what would be written without touching the disk.
    #[arg(long, overrides_with = "no_dry_run")]
    dry_run: bool,

    /// Write files even if the config file enables `dry_run`.
    #[arg(long, overrides_with = "dry_run")]
    no_dry_run: bool,

    /// Suppress all output.
    #[arg(long, overrides_with = "no_silent")]
    silent: bool,

    #[arg(long, overrides_with = "silent", hide = true)]
    no_silent: bool,

    /// Verbosity from 0 (errors) to 5 (trace).
    #[arg(long)]
    log_level: Option<u8>,

    /// Track every staged write and log rewrite diffs.
    #[arg(long, overrides_with = "no_log_changes")]
    log_changes: bool,

    #[arg(long, overrides_with = "log_changes", hide = true)]
    no_log_changes: bool,

    /// Trace logging plus change tracking.
    #[arg(long, overrides_with = "no_debug")]
    debug: bool,

    #[arg(long, overrides_with = "debug", hide = true)]
    no_debug: bool,

    /// Skip `.gitignore`.
    #[arg(long)]
    no_git: bool,

    /// SPDX identifier of a license to add.
    #[arg(long)]
    license: Option<String>,
}

impl NewArgs {
    /// Layer flags over file options. A `--no-*` flag switches a file option off.
    fn apply(&self, mut options: RunOptions) -> Result<RunOptions> {
        if let Some(out_dir) = &self.out_dir {
            options.out_dir = out_dir.clone();
        }
        if let Some(level) = self.log_level {
            options.log_level = level;
        }
        toggle(&mut options.dry_run, self.dry_run, self.no_dry_run);
        toggle(&mut options.silent, self.silent, self.no_silent);
        toggle(&mut options.log_changes, self.log_changes, self.no_log_changes);
        toggle(&mut options.debug, self.debug, self.no_debug);
        options.validate()?;
        Ok(options)
    }

    fn starter(&self) -> StarterOptions {
        StarterOptions {
            name: self.name.clone(),
            git: !self.no_git,
            license: self.license.clone(),
        }
    }
}

fn toggle(option: &mut bool, on: bool, off: bool) {
    if on {
        *option = true;
    } else if off {
        *option = false;
    }
}

fn main() {
    let code = match run() {
        Ok(()) => exit_codes::OK,
        Err(err) => {
            eprintln!("{err:#}");
            exit_code_for(&err)
        }
    };
    std::process::exit(code);
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<WriteFailed>().is_some() {
        exit_codes::WRITE_FAILED
    } else {
        exit_codes::FAILED
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
    match cli.command {
        Command::New(args) => cmd_new(&config_path, &args),
        Command::Config {
            command: ConfigCommand::Init { force },
        } => cmd_config_init(&config_path, force),
    }
}

fn cmd_new(config_path: &Path, args: &NewArgs) -> Result<()> {
    let options = args.apply(load_config(config_path)?)?;
    logging::init(&options);

    let runtime = tokio::runtime::Runtime::new().context("start async runtime")?;
    runtime.block_on(scaffolder::run(starter_actions(args.starter()), options))?;
    Ok(())
}

fn cmd_config_init(path: &Path, force: bool) -> Result<()> {
    if !force && path.exists() {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    write_config(path, &RunOptions::default())?;
    println!("{}", path.display());
    Ok(())
}
