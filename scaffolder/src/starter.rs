//! Built-in starter pipeline: a minimal Rust library skeleton.
//!
//! Used by `scaffolder new`. The tree also serves as a worked example of
//! gates, data threading and post-write hooks.

use anyhow::{Context as _, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::action::Action;

/// Inputs for the starter pipeline, usually taken from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StarterOptions {
    pub name: String,
    /// Stage a `.gitignore`.
    pub git: bool,
    /// SPDX identifier of the license to stage, if any.
    pub license: Option<String>,
}

/// Data collected by the `project` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectData {
    pub name: String,
    pub crate_name: String,
}

/// Data collected by the `license` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseData {
    pub spdx: String,
}

/// Build the starter action tree.
///
/// ```text
/// project
/// ├── manifest
/// ├── library
/// └── readme
///     └── license   (loaded only when a license was requested)
/// gitignore         (executed only when git is enabled)
/// ```
pub fn starter_actions(options: StarterOptions) -> Vec<Action> {
    let StarterOptions { name, git, license } = options;
    let license_for_gate = license.clone();

    let project = Action::new("project")
        .with_description("validate the project name")
        .collect_data(move |_| {
            let name = name.clone();
            async move { project_data(&name) }
        })
        .with_sub_actions([manifest(), library(), readme(license, license_for_gate)]);

    let gitignore = Action::new("gitignore")
        .with_description("ignore build output")
        .can_execute_action(move |_| async move { Ok(git) })
        .action(|params| async move {
            params.files.write(".gitignore", "/target\n");
            Ok(())
        });

    let summary = Action::new("summary")
        .with_description("report what was generated")
        .post_write(|params| async move {
            let project: ProjectData = params
                .full_data
                .get_as("project")?
                .context("project data missing")?;
            let verb = if params.context.options().dry_run {
                "would create"
            } else {
                "created"
            };
            info!("{verb} `{}` with {} file(s)", project.name, params.files.len());
            Ok(())
        });

    vec![project, gitignore, summary]
}

fn project_data(name: &str) -> Result<ProjectData> {
    let name = name.trim();
    if name.is_empty() {
        bail!("project name must not be empty");
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        bail!("project name `{name}` may only contain ASCII letters, digits, `-` and `_`");
    }
    Ok(ProjectData {
        name: name.to_string(),
        crate_name: name.replace('-', "_"),
    })
}

fn manifest() -> Action {
    Action::new("manifest")
        .with_description("stage Cargo.toml")
        .action(|params| async move {
            let project: ProjectData = params
                .full_data
                .get_as("project")?
                .context("project data missing")?;
            params.files.write(
                "Cargo.toml",
                format!(
                    "[package]\nname = \"{}\"\nversion = \"0.1.0\"\nedition = \"2024\"\n\n[dependencies]\n",
                    project.name
                ),
            );
            Ok(())
        })
}

fn library() -> Action {
    Action::new("library")
        .with_description("stage src/lib.rs")
        .action(|params| async move {
            let project: ProjectData = params
                .full_data
                .get_as("project")?
                .context("project data missing")?;
            params.files.write(
                "src/lib.rs",
                format!(
                    "//! {}\n\npub fn hello() -> &'static str {{\n    \"hello from {}\"\n}}\n",
                    project.name, project.crate_name
                ),
            );
            Ok(())
        })
}

fn readme(license: Option<String>, license_for_gate: Option<String>) -> Action {
    Action::new("readme")
        .with_description("stage README.md")
        .action(|params| async move {
            let name = params
                .full_data
                .str_field("project", "name")
                .context("project name missing")?;
            params.files.write("README.md", format!("# {name}\n"));
            Ok(())
        })
        .with_sub_action(license_action(license, license_for_gate))
}

fn license_action(license: Option<String>, license_for_gate: Option<String>) -> Action {
    Action::new("license")
        .with_description("stage LICENSE and mention it in the README")
        .can_load(move |_| {
            let requested = license_for_gate.is_some();
            async move { Ok(requested) }
        })
        .collect_data(move |_| {
            let spdx = license.clone().unwrap_or_default();
            async move { Ok(LicenseData { spdx }) }
        })
        .action(|params| async move {
            let license: LicenseData = params.data_as()?.context("license data missing")?;
            params.files.write(
                "LICENSE",
                format!("SPDX-License-Identifier: {}\n", license.spdx),
            );
            if let Some((path, readme)) = params.files.get("README.md") {
                params.files.write(
                    path,
                    format!("{readme}\n## License\n\n{}\n", license.spdx),
                );
            }
            Ok(())
        })
}
