//! External tool invoker for WiX heat
//!
//! Resolves the heat executable, assembles the harvesting argument list in
//! its fixed order, and runs heat as a child process with captured output.
//! A non-zero exit aborts the request with heat's own diagnostics; warning
//! lines on a successful run are forwarded through the `log` facade.

use crate::{ComRegError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Baseline arguments passed on every run unless `override_defaults` is set
pub const BASELINE_ARGS: [&str; 2] = ["-ag", "-sfrag"];

/// Argument suppressing rich COM/TypeLib elements in favor of plain
/// registry values, passed unless `create_com_objects` is set
pub const SUPPRESS_COM_ARG: &str = "-scom";

/// Options controlling a heat invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComHarvestOptions {
    /// Emit rich COM/TypeLib elements instead of plain registry values
    pub create_com_objects: bool,
    /// Drop the baseline arguments
    pub override_defaults: bool,
    /// Do not forward heat's warning output
    pub hide_warnings: bool,
    /// Extra arguments appended verbatim, before `-out`
    pub extra_arguments: Vec<String>,
    /// Stdout lines heat prints before any warnings (its banner).
    /// Version-specific; output longer than this is treated as warnings.
    pub warning_threshold: usize,
}

impl Default for ComHarvestOptions {
    fn default() -> Self {
        Self {
            create_com_objects: false,
            override_defaults: false,
            hide_warnings: false,
            extra_arguments: Vec::new(),
            warning_threshold: 2,
        }
    }
}

/// Captured output of one heat run
#[derive(Debug, Clone)]
pub struct HeatOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Resolved heat executable
#[derive(Debug, Clone)]
pub struct HeatTool {
    path: PathBuf,
}

impl HeatTool {
    /// Locate heat on PATH
    pub fn detect() -> Result<Self> {
        let path = which::which("heat").map_err(|_| ComRegError::ToolNotFound)?;
        Ok(Self { path })
    }

    /// Use a specific heat binary (build systems with a known install path)
    pub fn at<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path to the resolved binary
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Render the full invocation for diagnostics, paths quoted
    pub fn command_line(&self, source: &Path, output: &Path, options: &ComHarvestOptions) -> String {
        let mut cmd = format!("{} file \"{}\"", self.path.display(), source.display());
        for arg in flag_args(options) {
            cmd.push(' ');
            cmd.push_str(&arg);
        }
        cmd.push_str(&format!(" -out \"{}\"", output.display()));
        cmd
    }

    /// Run heat against `source`, writing the harvested fragment to `output`.
    ///
    /// Blocks until the child exits. Stdout and stderr are captured, never
    /// inherited. A non-zero exit surfaces heat's stdout as the failure
    /// detail; heat reports its diagnostics there even on failure.
    pub fn run(
        &self,
        source: &Path,
        output: &Path,
        options: &ComHarvestOptions,
    ) -> Result<HeatOutput> {
        let args = harvest_args(source, output, options);
        let result = Command::new(&self.path).args(&args).output()?;

        let stdout = String::from_utf8_lossy(&result.stdout).to_string();
        let stderr = String::from_utf8_lossy(&result.stderr).to_string();

        if !result.status.success() {
            return Err(ComRegError::HarvestFailed(stdout.trim().to_string()));
        }

        let lines: Vec<&str> = stdout.lines().collect();
        if !options.hide_warnings && lines.len() > options.warning_threshold {
            for line in &lines {
                log::warn!("heat: {}", line);
            }
        }

        Ok(HeatOutput { stdout, stderr })
    }
}

/// Assemble the full argument vector in its fixed order:
/// `file <source>`, baseline, suppression, extras, `-out <output>`
pub fn harvest_args(source: &Path, output: &Path, options: &ComHarvestOptions) -> Vec<String> {
    let mut args = vec!["file".to_string(), source.display().to_string()];
    args.extend(flag_args(options));
    args.push("-out".to_string());
    args.push(output.display().to_string());
    args
}

fn flag_args(options: &ComHarvestOptions) -> Vec<String> {
    let mut args = Vec::new();

    if !options.override_defaults {
        args.extend(BASELINE_ARGS.iter().map(|a| a.to_string()));
    }

    if !options.create_com_objects {
        args.push(SUPPRESS_COM_ARG.to_string());
    }

    args.extend(options.extra_arguments.iter().cloned());
    args
}
