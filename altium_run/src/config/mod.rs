//! Run files: TOML descriptions of a scripting project run.
//!
//! ```toml
//! version = "22.0.2"
//! project_dir = "scripting_project"
//! project = "Altium_project/Arduino_uno.PrjPcb"
//! scripts = ["Altium_scripts/generate_docs.pas"]
//! function = "gen_docs"
//! args = ["Arduino_uno"]
//! timeout_secs = 30
//! ```
//!
//! Relative paths are resolved against the current directory, not the run file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{with_err_context, ErrorContext, ErrorSource, Result};
use crate::io;
use crate::param::Param;
use crate::run::{AltiumRun, RunOpts};


#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunFile {
    /// Full or short build string of the installation to use.
    pub version: Option<String>,
    /// Explicit application path. Takes precedence over `version`.
    pub application: Option<PathBuf>,
    pub project_dir: Option<PathBuf>,
    pub internal_logger: Option<bool>,
    /// The project to open before calling the function.
    pub project: Option<PathBuf>,
    pub scripts: Vec<PathBuf>,
    pub function: Option<String>,
    pub args: Vec<toml::Value>,
    pub wait: Option<bool>,
    pub timeout_secs: Option<f64>,
}

impl RunFile {
    pub fn from_toml(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = io::read_to_string(path)?;
        with_err_context(Self::from_toml(&s), || {
            ErrorContext::ReadFile(path.to_path_buf())
        })
    }

    /// Applies every setting present in this file to `run`.
    pub fn apply(&self, run: &mut AltiumRun) -> Result<()> {
        if let Some(application) = &self.application {
            run.set_application_path(application);
        } else if let Some(version) = &self.version {
            run.set_version(Some(version.as_str()))?;
        }
        if let Some(dir) = &self.project_dir {
            run.set_scripting_project_path(dir);
        }
        if let Some(enabled) = self.internal_logger {
            run.set_internal_logger(enabled);
        }
        if let Some(project) = &self.project {
            run.set_project_to_open(Some(project.clone()));
        }
        for script in self.scripts.iter() {
            run.add_script(script);
        }
        if let Some(function) = &self.function {
            run.set_function_name(function.as_str());
        }
        if !self.args.is_empty() {
            run.set_function_parameters(self.args.iter().cloned().map(Param::from));
        }
        Ok(())
    }

    pub fn run_opts(&self) -> Result<RunOpts> {
        let mut opts = RunOpts::default();
        if let Some(wait) = self.wait {
            opts.wait = wait;
        }
        if let Some(secs) = self.timeout_secs {
            opts.timeout = Duration::try_from_secs_f64(secs).map_err(|e| {
                ErrorSource::InvalidArgument(format!("invalid timeout of {secs} seconds: {e}"))
            })?;
        }
        Ok(opts)
    }
}
