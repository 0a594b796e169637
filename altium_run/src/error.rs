use std::fmt::{Debug, Display};
use std::path::PathBuf;
use std::time::Duration;

use arcstr::ArcStr;
use thiserror::Error;

use crate::run::RunHandle;

pub type Result<T> = std::result::Result<T, AltiumRunError>;

pub struct AltiumRunError {
    pub(crate) source: ErrorSource,
    pub(crate) context: Vec<ErrorContext>,
}

impl AltiumRunError {
    pub fn source(&self) -> &ErrorSource {
        &self.source
    }

    pub fn context(&self) -> &[ErrorContext] {
        &self.context
    }
}

impl std::error::Error for AltiumRunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

impl Display for AltiumRunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source)?;
        for item in self.context.iter() {
            write!(f, "\n\twhile {}", item)?;
        }
        Ok(())
    }
}

impl Debug for AltiumRunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.source)?;
        if !self.context.is_empty() {
            writeln!(f, "\nError occurred:")?;
            for (i, item) in self.context.iter().enumerate() {
                writeln!(f, "\t{}: {:?}", i, item)?;
            }
        }
        Ok(())
    }
}

impl<T> From<T> for AltiumRunError
where
    T: Into<ErrorSource>,
{
    fn from(value: T) -> Self {
        Self {
            source: value.into(),
            context: Vec::new(),
        }
    }
}

impl AltiumRunError {
    pub fn new(source: impl Into<ErrorSource>) -> Self {
        Self {
            source: source.into(),
            context: Vec::new(),
        }
    }

    pub fn from_context(source: impl Into<ErrorSource>, ctx: impl Into<ErrorContext>) -> Self {
        Self {
            source: source.into(),
            context: vec![ctx.into()],
        }
    }

    pub fn with_context(mut self, ctx: impl Into<ErrorContext>) -> Self {
        self.context.push(ctx.into());
        self
    }

    #[inline]
    pub fn into_inner(self) -> ErrorSource {
        self.source
    }

    /// Takes back the still running process from a timed-out [`AltiumRun::run`].
    ///
    /// [`AltiumRun::run`]: crate::run::AltiumRun::run
    pub fn into_run_handle(self) -> Option<RunHandle> {
        match self.source {
            ErrorSource::Timeout { handle, .. } => handle.map(|handle| *handle),
            _ => None,
        }
    }

    pub(crate) fn with_run_handle(mut self, run: RunHandle) -> Self {
        if let ErrorSource::Timeout { handle, .. } = &mut self.source {
            *handle = Some(Box::new(run));
        }
        self
    }
}

#[inline]
pub fn with_err_context<T, E, C>(result: std::result::Result<T, E>, ctx: C) -> Result<T>
where
    C: FnOnce() -> ErrorContext,
    E: Into<AltiumRunError>,
{
    result.map_err(|err| err.into().with_context(ctx()))
}

#[derive(Debug, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub enum ErrorContext {
    CreateDir(PathBuf),
    CreateFile(PathBuf),
    AppendFile(PathBuf),
    ReadFile(PathBuf),
    RenderTemplate(ArcStr),
    Launch(PathBuf),
    Task(ArcStr),
}

impl Display for ErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ErrorContext::*;
        match self {
            CreateDir(path) => write!(f, "creating directory {path:?}"),
            CreateFile(path) => write!(f, "creating file {path:?}"),
            AppendFile(path) => write!(f, "opening file {path:?} for append"),
            ReadFile(path) => write!(f, "reading file {path:?}"),
            RenderTemplate(name) => write!(f, "rendering template {name}"),
            Launch(path) => write!(f, "launching {path:?}"),
            Task(task) => write!(f, "{task}"),
        }
    }
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ErrorSource {
    #[error("build registry unavailable: {0}")]
    RegistryUnavailable(String),

    #[error("no installed Altium Designer matches version {}", .0.as_deref().unwrap_or("(any)"))]
    VersionNotFound(Option<ArcStr>),

    #[error("unsupported parameter type `{type_name}` at position {index}")]
    UnsupportedParameter { index: usize, type_name: ArcStr },

    #[error("timed out after {timeout:?} waiting for the script to finish")]
    Timeout {
        timeout: Duration,
        /// The launched process, when the handle was not otherwise returned to the caller.
        handle: Option<Box<RunHandle>>,
    },

    #[error("a run of this scripting project is still active")]
    AlreadyRunning,

    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("error parsing TOML: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("internal error: {0}")]
    Internal(String),
}
