//! Launching Altium Designer and waiting for a script to finish.
//!
//! A run goes through `Idle -> Preparing -> Launched -> (Finished | TimedOut)`. Preparing
//! renders the generated scripts and the manifest into the scripting project directory.
//! Launching creates the `data/running` sentinel and starts the application. The generated
//! main script deletes the sentinel when the user function returns; the application itself
//! stays open, so the runner kills it once the sentinel is gone.
//!
//! All runs of one configuration share the same sentinel, so a configuration has at most one
//! active [`RunHandle`]. The handle stops being active when its run finishes, when it is
//! killed or when it is dropped.

use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::process::{Child, Command, ExitStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arcstr::ArcStr;
use derive_builder::Builder;

use crate::error::{with_err_context, AltiumRunError, ErrorContext, ErrorSource, Result};
use crate::io;
use crate::log::{debug, info, warn};
use crate::manifest::{write_manifest, DATA_DIR};
use crate::param::{serialize_params, Param};
use crate::poll::{self, POLL_INTERVAL};
use crate::template::{LoggerCtx, MainCtx, ScriptRenderer, LOGGER_TEMPLATE, MAIN_TEMPLATE};
use crate::version::{find_version, list_installed_versions, BuildRegistry};

#[cfg(test)]
mod tests;

pub const DEFAULT_PROJECT_DIR: &str = "scripting_project";
pub const DEFAULT_FUNCTION: &str = "main";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const LOG_FILE_NAME: &str = "log.txt";
pub const RUNNING_SENTINEL: &str = "running";
/// The procedure in the generated main script that Altium Designer is told to run.
pub const ENTRY_POINT: &str = "main.pas>SCRIPTING_SYSTEM_MAIN";

const STARTUP_LOG_LINE: &str = "Startup Altium script\n";

/// Configuration of a scripting project run.
///
/// The configuration is reusable: every call to [`AltiumRun::start`] or [`AltiumRun::run`]
/// regenerates the scripting project from the current settings and launches a new process.
pub struct AltiumRun {
    registry: Arc<dyn BuildRegistry>,
    renderer: ScriptRenderer,
    application: Option<PathBuf>,
    project_dir: PathBuf,
    scripts: Vec<PathBuf>,
    internal_logger: bool,
    project_to_open: Option<PathBuf>,
    function_name: ArcStr,
    function_parameters: Vec<Param>,
    active: Arc<AtomicBool>,
}

/// Options controlling how [`AltiumRun::run`] waits.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Builder)]
pub struct RunOpts {
    /// Whether to block until the script finishes.
    ///
    /// If `false`, a single grace poll is made before returning.
    #[builder(default = "true")]
    pub wait: bool,
    #[builder(default = "DEFAULT_TIMEOUT")]
    pub timeout: Duration,
}

impl RunOpts {
    #[inline]
    pub fn builder() -> RunOptsBuilder {
        RunOptsBuilder::default()
    }
}

impl Default for RunOpts {
    fn default() -> Self {
        Self {
            wait: true,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// How a launched script finished.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Completion {
    /// The script removed the sentinel file. The application was then killed.
    SentinelCleared,
    /// The application exited on its own.
    Exited(ExitStatus),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RunState {
    Launched,
    Finished(Completion),
    /// The last wait ran out of time. The application was left running.
    TimedOut,
}

/// A launched Altium Designer process.
///
/// Dropping the handle does not stop the process.
#[derive(Debug)]
pub struct RunHandle {
    child: Child,
    sentinel: PathBuf,
    state: RunState,
    active: Option<ActiveRun>,
}

/// Marks the owning configuration as having a live run until dropped.
#[derive(Debug)]
struct ActiveRun(Arc<AtomicBool>);

impl ActiveRun {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        (!flag.swap(true, Ordering::AcqRel)).then(|| Self(Arc::clone(flag)))
    }
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct PreparedRun {
    data_dir: PathBuf,
    manifest: PathBuf,
}

impl AltiumRun {
    /// Creates a run configuration using the first installation found in `registry`.
    pub fn new(registry: impl BuildRegistry + 'static) -> Self {
        Self::with_registry(Arc::new(registry))
    }

    pub fn with_registry(registry: Arc<dyn BuildRegistry>) -> Self {
        let mut run = Self {
            registry,
            renderer: ScriptRenderer::default(),
            application: None,
            project_dir: PathBuf::from(DEFAULT_PROJECT_DIR),
            scripts: Vec::new(),
            internal_logger: true,
            project_to_open: None,
            function_name: ArcStr::from(DEFAULT_FUNCTION),
            function_parameters: Vec::new(),
            active: Arc::new(AtomicBool::new(false)),
        };
        if run.set_version(None).is_err() {
            warn!("no Altium Designer installation found; set an application path before running");
        }
        run
    }

    /// Full version strings of all installed Altium Designer builds.
    pub fn versions(&self) -> Vec<String> {
        list_installed_versions(self.registry.as_ref())
    }

    /// Selects the installation to run, by full or short build string.
    ///
    /// `None` selects the first installation found. If nothing matches, the current
    /// selection is kept and [`ErrorSource::VersionNotFound`] is returned.
    pub fn set_version(&mut self, version: Option<&str>) -> Result<()> {
        let found = find_version(self.registry.as_ref(), version)
            .ok_or_else(|| ErrorSource::VersionNotFound(version.map(ArcStr::from)))?;
        self.application = Some(found.application_path());
        Ok(())
    }

    /// Runs `path` instead of a registry-discovered installation.
    pub fn set_application_path(&mut self, path: impl Into<PathBuf>) {
        self.application = Some(path.into());
    }

    pub fn application_path(&self) -> Option<&Path> {
        self.application.as_deref()
    }

    /// Sets the directory in which the scripting project is generated.
    ///
    /// Defaults to `scripting_project` in the current directory, not next to the running
    /// executable. Pass an absolute path to make a run independent of where it is launched.
    pub fn set_scripting_project_path(&mut self, path: impl Into<PathBuf>) {
        self.project_dir = path.into();
    }

    pub fn scripting_project_path(&self) -> &Path {
        &self.project_dir
    }

    pub fn set_renderer(&mut self, renderer: ScriptRenderer) {
        self.renderer = renderer;
    }

    pub fn set_internal_logger(&mut self, enabled: bool) {
        self.internal_logger = enabled;
    }

    pub fn internal_logger(&self) -> bool {
        self.internal_logger
    }

    /// The log written by the generated logger script, or `None` if it is disabled.
    pub fn log_file_path(&self) -> Option<PathBuf> {
        self.internal_logger
            .then(|| self.data_dir().join(LOG_FILE_NAME))
    }

    /// Truncates the log file. Does nothing if the internal logger is disabled.
    pub fn clear_log_file(&self) -> Result<()> {
        let Some(path) = self.log_file_path() else {
            return Ok(());
        };
        match std::fs::File::create(&path) {
            Ok(_) => Ok(()),
            // No scripting project yet, so there is no log to clear.
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AltiumRunError::from_context(
                err,
                ErrorContext::CreateFile(path),
            )),
        }
    }

    /// Adds a script to the scripting project. Adding a script twice has no effect.
    pub fn add_script(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.scripts.contains(&path) {
            self.scripts.push(path);
        }
    }

    pub fn remove_script(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.scripts.retain(|s| s != path);
    }

    pub fn clear_scripts(&mut self) {
        self.scripts.clear();
    }

    /// User scripts, in the order they were added.
    pub fn scripts(&self) -> &[PathBuf] {
        &self.scripts
    }

    /// Sets the PCB or multi-board project to open before calling the script function.
    pub fn set_project_to_open(&mut self, path: Option<PathBuf>) {
        self.project_to_open = path;
    }

    pub fn project_to_open(&self) -> Option<&Path> {
        self.project_to_open.as_deref()
    }

    pub fn set_function_name(&mut self, name: impl Into<ArcStr>) {
        self.function_name = name.into();
    }

    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    pub fn set_function_parameters<I, P>(&mut self, params: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<Param>,
    {
        self.function_parameters = params.into_iter().map(Into::into).collect();
    }

    pub fn function_parameters(&self) -> &[Param] {
        &self.function_parameters
    }

    pub fn set_function<I, P>(&mut self, name: impl Into<ArcStr>, params: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<Param>,
    {
        self.set_function_name(name);
        self.set_function_parameters(params);
    }

    fn data_dir(&self) -> PathBuf {
        self.project_dir.join(DATA_DIR)
    }

    /// The command line used to run the scripting project described by `manifest`.
    pub fn command_line(&self, manifest: impl AsRef<Path>) -> Result<String> {
        let application = self.require_application()?;
        Ok(format!(
            "\"{}\" {}",
            application.display(),
            script_argument(manifest.as_ref())
        ))
    }

    fn require_application(&self) -> Result<&Path> {
        self.application
            .as_deref()
            .ok_or_else(|| ErrorSource::VersionNotFound(None).into())
    }

    /// Generates the scripting project and launches Altium Designer without waiting.
    ///
    /// Fails with [`ErrorSource::AlreadyRunning`] while a previous handle from this
    /// configuration is still active.
    pub fn start(&self) -> Result<RunHandle> {
        let application = self.require_application()?.to_path_buf();
        let active = ActiveRun::acquire(&self.active).ok_or(ErrorSource::AlreadyRunning)?;
        let prepared = with_err_context(self.prepare(), || {
            ErrorContext::Task(arcstr::literal!("preparing scripting project"))
        })?;

        let sentinel = prepared.data_dir.join(RUNNING_SENTINEL);
        io::create_file(&sentinel)?;

        let mut command = launch_command(&application, &prepared.manifest);
        let child = with_err_context(command.spawn(), || {
            ErrorContext::Launch(application.clone())
        })?;
        info!(
            "launched {:?} (pid {}) for {:?}",
            application,
            child.id(),
            prepared.manifest
        );

        Ok(RunHandle {
            child,
            sentinel,
            state: RunState::Launched,
            active: Some(active),
        })
    }

    /// Generates the scripting project, launches Altium Designer and waits as configured.
    ///
    /// If `opts.wait` is set and the script does not finish in time, returns
    /// [`ErrorSource::Timeout`]. The application is left running and its handle can be taken
    /// back with [`AltiumRunError::into_run_handle`].
    pub fn run(&self, opts: &RunOpts) -> Result<RunHandle> {
        let mut handle = self.start()?;
        if opts.wait {
            if let Err(err) = handle.wait(opts.timeout) {
                return Err(err.with_run_handle(handle));
            }
        } else {
            handle.poll(1)?;
        }
        Ok(handle)
    }

    fn prepare(&self) -> Result<PreparedRun> {
        debug!("preparing scripting project in {:?}", self.project_dir);
        let function_parameters = serialize_params(&self.function_parameters)?;

        let project_dir = io::absolute(&self.project_dir)?;
        let data_dir = project_dir.join(DATA_DIR);
        io::create_dir_all(&data_dir)?;

        let mut scripts = Vec::with_capacity(self.scripts.len() + 2);
        if self.internal_logger {
            scripts.push(self.generate_logger_script(&project_dir, &data_dir)?);
        }
        scripts.push(self.generate_main_script(&project_dir, &data_dir, &function_parameters)?);
        scripts.extend(self.scripts.iter().cloned());

        let manifest = write_manifest(&project_dir, &scripts)?;
        Ok(PreparedRun { data_dir, manifest })
    }

    fn generate_logger_script(&self, project_dir: &Path, data_dir: &Path) -> Result<PathBuf> {
        let log_file = data_dir.join(LOG_FILE_NAME);
        {
            use std::io::Write;
            let mut file = io::append_file(&log_file)?;
            with_err_context(file.write_all(STARTUP_LOG_LINE.as_bytes()), || {
                ErrorContext::AppendFile(log_file.clone())
            })?;
        }

        let dest = project_dir.join(LOGGER_TEMPLATE);
        let log_file = log_file.display().to_string();
        self.renderer.render(
            LOGGER_TEMPLATE,
            &LoggerCtx {
                log_file_path: &log_file,
            },
            &dest,
        )?;
        Ok(dest)
    }

    fn generate_main_script(
        &self,
        project_dir: &Path,
        data_dir: &Path,
        function_parameters: &str,
    ) -> Result<PathBuf> {
        let data_folder = format!("{}{}", data_dir.display(), MAIN_SEPARATOR);
        let project_file_path = match &self.project_to_open {
            Some(path) => io::absolute(path)?.display().to_string(),
            None => String::new(),
        };

        let dest = project_dir.join(MAIN_TEMPLATE);
        self.renderer.render(
            MAIN_TEMPLATE,
            &MainCtx {
                data_folder: &data_folder,
                project_file_path: &project_file_path,
                function_name: &self.function_name,
                function_parameters,
            },
            &dest,
        )?;
        Ok(dest)
    }
}

/// The argument telling the scripting system which project and procedure to run.
pub fn script_argument(manifest: &Path) -> String {
    let project = manifest.display().to_string().replace('/', "\\");
    format!("-RScriptingSystem:RunScript(ProjectName=\"{project}\"|ProcName=\"{ENTRY_POINT}\")")
}

#[cfg(windows)]
fn launch_command(application: &Path, manifest: &Path) -> Command {
    use std::os::windows::process::CommandExt;

    // The scripting system parses the quotes itself; they must reach it unescaped.
    let mut command = Command::new(application);
    command.raw_arg(script_argument(manifest));
    command
}

#[cfg(not(windows))]
fn launch_command(application: &Path, manifest: &Path) -> Command {
    let mut command = Command::new(application);
    command.arg(script_argument(manifest));
    command
}

impl RunHandle {
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn sentinel_path(&self) -> &Path {
        &self.sentinel
    }

    /// Blocks until the script finishes or `timeout` elapses.
    ///
    /// Checks every [`POLL_INTERVAL`]. On timeout the process keeps running and the handle
    /// may be waited on again.
    pub fn wait(&mut self, timeout: Duration) -> Result<Completion> {
        if let RunState::Finished(completion) = self.state {
            return Ok(completion);
        }
        match self.poll(poll::attempts(timeout, POLL_INTERVAL))? {
            Some(completion) => Ok(completion),
            None => {
                self.state = RunState::TimedOut;
                warn!(
                    "script in process {} did not finish within {timeout:?}",
                    self.child.id()
                );
                Err(ErrorSource::Timeout {
                    timeout,
                    handle: None,
                }
                .into())
            }
        }
    }

    fn poll(&mut self, attempts: u64) -> Result<Option<Completion>> {
        let child = &mut self.child;
        let sentinel = self.sentinel.as_path();
        let completion = poll::poll(POLL_INTERVAL, attempts, || check(child, sentinel))?;
        if let Some(completion) = completion {
            info!("script finished: {completion:?}");
            self.state = RunState::Finished(completion);
            self.active = None;
        }
        Ok(completion)
    }

    /// Kills the application if it is still running.
    pub fn kill(&mut self) -> Result<()> {
        if self.child.try_wait()?.is_none() {
            self.child.kill()?;
        }
        let status = self.child.wait()?;
        if !matches!(self.state, RunState::Finished(_)) {
            self.state = RunState::Finished(Completion::Exited(status));
        }
        self.active = None;
        Ok(())
    }
}

fn check(child: &mut Child, sentinel: &Path) -> Result<Option<Completion>> {
    if !sentinel.is_file() {
        if child.try_wait()?.is_none() {
            debug!("sentinel removed; stopping process {}", child.id());
            child.kill()?;
        }
        child.wait()?;
        return Ok(Some(Completion::SentinelCleared));
    }
    if let Some(status) = child.try_wait()? {
        return Ok(Some(Completion::Exited(status)));
    }
    Ok(None)
}
