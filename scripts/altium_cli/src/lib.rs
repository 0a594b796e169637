use std::path::PathBuf;
use std::time::Duration;

use altium_run::config::RunFile;
use altium_run::param::Param;
use altium_run::run::{AltiumRun, Completion, RunOpts, RunState};
use altium_run::template::ScriptRenderer;
use altium_run::version::{installed_versions, BuildRegistry, InstalledVersion};
use clap::{Args, Parser, Subcommand};


#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = "Run DelphiScript automation scripts inside Altium Designer"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List installed Altium Designer versions.
    Versions(VersionsArgs),
    /// Generate a scripting project and run it.
    Run(RunArgs),
}

#[derive(Args, Debug, Default)]
pub struct VersionsArgs {
    /// Print the installations as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// A TOML run file. Flags override its settings.
    pub config: Option<PathBuf>,
    /// Full or short build string of the Altium Designer installation to use.
    #[arg(long)]
    pub altium_version: Option<String>,
    /// Path to the Altium Designer executable. Takes precedence over --altium-version.
    #[arg(long)]
    pub app: Option<PathBuf>,
    /// Directory in which the scripting project is generated.
    #[arg(long)]
    pub project_dir: Option<PathBuf>,
    /// The PCB project to open before calling the function.
    #[arg(long)]
    pub open: Option<PathBuf>,
    /// A script to load. May be repeated.
    #[arg(long = "script")]
    pub scripts: Vec<PathBuf>,
    /// The function to call.
    #[arg(long)]
    pub function: Option<String>,
    /// A function argument as a TOML literal (`3`, `true`, `[1, 2]`); anything else,
    /// including dates and tables, is passed as a string. May be repeated.
    #[arg(long = "arg")]
    pub args: Vec<String>,
    /// Do not generate the logger script.
    #[arg(long)]
    pub no_logger: bool,
    /// Truncate the log file before running.
    #[arg(long)]
    pub clear_log: bool,
    /// Return right after launching instead of waiting for the script.
    #[arg(long)]
    pub no_wait: bool,
    /// Seconds to wait for the script to finish.
    #[arg(long)]
    pub timeout: Option<f64>,
    /// Directory holding replacement `logger.pas` and `main.pas` templates.
    #[arg(long)]
    pub templates: Option<PathBuf>,
}

/// Parses a command line function argument.
pub fn parse_arg(arg: &str) -> Param {
    match Param::parse_literal(arg) {
        Ok(Param::Other { .. }) | Err(_) => Param::Str(arg.to_string()),
        Ok(param) => param,
    }
}

pub fn format_versions(versions: &[InstalledVersion], json: bool) -> anyhow::Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(versions)?);
    }
    Ok(versions
        .iter()
        .map(|v| format!("{}\t{}", v.full_build, v.install_path.display()))
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Applies the run file and flags in `args` to `run`, returning the wait options.
pub fn configure(run: &mut AltiumRun, args: &RunArgs) -> anyhow::Result<RunOpts> {
    let file = match &args.config {
        Some(path) => RunFile::load(path)?,
        None => RunFile::default(),
    };
    file.apply(run)?;
    let mut opts = file.run_opts()?;

    if let Some(app) = &args.app {
        run.set_application_path(app);
    } else if let Some(version) = &args.altium_version {
        run.set_version(Some(version.as_str()))?;
    }
    if let Some(dir) = &args.project_dir {
        run.set_scripting_project_path(dir);
    }
    if let Some(project) = &args.open {
        run.set_project_to_open(Some(project.clone()));
    }
    for script in args.scripts.iter() {
        run.add_script(script);
    }
    if let Some(function) = &args.function {
        run.set_function_name(function.as_str());
    }
    if !args.args.is_empty() {
        run.set_function_parameters(args.args.iter().map(|arg| parse_arg(arg)));
    }
    if args.no_logger {
        run.set_internal_logger(false);
    }
    if let Some(dir) = &args.templates {
        run.set_renderer(ScriptRenderer::new(dir));
    }
    if args.no_wait {
        opts.wait = false;
    }
    if let Some(secs) = args.timeout {
        opts.timeout = Duration::try_from_secs_f64(secs)?;
    }
    Ok(opts)
}

pub fn execute(cli: Cli, registry: impl BuildRegistry + 'static) -> anyhow::Result<()> {
    match cli.command {
        Command::Versions(args) => {
            let versions = installed_versions(&registry);
            println!("{}", format_versions(&versions, args.json)?);
        }
        Command::Run(args) => {
            let mut run = AltiumRun::new(registry);
            let opts = configure(&mut run, &args)?;
            if args.clear_log {
                run.clear_log_file()?;
            }
            let handle = run.run(&opts)?;
            match handle.state() {
                RunState::Finished(Completion::SentinelCleared) => {
                    log::info!("script finished")
                }
                RunState::Finished(Completion::Exited(status)) => {
                    log::warn!("Altium Designer exited before the script finished: {status}")
                }
                RunState::Launched | RunState::TimedOut => {
                    println!("launched Altium Designer (pid {})", handle.id())
                }
            }
        }
    }
    Ok(())
}
