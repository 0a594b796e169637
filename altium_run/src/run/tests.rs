use std::path::PathBuf;

use tempdir::TempDir;

use super::*;
use crate::version::{InstalledVersion, MemoryRegistry, APPLICATION_EXE};

fn registry() -> MemoryRegistry {
    let build = |full: &str, short: &str, path: &str| {
        InstalledVersion::builder()
            .full_build(full)
            .short_build(short)
            .install_path(path)
            .build()
            .unwrap()
    };
    MemoryRegistry::new()
        .with_build(build("21.9.1.22", "21.9.1", "/opt/altium/AD21"))
        .with_build(build("22.0.2.(1)", "22.0.2", "/opt/altium/AD22"))
}

#[test]
fn defaults() {
    let run = AltiumRun::new(registry());
    assert_eq!(
        run.application_path(),
        Some(Path::new("/opt/altium/AD21").join(APPLICATION_EXE).as_path())
    );
    assert_eq!(run.scripting_project_path(), Path::new(DEFAULT_PROJECT_DIR));
    assert_eq!(run.function_name(), "main");
    assert!(run.function_parameters().is_empty());
    assert!(run.scripts().is_empty());
    assert_eq!(run.project_to_open(), None);
    assert!(run.internal_logger());
    assert_eq!(
        run.versions(),
        vec!["21.9.1.22".to_string(), "22.0.2.(1)".to_string()]
    );
}

#[test]
fn unknown_version_keeps_previous_selection() {
    let mut run = AltiumRun::new(registry());
    run.set_version(Some("22.0.2")).unwrap();
    let selected = run.application_path().map(Path::to_path_buf);

    let err = run.set_version(Some("23.0.0")).unwrap_err();
    assert!(matches!(
        err.source(),
        ErrorSource::VersionNotFound(Some(v)) if v == "23.0.0"
    ));
    assert_eq!(run.application_path().map(Path::to_path_buf), selected);
    assert_eq!(
        selected,
        Some(PathBuf::from("/opt/altium/AD22").join(APPLICATION_EXE))
    );
}

#[test]
fn no_installation_cannot_start() {
    let run = AltiumRun::new(MemoryRegistry::new());
    assert_eq!(run.application_path(), None);
    let err = run.start().unwrap_err();
    assert!(matches!(err.source(), ErrorSource::VersionNotFound(None)));
}

#[test]
fn adding_a_script_twice_is_a_noop() {
    let mut run = AltiumRun::new(registry());
    run.add_script("scripts/generate_docs.pas");
    run.add_script("scripts/util.pas");
    run.add_script("scripts/generate_docs.pas");
    assert_eq!(
        run.scripts(),
        &[
            PathBuf::from("scripts/generate_docs.pas"),
            PathBuf::from("scripts/util.pas")
        ]
    );

    run.remove_script("scripts/generate_docs.pas");
    run.remove_script("scripts/not_added.pas");
    assert_eq!(run.scripts(), &[PathBuf::from("scripts/util.pas")]);

    run.clear_scripts();
    assert!(run.scripts().is_empty());
}

#[test]
fn set_function_replaces_parameters() {
    let mut run = AltiumRun::new(registry());
    run.set_function_parameters([1, 2, 3]);
    run.set_function("gen_docs", ["Arduino_uno"]);
    assert_eq!(run.function_name(), "gen_docs");
    assert_eq!(run.function_parameters(), &[Param::from("Arduino_uno")]);
}

#[test]
fn log_file_follows_logger_setting() {
    let mut run = AltiumRun::new(registry());
    run.set_scripting_project_path("/work/project");
    assert_eq!(
        run.log_file_path(),
        Some(PathBuf::from("/work/project/data/log.txt"))
    );
    run.set_internal_logger(false);
    assert_eq!(run.log_file_path(), None);
}

#[test]
fn clearing_a_missing_log_is_not_an_error() {
    let dir = TempDir::new("run").unwrap();
    let mut run = AltiumRun::new(registry());
    run.set_scripting_project_path(dir.path().join("does_not_exist"));
    run.clear_log_file().unwrap();
}

#[test]
fn clears_existing_log() {
    let dir = TempDir::new("run").unwrap();
    std::fs::create_dir_all(dir.path().join("data")).unwrap();
    std::fs::write(dir.path().join("data/log.txt"), "old output\n").unwrap();

    let mut run = AltiumRun::new(registry());
    run.set_scripting_project_path(dir.path());
    run.clear_log_file().unwrap();
    assert_eq!(std::fs::read_to_string(dir.path().join("data/log.txt")).unwrap(), "");
}

#[test]
fn builds_command_line() {
    let mut run = AltiumRun::new(registry());
    run.set_application_path("C:/Program Files/Altium/AD22/X2.exe");
    assert_eq!(
        run.command_line("C:/work/scripting_project/script_project.PrjScr")
            .unwrap(),
        "\"C:/Program Files/Altium/AD22/X2.exe\" -RScriptingSystem:RunScript(\
         ProjectName=\"C:\\work\\scripting_project\\script_project.PrjScr\"|\
         ProcName=\"main.pas>SCRIPTING_SYSTEM_MAIN\")"
    );
}

#[test]
fn unsupported_parameter_fails_before_launch() {
    let dir = TempDir::new("run").unwrap();
    let project = dir.path().join("project");
    let mut run = AltiumRun::new(registry());
    run.set_scripting_project_path(&project);
    run.set_function(
        "gen_docs",
        [
            Param::from("ok"),
            Param::Other {
                type_name: arcstr::literal!("table"),
            },
        ],
    );

    let err = run.run(&RunOpts::default()).unwrap_err();
    assert!(matches!(
        err.source(),
        ErrorSource::UnsupportedParameter { index: 1, .. }
    ));
    assert_eq!(
        err.context(),
        &[ErrorContext::Task(arcstr::literal!(
            "preparing scripting project"
        ))]
    );
    assert!(!project.join(DATA_DIR).join(RUNNING_SENTINEL).exists());

    // A failed start does not leave the configuration marked as running.
    let err = run.start().unwrap_err();
    assert!(matches!(
        err.source(),
        ErrorSource::UnsupportedParameter { .. }
    ));
}

#[test]
fn prepare_generates_scripts_and_manifest() {
    let dir = TempDir::new("run").unwrap();
    let project = dir.path().join("a/b/project");
    let user_script = dir.path().join("generate_docs.pas");
    let board = dir.path().join("Arduino_uno.PrjPcb");

    let mut run = AltiumRun::new(registry());
    run.set_scripting_project_path(&project);
    run.add_script(&user_script);
    run.set_project_to_open(Some(board.clone()));
    run.set_function("gen_docs", vec![Param::from("Arduino_uno"), 3.into()]);

    let prepared = run.prepare().unwrap();
    assert_eq!(prepared.data_dir, project.join(DATA_DIR));
    assert!(prepared.data_dir.is_dir());

    let manifest = std::fs::read_to_string(&prepared.manifest).unwrap();
    let expected = format!(
        "[Design]\nVersion=1.0\n\n\
         [Document1]\nDocumentPath={}\n\n\
         [Document2]\nDocumentPath={}\n\n\
         [Document3]\nDocumentPath={}\n\n",
        project.join("logger.pas").display(),
        project.join("main.pas").display(),
        user_script.display(),
    );
    assert_eq!(manifest, expected);

    let main = std::fs::read_to_string(project.join("main.pas")).unwrap();
    assert!(main.contains("gen_docs('Arduino_uno', 3);"));
    assert!(main.contains(&format!("ProjectFilePath := '{}';", board.display())));

    let log = std::fs::read_to_string(project.join("data/log.txt")).unwrap();
    assert_eq!(log, "Startup Altium script\n");
}

#[test]
fn prepare_without_logger_lists_main_first() {
    let dir = TempDir::new("run").unwrap();
    let mut run = AltiumRun::new(registry());
    run.set_scripting_project_path(dir.path());
    run.set_internal_logger(false);

    let prepared = run.prepare().unwrap();
    let manifest = std::fs::read_to_string(prepared.manifest).unwrap();
    assert!(manifest.contains(&format!(
        "[Document1]\nDocumentPath={}\n",
        dir.path().join("main.pas").display()
    )));
    assert!(!manifest.contains("[Document2]"));
    assert!(!dir.path().join("logger.pas").exists());
    assert!(!dir.path().join("data/log.txt").exists());

    let main = std::fs::read_to_string(dir.path().join("main.pas")).unwrap();
    assert!(main.contains("ProjectFilePath := '';"));
    assert!(main.contains("    main;\n"));
}

#[test]
fn run_opts_builder_defaults() {
    assert_eq!(RunOpts::builder().build().unwrap(), RunOpts::default());
    let opts = RunOpts::builder()
        .wait(false)
        .timeout(Duration::from_secs(1))
        .build()
        .unwrap();
    assert!(!opts.wait);
    assert_eq!(opts.timeout, Duration::from_secs(1));
}
