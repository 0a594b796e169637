#![allow(dead_code)]

use std::path::{Path, PathBuf};

use altium_run::run::AltiumRun;
use altium_run::version::MemoryRegistry;
use lazy_static::lazy_static;

pub const BUILD_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/build");

/// Stands in for Altium Designer: runs the script (removes the sentinel) and stays open.
const FINISHES_SCRIPT: &str = r#"#!/bin/sh
manifest=$(printf '%s' "$1" | sed -e 's/.*ProjectName="\([^"]*\)".*/\1/' -e 's#\\#/#g')
rm -f "$(dirname "$manifest")/data/running"
exec sleep 30
"#;

/// Exits immediately without touching the sentinel.
const EXITS_SCRIPT: &str = "#!/bin/sh\nexit 3\n";

/// Never finishes the script.
const HANGS_SCRIPT: &str = "#!/bin/sh\nexec sleep 30\n";

pub struct FakeApps {
    pub finishes: PathBuf,
    pub exits: PathBuf,
    pub hangs: PathBuf,
}

lazy_static! {
    // Written once, before any test spawns, so no executable is open for writing
    // while another thread forks.
    pub static ref FAKE_APPS: FakeApps = {
        let dir = PathBuf::from(BUILD_DIR).join("fake_apps");
        std::fs::create_dir_all(&dir).unwrap();
        FakeApps {
            finishes: write_app(&dir, "finishes.sh", FINISHES_SCRIPT),
            exits: write_app(&dir, "exits.sh", EXITS_SCRIPT),
            hangs: write_app(&dir, "hangs.sh", HANGS_SCRIPT),
        }
    };
}

fn write_app(dir: &Path, name: &str, contents: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// A fresh, not yet existing, scripting project directory for `test_name`.
pub fn project_dir(test_name: &str) -> PathBuf {
    let path = PathBuf::from(BUILD_DIR).join(format!("tests/{test_name}/scripting_project"));
    if path.exists() {
        std::fs::remove_dir_all(&path).unwrap();
    }
    path
}

pub fn setup_run(test_name: &str, app: &Path) -> AltiumRun {
    let mut run = AltiumRun::new(MemoryRegistry::new());
    run.set_application_path(app);
    run.set_scripting_project_path(project_dir(test_name));
    run
}
