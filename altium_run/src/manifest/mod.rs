//! The scripting project file that tells Altium Designer which scripts to load.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::io;
use crate::log::debug;


pub const MANIFEST_NAME: &str = "script_project.PrjScr";
/// Subdirectory of the scripting project holding the log and the sentinel file.
pub const DATA_DIR: &str = "data";

/// Renders the manifest for `scripts`, in order.
///
/// Script paths are made absolute against the current directory. Symlinks are not resolved.
pub fn render_manifest<P: AsRef<Path>>(scripts: &[P]) -> Result<String> {
    let mut out = String::from("[Design]\nVersion=1.0\n\n");
    for (i, script) in scripts.iter().enumerate() {
        let path = io::absolute(script)?;
        out.push_str(&format!("[Document{}]\n", i + 1));
        out.push_str(&format!("DocumentPath={}\n", path.display()));
        out.push('\n');
    }
    Ok(out)
}

/// Writes the manifest for `scripts` into `dir`, creating `dir` and its data directory.
///
/// Returns the path of the written manifest.
pub fn write_manifest<P: AsRef<Path>>(dir: impl AsRef<Path>, scripts: &[P]) -> Result<PathBuf> {
    let dir = dir.as_ref();
    io::create_dir_all(dir.join(DATA_DIR))?;
    let path = dir.join(MANIFEST_NAME);
    io::write(&path, render_manifest(scripts)?)?;
    debug!("wrote manifest with {} scripts to {path:?}", scripts.len());
    Ok(path)
}
