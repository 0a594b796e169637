//! Locates Altium Designer installations through the Windows registry.
//!
//! Each installed build has a key under `HKEY_LOCAL_MACHINE\SOFTWARE\Altium\Builds` with the
//! string values `FullBuild`, `Build` and `ProgramsInstallPath`. On other platforms the
//! registry is reported as unavailable, which the version locator treats as "nothing
//! installed".

use altium_run::error::{ErrorSource, Result};
use altium_run::run::AltiumRun;
use altium_run::version::{BuildRegistry, InstalledVersion};


pub const BUILDS_KEY: &str = r"SOFTWARE\Altium\Builds";

/// A [`BuildRegistry`] reading `HKEY_LOCAL_MACHINE`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct WindowsRegistry {
    key: String,
}

impl Default for WindowsRegistry {
    fn default() -> Self {
        Self::new(BUILDS_KEY)
    }
}

impl WindowsRegistry {
    /// Reads builds from subkeys of `key` instead of [`BUILDS_KEY`].
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

/// A run configuration using the first Altium Designer installation on this machine.
pub fn altium_run() -> AltiumRun {
    AltiumRun::new(WindowsRegistry::default())
}

#[cfg(windows)]
impl BuildRegistry for WindowsRegistry {
    fn builds(&self) -> Result<Vec<InstalledVersion>> {
        use log::{debug, warn};
        use winreg::enums::{HKEY_LOCAL_MACHINE, KEY_READ};
        use winreg::RegKey;

        let top = RegKey::predef(HKEY_LOCAL_MACHINE)
            .open_subkey_with_flags(&self.key, KEY_READ)
            .map_err(|e| ErrorSource::RegistryUnavailable(format!("{}: {e}", self.key)))?;

        let mut builds = Vec::new();
        for name in top.enum_keys() {
            let name = match name {
                Ok(name) => name,
                Err(e) => {
                    warn!("failed to enumerate {}: {e}", self.key);
                    break;
                }
            };
            match read_build(&top, &name) {
                Ok(build) => builds.push(build),
                Err(e) => debug!("skipping incomplete build {name}: {e}"),
            }
        }
        Ok(builds)
    }
}

#[cfg(windows)]
fn read_build(top: &winreg::RegKey, name: &str) -> std::io::Result<InstalledVersion> {
    let key = top.open_subkey_with_flags(name, winreg::enums::KEY_READ)?;
    let full_build: String = key.get_value("FullBuild")?;
    let short_build: String = key.get_value("Build")?;
    let install_path: String = key.get_value("ProgramsInstallPath")?;
    Ok(InstalledVersion {
        full_build: full_build.into(),
        short_build: short_build.into(),
        install_path: install_path.into(),
    })
}

#[cfg(not(windows))]
impl BuildRegistry for WindowsRegistry {
    fn builds(&self) -> Result<Vec<InstalledVersion>> {
        Err(ErrorSource::RegistryUnavailable(format!(
            "{}: the Windows registry does not exist on this platform",
            self.key
        ))
        .into())
    }
}
