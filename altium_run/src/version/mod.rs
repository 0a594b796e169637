//! Discovery of installed Altium Designer builds.
//!
//! Installations are described by a [`BuildRegistry`]. On Windows this is the system
//! registry (see the `altium_registry` plugin); tests and explicit configurations can use a
//! [`MemoryRegistry`] instead.

use std::path::PathBuf;

use arcstr::ArcStr;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::log::{debug, warn};


/// The executable inside an installation directory.
pub const APPLICATION_EXE: &str = "X2.exe";

/// A source of installed build metadata.
pub trait BuildRegistry: Send + Sync {
    /// Returns every registered build, in the registry's enumeration order.
    ///
    /// Should return [`ErrorSource::RegistryUnavailable`](crate::error::ErrorSource::RegistryUnavailable)
    /// if the underlying store cannot be opened at all.
    fn builds(&self) -> Result<Vec<InstalledVersion>>;
}

/// Metadata of one installed build.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Builder)]
pub struct InstalledVersion {
    /// The full version string, e.g. `22.0.2.(1)`.
    #[builder(setter(into))]
    pub full_build: ArcStr,
    /// The short build string.
    #[builder(setter(into))]
    pub short_build: ArcStr,
    /// The directory containing [`APPLICATION_EXE`].
    #[builder(setter(into))]
    pub install_path: PathBuf,
}

impl InstalledVersion {
    #[inline]
    pub fn builder() -> InstalledVersionBuilder {
        InstalledVersionBuilder::default()
    }

    /// Whether `version` names this build, by either its full or its short build string.
    pub fn matches(&self, version: &str) -> bool {
        self.full_build == version || self.short_build == version
    }

    pub fn application_path(&self) -> PathBuf {
        self.install_path.join(APPLICATION_EXE)
    }
}

/// Returns all installed builds, or nothing if the registry is unavailable.
pub fn installed_versions(registry: &dyn BuildRegistry) -> Vec<InstalledVersion> {
    match registry.builds() {
        Ok(builds) => builds,
        Err(err) => {
            warn!("no Altium Designer installations found: {err}");
            Vec::new()
        }
    }
}

/// Returns the full version string of every installed build.
pub fn list_installed_versions(registry: &dyn BuildRegistry) -> Vec<String> {
    installed_versions(registry)
        .into_iter()
        .map(|v| v.full_build.to_string())
        .collect()
}

/// Finds the build named by `version`, or the first enumerated build if `version` is `None`.
///
/// Enumeration order is whatever the registry yields; `None` does not mean "newest".
pub fn find_version(registry: &dyn BuildRegistry, version: Option<&str>) -> Option<InstalledVersion> {
    let found = installed_versions(registry)
        .into_iter()
        .find(|v| version.map_or(true, |version| v.matches(version)));
    match &found {
        Some(v) => debug!("resolved version {:?} to {:?}", version, v.install_path),
        None => debug!("version {:?} is not installed", version),
    }
    found
}

/// Resolves `version` to an installation directory.
pub fn resolve_install_path(registry: &dyn BuildRegistry, version: Option<&str>) -> Option<PathBuf> {
    find_version(registry, version).map(|v| v.install_path)
}

/// A [`BuildRegistry`] backed by a fixed list of builds.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct MemoryRegistry {
    builds: Vec<InstalledVersion>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_build(mut self, build: InstalledVersion) -> Self {
        self.push(build);
        self
    }

    pub fn push(&mut self, build: InstalledVersion) {
        self.builds.push(build);
    }
}

impl FromIterator<InstalledVersion> for MemoryRegistry {
    fn from_iter<T: IntoIterator<Item = InstalledVersion>>(iter: T) -> Self {
        Self {
            builds: iter.into_iter().collect(),
        }
    }
}

impl BuildRegistry for MemoryRegistry {
    fn builds(&self) -> Result<Vec<InstalledVersion>> {
        Ok(self.builds.clone())
    }
}
