//! Host facts consumed by the resolver.
//!
//! The resolver is a pure function; everything it needs to know about the
//! host (which optional dependencies exist, where the interpreter lives,
//! whether the full compiler suite is installed) is captured up front in
//! an immutable [`HostFacts`] snapshot. The impure side that builds the
//! snapshot lives in [`system`].

pub mod system;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use system::SystemProbe;

/// What the probe learned about one optional dependency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyFact {
    /// Dependency name as the recipe spells it (e.g., `hdf5`, `pyqt5`)
    pub name: String,

    /// Whether the dependency was found on the host
    pub present: bool,

    /// Detected version, when the probe could determine one
    pub version: Option<String>,

    /// Installation prefix, when known
    pub prefix: Option<PathBuf>,
}

impl DependencyFact {
    /// A present dependency with no further detail.
    pub fn present(name: impl Into<String>) -> Self {
        DependencyFact {
            name: name.into(),
            present: true,
            version: None,
            prefix: None,
        }
    }

    /// An absent dependency.
    pub fn absent(name: impl Into<String>) -> Self {
        DependencyFact {
            name: name.into(),
            present: false,
            version: None,
            prefix: None,
        }
    }

    /// Attach a version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Attach an install prefix.
    pub fn with_prefix(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}

/// What the probe learned about an interpreter runtime installation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeFacts {
    /// Interpreter executable
    pub executable: PathBuf,

    /// `sys.prefix` of the installation
    pub prefix: PathBuf,

    /// Public header directory
    pub include_dir: PathBuf,

    /// `major.minor` version, e.g. `2.7`
    pub version: String,

    /// Files under the installation the probe confirmed to exist.
    ///
    /// The resolver's runtime-library search is a pure lookup against this
    /// set; the probe populates it from the configured candidate
    /// templates.
    pub existing_files: BTreeSet<PathBuf>,
}

impl RuntimeFacts {
    /// Whether the probe confirmed this file exists.
    pub fn file_exists(&self, path: &Path) -> bool {
        self.existing_files.contains(path)
    }
}

/// Host operating-system kind, as far as the pipeline cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsKind {
    /// Uses install-name dynamic linking; post-install patching applies.
    Macos,
    Linux,
    Other,
}

impl OsKind {
    /// Detect the compile-time host OS.
    pub fn host() -> Self {
        if cfg!(target_os = "macos") {
            OsKind::Macos
        } else if cfg!(target_os = "linux") {
            OsKind::Linux
        } else {
            OsKind::Other
        }
    }

    /// Whether dynamic libraries carry rewritable install names.
    pub fn uses_install_names(&self) -> bool {
        matches!(self, OsKind::Macos)
    }
}

/// Immutable snapshot of everything the resolver may consult.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostFacts {
    /// Host OS kind
    pub os: OsKind,

    /// Optional-dependency facts, keyed by recipe dependency name
    pub dependencies: BTreeMap<String, DependencyFact>,

    /// Python 2 runtime, when detected
    pub python2: Option<RuntimeFacts>,

    /// Python 3 runtime, when detected
    pub python3: Option<RuntimeFacts>,

    /// Whether a full compiler-suite installation (command-line tools)
    /// is present, as opposed to an IDE-only toolchain
    pub compiler_suite_installed: bool,

    /// Platform SDK root, when the probe could determine one
    pub sdk_path: Option<PathBuf>,

    /// Target installation prefix
    pub install_prefix: PathBuf,

    /// Whether the package-manager-provided interpreter is the currently
    /// linked/active one (drives post-install patch direction)
    pub packaged_python_linked: bool,
}

impl HostFacts {
    /// Look up a dependency fact.
    pub fn dependency(&self, name: &str) -> Option<&DependencyFact> {
        self.dependencies.get(name)
    }

    /// Whether a dependency was probed and found present.
    pub fn has(&self, name: &str) -> bool {
        self.dependency(name).map(|d| d.present).unwrap_or(false)
    }

    /// The library directory under the install prefix.
    pub fn lib_dir(&self) -> PathBuf {
        self.install_prefix.join("lib")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_fact_builders() {
        let fact = DependencyFact::present("hdf5")
            .with_version("1.10.0")
            .with_prefix("/usr/local");

        assert!(fact.present);
        assert_eq!(fact.version.as_deref(), Some("1.10.0"));
        assert_eq!(fact.prefix.as_deref(), Some(Path::new("/usr/local")));
    }

    #[test]
    fn test_os_kind_install_names() {
        assert!(OsKind::Macos.uses_install_names());
        assert!(!OsKind::Linux.uses_install_names());
    }

    #[test]
    fn test_host_facts_lookup() {
        let mut deps = BTreeMap::new();
        deps.insert("jpeg".to_string(), DependencyFact::present("jpeg"));
        deps.insert("qt".to_string(), DependencyFact::absent("qt"));

        let facts = HostFacts {
            os: OsKind::Linux,
            dependencies: deps,
            python2: None,
            python3: None,
            compiler_suite_installed: true,
            sdk_path: None,
            install_prefix: PathBuf::from("/usr/local"),
            packaged_python_linked: false,
        };

        assert!(facts.has("jpeg"));
        assert!(!facts.has("qt"));
        assert!(!facts.has("never-probed"));
        assert_eq!(facts.lib_dir(), PathBuf::from("/usr/local/lib"));
    }
}
