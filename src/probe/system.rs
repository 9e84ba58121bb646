//! The impure host probe.
//!
//! `SystemProbe` is the only place in the crate that inspects the ambient
//! environment to answer resolver questions: it shells out to
//! `pkg-config`, the interpreters, and (on macOS) `xcode-select`, and
//! folds the answers into a [`HostFacts`] snapshot. The resolver itself
//! never executes a process.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::probe::{DependencyFact, HostFacts, OsKind, RuntimeFacts};
use crate::recipe::Recipe;
use crate::util::config::NamingConfig;
use crate::util::process::{find_executable, ProcessBuilder};

/// pkg-config module names for recipe dependencies that have one.
const PKG_CONFIG_NAMES: &[(&str, &str)] = &[
    ("x11", "x11"),
    ("fontconfig", "fontconfig"),
    ("hdf5", "hdf5"),
    ("jpeg", "libjpeg"),
    ("libpng", "libpng"),
    ("libtiff", "libtiff-4"),
    ("qt", "QtCore"),
    ("qt5", "Qt5Core"),
];

/// Marker executables for dependencies that ship a tool.
const TOOL_NAMES: &[(&str, &str)] = &[
    ("qt", "qmake"),
    ("qt5", "qmake"),
    ("sip", "sip"),
    ("pyqt", "pyuic4"),
    ("pyqt5", "pyuic5"),
    ("tcl", "tclsh"),
];

/// Common prefixes searched for header-only dependencies such as boost.
const HEADER_PREFIXES: &[&str] = &["/usr/local", "/opt/homebrew", "/usr"];

/// Probes the host system for the facts the resolver needs.
pub struct SystemProbe {
    naming: NamingConfig,
}

impl SystemProbe {
    /// Create a probe using the given runtime-library naming templates.
    pub fn new(naming: NamingConfig) -> Self {
        SystemProbe { naming }
    }

    /// Build a complete host snapshot for one recipe invocation.
    pub fn facts(&self, recipe: &Recipe, install_prefix: PathBuf) -> Result<HostFacts> {
        let os = OsKind::host();

        let mut dependencies = BTreeMap::new();
        for decl in &recipe.options {
            if let Some(fact) = self.probe_dependency(&decl.name) {
                dependencies.insert(decl.name.clone(), fact);
            }
        }
        // Binding generators are not user-facing options but the resolver
        // may require them for compound features.
        for name in ["sip", "pyqt", "pyqt5"] {
            dependencies.insert(name.to_string(), self.probe_tool_dependency(name));
        }

        let python2 = self.probe_runtime("python");
        let python3 = self.probe_runtime("python3");

        // matplotlib lives inside an interpreter installation, so it is
        // probed through whichever runtime was found.
        dependencies.insert(
            "matplotlib".to_string(),
            self.probe_matplotlib(python2.as_ref().or(python3.as_ref())),
        );

        let packaged_python_linked = python2
            .as_ref()
            .map(|rt| !rt.executable.starts_with("/usr/bin"))
            .unwrap_or(false);

        Ok(HostFacts {
            os,
            dependencies,
            python2,
            python3,
            compiler_suite_installed: self.compiler_suite_installed(os),
            sdk_path: self.sdk_path(os),
            install_prefix,
            packaged_python_linked,
        })
    }

    /// Probe a single named dependency, if slipway knows how to find it.
    fn probe_dependency(&self, name: &str) -> Option<DependencyFact> {
        // Switches and runtime bindings are not host dependencies.
        match name {
            "cxx11" | "examples" | "legacy" | "python" | "python3" | "qt-extern"
            | "matplotlib" => return None,
            "boost" => return Some(self.probe_header_dependency("boost", "boost/version.hpp")),
            _ => {}
        }

        if let Some(fact) = self.probe_pkg_config(name) {
            return Some(fact);
        }

        Some(self.probe_tool_dependency(name))
    }

    /// Ask pkg-config about a dependency, when a module name is known.
    fn probe_pkg_config(&self, name: &str) -> Option<DependencyFact> {
        let module = PKG_CONFIG_NAMES
            .iter()
            .find(|(dep, _)| *dep == name)
            .map(|(_, module)| *module)?;
        let pkg_config = find_executable("pkg-config")?;

        let exists = ProcessBuilder::new(&pkg_config)
            .args(["--exists", module])
            .status()
            .map(|s| s.success())
            .unwrap_or(false);
        if !exists {
            return None;
        }

        let mut fact = DependencyFact::present(name);
        if let Ok(version) = ProcessBuilder::new(&pkg_config)
            .args(["--modversion", module])
            .exec_capture()
        {
            fact = fact.with_version(version);
        }
        if let Ok(prefix) = ProcessBuilder::new(&pkg_config)
            .args(["--variable=prefix", module])
            .exec_capture()
        {
            if !prefix.is_empty() {
                fact = fact.with_prefix(prefix);
            }
        }
        Some(fact)
    }

    /// Fall back to locating a marker executable for the dependency.
    fn probe_tool_dependency(&self, name: &str) -> DependencyFact {
        let tool = TOOL_NAMES
            .iter()
            .find(|(dep, _)| *dep == name)
            .map(|(_, tool)| *tool);

        match tool.and_then(find_executable) {
            Some(path) => {
                // bin/<tool> -> installation prefix
                let prefix = path.parent().and_then(Path::parent).map(Path::to_path_buf);
                let mut fact = DependencyFact::present(name);
                if let Some(prefix) = prefix {
                    fact = fact.with_prefix(prefix);
                }
                fact
            }
            None => DependencyFact::absent(name),
        }
    }

    /// Locate a header-only dependency by scanning common prefixes.
    fn probe_header_dependency(&self, name: &str, marker: &str) -> DependencyFact {
        for prefix in HEADER_PREFIXES {
            let header = Path::new(prefix).join("include").join(marker);
            if header.exists() {
                return DependencyFact::present(name).with_prefix(*prefix);
            }
        }
        DependencyFact::absent(name)
    }

    /// Introspect an interpreter installation.
    ///
    /// Mirrors what the build itself will ask of the interpreter: its
    /// prefix, public include directory, and `major.minor` version. Any
    /// failure along the way means the runtime is treated as absent.
    fn probe_runtime(&self, interpreter: &str) -> Option<RuntimeFacts> {
        let executable = find_executable(interpreter)?;

        let prefix = self
            .python_eval(&executable, "import sys;print(sys.prefix)")
            .ok()?;
        let include_dir = self
            .python_eval(
                &executable,
                "import sysconfig;print(sysconfig.get_paths()['include'])",
            )
            .ok()?;
        let version = self
            .python_eval(
                &executable,
                "import sys;print('%d.%d' % sys.version_info[:2])",
            )
            .ok()?;

        let prefix = PathBuf::from(prefix);
        let existing_files = self.existing_library_candidates(&prefix, &version);

        Some(RuntimeFacts {
            executable,
            prefix,
            include_dir: PathBuf::from(include_dir),
            version,
            existing_files,
        })
    }

    /// Expand the configured library templates and keep those that exist.
    fn existing_library_candidates(&self, prefix: &Path, version: &str) -> BTreeSet<PathBuf> {
        self.naming
            .library_templates
            .iter()
            .map(|template| expand_template(template, prefix, version))
            .filter(|path| path.exists())
            .collect()
    }

    /// Check for matplotlib by importing it in the detected runtime.
    fn probe_matplotlib(&self, runtime: Option<&RuntimeFacts>) -> DependencyFact {
        let Some(rt) = runtime else {
            return DependencyFact::absent("matplotlib");
        };

        match self.python_eval(
            &rt.executable,
            "import matplotlib;print(matplotlib.__version__)",
        ) {
            Ok(version) => DependencyFact::present("matplotlib").with_version(version),
            Err(_) => DependencyFact::absent("matplotlib"),
        }
    }

    fn python_eval(&self, executable: &Path, snippet: &str) -> Result<String> {
        ProcessBuilder::new(executable)
            .args(["-c", snippet])
            .exec_capture()
    }

    /// Whether a full compiler suite is installed.
    ///
    /// On macOS this distinguishes a command-line-tools installation from
    /// an IDE-only one; everywhere else a working compiler is assumed to
    /// come with its headers.
    fn compiler_suite_installed(&self, os: OsKind) -> bool {
        if os != OsKind::Macos {
            return true;
        }

        if Path::new("/Library/Developer/CommandLineTools/usr/bin/clang").exists() {
            return true;
        }

        find_executable("xcode-select")
            .map(|tool| {
                ProcessBuilder::new(tool)
                    .arg("-p")
                    .status()
                    .map(|s| s.success())
                    .unwrap_or(false)
            })
            .unwrap_or(false)
    }

    /// Platform SDK root, for header-path flags on IDE-only hosts.
    fn sdk_path(&self, os: OsKind) -> Option<PathBuf> {
        if os != OsKind::Macos {
            return None;
        }

        let xcrun = find_executable("xcrun")?;
        ProcessBuilder::new(xcrun)
            .args(["--show-sdk-path"])
            .exec_capture()
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
    }
}

/// Expand `{prefix}` and `{version}` placeholders in a library template.
pub fn expand_template(template: &str, prefix: &Path, version: &str) -> PathBuf {
    let expanded = template
        .replace("{prefix}", &prefix.to_string_lossy())
        .replace("{version}", version);
    PathBuf::from(expanded)
}
