//! The conditional build-configuration resolver.
//!
//! `resolve` turns a recipe, the user's option tokens, and a probed host
//! snapshot into the ordered list of build definitions, or fails with a
//! [`ResolveError`] before any external process would run. It is a pure
//! function of its inputs: calling it twice with the same arguments
//! yields byte-identical output, which is what makes `slipway resolve`
//! a safe dry-run.

pub mod errors;
pub mod flags;

use std::path::PathBuf;

pub use errors::ResolveError;
pub use flags::{BuildFlag, FlagGroup, FlagSet};

use crate::probe::{HostFacts, RuntimeFacts};
use crate::recipe::{OptionSet, Recipe, ResolvedOptions};
use crate::util::config::NamingConfig;

/// Which interpreter major version the build wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeMajor {
    Python2,
    Python3,
}

impl RuntimeMajor {
    /// The dependency/option name for this runtime.
    pub fn feature(&self) -> &'static str {
        match self {
            RuntimeMajor::Python2 => "python",
            RuntimeMajor::Python3 => "python3",
        }
    }
}

/// Successful resolution output.
#[derive(Debug)]
pub struct Resolution {
    /// Ordered, duplicate-free build definitions
    pub flags: Vec<BuildFlag>,

    /// Non-fatal notices gathered along the way (alias rewrites,
    /// override replacements); logged by the caller, never aborting
    pub warnings: Vec<String>,

    /// Post-install notes for the user
    pub caveats: Vec<String>,

    /// Which runtime the build wraps, if any (drives the post-install
    /// patch decision)
    pub python_wrapped: Option<RuntimeMajor>,
}

impl Resolution {
    /// Render all flags as `-DKEY=VALUE` strings.
    pub fn rendered_flags(&self) -> Vec<String> {
        self.flags.iter().map(BuildFlag::render).collect()
    }
}

/// Resolve build configuration for one invocation.
///
/// `overrides` are explicit user `--define KEY=VALUE` pairs; they are the
/// only way a flag value may be replaced after the resolver emits it.
pub fn resolve(
    recipe: &Recipe,
    options: &OptionSet,
    facts: &HostFacts,
    naming: &NamingConfig,
    overrides: &[(String, String)],
) -> Result<Resolution, ResolveError> {
    // Step 1: alias normalization, then fold tokens into feature states.
    let (normalized, mut warnings) = options.normalize(&recipe.deprecated_options);
    let (states, fold_warnings) = normalized.feature_states();
    warnings.extend(fold_warnings);
    let opts = ResolvedOptions::new(states, &recipe.options);

    // Step 2: mutual exclusions, caught before anything is emitted.
    if opts.with("qt") && opts.with("qt5") {
        return Err(ResolveError::ConflictingToolkits {
            first: "with-qt".to_string(),
            second: "with-qt5".to_string(),
        });
    }
    if opts.with("python") && opts.with("python3") {
        return Err(ResolveError::ConflictingRuntimes {
            first: "python".to_string(),
            second: "python3".to_string(),
        });
    }

    let mut set = FlagSet::new();
    let lib_dir = facts.lib_dir();

    emit_universal(&mut set, facts, &lib_dir)?;
    emit_features(&mut set, &opts, facts)?;
    emit_toolchain(&mut set, facts, &mut warnings)?;
    let python_wrapped = emit_runtime(&mut set, &opts, facts, naming, &lib_dir)?;

    // Explicit user overrides are the one sanctioned way to replace a
    // resolver-emitted value.
    for (key, value) in overrides {
        if let Some(warning) = set.apply_override(key, value) {
            warnings.push(warning);
        }
    }

    let caveats = build_caveats(&opts, facts, python_wrapped);

    Ok(Resolution {
        flags: set.into_flags(),
        warnings,
        caveats,
        python_wrapped,
    })
}

/// Flags emitted on every build, independent of options.
fn emit_universal(
    set: &mut FlagSet,
    facts: &HostFacts,
    lib_dir: &std::path::Path,
) -> Result<(), ResolveError> {
    let g = FlagGroup::Universal;
    set.insert(g, "CMAKE_BUILD_TYPE", "Release")?;
    set.insert(
        g,
        "CMAKE_INSTALL_PREFIX",
        facts.install_prefix.display().to_string(),
    )?;
    set.insert(g, "BUILD_SHARED_LIBS", "ON")?;
    set.insert(g, "VTK_REQUIRED_OBJCXX_FLAGS", "")?;
    set.insert(g, "CMAKE_INSTALL_RPATH", lib_dir.display().to_string())?;
    set.insert(g, "CMAKE_INSTALL_NAME_DIR", lib_dir.display().to_string())?;
    set.insert(g, "VTK_USE_SYSTEM_EXPAT", "ON")?;
    set.insert(g, "VTK_USE_SYSTEM_LIBXML2", "ON")?;
    set.insert(g, "VTK_USE_SYSTEM_ZLIB", "ON")?;
    Ok(())
}

/// Option-driven flags, in the recipe's declaration order.
fn emit_features(
    set: &mut FlagSet,
    opts: &ResolvedOptions,
    facts: &HostFacts,
) -> Result<(), ResolveError> {
    let g = FlagGroup::Feature;

    if opts.with("cxx11") {
        set.insert(g, "CMAKE_CXX_STANDARD", "11")?;
    }

    let examples = if opts.with("examples") { "ON" } else { "OFF" };
    set.insert(g, "BUILD_EXAMPLES", examples)?;
    set.insert(g, "BUILD_TESTING", examples)?;

    // GUI toolkit group. `qt-extern` points at an external toolkit the
    // probe cannot see, so only the probed variants get a presence check.
    if opts.with("qt") {
        require(facts, "qt", "`--with-qt`")?;
    }
    if opts.with("qt5") {
        require(facts, "qt5", "`--with-qt5`")?;
        set.insert(g, "VTK_QT_VERSION", "5")?;
    }
    if opts.with("qt") || opts.with("qt5") || opts.with("qt-extern") {
        set.insert(g, "VTK_Group_Qt", "ON")?;
    }

    if opts.with("tcl") {
        set.insert(g, "VTK_WRAP_TCL", "ON")?;
    }

    // Exactly one windowing backend, always.
    if opts.with("x11") {
        require(facts, "x11", "`--with-x11`")?;
        set.insert(g, "VTK_USE_X", "ON")?;
    } else {
        set.insert(g, "VTK_USE_COCOA", "ON")?;
    }

    if opts.with("boost") {
        require(facts, "boost", "`--with-boost` (default)")?;
        set.insert(g, "Module_vtkInfovisBoost", "ON")?;
        set.insert(g, "Module_vtkInfovisBoostGraphAlgorithms", "ON")?;
    }
    if opts.with("fontconfig") {
        require(facts, "fontconfig", "`--with-fontconfig` (default)")?;
        set.insert(g, "Module_vtkRenderingFreeTypeFontConfig", "ON")?;
    }
    if opts.with("hdf5") {
        require(facts, "hdf5", "`--with-hdf5` (default)")?;
        set.insert(g, "VTK_USE_SYSTEM_HDF5", "ON")?;
    }
    if opts.with("jpeg") {
        require(facts, "jpeg", "`--with-jpeg` (default)")?;
        set.insert(g, "VTK_USE_SYSTEM_JPEG", "ON")?;
    }
    if opts.with("libpng") {
        require(facts, "libpng", "`--with-libpng` (default)")?;
        set.insert(g, "VTK_USE_SYSTEM_PNG", "ON")?;
    }
    if opts.with("libtiff") {
        require(facts, "libtiff", "`--with-libtiff` (default)")?;
        set.insert(g, "VTK_USE_SYSTEM_TIFF", "ON")?;
    }
    if opts.with("matplotlib") {
        require(facts, "matplotlib", "`--with-matplotlib`")?;
        set.insert(g, "Module_vtkRenderingMatplotlib", "ON")?;
    }

    if opts.without("legacy") {
        set.insert(g, "VTK_LEGACY_REMOVE", "ON")?;
    }

    Ok(())
}

/// Header-path workarounds for IDE-only compiler installations.
///
/// Without the full compiler suite the build would pick up the bundled Tk
/// headers, which differ from the platform's; the probed SDK path points
/// at the real ones.
fn emit_toolchain(
    set: &mut FlagSet,
    facts: &HostFacts,
    warnings: &mut Vec<String>,
) -> Result<(), ResolveError> {
    if facts.compiler_suite_installed {
        return Ok(());
    }

    let Some(ref sdk) = facts.sdk_path else {
        warnings.push(
            "compiler suite not detected and no SDK path probed; \
             skipping explicit Tk header flags"
                .to_string(),
        );
        return Ok(());
    };

    let headers = sdk.join("System/Library/Frameworks/Tk.framework/Headers");
    set.insert(
        FlagGroup::Toolchain,
        "TK_INCLUDE_PATH",
        headers.display().to_string(),
    )?;
    set.insert(
        FlagGroup::Toolchain,
        "TK_INTERNAL_PATH",
        headers.join("tk-private").display().to_string(),
    )?;
    Ok(())
}

/// Interpreter-wrapping flags, including the derived binding-generator
/// requirements.
fn emit_runtime(
    set: &mut FlagSet,
    opts: &ResolvedOptions,
    facts: &HostFacts,
    naming: &NamingConfig,
    lib_dir: &std::path::Path,
) -> Result<Option<RuntimeMajor>, ResolveError> {
    let major = if opts.with("python") {
        RuntimeMajor::Python2
    } else if opts.with("python3") {
        RuntimeMajor::Python3
    } else {
        return Ok(None);
    };

    let runtime = match major {
        RuntimeMajor::Python2 => facts.python2.as_ref(),
        RuntimeMajor::Python3 => facts.python3.as_ref(),
    }
    .ok_or_else(|| ResolveError::MissingDependency {
        dependency: major.feature().to_string(),
        wanted_by: format!("`--with-{}`", major.feature()),
    })?;

    // Wrapping a toolkit together with a runtime implicitly requires the
    // two binding generators: the interface generator and the toolkit
    // variant matching the active toolkit major version.
    let toolkit_generator = if opts.with("qt") {
        Some("pyqt")
    } else if opts.with("qt5") {
        Some("pyqt5")
    } else {
        None
    };

    if let Some(generator) = toolkit_generator {
        let wanted_by = format!(
            "toolkit wrapping together with the {} runtime",
            major.feature()
        );
        require(facts, "sip", &wanted_by)?;
        require(facts, generator, &wanted_by)?;
    }

    let g = FlagGroup::Runtime;
    set.insert(g, "VTK_WRAP_PYTHON", "ON")?;
    set.insert(
        g,
        "PYTHON_EXECUTABLE",
        runtime.executable.display().to_string(),
    )?;
    set.insert(
        g,
        "PYTHON_INCLUDE_DIR",
        runtime.include_dir.display().to_string(),
    )?;
    set.insert(g, "PYTHON_LIBRARY", find_runtime_library(runtime, naming, major)?)?;

    let site_packages = lib_dir
        .join(format!("python{}", runtime.version))
        .join("site-packages");
    set.insert(
        g,
        "VTK_INSTALL_PYTHON_MODULE_DIR",
        site_packages.display().to_string(),
    )?;

    if let Some(generator) = toolkit_generator {
        set.insert(g, "VTK_WRAP_PYTHON_SIP", "ON")?;
        let generator_prefix = facts
            .dependency(generator)
            .and_then(|d| d.prefix.clone())
            .unwrap_or_else(|| facts.install_prefix.clone());
        set.insert(
            g,
            "SIP_PYQT_DIR",
            generator_prefix.join("share/sip").display().to_string(),
        )?;
    }

    Ok(Some(major))
}

/// Try the configured library candidates in order; first existing wins.
fn find_runtime_library(
    runtime: &RuntimeFacts,
    naming: &NamingConfig,
    major: RuntimeMajor,
) -> Result<String, ResolveError> {
    let mut searched = Vec::new();

    for template in &naming.library_templates {
        let candidate =
            crate::probe::system::expand_template(template, &runtime.prefix, &runtime.version);
        if runtime.file_exists(&candidate) {
            return Ok(candidate.display().to_string());
        }
        searched.push(candidate);
    }

    Err(ResolveError::RuntimeLibraryNotFound {
        runtime: major.feature().to_string(),
        searched,
    })
}

fn require(facts: &HostFacts, dependency: &str, wanted_by: &str) -> Result<(), ResolveError> {
    if facts.has(dependency) {
        Ok(())
    } else {
        Err(ResolveError::MissingDependency {
            dependency: dependency.to_string(),
            wanted_by: wanted_by.to_string(),
        })
    }
}

/// Post-success notes, mirroring what the install reports to the user.
fn build_caveats(
    opts: &ResolvedOptions,
    facts: &HostFacts,
    python_wrapped: Option<RuntimeMajor>,
) -> Vec<String> {
    let mut caveats = vec![
        "Even without the qt options, native render windows can be driven from \
         python; the RenderWindowInteractor also integrates with PyQt, PySide, \
         Tk or Wx at runtime."
            .to_string(),
    ];

    if opts.with("examples") {
        caveats.push(format!(
            "The scripting examples are installed under {}",
            facts.install_prefix.join("share/vtk").display()
        ));
    }

    if python_wrapped == Some(RuntimeMajor::Python2) {
        let which = if facts.packaged_python_linked {
            "the package manager's"
        } else {
            "the system's"
        };
        caveats.push(format!(
            "The build links against {} copy of Python. If you later switch Python \
             installations, re-run `slipway patch` to relink.",
            which
        ));
    }

    caveats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{DependencyFact, OsKind};
    use std::collections::{BTreeMap, BTreeSet};

    fn facts_with(deps: &[&str]) -> HostFacts {
        let mut dependencies = BTreeMap::new();
        for dep in deps {
            dependencies.insert(dep.to_string(), DependencyFact::present(*dep));
        }
        HostFacts {
            os: OsKind::Macos,
            dependencies,
            python2: Some(runtime("/usr/local/opt/python")),
            python3: None,
            compiler_suite_installed: true,
            sdk_path: None,
            install_prefix: PathBuf::from("/usr/local/Cellar/vtk/7.0.0"),
            packaged_python_linked: true,
        }
    }

    fn runtime(prefix: &str) -> RuntimeFacts {
        let prefix = PathBuf::from(prefix);
        let mut existing = BTreeSet::new();
        existing.insert(prefix.join("lib/libpython2.7.dylib"));
        RuntimeFacts {
            executable: prefix.join("bin/python"),
            prefix: prefix.clone(),
            include_dir: prefix.join("include/python2.7"),
            version: "2.7".to_string(),
            existing_files: existing,
        }
    }

    fn base_deps() -> Vec<&'static str> {
        vec!["boost", "fontconfig", "hdf5", "jpeg", "libpng", "libtiff"]
    }

    fn resolve_tokens(tokens: &[&str], facts: &HostFacts) -> Result<Resolution, ResolveError> {
        let recipe = Recipe::vtk();
        let options = OptionSet::from_tokens(tokens.iter().copied());
        resolve(&recipe, &options, facts, &NamingConfig::default(), &[])
    }

    #[test]
    fn test_conflicting_toolkits() {
        let facts = facts_with(&base_deps());
        let err = resolve_tokens(&["with-qt", "with-qt5"], &facts).unwrap_err();
        assert!(matches!(err, ResolveError::ConflictingToolkits { .. }));
    }

    #[test]
    fn test_conflicting_runtimes() {
        let facts = facts_with(&base_deps());
        let err = resolve_tokens(&["with-python", "with-python3"], &facts).unwrap_err();
        assert!(matches!(err, ResolveError::ConflictingRuntimes { .. }));
    }

    #[test]
    fn test_default_python_conflicts_with_python3() {
        // python defaults to enabled; enabling python3 without disabling
        // python is the same unsupported pair.
        let facts = facts_with(&base_deps());
        let err = resolve_tokens(&["with-python3"], &facts).unwrap_err();
        assert!(matches!(err, ResolveError::ConflictingRuntimes { .. }));
    }

    #[test]
    fn test_missing_dependency_named() {
        let mut deps = base_deps();
        deps.retain(|d| *d != "hdf5");
        let facts = facts_with(&deps);

        let err = resolve_tokens(&[], &facts).unwrap_err();
        match err {
            ResolveError::MissingDependency { dependency, .. } => {
                assert_eq!(dependency, "hdf5")
            }
            other => panic!("expected MissingDependency, got {:?}", other),
        }
    }

    #[test]
    fn test_exactly_one_windowing_flag() {
        let facts = facts_with(&base_deps());

        let cocoa = resolve_tokens(&[], &facts).unwrap();
        assert!(keys(&cocoa).contains(&"VTK_USE_COCOA"));
        assert!(!keys(&cocoa).contains(&"VTK_USE_X"));

        let mut deps = base_deps();
        deps.push("x11");
        let facts = facts_with(&deps);
        let x11 = resolve_tokens(&["with-x11"], &facts).unwrap();
        assert!(keys(&x11).contains(&"VTK_USE_X"));
        assert!(!keys(&x11).contains(&"VTK_USE_COCOA"));
    }

    #[test]
    fn test_qt_python_pulls_binding_generators() {
        let mut deps = base_deps();
        deps.extend(["qt", "sip", "pyqt"]);
        let facts = facts_with(&deps);

        let resolution = resolve_tokens(&["with-qt"], &facts).unwrap();
        let keys = keys(&resolution);
        assert!(keys.contains(&"VTK_Group_Qt"));
        assert!(keys.contains(&"VTK_WRAP_PYTHON"));
        assert!(keys.contains(&"VTK_WRAP_PYTHON_SIP"));
        assert!(keys.contains(&"SIP_PYQT_DIR"));
    }

    #[test]
    fn test_qt_python_missing_generator_fails() {
        let mut deps = base_deps();
        deps.extend(["qt", "sip"]); // pyqt absent
        let facts = facts_with(&deps);

        let err = resolve_tokens(&["with-qt"], &facts).unwrap_err();
        match err {
            ResolveError::MissingDependency { dependency, .. } => {
                assert_eq!(dependency, "pyqt")
            }
            other => panic!("expected MissingDependency, got {:?}", other),
        }
    }

    #[test]
    fn test_qt5_selects_pyqt5_variant() {
        let mut deps = base_deps();
        deps.extend(["qt5", "sip", "pyqt5"]);
        let facts = facts_with(&deps);

        let resolution = resolve_tokens(&["with-qt5"], &facts).unwrap();
        let keys = keys(&resolution);
        assert!(keys.contains(&"VTK_QT_VERSION"));
        assert!(keys.contains(&"SIP_PYQT_DIR"));
    }

    #[test]
    fn test_without_legacy_single_flag() {
        let facts = facts_with(&base_deps());
        let resolution = resolve_tokens(&["without-legacy"], &facts).unwrap();

        let legacy: Vec<_> = resolution
            .flags
            .iter()
            .filter(|f| f.key.contains("LEGACY"))
            .collect();
        assert_eq!(legacy.len(), 1);
        assert_eq!(legacy[0].key, "VTK_LEGACY_REMOVE");
        assert_eq!(legacy[0].value, "ON");
    }

    #[test]
    fn test_deprecated_alias_equivalent() {
        let facts = facts_with(&base_deps());

        let via_alias = resolve_tokens(&["examples"], &facts).unwrap();
        let via_canonical = resolve_tokens(&["with-examples"], &facts).unwrap();

        assert_eq!(via_alias.rendered_flags(), via_canonical.rendered_flags());
        assert!(via_alias
            .warnings
            .iter()
            .any(|w| w.contains("deprecated")));
    }

    #[test]
    fn test_idempotent() {
        let facts = facts_with(&base_deps());
        let a = resolve_tokens(&["with-examples", "without-legacy"], &facts).unwrap();
        let b = resolve_tokens(&["with-examples", "without-legacy"], &facts).unwrap();
        assert_eq!(a.rendered_flags(), b.rendered_flags());
    }

    #[test]
    fn test_no_duplicate_keys() {
        let mut deps = base_deps();
        deps.extend(["qt5", "sip", "pyqt5", "x11"]);
        let facts = facts_with(&deps);

        let resolution =
            resolve_tokens(&["with-qt5", "with-x11", "with-examples", "cxx11"], &facts).unwrap();

        let mut seen = BTreeSet::new();
        for flag in &resolution.flags {
            assert!(seen.insert(&flag.key), "duplicate key {}", flag.key);
        }
    }

    #[test]
    fn test_runtime_library_search_order() {
        let mut facts = facts_with(&base_deps());
        // Both the framework file and the dylib exist; the framework
        // template is listed first and must win.
        let rt = facts.python2.as_mut().unwrap();
        rt.existing_files.insert(rt.prefix.join("Python"));

        let resolution = resolve_tokens(&[], &facts).unwrap();
        let library = resolution
            .flags
            .iter()
            .find(|f| f.key == "PYTHON_LIBRARY")
            .unwrap();
        assert!(library.value.ends_with("/Python"));
    }

    #[test]
    fn test_runtime_library_not_found() {
        let mut facts = facts_with(&base_deps());
        facts.python2.as_mut().unwrap().existing_files.clear();

        let err = resolve_tokens(&[], &facts).unwrap_err();
        match err {
            ResolveError::RuntimeLibraryNotFound { searched, .. } => {
                assert!(!searched.is_empty())
            }
            other => panic!("expected RuntimeLibraryNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_toolchain_flags_without_compiler_suite() {
        let mut facts = facts_with(&base_deps());
        facts.compiler_suite_installed = false;
        facts.sdk_path = Some(PathBuf::from("/Applications/Xcode.app/sdk"));

        let resolution = resolve_tokens(&[], &facts).unwrap();
        let keys = keys(&resolution);
        assert!(keys.contains(&"TK_INCLUDE_PATH"));
        assert!(keys.contains(&"TK_INTERNAL_PATH"));
    }

    #[test]
    fn test_user_override_wins_with_warning() {
        let facts = facts_with(&base_deps());
        let recipe = Recipe::vtk();
        let options = OptionSet::new();
        let overrides = vec![("CMAKE_BUILD_TYPE".to_string(), "Debug".to_string())];

        let resolution = resolve(
            &recipe,
            &options,
            &facts,
            &NamingConfig::default(),
            &overrides,
        )
        .unwrap();

        let build_type = resolution
            .flags
            .iter()
            .find(|f| f.key == "CMAKE_BUILD_TYPE")
            .unwrap();
        assert_eq!(build_type.value, "Debug");
        assert!(resolution
            .warnings
            .iter()
            .any(|w| w.contains("user override")));
    }

    #[test]
    fn test_resolution_is_side_effect_free_on_error() {
        // A failing resolve returns before producing any flags at all.
        let facts = facts_with(&[]);
        let err = resolve_tokens(&[], &facts);
        assert!(err.is_err());
    }

    fn keys(resolution: &Resolution) -> Vec<&str> {
        resolution.flags.iter().map(|f| f.key.as_str()).collect()
    }
}
