//! Post-install dynamic-library relinking.
//!
//! The wrapped build links its libraries directly against the interpreter
//! it was configured with. On platforms with install-name linking that
//! reference breaks whenever the active interpreter installation changes,
//! so after install the affected load commands are rewritten to point at
//! the currently linked installation. The decision of *whether* to patch
//! and in which direction is pure; only the rewrite itself touches the
//! filesystem.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::probe::HostFacts;
use crate::resolver::RuntimeMajor;
use crate::util::process::{find_install_name_tool, find_otool, ProcessBuilder};

/// The system interpreter framework location on install-name platforms.
const SYSTEM_PYTHON_FRAMEWORK: &str = "/System/Library/Frameworks/Python.framework";

/// A decided patch: rewrite load commands starting with `from` to `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchPlan {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// Decide whether a post-install patch is needed and with what arguments.
///
/// Returns `None` when no patch applies: non-install-name platform, no
/// python wrapping, or a non-framework interpreter build that has nothing
/// to rewrite.
pub fn plan(facts: &HostFacts, python_wrapped: Option<RuntimeMajor>) -> Option<PatchPlan> {
    if !facts.os.uses_install_names() {
        return None;
    }
    if python_wrapped != Some(RuntimeMajor::Python2) {
        return None;
    }

    let runtime = facts.python2.as_ref()?;
    let packaged = framework_root(&runtime.prefix)?;
    let system = PathBuf::from(SYSTEM_PYTHON_FRAMEWORK);

    if facts.packaged_python_linked {
        Some(PatchPlan {
            from: system,
            to: packaged,
        })
    } else {
        Some(PatchPlan {
            from: packaged,
            to: system,
        })
    }
}

/// Walk up from `sys.prefix` to the enclosing `Python.framework` root.
fn framework_root(prefix: &Path) -> Option<PathBuf> {
    prefix
        .ancestors()
        .find(|p| p.file_name().map(|n| n == "Python.framework").unwrap_or(false))
        .map(Path::to_path_buf)
}

/// Rewrites dynamic-library load commands under an install prefix.
pub struct LinkPatcher {
    plan: PatchPlan,
    otool: PathBuf,
    install_name_tool: PathBuf,
}

impl LinkPatcher {
    /// Create a patcher, verifying the platform tools exist.
    pub fn new(plan: PatchPlan) -> Result<Self> {
        let otool = find_otool().context("otool not found; cannot inspect load commands")?;
        let install_name_tool = find_install_name_tool()
            .context("install_name_tool not found; cannot rewrite load commands")?;

        Ok(LinkPatcher {
            plan,
            otool,
            install_name_tool,
        })
    }

    /// Patch every dynamic library under `root`; returns rewrite count.
    pub fn patch_tree(&self, root: &Path) -> Result<usize> {
        let mut rewrites = 0;

        for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let is_dylib = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e == "dylib" || e == "so")
                .unwrap_or(false);
            if !is_dylib {
                continue;
            }

            rewrites += self.patch_file(path)?;
        }

        Ok(rewrites)
    }

    /// Rewrite matching load commands in one file.
    fn patch_file(&self, file: &Path) -> Result<usize> {
        let output = ProcessBuilder::new(&self.otool)
            .arg("-L")
            .arg(file)
            .exec_and_check()?;
        let listing = String::from_utf8_lossy(&output.stdout).into_owned();

        let mut rewrites = 0;
        for old_name in parse_load_commands(&listing) {
            if !old_name.starts_with(&*self.plan.from.to_string_lossy()) {
                continue;
            }

            let new_name = old_name.replacen(
                &*self.plan.from.to_string_lossy(),
                &self.plan.to.to_string_lossy(),
                1,
            );
            tracing::debug!("{}: {} => {}", file.display(), old_name, new_name);

            ProcessBuilder::new(&self.install_name_tool)
                .arg("-change")
                .arg(&old_name)
                .arg(&new_name)
                .arg(file)
                .exec_and_check()?;
            rewrites += 1;
        }

        Ok(rewrites)
    }
}

/// Parse `otool -L` output into load-command paths.
///
/// The first line names the inspected file; each following indented line
/// is `<path> (compatibility version ...)`.
pub fn parse_load_commands(listing: &str) -> Vec<String> {
    listing
        .lines()
        .filter(|line| line.starts_with('\t') || line.starts_with("    "))
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}
