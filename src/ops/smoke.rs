//! Post-install smoke test.
//!
//! Compiles and runs a minimal consumer program against the installed
//! artifact, asserting on the two version constants it exposes. This is
//! an acceptance check on the whole install, not on any single flag: if
//! the resolver emitted a working configuration, this program builds,
//! links, and exits zero.

use std::path::Path;

use anyhow::{bail, Context, Result};
use tempfile::TempDir;

use crate::recipe::Recipe;
use crate::util::diagnostic::suggestions;
use crate::util::fs::write_string;
use crate::util::process::{find_cmake, ProcessBuilder};
use crate::util::shell::{Shell, Status};

/// Build and run the version-check consumer program.
pub fn smoke_test(recipe: &Recipe, prefix: &Path, shell: &Shell) -> Result<()> {
    let Some(cmake) = find_cmake() else {
        bail!(
            "CMake not found; cannot build the smoke-test program\n\n{}",
            suggestions::NO_CMAKE
        );
    };

    let workspace = TempDir::new().context("failed to create smoke-test workspace")?;

    write_string(
        &workspace.path().join("Version.cpp"),
        &version_check_source(recipe),
    )?;
    write_string(
        &workspace.path().join("CMakeLists.txt"),
        CONSUMER_CMAKELISTS,
    )?;

    shell.status(Status::Testing, format!("{} {}", recipe.name, recipe.version));

    let build_dir = workspace.path().join("build");
    ProcessBuilder::new(&cmake)
        .arg("-S")
        .arg(workspace.path())
        .arg("-B")
        .arg(&build_dir)
        .arg(format!("-DCMAKE_PREFIX_PATH={}", prefix.display()))
        .exec_and_check()
        .context("smoke-test configure failed")?;

    ProcessBuilder::new(&cmake)
        .arg("--build")
        .arg(&build_dir)
        .exec_and_check()
        .context("smoke-test build failed")?;

    let binary = build_dir.join("Version");
    let status = ProcessBuilder::new(&binary)
        .status()
        .context("failed to run the smoke-test program")?;

    if !status.success() {
        bail!(
            "smoke test failed: version constants did not match {}.{}",
            recipe.version.major,
            recipe.version.minor
        );
    }

    shell.status(Status::Finished, "smoke test passed");
    Ok(())
}

/// The consumer program, parameterized on the recipe's version.
fn version_check_source(recipe: &Recipe) -> String {
    format!(
        r#"#include <vtkVersion.h>
#include <assert.h>
#include <stdlib.h>
int main(int, char *[])
{{
  assert (vtkVersion::GetVTKMajorVersion()=={major});
  assert (vtkVersion::GetVTKMinorVersion()=={minor});
  return EXIT_SUCCESS;
}}
"#,
        major = recipe.version.major,
        minor = recipe.version.minor
    )
}

const CONSUMER_CMAKELISTS: &str = r#"cmake_minimum_required(VERSION 3.10)
project(Version)
find_package(VTK REQUIRED)
include(${VTK_USE_FILE})
add_executable(Version Version.cpp)
target_link_libraries(Version ${VTK_LIBRARIES})
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_check_source_uses_recipe_version() {
        let source = version_check_source(&Recipe::vtk());
        assert!(source.contains("GetVTKMajorVersion()==7"));
        assert!(source.contains("GetVTKMinorVersion()==0"));
    }

    #[test]
    fn test_consumer_cmakelists_links_vtk() {
        assert!(CONSUMER_CMAKELISTS.contains("find_package(VTK REQUIRED)"));
        assert!(CONSUMER_CMAKELISTS.contains("target_link_libraries"));
    }
}
