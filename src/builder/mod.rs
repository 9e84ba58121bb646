//! Build executor: drives CMake over the extracted source tree.
//!
//! The executor is deliberately thin. All decision logic happened in the
//! resolver by the time a `CMakeBuilder` exists; this module only turns
//! the resolved definitions into configure/build/install invocations and
//! reports external failures verbatim.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::resolver::BuildFlag;
use crate::util::diagnostic::suggestions;
use crate::util::fs::ensure_dir;
use crate::util::process::{find_cmake, ProcessBuilder};

/// CMake build executor.
pub struct CMakeBuilder {
    cmake: PathBuf,
    source_dir: PathBuf,
    build_dir: PathBuf,
    definitions: Vec<String>,
    jobs: Option<usize>,
}

impl CMakeBuilder {
    /// Create a new executor for a configured source tree.
    pub fn new(source_dir: PathBuf, build_dir: PathBuf, flags: &[BuildFlag]) -> Result<Self> {
        let Some(cmake) = find_cmake() else {
            bail!("CMake not found\n\n{}", suggestions::NO_CMAKE);
        };

        Ok(CMakeBuilder {
            cmake,
            source_dir,
            build_dir,
            definitions: flags.iter().map(BuildFlag::render).collect(),
            jobs: None,
        })
    }

    /// Limit build parallelism.
    pub fn jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs;
        self
    }

    /// Configure, build, and install.
    pub fn run(&self) -> Result<()> {
        ensure_dir(&self.build_dir)?;
        self.configure()?;
        self.compile()?;
        self.install()
    }

    /// Run CMake configuration with the resolved definitions.
    pub fn configure(&self) -> Result<()> {
        tracing::info!("Configuring {}", self.source_dir.display());

        let mut cmd = ProcessBuilder::new(&self.cmake)
            .arg("-S")
            .arg(&self.source_dir)
            .arg("-B")
            .arg(&self.build_dir);

        for definition in &self.definitions {
            cmd = cmd.arg(definition);
        }

        let output = cmd.exec()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("CMake configuration failed:\n{}", stderr);
        }

        Ok(())
    }

    /// Run the build step.
    pub fn compile(&self) -> Result<()> {
        tracing::info!("Building in {}", self.build_dir.display());

        let mut cmd = ProcessBuilder::new(&self.cmake)
            .arg("--build")
            .arg(&self.build_dir);

        match self.jobs {
            Some(jobs) => cmd = cmd.arg("--parallel").arg(jobs.to_string()),
            None => cmd = cmd.arg("--parallel"),
        }

        let output = cmd.exec()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("build failed:\n{}", stderr);
        }

        Ok(())
    }

    /// Run the install step.
    pub fn install(&self) -> Result<()> {
        tracing::info!("Installing from {}", self.build_dir.display());

        let output = ProcessBuilder::new(&self.cmake)
            .arg("--install")
            .arg(&self.build_dir)
            .exec()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("install failed:\n{}", stderr);
        }

        Ok(())
    }

    /// The definitions this executor will pass to configure.
    pub fn definitions(&self) -> &[String] {
        &self.definitions
    }
}

/// Check if a directory contains a CMake project.
pub fn is_cmake_project(dir: &Path) -> bool {
    dir.join("CMakeLists.txt").exists()
}

/// Locate the single top-level source directory inside an extraction dir.
///
/// Release tarballs unpack to `NAME-VERSION/`; when exactly one directory
/// is present it is the source root, otherwise the extraction dir itself
/// is used.
pub fn source_root(extract_dir: &Path) -> Result<PathBuf> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(extract_dir)
        .with_context(|| format!("failed to read {}", extract_dir.display()))?
    {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }

    match dirs.as_slice() {
        [single] => Ok(single.clone()),
        _ => Ok(extract_dir.to_path_buf()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_is_cmake_project() {
        let tmp = TempDir::new().unwrap();

        assert!(!is_cmake_project(tmp.path()));

        std::fs::write(
            tmp.path().join("CMakeLists.txt"),
            "cmake_minimum_required(VERSION 3.10)",
        )
        .unwrap();

        assert!(is_cmake_project(tmp.path()));
    }

    #[test]
    fn test_source_root_single_dir() {
        let tmp = TempDir::new().unwrap();
        let inner = tmp.path().join("VTK-7.0.0");
        std::fs::create_dir(&inner).unwrap();

        assert_eq!(source_root(tmp.path()).unwrap(), inner);
    }

    #[test]
    fn test_source_root_flat_layout() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("CMakeLists.txt"), "").unwrap();

        assert_eq!(source_root(tmp.path()).unwrap(), tmp.path());
    }
}
