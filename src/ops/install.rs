//! Implementation of `slipway install` and the `resolve` dry-run.
//!
//! The pipeline is strictly ordered: resolve first (pure, no side
//! effects), and only on success fetch, build, install, and finally the
//! conditional post-install relink. A resolution failure therefore never
//! leaves partial state behind.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::builder::{is_cmake_project, source_root, CMakeBuilder};
use crate::patcher::{self, LinkPatcher};
use crate::probe::{HostFacts, SystemProbe};
use crate::recipe::{OptionSet, Recipe};
use crate::resolver::{resolve, Resolution};
use crate::sources::SourceFetcher;
use crate::util::config::load_user_config;
use crate::util::diagnostic::emit;
use crate::util::shell::{Shell, Status};

/// Options for the install pipeline.
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Raw option tokens (`with-qt`, `without-python`, deprecated
    /// spellings included)
    pub tokens: Vec<String>,

    /// Explicit user `KEY=VALUE` definition overrides
    pub defines: Vec<(String, String)>,

    /// Installation prefix
    pub prefix: PathBuf,

    /// Recipe file to use instead of the built-in VTK recipe
    pub recipe_path: Option<PathBuf>,

    /// Number of parallel build jobs
    pub jobs: Option<usize>,

    /// Skip the post-install relink step
    pub no_patch: bool,
}

/// Load the recipe named by the options.
fn load_recipe(options: &InstallOptions) -> Result<Recipe> {
    match &options.recipe_path {
        Some(path) => Recipe::from_path(path),
        None => Ok(Recipe::vtk()),
    }
}

/// Probe the host and run the resolver; no side effects.
///
/// This is the whole of the `resolve` dry-run command, and the first
/// phase of `install`.
pub fn resolve_only(
    options: &InstallOptions,
    shell: &Shell,
) -> Result<(Recipe, HostFacts, Resolution)> {
    let config = load_user_config();
    let recipe = load_recipe(options)?;

    shell.status(Status::Resolving, format!("{} {}", recipe.name, recipe.version));

    let probe = SystemProbe::new(config.naming.clone());
    let facts = probe.facts(&recipe, options.prefix.clone())?;

    let option_set = OptionSet::from_tokens(options.tokens.iter().cloned());
    let resolution = match resolve(&recipe, &option_set, &facts, &config.naming, &options.defines)
    {
        Ok(resolution) => resolution,
        Err(e) => {
            emit(&e.to_diagnostic(), shell.use_color());
            bail!("configuration resolution failed");
        }
    };

    for warning in &resolution.warnings {
        shell.warn(warning);
    }

    Ok((recipe, facts, resolution))
}

/// Run the full install pipeline.
pub fn install(options: InstallOptions, shell: &Shell) -> Result<()> {
    let config = load_user_config();
    let (recipe, facts, resolution) = resolve_only(&options, shell)?;

    let cache_dir = config.cache_dir()?;
    let fetcher = SourceFetcher::new(cache_dir);

    let archive = fetcher.fetch(&recipe, shell)?;

    shell.status(Status::Extracting, archive.display());
    let extract_dir = fetcher.extract(&recipe, &archive)?;
    let source_dir = source_root(&extract_dir)?;
    if !is_cmake_project(&source_dir) {
        bail!(
            "extracted source at {} has no CMakeLists.txt",
            source_dir.display()
        );
    }

    shell.status(Status::Configuring, source_dir.display());
    let builder = CMakeBuilder::new(
        source_dir,
        extract_dir.join("build"),
        &resolution.flags,
    )?
    .jobs(options.jobs);

    builder.configure()?;
    shell.status(Status::Building, format!("{} {}", recipe.name, recipe.version));
    builder.compile()?;
    shell.status(Status::Installing, options.prefix.display());
    builder.install()?;

    if !options.no_patch {
        run_patch_step(&facts, &resolution, shell)?;
    }

    shell.status(
        Status::Installed,
        format!("{} {} to {}", recipe.name, recipe.version, options.prefix.display()),
    );

    for caveat in &resolution.caveats {
        shell.note(caveat);
    }

    Ok(())
}

/// Conditionally relink installed libraries against the active runtime.
fn run_patch_step(facts: &HostFacts, resolution: &Resolution, shell: &Shell) -> Result<()> {
    let Some(plan) = patcher::plan(facts, resolution.python_wrapped) else {
        tracing::debug!("no post-install patch applicable");
        return Ok(());
    };

    shell.status(
        Status::Patching,
        format!("{} => {}", plan.from.display(), plan.to.display()),
    );

    let patcher = LinkPatcher::new(plan)?;
    let rewrites = patcher
        .patch_tree(&facts.install_prefix)
        .context("post-install relink failed")?;

    tracing::info!("rewrote {} load commands", rewrites);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_recipe_default_is_vtk() {
        let options = InstallOptions::default();
        let recipe = load_recipe(&options).unwrap();
        assert_eq!(recipe.name, "vtk");
    }

    #[test]
    fn test_load_recipe_from_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("recipe.toml");
        let toml_str = toml::to_string(&Recipe::vtk()).unwrap();
        std::fs::write(&path, toml_str).unwrap();

        let options = InstallOptions {
            recipe_path: Some(path),
            ..Default::default()
        };
        let recipe = load_recipe(&options).unwrap();
        assert_eq!(recipe.name, "vtk");
    }

    #[test]
    fn test_load_recipe_missing_file_errors() {
        let options = InstallOptions {
            recipe_path: Some(PathBuf::from("/nonexistent/recipe.toml")),
            ..Default::default()
        };
        assert!(load_recipe(&options).is_err());
    }
}
