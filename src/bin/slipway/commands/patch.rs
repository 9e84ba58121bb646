//! `slipway patch` - re-run the post-install relink.
//!
//! Useful after switching the active python installation: the installed
//! libraries still reference the previous one until relinked.

use anyhow::Result;

use slipway::patcher::{self, LinkPatcher};
use slipway::probe::SystemProbe;
use slipway::recipe::Recipe;
use slipway::resolver::RuntimeMajor;
use slipway::util::config::load_user_config;
use slipway::util::shell::{Shell, Status};

use crate::cli::PatchArgs;

pub fn execute(args: PatchArgs, shell: &Shell) -> Result<()> {
    let config = load_user_config();
    let probe = SystemProbe::new(config.naming.clone());
    let facts = probe.facts(&Recipe::vtk(), args.prefix.clone())?;

    let Some(plan) = patcher::plan(&facts, Some(RuntimeMajor::Python2)) else {
        shell.status(Status::Skipped, "no relink applicable on this host");
        return Ok(());
    };

    shell.status(
        Status::Patching,
        format!("{} => {}", plan.from.display(), plan.to.display()),
    );

    let patcher = LinkPatcher::new(plan)?;
    let rewrites = patcher.patch_tree(&args.prefix)?;

    shell.status(Status::Finished, format!("rewrote {} load commands", rewrites));
    Ok(())
}
