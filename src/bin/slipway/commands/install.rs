//! `slipway install` - the full pipeline.

use anyhow::Result;

use slipway::ops::{install, InstallOptions};
use slipway::util::Shell;

use crate::cli::InstallArgs;
use crate::commands::parse_define;

pub fn execute(args: InstallArgs, shell: &Shell) -> Result<()> {
    let defines = args
        .defines
        .iter()
        .map(|d| parse_define(d))
        .collect::<Result<Vec<_>>>()?;

    let options = InstallOptions {
        tokens: args.features.tokens(),
        defines,
        prefix: args.prefix,
        recipe_path: args.recipe,
        jobs: args.jobs,
        no_patch: args.no_patch,
    };

    install(options, shell)
}
