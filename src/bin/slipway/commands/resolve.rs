//! `slipway resolve` - dry-run flag preview.
//!
//! Runs the probe and the resolver but starts no build; the output is
//! exactly what `install` would pass to the build tool.

use anyhow::Result;

use slipway::ops::{resolve_only, InstallOptions};
use slipway::util::Shell;

use crate::cli::ResolveArgs;
use crate::commands::parse_define;

pub fn execute(args: ResolveArgs, shell: &Shell) -> Result<()> {
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
        jobs: None,
        no_patch: false,
    };

    let (_, _, resolution) = resolve_only(&options, shell)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&resolution.flags)?);
    } else {
        for flag in &resolution.flags {
            println!("{}", flag.render());
        }
    }

    Ok(())
}
