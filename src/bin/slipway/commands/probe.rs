//! `slipway probe` - host environment report.

use anyhow::Result;

use slipway::probe::SystemProbe;
use slipway::recipe::Recipe;
use slipway::util::config::load_user_config;
use slipway::util::Shell;

use crate::cli::ProbeArgs;

pub fn execute(args: ProbeArgs, shell: &Shell) -> Result<()> {
    let config = load_user_config();
    let recipe = Recipe::vtk();

    let probe = SystemProbe::new(config.naming.clone());
    let facts = probe.facts(&recipe, args.prefix)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&facts)?);
        return Ok(());
    }

    println!("os: {:?}", facts.os);
    println!("compiler suite installed: {}", facts.compiler_suite_installed);
    if let Some(ref sdk) = facts.sdk_path {
        println!("sdk path: {}", sdk.display());
    }

    println!("\ndependencies:");
    for (name, fact) in &facts.dependencies {
        let mark = if fact.present { "ok " } else { "-- " };
        let version = fact.version.as_deref().unwrap_or("");
        println!("  {}{:<12} {}", mark, name, version);
    }

    for (label, runtime) in [("python", &facts.python2), ("python3", &facts.python3)] {
        match runtime {
            Some(rt) => {
                println!("\n{}: {} ({})", label, rt.executable.display(), rt.version);
                println!("  prefix:  {}", rt.prefix.display());
                println!("  include: {}", rt.include_dir.display());
                if shell.is_verbose() {
                    for file in &rt.existing_files {
                        println!("  library candidate: {}", file.display());
                    }
                }
            }
            None => println!("\n{}: not found", label),
        }
    }

    Ok(())
}
