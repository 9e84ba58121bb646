//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Slipway - a recipe-driven build and install tool for the VTK
/// visualization toolkit
#[derive(Parser)]
#[command(name = "slipway")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress status output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch, build, and install the recipe
    Install(InstallArgs),

    /// Resolve build configuration without building (dry run)
    Resolve(ResolveArgs),

    /// Report detected dependencies, runtimes, and toolchain state
    Probe(ProbeArgs),

    /// Build and run the post-install version smoke test
    Test(TestArgs),

    /// Re-run the post-install library relink step
    Patch(PatchArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Feature-selection flags shared by install and resolve.
///
/// Each flag contributes a raw option token; deprecated spellings are
/// accepted as hidden flags and rewritten (with a warning) during
/// resolution.
#[derive(Args, Debug, Default)]
pub struct FeatureArgs {
    /// Build using C++11 mode
    #[arg(long)]
    pub cxx11: bool,

    /// Compile and install various examples
    #[arg(long = "with-examples")]
    pub with_examples: bool,

    /// Deprecated spelling of --with-examples
    #[arg(long = "examples", hide = true)]
    pub examples: bool,

    /// Enable Qt4 extension
    #[arg(long = "with-qt")]
    pub with_qt: bool,

    /// Enable Qt5 extension
    #[arg(long = "with-qt5")]
    pub with_qt5: bool,

    /// Enable Qt4 extension via an external Qt4 installation
    #[arg(long = "with-qt-extern")]
    pub with_qt_extern: bool,

    /// Deprecated spelling of --with-qt-extern
    #[arg(long = "qt-extern", hide = true)]
    pub qt_extern: bool,

    /// Enable Tcl wrapping of VTK classes
    #[arg(long = "with-tcl")]
    pub with_tcl: bool,

    /// Deprecated spelling of --with-tcl
    #[arg(long = "tcl", hide = true)]
    pub tcl: bool,

    /// Enable matplotlib support
    #[arg(long = "with-matplotlib")]
    pub with_matplotlib: bool,

    /// Use the X window system instead of Cocoa
    #[arg(long = "with-x11")]
    pub with_x11: bool,

    /// Enable python3 wrapping
    #[arg(long = "with-python3")]
    pub with_python3: bool,

    /// Build without python2 support
    #[arg(long = "without-python")]
    pub without_python: bool,

    /// Disable legacy APIs
    #[arg(long = "without-legacy")]
    pub without_legacy: bool,

    /// Deprecated spelling of --without-legacy
    #[arg(long = "remove-legacy", hide = true)]
    pub remove_legacy: bool,

    /// Skip a recommended dependency (repeatable, e.g. --without boost)
    #[arg(long = "without", value_name = "FEATURE")]
    pub without: Vec<String>,

    /// Request an additional feature by name (repeatable)
    #[arg(long = "with", value_name = "FEATURE")]
    pub with: Vec<String>,
}

impl FeatureArgs {
    /// Collect the raw option tokens in the order a user would read them.
    pub fn tokens(&self) -> Vec<String> {
        let mut tokens = Vec::new();
        let mut push_if = |enabled: bool, token: &str| {
            if enabled {
                tokens.push(token.to_string());
            }
        };

        push_if(self.cxx11, "cxx11");
        push_if(self.with_examples, "with-examples");
        push_if(self.examples, "examples");
        push_if(self.with_qt, "with-qt");
        push_if(self.with_qt5, "with-qt5");
        push_if(self.with_qt_extern, "with-qt-extern");
        push_if(self.qt_extern, "qt-extern");
        push_if(self.with_tcl, "with-tcl");
        push_if(self.tcl, "tcl");
        push_if(self.with_matplotlib, "with-matplotlib");
        push_if(self.with_x11, "with-x11");
        push_if(self.with_python3, "with-python3");
        push_if(self.without_python, "without-python");
        push_if(self.without_legacy, "without-legacy");
        push_if(self.remove_legacy, "remove-legacy");

        for feature in &self.with {
            tokens.push(format!("with-{}", feature));
        }
        for feature in &self.without {
            tokens.push(format!("without-{}", feature));
        }

        tokens
    }
}

#[derive(Args)]
pub struct InstallArgs {
    #[command(flatten)]
    pub features: FeatureArgs,

    /// Installation prefix
    #[arg(long, default_value = "/usr/local")]
    pub prefix: PathBuf,

    /// Recipe file to install instead of the built-in VTK recipe
    #[arg(long)]
    pub recipe: Option<PathBuf>,

    /// Explicit build definition override (KEY=VALUE, repeatable)
    #[arg(long = "define", value_name = "KEY=VALUE")]
    pub defines: Vec<String>,

    /// Number of parallel build jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Skip the post-install relink step
    #[arg(long)]
    pub no_patch: bool,
}

#[derive(Args)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub features: FeatureArgs,

    /// Installation prefix the flags should target
    #[arg(long, default_value = "/usr/local")]
    pub prefix: PathBuf,

    /// Recipe file to resolve instead of the built-in VTK recipe
    #[arg(long)]
    pub recipe: Option<PathBuf>,

    /// Explicit build definition override (KEY=VALUE, repeatable)
    #[arg(long = "define", value_name = "KEY=VALUE")]
    pub defines: Vec<String>,

    /// Emit the resolved flags as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ProbeArgs {
    /// Emit the probed facts as JSON
    #[arg(long)]
    pub json: bool,

    /// Installation prefix the facts should target
    #[arg(long, default_value = "/usr/local")]
    pub prefix: PathBuf,
}

#[derive(Args)]
pub struct TestArgs {
    /// Installation prefix the artifact was installed to
    #[arg(long, default_value = "/usr/local")]
    pub prefix: PathBuf,

    /// Recipe the artifact was built from
    #[arg(long)]
    pub recipe: Option<PathBuf>,
}

#[derive(Args)]
pub struct PatchArgs {
    /// Installation prefix holding the libraries to relink
    #[arg(long, default_value = "/usr/local")]
    pub prefix: PathBuf,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
