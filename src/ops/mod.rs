//! High-level operations behind the CLI commands.

pub mod install;
pub mod smoke;

pub use install::{install, resolve_only, InstallOptions};
pub use smoke::smoke_test;
