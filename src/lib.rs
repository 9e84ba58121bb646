//! Slipway - a recipe-driven build and install tool for the VTK
//! visualization toolkit.
//!
//! This crate provides the core library functionality for Slipway: the
//! pure build-configuration resolver, the host probe that feeds it, and
//! the fetch/build/install/patch pipeline around it.

pub mod builder;
pub mod ops;
pub mod patcher;
pub mod probe;
pub mod recipe;
pub mod resolver;
pub mod sources;
pub mod util;

pub use probe::{DependencyFact, HostFacts, RuntimeFacts};
pub use recipe::{OptionSet, Recipe};
pub use resolver::{resolve, BuildFlag, Resolution, ResolveError};
pub use util::config::Config;
