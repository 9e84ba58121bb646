//! Ordered build-flag accumulation.
//!
//! Flags are collected into stable groups (universal, feature, toolchain,
//! runtime, user overrides) so the final list is human-diffable. The set
//! enforces the no-duplicate invariant: a key inserted twice by resolver
//! logic is a defect and surfaces as an error, while an explicit user
//! override may replace an existing value, with a warning.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::resolver::errors::ResolveError;

/// A single key/value build definition, rendered as `-DKEY=VALUE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildFlag {
    pub key: String,
    pub value: String,
}

impl BuildFlag {
    /// Create a flag.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        BuildFlag {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Render as a build-tool command-line definition.
    pub fn render(&self) -> String {
        format!("-D{}={}", self.key, self.value)
    }
}

impl fmt::Display for BuildFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// Output group a flag belongs to. Groups are emitted in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FlagGroup {
    /// Always-emitted flags independent of any option.
    Universal,
    /// Flags driven by options, in option declaration order.
    Feature,
    /// Compiler-suite workarounds.
    Toolchain,
    /// Interpreter-runtime flags.
    Runtime,
    /// Explicit user `--define` values that did not hit an existing key.
    Override,
}

const GROUP_ORDER: [FlagGroup; 5] = [
    FlagGroup::Universal,
    FlagGroup::Feature,
    FlagGroup::Toolchain,
    FlagGroup::Runtime,
    FlagGroup::Override,
];

/// Insert-once, grouped flag accumulator.
#[derive(Debug, Default)]
pub struct FlagSet {
    groups: BTreeMap<FlagGroup, Vec<BuildFlag>>,
    index: BTreeMap<String, FlagGroup>,
}

impl FlagSet {
    /// Create an empty set.
    pub fn new() -> Self {
        FlagSet::default()
    }

    /// Insert a resolver-emitted flag.
    ///
    /// A key already present means two resolver paths emitted the same
    /// flag, which is a logic defect, not something to paper over.
    pub fn insert(
        &mut self,
        group: FlagGroup,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), ResolveError> {
        let flag = BuildFlag::new(key, value);

        if self.index.contains_key(&flag.key) {
            return Err(ResolveError::DuplicateFlag { key: flag.key });
        }

        self.index.insert(flag.key.clone(), group);
        self.groups.entry(group).or_default().push(flag);
        Ok(())
    }

    /// Apply an explicit user override.
    ///
    /// Replaces an existing value in place (returning a warning message)
    /// or appends to the override group.
    pub fn apply_override(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<String> {
        let flag = BuildFlag::new(key, value);

        if let Some(group) = self.index.get(&flag.key).copied() {
            let flags = self.groups.entry(group).or_default();
            if let Some(existing) = flags.iter_mut().find(|f| f.key == flag.key) {
                let warning = format!(
                    "user override replaces `{}={}` with `{}`",
                    existing.key, existing.value, flag.value
                );
                existing.value = flag.value;
                return Some(warning);
            }
        }

        self.index.insert(flag.key.clone(), FlagGroup::Override);
        self.groups
            .entry(FlagGroup::Override)
            .or_default()
            .push(flag);
        None
    }

    /// Whether a key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Number of flags across all groups.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Flatten into the final ordered list.
    pub fn into_flags(mut self) -> Vec<BuildFlag> {
        let mut flags = Vec::with_capacity(self.index.len());
        for group in GROUP_ORDER {
            if let Some(group_flags) = self.groups.remove(&group) {
                flags.extend(group_flags);
            }
        }
        flags
    }
}
