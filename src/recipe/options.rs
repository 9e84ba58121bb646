//! User-supplied option handling.
//!
//! Options arrive as raw tokens the way a package manager passes them on
//! the command line: `with-qt`, `without-python`, `cxx11`, plus deprecated
//! spellings like `examples`. Normalization rewrites deprecated tokens to
//! their canonical names, then tokens are folded into a tri-state map of
//! feature name to requested state. Defaults for unspecified features come
//! from the recipe's option declarations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Requested state for a single feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionState {
    /// Explicitly requested (`--with-X` or a bare switch).
    Enabled,
    /// Explicitly refused (`--without-X`).
    Disabled,
    /// Not mentioned; the recipe default applies.
    Unspecified,
}

/// A declared option in a recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionDecl {
    /// Feature name (without the `with-`/`without-` prefix)
    pub name: String,

    /// One-line description shown in help output
    #[serde(default)]
    pub help: String,

    /// Whether the feature is enabled when the user says nothing.
    ///
    /// Recommended dependencies default to enabled; optional ones to
    /// disabled.
    #[serde(default)]
    pub default_enabled: bool,
}

impl OptionDecl {
    /// Declare an option that defaults to disabled.
    pub fn optional(name: impl Into<String>, help: impl Into<String>) -> Self {
        OptionDecl {
            name: name.into(),
            help: help.into(),
            default_enabled: false,
        }
    }

    /// Declare an option that defaults to enabled.
    pub fn recommended(name: impl Into<String>, help: impl Into<String>) -> Self {
        OptionDecl {
            name: name.into(),
            help: help.into(),
            default_enabled: true,
        }
    }
}

/// The raw option tokens supplied for one invocation.
///
/// Tokens keep their user-facing spelling (including deprecated aliases)
/// so that alias rewriting happens in exactly one place, with a warning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionSet {
    tokens: Vec<String>,
}

impl OptionSet {
    /// Create an empty option set.
    pub fn new() -> Self {
        OptionSet::default()
    }

    /// Create an option set from raw tokens.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = OptionSet::new();
        for token in tokens {
            set.insert(token);
        }
        set
    }

    /// Add a raw token, preserving first-seen order.
    pub fn insert(&mut self, token: impl Into<String>) {
        let token = token.into();
        if !self.tokens.contains(&token) {
            self.tokens.push(token);
        }
    }

    /// Raw tokens in insertion order.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Check whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Rewrite deprecated tokens to their canonical replacements.
    ///
    /// Returns the normalized set and a warning per rewrite. When both the
    /// deprecated and the canonical spelling were supplied, the canonical
    /// one wins and the duplicate is dropped with a warning.
    pub fn normalize(&self, aliases: &BTreeMap<String, String>) -> (OptionSet, Vec<String>) {
        let mut normalized = OptionSet::new();
        let mut warnings = Vec::new();

        for token in &self.tokens {
            match aliases.get(token) {
                Some(canonical) => {
                    if self.tokens.contains(canonical) {
                        warnings.push(format!(
                            "both `{}` and `{}` were given; using `{}`",
                            token, canonical, canonical
                        ));
                    } else {
                        warnings.push(format!(
                            "option `{}` is deprecated; use `{}`",
                            token, canonical
                        ));
                    }
                    normalized.insert(canonical.clone());
                }
                None => normalized.insert(token.clone()),
            }
        }

        (normalized, warnings)
    }

    /// Fold normalized tokens into per-feature states.
    ///
    /// `with-X` enables feature X, `without-X` disables it, and a bare
    /// token is a switch that enables a feature of the same name. If a
    /// feature is both enabled and disabled, the later token wins and a
    /// warning is recorded.
    pub fn feature_states(&self) -> (BTreeMap<String, OptionState>, Vec<String>) {
        let mut states: BTreeMap<String, OptionState> = BTreeMap::new();
        let mut warnings = Vec::new();

        for token in &self.tokens {
            let (feature, state) = if let Some(rest) = token.strip_prefix("with-") {
                (rest.to_string(), OptionState::Enabled)
            } else if let Some(rest) = token.strip_prefix("without-") {
                (rest.to_string(), OptionState::Disabled)
            } else {
                (token.clone(), OptionState::Enabled)
            };

            if let Some(previous) = states.get(&feature) {
                if *previous != state {
                    warnings.push(format!(
                        "feature `{}` was both enabled and disabled; keeping the later request",
                        feature
                    ));
                }
            }
            states.insert(feature, state);
        }

        (states, warnings)
    }
}

/// Option states after normalization, resolved against recipe defaults.
#[derive(Debug, Clone)]
pub struct ResolvedOptions {
    states: BTreeMap<String, OptionState>,
    defaults: BTreeMap<String, bool>,
}

impl ResolvedOptions {
    /// Build resolved options from feature states and option declarations.
    pub fn new(states: BTreeMap<String, OptionState>, decls: &[OptionDecl]) -> Self {
        let defaults = decls
            .iter()
            .map(|d| (d.name.clone(), d.default_enabled))
            .collect();
        ResolvedOptions { states, defaults }
    }

    /// Whether a feature is effectively enabled.
    pub fn with(&self, feature: &str) -> bool {
        match self.states.get(feature) {
            Some(OptionState::Enabled) => true,
            Some(OptionState::Disabled) => false,
            Some(OptionState::Unspecified) | None => {
                self.defaults.get(feature).copied().unwrap_or(false)
            }
        }
    }

    /// Whether a feature is effectively disabled.
    pub fn without(&self, feature: &str) -> bool {
        !self.with(feature)
    }

    /// Whether the user explicitly requested the feature (not via default).
    pub fn explicitly_enabled(&self, feature: &str) -> bool {
        matches!(self.states.get(feature), Some(OptionState::Enabled))
    }
}
