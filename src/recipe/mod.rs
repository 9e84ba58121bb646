//! Recipe schema and the built-in VTK recipe.
//!
//! A recipe is the declarative side of an install: where the source
//! archive lives, its checksum, which options exist and what they default
//! to, and which deprecated option spellings map to current ones. The
//! VTK 7.0 recipe ships built in; other CMake-based libraries can be
//! described in a TOML file with the same schema.

pub mod options;

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use semver::Version;
use serde::{Deserialize, Serialize};

pub use options::{OptionDecl, OptionSet, OptionState, ResolvedOptions};

/// A declarative build/install recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    /// Package name (e.g., `vtk`)
    pub name: String,

    /// Upstream version
    pub version: Version,

    /// Project homepage
    #[serde(default)]
    pub homepage: String,

    /// Primary source archive URL
    pub url: String,

    /// Fallback mirrors, tried in order after the primary URL
    #[serde(default)]
    pub mirrors: Vec<String>,

    /// Expected SHA256 of the source archive
    pub sha256: String,

    /// Declared options, in declaration order
    #[serde(default)]
    pub options: Vec<OptionDecl>,

    /// Deprecated option token -> canonical token
    #[serde(default)]
    pub deprecated_options: BTreeMap<String, String>,
}

impl Recipe {
    /// Load a recipe from a TOML file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read recipe: {}", path.display()))?;

        let recipe: Recipe = toml::from_str(&contents)
            .with_context(|| format!("failed to parse recipe: {}", path.display()))?;

        recipe.validate()?;
        Ok(recipe)
    }

    /// Sanity-check the recipe declarations.
    pub fn validate(&self) -> Result<()> {
        for (deprecated, canonical) in &self.deprecated_options {
            if self.deprecated_options.contains_key(canonical) {
                anyhow::bail!(
                    "recipe `{}`: deprecated option `{}` maps to `{}`, which is itself deprecated",
                    self.name,
                    deprecated,
                    canonical
                );
            }
        }

        let mut seen = std::collections::BTreeSet::new();
        for decl in &self.options {
            if !seen.insert(&decl.name) {
                anyhow::bail!(
                    "recipe `{}`: option `{}` declared twice",
                    self.name,
                    decl.name
                );
            }
        }

        Ok(())
    }

    /// Look up an option declaration by feature name.
    pub fn option(&self, name: &str) -> Option<&OptionDecl> {
        self.options.iter().find(|o| o.name == name)
    }

    /// Archive file name derived from the primary URL.
    pub fn archive_name(&self) -> String {
        self.url
            .rsplit('/')
            .next()
            .unwrap_or("source.tar.gz")
            .to_string()
    }

    /// The built-in VTK 7.0 recipe.
    pub fn vtk() -> Self {
        Recipe {
            name: "vtk".to_string(),
            version: Version::new(7, 0, 0),
            homepage: "http://www.vtk.org".to_string(),
            url: "http://www.vtk.org/files/release/7.0/VTK-7.0.0.tar.gz".to_string(),
            mirrors: vec!["https://fossies.org/linux/misc/VTK-7.0.0.tar.gz".to_string()],
            sha256: "78a990a15ead79cdc752e86b83cfab7dbf5b7ef51ba409db02570dbdd9ec32c3"
                .to_string(),
            options: vec![
                OptionDecl::optional("cxx11", "Build using C++11 mode"),
                OptionDecl::optional("examples", "Compile and install various examples"),
                OptionDecl::optional("qt", "Enable Qt4 extension"),
                OptionDecl::optional("qt5", "Enable Qt5 extension"),
                OptionDecl::optional("qt-extern", "Enable Qt4 extension via external Qt4"),
                OptionDecl::optional("tcl", "Enable Tcl wrapping of VTK classes"),
                OptionDecl::optional("matplotlib", "Enable matplotlib support"),
                OptionDecl::optional("x11", "Use the X window system instead of Cocoa"),
                OptionDecl::recommended("python", "Enable python2 wrapping"),
                OptionDecl::optional("python3", "Enable python3 wrapping"),
                OptionDecl::recommended("boost", "Enable boost graph algorithm modules"),
                OptionDecl::recommended("fontconfig", "Enable fontconfig font rendering"),
                OptionDecl::recommended("hdf5", "Use the system hdf5 library"),
                OptionDecl::recommended("jpeg", "Use the system jpeg library"),
                OptionDecl::recommended("libpng", "Use the system libpng library"),
                OptionDecl::recommended("libtiff", "Use the system libtiff library"),
                OptionDecl::recommended("legacy", "Keep legacy APIs available"),
            ],
            deprecated_options: [
                ("examples", "with-examples"),
                ("qt-extern", "with-qt-extern"),
                ("tcl", "with-tcl"),
                ("remove-legacy", "without-legacy"),
            ]
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect(),
        }
    }
}
