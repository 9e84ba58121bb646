//! Resolution error types and diagnostics.

use std::path::PathBuf;

use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// Error during build-configuration resolution.
///
/// Every variant is terminal: retrying with the same inputs cannot
/// succeed, and no external process has been started when one is
/// returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("cannot enable both `{first}` and `{second}` toolkit bindings")]
    ConflictingToolkits { first: String, second: String },

    #[error("cannot build both python 2 and 3 wrappers")]
    ConflictingRuntimes { first: String, second: String },

    #[error("required dependency `{dependency}` not found")]
    MissingDependency {
        dependency: String,
        wanted_by: String,
    },

    #[error("no runtime library found for `{runtime}`")]
    RuntimeLibraryNotFound {
        runtime: String,
        searched: Vec<PathBuf>,
    },

    #[error("internal flag conflict for `{key}`")]
    DuplicateFlag { key: String },
}

impl ResolveError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ResolveError::ConflictingToolkits { first, second } => {
                Diagnostic::error(format!(
                    "cannot enable both `{}` and `{}`",
                    first, second
                ))
                .with_context("the underlying build supports a single GUI-toolkit major version")
                .with_suggestion(suggestions::CONFLICTING_OPTIONS.to_string())
            }

            ResolveError::ConflictingRuntimes { first, second } => {
                Diagnostic::error("cannot build both python 2 and 3 wrappers")
                    .with_context(format!("`{}` and `{}` are both enabled", first, second))
                    .with_suggestion(
                        "Pass `--without-python` to keep only the python 3 wrapper".to_string(),
                    )
            }

            ResolveError::MissingDependency {
                dependency,
                wanted_by,
            } => Diagnostic::error(format!("required dependency `{}` not found", dependency))
                .with_context(format!("requested by {}", wanted_by))
                .with_suggestion(suggestions::MISSING_DEPENDENCY.to_string()),

            ResolveError::RuntimeLibraryNotFound { runtime, searched } => {
                let mut diag = Diagnostic::error(format!(
                    "no runtime library found for `{}`",
                    runtime
                ));

                for path in searched {
                    diag = diag.with_context(format!("tried {}", path.display()));
                }

                diag.with_suggestion(suggestions::RUNTIME_LIBRARY.to_string())
            }

            ResolveError::DuplicateFlag { key } => {
                Diagnostic::error(format!("internal flag conflict for `{}`", key))
                    .with_context("the resolver attempted to emit the same flag twice")
                    .with_suggestion(
                        "This is a bug in slipway; please report it with the full option set"
                            .to_string(),
                    )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflicting_toolkits_diagnostic() {
        let err = ResolveError::ConflictingToolkits {
            first: "with-qt".to_string(),
            second: "with-qt5".to_string(),
        };

        let diag = err.to_diagnostic();
        let output = diag.format(false);

        assert!(output.contains("cannot enable both"));
        assert!(output.contains("with-qt"));
        assert!(output.contains("with-qt5"));
        assert!(output.contains("help: consider:"));
    }

    #[test]
    fn test_missing_dependency_names_it() {
        let err = ResolveError::MissingDependency {
            dependency: "pyqt5".to_string(),
            wanted_by: "`--with-qt5` together with python wrapping".to_string(),
        };

        let output = err.to_diagnostic().format(false);
        assert!(output.contains("`pyqt5`"));
        assert!(output.contains("requested by"));
    }

    #[test]
    fn test_runtime_library_lists_candidates() {
        let err = ResolveError::RuntimeLibraryNotFound {
            runtime: "python".to_string(),
            searched: vec![
                PathBuf::from("/usr/local/Python"),
                PathBuf::from("/usr/local/lib/libpython2.7.dylib"),
            ],
        };

        let output = err.to_diagnostic().format(false);
        assert!(output.contains("tried /usr/local/Python"));
        assert!(output.contains("libpython2.7.dylib"));
    }
}
