//! Centralized shell output and progress management.
//!
//! The Shell owns all human-facing CLI output: aligned status lines for
//! each pipeline phase and a progress bar for archive downloads. Commands
//! never print directly; they ask the shell, which handles verbosity and
//! color selection.

use std::fmt::Display;
use std::io::{self, IsTerminal};

use indicatif::{ProgressBar, ProgressStyle};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// --quiet: errors only, no progress
    Quiet,
    /// Default: status messages + progress bars
    #[default]
    Normal,
    /// --verbose: immediate status lines, debug info, no progress bars
    Verbose,
}

/// Color output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Detect TTY and use colors if available.
    #[default]
    Auto,
    /// Always use ANSI colors.
    Always,
    /// Never use ANSI colors.
    Never,
}

impl std::str::FromStr for ColorChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ColorChoice::Auto),
            "always" => Ok(ColorChoice::Always),
            "never" => Ok(ColorChoice::Never),
            _ => Err(format!(
                "invalid color choice '{}'; expected 'auto', 'always', or 'never'",
                s
            )),
        }
    }
}

/// Status types for output messages.
///
/// Shell handles all formatting - callers just specify the semantic status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    // Success statuses (green)
    Finished,
    Installed,

    // In-progress statuses (cyan)
    Fetching,
    Verifying,
    Extracting,
    Resolving,
    Configuring,
    Building,
    Installing,
    Patching,
    Testing,

    // Info statuses (blue)
    Info,

    // Warning statuses (yellow)
    Skipped,
    Warning,

    // Error status (red)
    Error,
}

impl Status {
    fn as_str(&self) -> &'static str {
        match self {
            Status::Finished => "Finished",
            Status::Installed => "Installed",
            Status::Fetching => "Fetching",
            Status::Verifying => "Verifying",
            Status::Extracting => "Extracting",
            Status::Resolving => "Resolving",
            Status::Configuring => "Configuring",
            Status::Building => "Building",
            Status::Installing => "Installing",
            Status::Patching => "Patching",
            Status::Testing => "Testing",
            Status::Info => "Info",
            Status::Skipped => "Skipped",
            Status::Warning => "Warning",
            Status::Error => "error",
        }
    }

    fn color_code(&self) -> &'static str {
        match self {
            // Success: bold green
            Status::Finished | Status::Installed => "\x1b[1;32m",
            // In-progress: bold cyan
            Status::Fetching
            | Status::Verifying
            | Status::Extracting
            | Status::Resolving
            | Status::Configuring
            | Status::Building
            | Status::Installing
            | Status::Patching
            | Status::Testing => "\x1b[1;36m",
            // Info: bold blue
            Status::Info => "\x1b[1;34m",
            // Warning: bold yellow
            Status::Skipped | Status::Warning => "\x1b[1;33m",
            // Error: bold red
            Status::Error => "\x1b[1;31m",
        }
    }
}

/// Central shell for all CLI output.
#[derive(Debug)]
pub struct Shell {
    verbosity: Verbosity,
    use_color: bool,
}

impl Shell {
    /// Create a new shell.
    pub fn new(verbosity: Verbosity, color: ColorChoice) -> Self {
        let use_color = match color {
            ColorChoice::Auto => io::stderr().is_terminal(),
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        };

        Shell {
            verbosity,
            use_color,
        }
    }

    /// Create a shell from CLI flags.
    pub fn from_flags(quiet: bool, verbose: bool, color: ColorChoice) -> Self {
        let verbosity = if quiet {
            Verbosity::Quiet
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        };

        Shell::new(verbosity, color)
    }

    /// Check if shell is in quiet mode.
    pub fn is_quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }

    /// Check if shell is in verbose mode.
    pub fn is_verbose(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }

    /// Check if colors are enabled.
    pub fn use_color(&self) -> bool {
        self.use_color
    }

    /// Print a status message.
    ///
    /// Format: `{status:>12} {message}`
    ///
    /// In quiet mode, only Error status is printed.
    pub fn status(&self, status: Status, msg: impl Display) {
        if self.is_quiet() && status != Status::Error {
            return;
        }

        let prefix = self.format_status(status);
        eprintln!("{} {}", prefix, msg);
    }

    /// Print an info message.
    pub fn note(&self, msg: impl Display) {
        self.status(Status::Info, msg);
    }

    /// Print a warning message.
    pub fn warn(&self, msg: impl Display) {
        self.status(Status::Warning, msg);
    }

    /// Print an error message.
    pub fn error(&self, msg: impl Display) {
        self.status(Status::Error, msg);
    }

    /// Create a progress bar for a download of known size.
    ///
    /// Returns a hidden bar in quiet/verbose mode (verbose prefers plain
    /// status lines over redrawn bars).
    pub fn download_progress(&self, total_bytes: u64) -> ProgressBar {
        if self.verbosity != Verbosity::Normal || !io::stderr().is_terminal() {
            return ProgressBar::hidden();
        }

        let bar = ProgressBar::new(total_bytes);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
        );
        bar
    }

    fn format_status(&self, status: Status) -> String {
        if self.use_color {
            format!("{}{:>12}\x1b[0m", status.color_code(), status.as_str())
        } else {
            format!("{:>12}", status.as_str())
        }
    }
}

impl Default for Shell {
    fn default() -> Self {
        Shell::new(Verbosity::Normal, ColorChoice::Auto)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_color_choice_parsing() {
        assert_eq!(ColorChoice::from_str("auto").unwrap(), ColorChoice::Auto);
        assert_eq!(
            ColorChoice::from_str("ALWAYS").unwrap(),
            ColorChoice::Always
        );
        assert_eq!(ColorChoice::from_str("never").unwrap(), ColorChoice::Never);
        assert!(ColorChoice::from_str("sometimes").is_err());
    }

    #[test]
    fn test_quiet_shell() {
        let shell = Shell::from_flags(true, false, ColorChoice::Never);
        assert!(shell.is_quiet());
        assert!(!shell.is_verbose());
    }

    #[test]
    fn test_status_alignment() {
        let shell = Shell::new(Verbosity::Normal, ColorChoice::Never);
        assert_eq!(shell.format_status(Status::Fetching), "    Fetching");
        assert_eq!(shell.format_status(Status::Configuring), " Configuring");
    }
}
