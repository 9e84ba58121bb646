//! CLI command implementations.

pub mod completions;
pub mod install;
pub mod patch;
pub mod probe;
pub mod resolve;

use anyhow::{bail, Result};

/// Parse a `KEY=VALUE` definition override.
pub fn parse_define(raw: &str) -> Result<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => bail!("invalid definition `{}`; expected KEY=VALUE", raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_define() {
        assert_eq!(
            parse_define("CMAKE_BUILD_TYPE=Debug").unwrap(),
            ("CMAKE_BUILD_TYPE".to_string(), "Debug".to_string())
        );
        // Empty values are allowed; CMake treats them as unset-to-empty.
        assert_eq!(
            parse_define("VTK_REQUIRED_OBJCXX_FLAGS=").unwrap(),
            ("VTK_REQUIRED_OBJCXX_FLAGS".to_string(), String::new())
        );
        assert!(parse_define("NO_EQUALS").is_err());
        assert!(parse_define("=VALUE").is_err());
    }
}
