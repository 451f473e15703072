//! Configuration management
//!
//! Handles the TOML file describing interfaces, static routes and ARP policy.

mod types;
mod validation;

pub use types::*;
pub use validation::{validate, ValidationResult};

use crate::{Error, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(Error::Io)?;
    from_str(&content)
}

/// Parse configuration from TOML text
pub fn from_str(content: &str) -> Result<Config> {
    toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [[interfaces]]
            name = "eth0"
            mac = "02:00:00:00:00:01"
            address = "10.0.0.1"
            "#
        )
        .unwrap();

        let config = load(file.path()).unwrap();
        assert_eq!(config.interfaces.len(), 1);
        assert_eq!(config.interfaces[0].name, "eth0");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = from_str("[[interfaces]]\nname = 3").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
