//! Configuration loader

use crate::config::StaticaConfig;
use crate::error::{Error, Result};
use std::path::Path;

/// Configuration loader for various formats
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file.
    ///
    /// The format is picked from the extension; the loaded configuration is
    /// validated before it is returned.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<StaticaConfig> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let config = match ext {
            "json" => Self::from_json(&content)?,
            "toml" | "" => Self::from_toml(&content)?,
            _ => return Err(Error::Config(format!("Unknown config format: {}", ext))),
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse JSON configuration
    pub fn from_json(content: &str) -> Result<StaticaConfig> {
        serde_json::from_str(content).map_err(|e| Error::Config(format!("Invalid JSON: {}", e)))
    }

    /// Parse TOML configuration
    pub fn from_toml(content: &str) -> Result<StaticaConfig> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_json_loading() {
        let json = r#"{"mounts": [{"root": "./public"}]}"#;
        let config = ConfigLoader::from_json(json).unwrap();
        assert_eq!(config.mounts.len(), 1);
        assert!(config.mounts[0].strip_path);
        assert!(!config.mounts[0].gzip);
    }

    #[test]
    fn test_toml_loading() {
        let toml = r#"
            listen = "127.0.0.1:9000"

            [[mounts]]
            root = "./assets"
            path = "/static"
            gzip = true

            [[mounts.except]]
            path = "/static/health"
            method = "GET"
            handler = { type = "respond", status = 200, body = "ok" }
        "#;
        let config = ConfigLoader::from_toml(toml).unwrap();
        assert_eq!(config.listen, "127.0.0.1:9000");
        assert_eq!(config.mounts[0].path.as_deref(), Some("/static"));
        assert_eq!(config.mounts[0].except.len(), 1);
    }

    #[test]
    fn test_load_from_file_validates() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "listen = \"not an address\"\n[[mounts]]\nroot = \".\"").unwrap();

        let err = ConfigLoader::load(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        assert!(ConfigLoader::load(file.path()).is_err());
    }
}
