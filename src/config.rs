//! Configuration for the proxy
//!
//! Configuration is loaded in order of precedence:
//! 1. CLI flags (highest priority, applied in `cli`)
//! 2. Environment variables
//! 3. Config file (~/.config/bloodhound/config.toml)
//! 4. Built-in defaults (lowest priority)

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the proxy server to
    pub listen_addr: SocketAddr,

    /// Upstream base URL all traffic is forwarded to
    pub target_url: String,

    /// Directory for bone files; None disables dumping
    pub bone_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:25663".parse().unwrap(),
            target_url: "https://httpbin.org".to_string(),
            bone_dir: None,
        }
    }
}

/// Config file structure (subset of Config that makes sense to persist)
#[derive(Debug, Deserialize, Default)]
pub(crate) struct FileConfig {
    pub listen_addr: Option<String>,
    pub target_url: Option<String>,
    pub bone_dir: Option<String>,
}

impl Config {
    /// Get the config file path: ~/.config/bloodhound/config.toml
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("bloodhound").join("config.toml"))
    }

    /// Load file config if it exists. A config file that exists but cannot
    /// be parsed is fatal: failing fast beats silently running on defaults
    /// while the user debugs the wrong thing.
    fn load_file_config() -> FileConfig {
        let Some(path) = Self::config_path() else {
            return FileConfig::default();
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Failed to parse config file {}: {}", path.display(), e);
                    eprintln!("Fix or delete the file and restart.");
                    std::process::exit(1);
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => FileConfig::default(),
            Err(e) => {
                eprintln!("Cannot read config file {}: {}", path.display(), e);
                std::process::exit(1);
            }
        }
    }

    /// Load configuration: env vars -> file -> defaults.
    pub fn from_env() -> Self {
        let file = Self::load_file_config();
        let defaults = Config::default();

        let listen_addr = std::env::var("BLOODHOUND_LISTEN")
            .ok()
            .or(file.listen_addr)
            .map(|s| s.parse().expect("Invalid listen address"))
            .unwrap_or(defaults.listen_addr);

        let target_url = std::env::var("BLOODHOUND_TARGET")
            .ok()
            .or(file.target_url)
            .unwrap_or(defaults.target_url);

        let bone_dir = resolve_bone_dir(std::env::var("BLOODHOUND_BONES").ok().or(file.bone_dir));

        Self {
            listen_addr,
            target_url,
            bone_dir,
        }
    }

    /// Validate startup-fatal settings. A malformed upstream URL must stop
    /// the process before the server starts.
    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.target_url)
            .with_context(|| format!("Invalid target URL: {}", self.target_url))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            bail!("Target URL must be http or https: {}", self.target_url);
        }
        if url.host_str().is_none() {
            bail!("Target URL has no host: {}", self.target_url);
        }
        Ok(())
    }
}

/// An empty string disables dumping, same as leaving the option unset.
fn resolve_bone_dir(raw: Option<String>) -> Option<PathBuf> {
    raw.filter(|s| !s.is_empty()).map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let config = Config::default();
        assert_eq!(config.listen_addr.to_string(), "0.0.0.0:25663");
        assert_eq!(config.target_url, "https://httpbin.org");
        assert!(config.bone_dir.is_none());
    }

    #[test]
    fn file_config_parses_all_keys() {
        let file: FileConfig = toml::from_str(
            r#"
            listen_addr = "127.0.0.1:9999"
            target_url = "http://localhost:3000"
            bone_dir = "/tmp/bones"
            "#,
        )
        .unwrap();
        assert_eq!(file.listen_addr.as_deref(), Some("127.0.0.1:9999"));
        assert_eq!(file.target_url.as_deref(), Some("http://localhost:3000"));
        assert_eq!(file.bone_dir.as_deref(), Some("/tmp/bones"));
    }

    #[test]
    fn file_config_tolerates_missing_keys() {
        let file: FileConfig = toml::from_str("").unwrap();
        assert!(file.listen_addr.is_none());
        assert!(file.target_url.is_none());
        assert!(file.bone_dir.is_none());
    }

    #[test]
    fn empty_bone_dir_means_disabled() {
        assert!(resolve_bone_dir(None).is_none());
        assert!(resolve_bone_dir(Some(String::new())).is_none());
        assert_eq!(
            resolve_bone_dir(Some("/tmp/bones".to_string())),
            Some(PathBuf::from("/tmp/bones"))
        );
    }

    #[test]
    fn validate_accepts_http_and_https_targets() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());
        config.target_url = "http://localhost:3000".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_malformed_targets() {
        let mut config = Config::default();
        config.target_url = "not a url".to_string();
        assert!(config.validate().is_err());
        config.target_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
        config.target_url = "http://".to_string();
        assert!(config.validate().is_err());
    }
}
