//! Configuration file management.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "GITPAID_DATA_DIR";

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Overlay node settings.
    #[serde(default)]
    pub overlay: OverlayConfig,
    /// Signing-token settings for certificate issuance.
    #[serde(default)]
    pub certifier: CertifierConfig,
    /// Advanced settings.
    #[serde(default)]
    pub advanced: AdvancedConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
    /// Database file name inside the data directory.
    #[serde(default = "default_database_file")]
    pub database_file: String,
}

/// Overlay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    #[serde(default = "default_node_name")]
    pub node_name: String,
    /// Public URL the overlay host advertises.
    #[serde(default = "default_hosting_url")]
    pub hosting_url: String,
    /// "main" | "test".
    #[serde(default = "default_network")]
    pub network: String,
    /// Topic label events are accepted for.
    #[serde(default = "default_topic")]
    pub topic: String,
    /// Service label lookups are accepted for.
    #[serde(default = "default_service")]
    pub service: String,
}

/// Certifier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertifierConfig {
    /// Lifetime of an issued signing token.
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
    /// Maximum outstanding tokens; the oldest is evicted beyond this.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

/// Advanced configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// Log level: "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Socket file name inside the data directory.
    #[serde(default = "default_socket_file")]
    pub socket_file: String,
}

// Default value functions

fn default_database_file() -> String {
    "gitpaid.db".to_string()
}

fn default_node_name() -> String {
    "gitpaid".to_string()
}

fn default_hosting_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_network() -> String {
    "main".to_string()
}

fn default_topic() -> String {
    gitpaid_types::TOPIC_BOUNTY.to_string()
}

fn default_service() -> String {
    gitpaid_types::SERVICE_BOUNTY.to_string()
}

fn default_token_ttl() -> u64 {
    300
}

fn default_max_tokens() -> usize {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_socket_file() -> String {
    "gitpaid.sock".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: String::new(),
            database_file: default_database_file(),
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            node_name: default_node_name(),
            hosting_url: default_hosting_url(),
            network: default_network(),
            topic: default_topic(),
            service: default_service(),
        }
    }
}

impl Default for CertifierConfig {
    fn default() -> Self {
        Self {
            token_ttl_secs: default_token_ttl(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            socket_file: default_socket_file(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: DaemonConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !matches!(self.overlay.network.as_str(), "main" | "test") {
            anyhow::bail!(
                "overlay.network must be \"main\" or \"test\", got {:?}",
                self.overlay.network
            );
        }
        if self.certifier.max_tokens == 0 {
            anyhow::bail!("certifier.max_tokens must be at least 1");
        }
        Ok(())
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            return PathBuf::from(dir);
        }
        if self.storage.data_dir.is_empty() {
            default_data_dir()
        } else {
            PathBuf::from(&self.storage.data_dir)
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir().join(&self.storage.database_file)
    }

    pub fn socket_path(&self) -> PathBuf {
        self.data_dir().join(&self.advanced.socket_file)
    }

    /// Get the config file path.
    fn config_path() -> PathBuf {
        std::env::var(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_data_dir())
            .join("config.toml")
    }
}

/// `$HOME/.gitpaid`.
fn default_data_dir() -> PathBuf {
    std::env::var("HOME")
        .map(|h| PathBuf::from(h).join(".gitpaid"))
        .unwrap_or_else(|_| PathBuf::from("/tmp/gitpaid"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.storage.database_file, "gitpaid.db");
        assert_eq!(config.overlay.network, "main");
        assert_eq!(config.overlay.topic, "tm_bounty");
        assert_eq!(config.overlay.service, "ls_bounty");
        assert_eq!(config.certifier.token_ttl_secs, 300);
        assert_eq!(config.advanced.socket_file, "gitpaid.sock");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = DaemonConfig::default();
        let toml_str = toml::to_string(&config).expect("serialize");
        let _parsed = DaemonConfig::from_toml(&toml_str).expect("parse");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = DaemonConfig::from_toml(
            "[overlay]\nnetwork = \"test\"\n\n[certifier]\ntoken_ttl_secs = 60\n",
        )
        .expect("parse");
        assert_eq!(config.overlay.network, "test");
        assert_eq!(config.overlay.node_name, "gitpaid");
        assert_eq!(config.certifier.token_ttl_secs, 60);
        assert_eq!(config.certifier.max_tokens, 10_000);
    }

    #[test]
    fn test_unknown_network_rejected() {
        assert!(DaemonConfig::from_toml("[overlay]\nnetwork = \"regtest\"\n").is_err());
    }
}
