//! Configuration file management.
//!
//! Read from `$YOUSPLIT_DATA_DIR/config.toml`. Every field has a serde
//! default, so a missing file or a partial one is fine; the `[pool]` section
//! is only consulted when the database holds no pool yet.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use yousplit_splitter::PoolParams;
use yousplit_types::{Address, AddressParseError, Bps, DEFAULT_OWNER_SHARE_BPS};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "YOUSPLIT_DATA_DIR";

/// Invalid `[pool]` configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("pool.{field} must be set")]
    Missing { field: &'static str },

    #[error("pool.{field}: {source}")]
    BadAddress {
        field: &'static str,
        #[source]
        source: AddressParseError,
    },
}

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Pool construction parameters.
    #[serde(default)]
    pub pool: PoolConfig,
    /// Storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// IPC settings.
    #[serde(default)]
    pub network: NetworkConfig,
    /// Advanced settings.
    #[serde(default)]
    pub advanced: AdvancedConfig,
}

/// Pool construction parameters. Addresses are hex, `0x` optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    #[serde(default)]
    pub owner: String,
    /// The pool's own identity on external ledgers.
    #[serde(default)]
    pub address: String,
    /// Stable-token ledger address. Empty = native-only pool.
    #[serde(default)]
    pub stable_token: String,
    #[serde(default)]
    pub beneficiaries: Vec<String>,
    #[serde(default)]
    pub shares: Vec<Bps>,
    #[serde(default = "default_owner_share_bps")]
    pub owner_share_bps: Bps,
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
}

/// IPC configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Socket file name inside the data directory.
    #[serde(default = "default_socket_name")]
    pub socket_name: String,
}

/// Advanced configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// Default tracing directive: "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Per-subscriber event buffer.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
    /// Enables `dev_*` RPC methods.
    #[serde(default)]
    pub dev_mode: bool,
}

fn default_owner_share_bps() -> Bps {
    DEFAULT_OWNER_SHARE_BPS
}

fn default_socket_name() -> String {
    "yousplit.sock".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_event_buffer() -> usize {
    1000
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            address: String::new(),
            stable_token: String::new(),
            beneficiaries: Vec::new(),
            shares: Vec::new(),
            owner_share_bps: default_owner_share_bps(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            socket_name: default_socket_name(),
        }
    }
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            event_buffer: default_event_buffer(),
            dev_mode: false,
        }
    }
}

fn parse_address(field: &'static str, value: &str) -> Result<Address, ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Missing { field });
    }
    value
        .parse()
        .map_err(|source| ConfigError::BadAddress { field, source })
}

impl PoolConfig {
    /// Turn the configured strings into construction parameters.
    ///
    /// Share validation is left to pool construction.
    pub fn to_params(&self) -> Result<PoolParams, ConfigError> {
        let owner = parse_address("owner", &self.owner)?;
        let address = parse_address("address", &self.address)?;
        let beneficiaries = self
            .beneficiaries
            .iter()
            .map(|b| parse_address("beneficiaries", b))
            .collect::<Result<Vec<_>, _>>()?;

        let mut params = PoolParams::new(owner, address, beneficiaries, self.shares.clone())
            .with_owner_share(self.owner_share_bps);
        if !self.stable_token.is_empty() {
            params = params.with_stable_token(parse_address("stable_token", &self.stable_token)?);
        }
        Ok(params)
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
            let config: DaemonConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        if self.storage.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.storage.data_dir)
        }
    }

    pub fn socket_path(&self) -> PathBuf {
        self.data_dir().join(&self.network.socket_name)
    }

    fn config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }

    /// Platform-specific default data directory.
    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            return PathBuf::from(dir);
        }
        #[cfg(target_os = "macos")]
        {
            dirs_fallback("Library/Application Support/YouSplit")
        }
        #[cfg(not(target_os = "macos"))]
        {
            dirs_fallback(".yousplit")
        }
    }
}

/// Fallback home directory resolution.
fn dirs_fallback(subpath: &str) -> PathBuf {
    std::env::var("HOME")
        .map(|h| PathBuf::from(h).join(subpath))
        .unwrap_or_else(|_| PathBuf::from("/tmp/yousplit"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.network.socket_name, "yousplit.sock");
        assert_eq!(config.advanced.log_level, "info");
        assert_eq!(config.advanced.event_buffer, 1000);
        assert_eq!(config.pool.owner_share_bps, DEFAULT_OWNER_SHARE_BPS);
        assert!(!config.advanced.dev_mode);
    }

    #[test]
    fn test_config_serialization() {
        let config = DaemonConfig::default();
        let toml_str = toml::to_string(&config).expect("serialize");
        let _parsed: DaemonConfig = toml::from_str(&toml_str).expect("parse");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: DaemonConfig = toml::from_str(
            r#"
            [pool]
            owner = "0x0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a"
            address = "eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee"
            beneficiaries = ["0x0101010101010101010101010101010101010101"]
            shares = [475]
            "#,
        )
        .expect("parse");

        let params = config.pool.to_params().expect("params");
        assert_eq!(params.owner, Address::repeat(0x0a));
        assert_eq!(params.address, Address::repeat(0xee));
        assert_eq!(params.beneficiaries, vec![Address::repeat(0x01)]);
        assert_eq!(params.owner_share_bps, DEFAULT_OWNER_SHARE_BPS);
        assert_eq!(params.stable_token, None);
        assert_eq!(config.network.socket_name, "yousplit.sock");
    }

    #[test]
    fn test_missing_owner() {
        let result = PoolConfig::default().to_params();
        assert!(matches!(result, Err(ConfigError::Missing { field: "owner" })));
    }

    #[test]
    fn test_bad_stable_token() {
        let pool = PoolConfig {
            owner: "0a".repeat(20),
            address: "ee".repeat(20),
            stable_token: "0xnothex".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            pool.to_params(),
            Err(ConfigError::BadAddress { field: "stable_token", .. })
        ));
    }
}
