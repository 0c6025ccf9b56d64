//! Node configuration
//!
//! Operational settings only: which network to join, where data lives and
//! how to mine. Consensus values come from [`Params`](crate::consensus::Params)
//! and are never read from here.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::consensus::{CoinbaseData, Network};
use crate::crypto::address::{address_to_script_public_key, AddressError};
use crate::pow::PowConfig;

/// File name of the stored full dataset inside the network directory
pub const DATASET_FILE_NAME: &str = "hashes.dat";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid mining address: {0}")]
    InvalidAddress(#[from] AddressError),

    #[error("mining is enabled but no mining address is configured")]
    MissingMiningAddress,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

fn default_threads() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// Mining settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    pub enabled: bool,
    /// Worker threads hashing templates
    pub threads: usize,
    /// Threads used once to generate the full dataset
    pub dataset_build_threads: usize,
    /// Build the full dataset before mining; otherwise items are derived
    /// from the light cache on first use
    pub generate_dataset: bool,
    /// Address paid by the coinbase of mined blocks
    pub address: Option<String>,
    /// Free-form bytes recorded in the coinbase payload
    pub extra_data: String,
    /// How often a fresh template is built, in milliseconds
    pub template_refresh_ms: u64,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threads: default_threads(),
            dataset_build_threads: default_threads(),
            generate_dataset: true,
            address: None,
            extra_data: String::new(),
            template_refresh_ms: 1_000,
        }
    }
}

/// Node configuration, read from a TOML file. Missing fields take defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub network: Network,
    pub data_dir: PathBuf,
    /// Full dataset file; defaults to `hashes.dat` in the network directory
    pub dataset_file: Option<PathBuf>,
    /// Default log filter when `RUST_LOG` is not set
    pub log_level: String,
    pub mining: MiningConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            network: Network::default(),
            data_dir: PathBuf::from("harbi-data"),
            dataset_file: None,
            log_level: "info".to_string(),
            mining: MiningConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Load config from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load config from `path` if given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Save config to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Directory holding this network's database and dataset
    pub fn network_dir(&self) -> PathBuf {
        self.data_dir.join(self.network.to_string())
    }

    pub fn database_dir(&self) -> PathBuf {
        self.network_dir().join("db")
    }

    pub fn dataset_path(&self) -> PathBuf {
        self.dataset_file
            .clone()
            .unwrap_or_else(|| self.network_dir().join(DATASET_FILE_NAME))
    }

    /// Proof-of-work settings derived from this config
    pub fn pow_config(&self) -> PowConfig {
        PowConfig::mainnet()
            .with_dataset_file(self.dataset_path())
            .with_build_threads(self.mining.dataset_build_threads)
    }

    /// Coinbase data paying the configured mining address
    pub fn mining_coinbase_data(&self) -> ConfigResult<CoinbaseData> {
        let address = self
            .mining
            .address
            .as_deref()
            .ok_or(ConfigError::MissingMiningAddress)?;
        let script_public_key = address_to_script_public_key(address)?;
        Ok(CoinbaseData::new(
            script_public_key,
            self.mining.extra_data.as_bytes().to_vec(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::address::encode_address;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: NodeConfig = toml::from_str(
            r#"
            network = "devnet"

            [mining]
            enabled = true
            threads = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.network, Network::Devnet);
        assert!(config.mining.enabled);
        assert_eq!(config.mining.threads, 2);
        assert!(config.mining.generate_dataset);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.dataset_path(), PathBuf::from("harbi-data/devnet/hashes.dat"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harbi.toml");
        let mut config = NodeConfig::default();
        config.dataset_file = Some(dir.path().join("dataset.dat"));
        config.mining.extra_data = "pool-7".to_string();
        config.save(&path).unwrap();

        let loaded = NodeConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.pow_config().dataset_file, Some(dir.path().join("dataset.dat")));
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            NodeConfig::load(dir.path().join("missing.toml")),
            Err(ConfigError::Read { .. })
        ));

        let path = dir.path().join("broken.toml");
        fs::write(&path, "network = 7").unwrap();
        assert!(matches!(NodeConfig::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_mining_coinbase_data() {
        let mut config = NodeConfig::default();
        assert!(matches!(
            config.mining_coinbase_data(),
            Err(ConfigError::MissingMiningAddress)
        ));

        config.mining.address = Some(encode_address(&[3u8; 32]));
        config.mining.extra_data = "hello".to_string();
        let data = config.mining_coinbase_data().unwrap();
        assert_eq!(data.extra_data, b"hello".to_vec());
        assert_eq!(data.script_public_key.script.len(), 34);

        config.mining.address = Some("harbi:notanaddress".to_string());
        assert!(matches!(
            config.mining_coinbase_data(),
            Err(ConfigError::InvalidAddress(_))
        ));
    }
}
