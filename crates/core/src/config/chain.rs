//! Per-chain configuration.
//!
//! Loaded once from TOML at startup, validated, and passed explicitly to the
//! components that need it.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::scanner::ScannerOverrides;

/// Configuration load or validation failure.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse chain config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{0} must not be the zero address")]
    ZeroAddress(&'static str),

    #[error("rpc_url must not be empty")]
    EmptyRpcUrl,

    #[error("chain_id must not be zero")]
    ZeroChainId,

    #[error("{field} references an unset environment variable: {value}")]
    UnresolvedVariable { field: &'static str, value: String },

    #[error("invalid scanner setting: {0}")]
    InvalidScanner(String),
}

/// Chain configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain: ChainDetails,
    pub contracts: ContractAddresses,
    #[serde(default)]
    pub liquidator: LiquidatorConfig,
    /// Scanner setting overrides applied on top of the selected profile
    #[serde(default)]
    pub scanner: ScannerOverrides,
}

/// Chain details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainDetails {
    /// Chain ID
    pub chain_id: u64,
    /// Human-readable name
    pub name: String,
    /// HTTP JSON-RPC endpoint
    pub rpc_url: String,
}

/// Deployed contract addresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractAddresses {
    /// FusePoolDirectory
    pub pool_directory: Address,
    /// FuseSafeLiquidator
    pub safe_liquidator: Address,
    /// Uniswap V2 factory used for flash swaps
    pub uniswap_v2_factory: Address,
    /// Wrapped ether
    pub weth: Address,
    /// Counter token for WETH flash swaps when the seized collateral is ETH
    pub flash_fallback_token: Address,
}

/// Liquidator account settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiquidatorConfig {
    /// Account whose balances fund direct liquidations. Defaults to the
    /// signer address when a private key is configured.
    #[serde(default)]
    pub account: Option<Address>,
    /// Pool ids never scanned
    #[serde(default)]
    pub excluded_pools: Vec<u64>,
}

impl ChainConfig {
    /// Load, expand `${VAR}` references and validate a chain config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ChainConfig = toml::from_str(&expand_env(content))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that make every scan meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chain.chain_id == 0 {
            return Err(ConfigError::ZeroChainId);
        }
        let rpc_url = self.chain.rpc_url.trim();
        if rpc_url.is_empty() {
            return Err(ConfigError::EmptyRpcUrl);
        }
        if rpc_url.contains("${") {
            return Err(ConfigError::UnresolvedVariable {
                field: "rpc_url",
                value: self.chain.rpc_url.clone(),
            });
        }

        let contracts = [
            ("pool_directory", self.contracts.pool_directory),
            ("safe_liquidator", self.contracts.safe_liquidator),
            ("uniswap_v2_factory", self.contracts.uniswap_v2_factory),
            ("weth", self.contracts.weth),
            ("flash_fallback_token", self.contracts.flash_fallback_token),
        ];
        for (name, address) in contracts {
            if address == Address::ZERO {
                return Err(ConfigError::ZeroAddress(name));
            }
        }

        Ok(())
    }
}

/// Expand ${VAR_NAME} patterns with environment variable values.
/// Unset variables are left in place so validation can name them.
fn expand_env(s: &str) -> String {
    let re = match regex_lite::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}") {
        Ok(re) => re,
        Err(_) => return s.to_string(),
    };

    re.replace_all(s, |caps: &regex_lite::Captures<'_>| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[chain]
chain_id = 1
name = "mainnet"
rpc_url = "${CHAIN_TEST_RPC}"

[contracts]
pool_directory = "0x835482FE0532f169024d5E9410199369aAD5C77E"
safe_liquidator = "0x41C7F2D48bde2397dFf43DadA367d2BD3527452F"
uniswap_v2_factory = "0x5C69bEe701ef814a2B6a3EDD4B1652CB9cc5aA6f"
weth = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"
flash_fallback_token = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"

[liquidator]
excluded_pools = [2, 5]

[scanner]
max_concurrent_pools = 2
"#;

    #[test]
    fn test_expand_env() {
        // Unique var name to avoid conflicts with parallel tests
        std::env::set_var("CHAIN_EXPAND_TEST_VAR", "test_value");
        assert_eq!(expand_env("${CHAIN_EXPAND_TEST_VAR}"), "test_value");
        assert_eq!(
            expand_env("prefix_${CHAIN_EXPAND_TEST_VAR}_suffix"),
            "prefix_test_value_suffix"
        );
        assert_eq!(expand_env("no_vars"), "no_vars");
        assert_eq!(expand_env("${CHAIN_EXPAND_UNSET_VAR}"), "${CHAIN_EXPAND_UNSET_VAR}");
        std::env::remove_var("CHAIN_EXPAND_TEST_VAR");
    }

    #[test]
    fn test_parse_sample_config() {
        std::env::set_var("CHAIN_TEST_RPC", "http://localhost:8545");
        let config = ChainConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.chain.chain_id, 1);
        assert_eq!(config.chain.rpc_url, "http://localhost:8545");
        assert_eq!(config.liquidator.excluded_pools, vec![2, 5]);
        assert_eq!(config.liquidator.account, None);
        assert_eq!(config.scanner.max_concurrent_pools, Some(2));
        std::env::remove_var("CHAIN_TEST_RPC");
    }

    #[test]
    fn test_unresolved_rpc_variable_rejected() {
        let content = SAMPLE.replace("CHAIN_TEST_RPC", "CHAIN_TEST_RPC_NEVER_SET");
        let err = ChainConfig::from_toml_str(&content).unwrap_err();
        assert!(matches!(err, ConfigError::UnresolvedVariable { field: "rpc_url", .. }));
    }

    #[test]
    fn test_zero_address_rejected() {
        let content = SAMPLE
            .replace("${CHAIN_TEST_RPC}", "http://localhost:8545")
            .replace(
                "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2",
                "0x0000000000000000000000000000000000000000",
            );
        let err = ChainConfig::from_toml_str(&content).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroAddress("weth")));
    }

    #[test]
    fn test_zero_chain_id_rejected() {
        let content = SAMPLE
            .replace("${CHAIN_TEST_RPC}", "http://localhost:8545")
            .replace("chain_id = 1", "chain_id = 0");
        assert!(matches!(
            ChainConfig::from_toml_str(&content),
            Err(ConfigError::ZeroChainId)
        ));
    }
}
