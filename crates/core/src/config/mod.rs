//! Configuration: per-chain contract addresses and endpoints, and scanner
//! runtime settings.

mod chain;
mod scanner;

pub use chain::{ChainConfig, ChainDetails, ConfigError, ContractAddresses, LiquidatorConfig};
pub use scanner::{ScannerOverrides, ScannerSettings};
