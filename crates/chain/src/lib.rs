//! Chain interaction layer for the Fuse liquidation scanner.
//!
//! This crate provides:
//! - Provider management with per-call read timeouts
//! - Contract bindings for the pool directory, comptrollers, markets and oracles
//! - The [`ChainDataProvider`] read abstraction and its Fuse implementation
//! - Liquidation funding (held balances and Uniswap V2 flash-swap capacity)
//! - Safe-liquidator calldata encoding and transaction sending

pub mod contracts;
mod error;
pub mod funding;
pub mod protocol;
mod provider;
mod signer;

pub use contracts::{EncodedCall, FundingMode, LiquidationCall, SafeLiquidatorContract};
pub use error::{ChainError, Result};
pub use funding::{LiquidationFunding, UniswapV2Funding};
pub use protocol::{
    AccountBalances, Asset, AssetBalance, ChainDataProvider, FuseDataProvider, PoolId, PoolRef,
};
pub use provider::{ProviderManager, DEFAULT_READ_TIMEOUT};
pub use signer::{TransactionSender, DEFAULT_LIQUIDATION_GAS_LIMIT};
