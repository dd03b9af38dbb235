//! Read-side protocol abstraction.
//!
//! The scanner core only sees the [`ChainDataProvider`] trait: pools, their
//! markets, borrowers, balances, prices and risk parameters. [`FuseDataProvider`]
//! implements it against deployed Fuse contracts; tests implement it in memory.
//!
//! # Example
//!
//! ```rust,ignore
//! use fuse_chain::protocol::{ChainDataProvider, FuseDataProvider};
//!
//! let provider = FuseDataProvider::new(rpc, pool_directory);
//! for pool in provider.list_pools().await? {
//!     let assets = provider.list_pool_assets(&pool).await?;
//!     let borrowers = provider.list_accounts_with_positions(&pool).await?;
//! }
//! ```

mod fuse;

pub use fuse::FuseDataProvider;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Debug};

use crate::error::Result;

/// Index of a pool in the pool directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PoolId(pub u64);

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Registry entry for a lending pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolRef {
    pub id: PoolId,
    pub name: String,
    /// Comptroller (risk manager) address
    pub comptroller: Address,
}

/// One market of a pool, as read from chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// cToken (wrapped market) address
    pub ctoken: Address,
    /// Underlying token, `Address::ZERO` for the native-ETH market
    pub underlying: Address,
    /// cToken symbol
    pub symbol: String,
    /// Underlying token decimals
    pub decimals: u8,
    /// Whether the comptroller lists this market
    pub is_listed: bool,
    /// Collateral factor mantissa (1e18 = 100%)
    pub collateral_factor: U256,
    /// Reserve factor mantissa (1e18 = 100%)
    pub reserve_factor: U256,
    /// Underlying per cToken, scaled by 1e18
    pub exchange_rate: U256,
}

impl Asset {
    /// Whether this is the native-ETH market.
    pub fn is_ether(&self) -> bool {
        self.underlying == Address::ZERO
    }
}

/// Per-market balances of one account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetBalance {
    /// Supplied balance in cToken units
    pub supplied: U256,
    /// Borrowed balance in underlying smallest units
    pub borrowed: U256,
    /// Whether the account entered this market as collateral
    pub collateral_enabled: bool,
}

impl AssetBalance {
    pub fn is_empty(&self) -> bool {
        self.supplied.is_zero() && self.borrowed.is_zero()
    }
}

/// All balances of one account in one pool, keyed by cToken.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalances {
    pub account: Address,
    pub balances: BTreeMap<Address, AssetBalance>,
}

impl AccountBalances {
    pub fn new(account: Address) -> Self {
        Self {
            account,
            balances: BTreeMap::new(),
        }
    }

    /// Builder-style insert, mainly for tests and fixtures.
    pub fn with(mut self, ctoken: Address, balance: AssetBalance) -> Self {
        self.balances.insert(ctoken, balance);
        self
    }

    /// Markets where the account has a non-zero supplied or borrowed balance.
    pub fn held(&self) -> impl Iterator<Item = (&Address, &AssetBalance)> {
        self.balances.iter().filter(|(_, b)| !b.is_empty())
    }
}

/// Read-only access to pool state.
///
/// Implementations own transport concerns (timeouts, retries); callers treat
/// every error as a failure of the single unit being read.
#[async_trait]
pub trait ChainDataProvider: Send + Sync + Debug {
    /// All pools registered in the directory.
    async fn list_pools(&self) -> Result<Vec<PoolRef>>;

    /// Markets of a pool.
    async fn list_pool_assets(&self, pool: &PoolRef) -> Result<Vec<Asset>>;

    /// Accounts that may hold a borrow position in the pool.
    async fn list_accounts_with_positions(&self, pool: &PoolRef) -> Result<Vec<Address>>;

    /// Balances of `account` across the given markets of the pool.
    async fn get_account_balances(
        &self,
        pool: &PoolRef,
        markets: &[Address],
        account: Address,
    ) -> Result<AccountBalances>;

    /// Price oracle used by the pool.
    async fn get_price_oracle(&self, pool: &PoolRef) -> Result<Address>;

    /// Underlying price of an asset from the pool oracle, scaled by
    /// `1e(36 - decimals)`. `None` when the oracle has no price.
    async fn get_asset_price(&self, oracle: Address, asset: &Asset) -> Result<Option<U256>>;

    /// Close factor mantissa (1e18 = 100%).
    async fn get_close_factor(&self, pool: &PoolRef) -> Result<U256>;

    /// Liquidation incentive mantissa (1.08e18 = 8% bonus).
    async fn get_liquidation_incentive(&self, pool: &PoolRef) -> Result<U256>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_held_skips_empty_balances() {
        let balances = AccountBalances::new(Address::ZERO)
            .with(Address::repeat_byte(1), AssetBalance::default())
            .with(
                Address::repeat_byte(2),
                AssetBalance {
                    supplied: U256::from(10u64),
                    borrowed: U256::ZERO,
                    collateral_enabled: true,
                },
            );

        let held: Vec<_> = balances.held().map(|(a, _)| *a).collect();
        assert_eq!(held, vec![Address::repeat_byte(2)]);
    }

    #[test]
    fn test_pool_id_display() {
        assert_eq!(PoolId(7).to_string(), "#7");
    }
}
