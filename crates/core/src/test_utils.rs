//! In-memory collaborators and fixtures for scanner tests.

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use fuse_chain::{
    AccountBalances, Asset, AssetBalance, ChainDataProvider, ChainError, LiquidationFunding, PoolId,
    PoolRef, Result as ChainResult,
};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::pool::Pool;
use crate::u256_math::{pow10, WAD};

pub fn ctoken(n: u8) -> Address {
    Address::repeat_byte(n)
}

pub fn underlying(n: u8) -> Address {
    Address::repeat_byte(n + 0x40)
}

pub fn account(n: u8) -> Address {
    Address::repeat_byte(n + 0x80)
}

/// Percentage as a WAD mantissa.
pub fn wad_fraction(percent: u64) -> U256 {
    U256::from(percent) * pow10(16)
}

/// Compound-convention price mantissa for a whole-dollar price.
pub fn usd_price(dollars: u64, decimals: u8) -> U256 {
    U256::from(dollars) * pow10(36 - decimals)
}

pub fn tokens(amount: u64, decimals: u8) -> U256 {
    U256::from(amount) * pow10(decimals)
}

/// Collateral-enabled supply; exchange rates in fixtures are 1:1.
pub fn supply(ctokens: U256) -> AssetBalance {
    AssetBalance {
        supplied: ctokens,
        borrowed: U256::ZERO,
        collateral_enabled: true,
    }
}

pub fn borrow(amount: U256) -> AssetBalance {
    AssetBalance {
        supplied: U256::ZERO,
        borrowed: amount,
        collateral_enabled: false,
    }
}

pub fn asset(n: u8, decimals: u8, collateral_percent: u64) -> Asset {
    Asset {
        ctoken: ctoken(n),
        underlying: underlying(n),
        symbol: format!("f{n}"),
        decimals,
        is_listed: true,
        collateral_factor: wad_fraction(collateral_percent),
        reserve_factor: wad_fraction(10),
        exchange_rate: WAD,
    }
}

pub fn ether_asset(n: u8, collateral_percent: u64) -> Asset {
    Asset {
        underlying: Address::ZERO,
        symbol: "fETH".to_string(),
        ..asset(n, 18, collateral_percent)
    }
}

pub fn pool_ref(id: u64) -> PoolRef {
    PoolRef {
        id: PoolId(id),
        name: format!("Pool {id}"),
        comptroller: Address::repeat_byte(0xc0 + id as u8),
    }
}

pub const ORACLE: Address = Address::repeat_byte(0x0a);

/// Pool 0 with a 50% close factor and an 8% liquidation incentive.
pub fn test_pool(assets: Vec<Asset>) -> Pool {
    Pool::new(pool_ref(0), ORACLE, wad_fraction(50), wad_fraction(108), assets)
        .expect("valid test pool")
}

/// In-memory chain state.
#[derive(Debug, Default)]
pub struct MockChain {
    pools: Vec<PoolRef>,
    assets: HashMap<PoolId, Vec<Asset>>,
    accounts: HashMap<PoolId, Vec<Address>>,
    balances: HashMap<(PoolId, Address), AccountBalances>,
    prices: HashMap<Address, U256>,
    failing_prices: HashSet<Address>,
    failing_accounts: HashSet<Address>,
    slow_accounts: HashSet<Address>,
    failing_pools: HashSet<PoolId>,
    directory_down: bool,
}

impl MockChain {
    pub fn with_pool(mut self, id: u64, assets: Vec<Asset>) -> Self {
        self.pools.push(pool_ref(id));
        self.assets.insert(PoolId(id), assets);
        self
    }

    /// Register a borrower; listing the same account twice is allowed.
    pub fn with_account(mut self, pool: u64, balances: AccountBalances) -> Self {
        self.accounts.entry(PoolId(pool)).or_default().push(balances.account);
        self.balances.insert((PoolId(pool), balances.account), balances);
        self
    }

    pub fn with_price(mut self, ctoken: Address, price: U256) -> Self {
        self.prices.insert(ctoken, price);
        self
    }

    pub fn with_failing_price(mut self, ctoken: Address) -> Self {
        self.failing_prices.insert(ctoken);
        self
    }

    pub fn with_failing_account(mut self, account: Address) -> Self {
        self.failing_accounts.insert(account);
        self
    }

    /// Balance reads for this account never complete in time.
    pub fn with_slow_account(mut self, account: Address) -> Self {
        self.slow_accounts.insert(account);
        self
    }

    /// Market listing of this pool fails.
    pub fn with_failing_pool(mut self, id: u64) -> Self {
        self.failing_pools.insert(PoolId(id));
        self
    }

    pub fn with_directory_down(mut self) -> Self {
        self.directory_down = true;
        self
    }
}

#[async_trait]
impl ChainDataProvider for MockChain {
    async fn list_pools(&self) -> ChainResult<Vec<PoolRef>> {
        if self.directory_down {
            return Err(ChainError::Rpc("connection refused".into()));
        }
        Ok(self.pools.clone())
    }

    async fn list_pool_assets(&self, pool: &PoolRef) -> ChainResult<Vec<Asset>> {
        if self.failing_pools.contains(&pool.id) {
            return Err(ChainError::contract("getAllMarkets", "execution reverted"));
        }
        Ok(self.assets.get(&pool.id).cloned().unwrap_or_default())
    }

    async fn list_accounts_with_positions(&self, pool: &PoolRef) -> ChainResult<Vec<Address>> {
        Ok(self.accounts.get(&pool.id).cloned().unwrap_or_default())
    }

    async fn get_account_balances(
        &self,
        pool: &PoolRef,
        _markets: &[Address],
        account: Address,
    ) -> ChainResult<AccountBalances> {
        if self.slow_accounts.contains(&account) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.failing_accounts.contains(&account) {
            return Err(ChainError::Rpc("rate limited".into()));
        }
        Ok(self
            .balances
            .get(&(pool.id, account))
            .cloned()
            .unwrap_or_else(|| AccountBalances::new(account)))
    }

    async fn get_price_oracle(&self, _pool: &PoolRef) -> ChainResult<Address> {
        Ok(ORACLE)
    }

    async fn get_asset_price(&self, _oracle: Address, asset: &Asset) -> ChainResult<Option<U256>> {
        if self.failing_prices.contains(&asset.ctoken) {
            return Err(ChainError::contract("getUnderlyingPrice", "execution reverted"));
        }
        Ok(self.prices.get(&asset.ctoken).copied())
    }

    async fn get_close_factor(&self, _pool: &PoolRef) -> ChainResult<U256> {
        Ok(wad_fraction(50))
    }

    async fn get_liquidation_incentive(&self, _pool: &PoolRef) -> ChainResult<U256> {
        Ok(wad_fraction(108))
    }
}

/// Funding with fixed held balances and a single flash capacity.
#[derive(Debug, Default)]
pub struct MockFunding {
    held: HashMap<Address, U256>,
    flash_capacity: U256,
}

impl MockFunding {
    pub fn with_held(mut self, underlying: Address, amount: U256) -> Self {
        self.held.insert(underlying, amount);
        self
    }

    pub fn with_flash_capacity(mut self, capacity: U256) -> Self {
        self.flash_capacity = capacity;
        self
    }
}

#[async_trait]
impl LiquidationFunding for MockFunding {
    async fn held_balance(&self, underlying: Address) -> ChainResult<U256> {
        Ok(self.held.get(&underlying).copied().unwrap_or_default())
    }

    async fn flash_capacity(&self, _repay: &Asset, _seize: &Asset) -> ChainResult<U256> {
        Ok(self.flash_capacity)
    }
}
