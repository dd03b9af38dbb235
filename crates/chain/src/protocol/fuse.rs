//! Fuse pool implementation of [`ChainDataProvider`].
//!
//! Pools come from the `FusePoolDirectory`; each pool is a Compound-style
//! comptroller with its own markets and price oracle.

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::{debug, instrument};

use super::{AccountBalances, Asset, AssetBalance, ChainDataProvider, PoolId, PoolRef};
use crate::contracts::{IComptroller, ICToken, IERC20, IFusePoolDirectory, IPriceOracle};
use crate::error::{ChainError, Result};
use crate::provider::ProviderManager;

/// Decimals of the native-ETH market.
const ETHER_DECIMALS: u8 = 18;

/// Reads Fuse pools over JSON-RPC.
#[derive(Debug, Clone)]
pub struct FuseDataProvider {
    /// RPC access
    rpc: ProviderManager,
    /// FusePoolDirectory address
    pool_directory: Address,
}

impl FuseDataProvider {
    pub fn new(rpc: ProviderManager, pool_directory: Address) -> Self {
        Self { rpc, pool_directory }
    }

    /// Get the pool directory address.
    pub fn pool_directory(&self) -> Address {
        self.pool_directory
    }

    /// Read one market's static data and risk parameters.
    async fn read_asset(&self, comptroller: Address, ctoken: Address) -> Result<Asset> {
        let provider = self.rpc.http()?;
        let market = ICToken::new(ctoken, &provider);
        let comptroller = IComptroller::new(comptroller, &provider);

        let is_ether_call = market.isCEther();
        let symbol_call = market.symbol();
        let reserve_factor_call = market.reserveFactorMantissa();
        let exchange_rate_call = market.exchangeRateStored();
        let listing_call = comptroller.markets(ctoken);

        let (is_ether, symbol, reserve_factor, exchange_rate, listing) = tokio::try_join!(
            self.rpc.timed("isCEther", is_ether_call.call()),
            self.rpc.timed("symbol", symbol_call.call()),
            self.rpc.timed("reserveFactorMantissa", reserve_factor_call.call()),
            self.rpc.timed("exchangeRateStored", exchange_rate_call.call()),
            self.rpc.timed("markets", listing_call.call()),
        )?;

        let (underlying, decimals) = if is_ether._0 {
            (Address::ZERO, ETHER_DECIMALS)
        } else {
            let underlying = self
                .rpc
                .timed("underlying", market.underlying().call())
                .await?
                ._0;
            let decimals = self
                .rpc
                .timed("decimals", IERC20::new(underlying, &provider).decimals().call())
                .await?
                ._0;
            (underlying, decimals)
        };

        Ok(Asset {
            ctoken,
            underlying,
            symbol: symbol._0,
            decimals,
            is_listed: listing.isListed,
            collateral_factor: listing.collateralFactorMantissa,
            reserve_factor: reserve_factor._0,
            exchange_rate: exchange_rate._0,
        })
    }

    /// Read one account's snapshot in one market.
    async fn read_snapshot(&self, ctoken: Address, account: Address) -> Result<(U256, U256)> {
        let provider = self.rpc.http()?;
        let market = ICToken::new(ctoken, &provider);
        let snapshot = self
            .rpc
            .timed("getAccountSnapshot", market.getAccountSnapshot(account).call())
            .await?;

        if !snapshot.err.is_zero() {
            return Err(ChainError::InvalidResponse {
                call: "getAccountSnapshot",
                message: format!("market {} returned error code {}", ctoken, snapshot.err),
            });
        }

        Ok((snapshot.cTokenBalance, snapshot.borrowBalance))
    }
}

#[async_trait]
impl ChainDataProvider for FuseDataProvider {
    #[instrument(skip(self), fields(directory = %self.pool_directory))]
    async fn list_pools(&self) -> Result<Vec<PoolRef>> {
        let provider = self.rpc.http()?;
        let directory = IFusePoolDirectory::new(self.pool_directory, &provider);
        let pools = self
            .rpc
            .timed("getAllPools", directory.getAllPools().call())
            .await?
            ._0;

        debug!(count = pools.len(), "Pools listed from directory");

        Ok(pools
            .into_iter()
            .enumerate()
            .map(|(index, pool)| PoolRef {
                id: PoolId(index as u64),
                name: pool.name,
                comptroller: pool.comptroller,
            })
            .collect())
    }

    async fn list_pool_assets(&self, pool: &PoolRef) -> Result<Vec<Asset>> {
        let provider = self.rpc.http()?;
        let comptroller = IComptroller::new(pool.comptroller, &provider);
        let markets = self
            .rpc
            .timed("getAllMarkets", comptroller.getAllMarkets().call())
            .await?
            ._0;

        debug!(pool = %pool.id, markets = markets.len(), "Reading pool markets");

        try_join_all(
            markets
                .into_iter()
                .map(|ctoken| self.read_asset(pool.comptroller, ctoken)),
        )
        .await
    }

    async fn list_accounts_with_positions(&self, pool: &PoolRef) -> Result<Vec<Address>> {
        let provider = self.rpc.http()?;
        let comptroller = IComptroller::new(pool.comptroller, &provider);
        let borrowers = self
            .rpc
            .timed("getAllBorrowers", comptroller.getAllBorrowers().call())
            .await?
            ._0;
        Ok(borrowers)
    }

    async fn get_account_balances(
        &self,
        pool: &PoolRef,
        markets: &[Address],
        account: Address,
    ) -> Result<AccountBalances> {
        let provider = self.rpc.http()?;
        let comptroller = IComptroller::new(pool.comptroller, &provider);

        let entered = self
            .rpc
            .timed("getAssetsIn", comptroller.getAssetsIn(account).call())
            .await?
            ._0;

        let snapshots = try_join_all(
            markets
                .iter()
                .map(|ctoken| self.read_snapshot(*ctoken, account)),
        )
        .await?;

        let mut balances = AccountBalances::new(account);
        for (ctoken, (supplied, borrowed)) in markets.iter().zip(snapshots) {
            balances.balances.insert(
                *ctoken,
                AssetBalance {
                    supplied,
                    borrowed,
                    collateral_enabled: entered.contains(ctoken),
                },
            );
        }

        Ok(balances)
    }

    async fn get_price_oracle(&self, pool: &PoolRef) -> Result<Address> {
        let provider = self.rpc.http()?;
        let comptroller = IComptroller::new(pool.comptroller, &provider);
        Ok(self
            .rpc
            .timed("oracle", comptroller.oracle().call())
            .await?
            ._0)
    }

    async fn get_asset_price(&self, oracle: Address, asset: &Asset) -> Result<Option<U256>> {
        let provider = self.rpc.http()?;
        let price = self
            .rpc
            .timed(
                "getUnderlyingPrice",
                IPriceOracle::new(oracle, &provider)
                    .getUnderlyingPrice(asset.ctoken)
                    .call(),
            )
            .await?
            ._0;

        // Compound oracles report a missing feed as zero
        Ok((!price.is_zero()).then_some(price))
    }

    async fn get_close_factor(&self, pool: &PoolRef) -> Result<U256> {
        let provider = self.rpc.http()?;
        let comptroller = IComptroller::new(pool.comptroller, &provider);
        Ok(self
            .rpc
            .timed("closeFactorMantissa", comptroller.closeFactorMantissa().call())
            .await?
            ._0)
    }

    async fn get_liquidation_incentive(&self, pool: &PoolRef) -> Result<U256> {
        let provider = self.rpc.http()?;
        let comptroller = IComptroller::new(pool.comptroller, &provider);
        Ok(self
            .rpc
            .timed(
                "liquidationIncentiveMantissa",
                comptroller.liquidationIncentiveMantissa().call(),
            )
            .await?
            ._0)
    }
}
