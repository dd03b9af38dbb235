//! Position valuation: raw balances to 18-decimal USD values.
//!
//! Prices are read once per pool per cycle into a [`PriceBook`] shared by
//! every account task of the pool. Assets without a price are never valued
//! as zero; they are reported back so the account can be marked incomplete.

use alloy::primitives::{Address, U256};
use fuse_chain::{AccountBalances, ChainDataProvider};
use futures::{stream, StreamExt};
use serde::Serialize;
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::ScanError;
use crate::pool::Pool;
use crate::scanner::bounded;
use crate::u256_math::{mul_div, UsdWad, WAD};

/// Underlying prices of one pool for one cycle, keyed by cToken.
/// `None` marks a price the oracle could not provide.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceBook {
    prices: BTreeMap<Address, Option<U256>>,
}

impl PriceBook {
    /// Read every market price of the pool with bounded concurrency.
    ///
    /// Failed reads are returned alongside the book and count as unavailable.
    pub async fn fetch(
        provider: &dyn ChainDataProvider,
        pool: &Pool,
        timeout: Duration,
        concurrency: usize,
    ) -> (Self, Vec<ScanError>) {
        let reads = stream::iter(pool.assets.iter())
            .map(|asset| async move {
                let price = bounded(
                    timeout,
                    || format!("pool {} price of {}", pool.id(), asset.ctoken),
                    provider.get_asset_price(pool.oracle, asset),
                )
                .await;
                (asset.ctoken, price)
            })
            .buffer_unordered(concurrency.max(1))
            .collect::<Vec<_>>()
            .await;

        let mut book = Self::default();
        let mut errors = Vec::new();
        for (ctoken, price) in reads {
            match price {
                Ok(price) => {
                    book.prices.insert(ctoken, price);
                }
                Err(e) => {
                    warn!(pool = %pool.id(), ctoken = %ctoken, error = %e, "Price read failed");
                    book.prices.insert(ctoken, None);
                    errors.push(e);
                }
            }
        }

        let missing = book.unavailable().count();
        debug!(pool = %pool.id(), priced = book.prices.len() - missing, missing, "Price book ready");

        (book, errors)
    }

    /// Build a book from known prices, mainly for tests.
    pub fn from_prices(prices: impl IntoIterator<Item = (Address, Option<U256>)>) -> Self {
        Self {
            prices: prices.into_iter().collect(),
        }
    }

    /// Price of a market, `None` when unavailable or never read.
    pub fn price(&self, ctoken: &Address) -> Option<U256> {
        self.prices.get(ctoken).copied().flatten()
    }

    /// Markets whose price is unavailable this cycle.
    pub fn unavailable(&self) -> impl Iterator<Item = &Address> {
        self.prices
            .iter()
            .filter(|(_, price)| price.is_none())
            .map(|(ctoken, _)| ctoken)
    }
}

/// One account's position in one market, valued in USD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValuatedPosition {
    pub ctoken: Address,
    pub collateral_enabled: bool,
    /// Collateral factor mantissa of the market
    pub collateral_factor: U256,
    /// Underlying price mantissa used for the valuation
    pub price: U256,
    /// Supplied balance converted to underlying units
    pub supplied_underlying: U256,
    /// Borrowed balance in underlying units
    pub borrowed: U256,
    pub supplied_value: UsdWad,
    pub borrowed_value: UsdWad,
}

/// Every priced position of one account, plus the held markets that could
/// not be priced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValuatedAccount {
    pub account: Address,
    pub positions: SmallVec<[ValuatedPosition; 4]>,
    pub missing_prices: SmallVec<[Address; 2]>,
}

/// Value every held market of an account.
pub fn value_account(
    pool: &Pool,
    prices: &PriceBook,
    balances: &AccountBalances,
) -> Result<ValuatedAccount, ScanError> {
    let mut valuated = ValuatedAccount {
        account: balances.account,
        positions: SmallVec::new(),
        missing_prices: SmallVec::new(),
    };

    for (ctoken, balance) in balances.held() {
        let Some(asset) = pool.asset(ctoken) else {
            debug!(pool = %pool.id(), ctoken = %ctoken, "Balance in unknown market ignored");
            continue;
        };
        let Some(price) = prices.price(ctoken) else {
            valuated.missing_prices.push(*ctoken);
            continue;
        };

        let supplied_underlying = mul_div(balance.supplied, asset.exchange_rate, WAD)
            .ok_or(ScanError::ArithmeticOverflow("supplied underlying"))?;
        let supplied_value = UsdWad::of_underlying(supplied_underlying, price)
            .ok_or(ScanError::ArithmeticOverflow("supplied value"))?;
        let borrowed_value = UsdWad::of_underlying(balance.borrowed, price)
            .ok_or(ScanError::ArithmeticOverflow("borrowed value"))?;

        valuated.positions.push(ValuatedPosition {
            ctoken: *ctoken,
            collateral_enabled: balance.collateral_enabled,
            collateral_factor: asset.collateral_factor,
            price,
            supplied_underlying,
            borrowed: balance.borrowed,
            supplied_value,
            borrowed_value,
        });
    }

    Ok(valuated)
}
