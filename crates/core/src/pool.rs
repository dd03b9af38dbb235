//! Pool snapshot assembled at the start of a pool scan.

use alloy::primitives::{Address, U256};
use fuse_chain::{Asset, PoolId, PoolRef};
use serde::Serialize;
use std::collections::HashSet;

use crate::error::ScanError;
use crate::u256_math::WAD;

/// Largest decimals value the price convention `1e(36 - decimals)` allows.
const MAX_DECIMALS: u8 = 36;

/// One pool with its risk parameters and markets, read fresh every scan.
#[derive(Debug, Clone, Serialize)]
pub struct Pool {
    pub reference: PoolRef,
    /// Price oracle address
    pub oracle: Address,
    /// Close factor mantissa
    pub close_factor: U256,
    /// Liquidation incentive mantissa (>= 1e18)
    pub liquidation_incentive: U256,
    pub assets: Vec<Asset>,
}

impl Pool {
    /// Assemble a pool, rejecting inconsistent data.
    pub fn new(
        reference: PoolRef,
        oracle: Address,
        close_factor: U256,
        liquidation_incentive: U256,
        assets: Vec<Asset>,
    ) -> Result<Self, ScanError> {
        let pool = Self {
            reference,
            oracle,
            close_factor,
            liquidation_incentive,
            assets,
        };
        pool.validate()?;
        Ok(pool)
    }

    pub fn id(&self) -> PoolId {
        self.reference.id
    }

    /// cToken addresses of every market, in listing order.
    pub fn markets(&self) -> Vec<Address> {
        self.assets.iter().map(|a| a.ctoken).collect()
    }

    pub fn asset(&self, ctoken: &Address) -> Option<&Asset> {
        self.assets.iter().find(|a| a.ctoken == *ctoken)
    }

    fn validate(&self) -> Result<(), ScanError> {
        let id = self.id();
        let invalid = |reason: String| Err(ScanError::invalid_pool(id, reason));

        if self.reference.comptroller == Address::ZERO {
            return invalid("comptroller is the zero address".into());
        }
        if self.oracle == Address::ZERO {
            return invalid("price oracle is the zero address".into());
        }
        if self.close_factor.is_zero() || self.close_factor > WAD {
            return invalid(format!("close factor {} outside (0, 1e18]", self.close_factor));
        }
        if self.liquidation_incentive < WAD {
            return invalid(format!(
                "liquidation incentive {} below 1e18",
                self.liquidation_incentive
            ));
        }
        if self.assets.is_empty() {
            return invalid("pool has no markets".into());
        }

        let mut seen = HashSet::with_capacity(self.assets.len());
        for asset in &self.assets {
            if asset.ctoken == Address::ZERO {
                return invalid(format!("market {} has no cToken address", asset.symbol));
            }
            if !seen.insert(asset.ctoken) {
                return invalid(format!("market {} listed twice", asset.ctoken));
            }
            if !asset.is_listed {
                return invalid(format!("market {} is not listed by the comptroller", asset.ctoken));
            }
            if asset.collateral_factor > WAD {
                return invalid(format!("market {} collateral factor above 1e18", asset.ctoken));
            }
            if asset.reserve_factor > WAD {
                return invalid(format!("market {} reserve factor above 1e18", asset.ctoken));
            }
            if asset.exchange_rate.is_zero() {
                return invalid(format!("market {} has a zero exchange rate", asset.ctoken));
            }
            if asset.decimals > MAX_DECIMALS {
                return invalid(format!("market {} has {} decimals", asset.ctoken, asset.decimals));
            }
        }

        Ok(())
    }
}
