//! Liquidation funding strategies.
//!
//! A liquidation repays part of the borrower's debt. The liquidator either
//! holds the repay token already, or borrows it for the duration of the
//! transaction through a flash swap. [`LiquidationFunding`] answers both
//! questions; [`UniswapV2Funding`] is the flash-swap source used by the Fuse
//! safe liquidator.

use alloy::primitives::{Address, U256};
use alloy::providers::Provider;
use async_trait::async_trait;
use std::fmt::Debug;
use tracing::debug;

use crate::contracts::{IERC20, IUniswapV2Factory, IUniswapV2Pair};
use crate::error::Result;
use crate::protocol::Asset;
use crate::provider::ProviderManager;

/// Sizing strategy for the repay side of a liquidation.
#[async_trait]
pub trait LiquidationFunding: Send + Sync + Debug {
    /// Amount of `underlying` the liquidator holds (`Address::ZERO` = native ETH).
    async fn held_balance(&self, underlying: Address) -> Result<U256>;

    /// Largest amount of the repay asset's underlying that can be flash
    /// borrowed for a liquidation seizing `seize`. Zero when no route exists.
    async fn flash_capacity(&self, repay: &Asset, seize: &Asset) -> Result<U256>;
}

/// Flash swaps from Uniswap V2 pairs.
///
/// The repay token (WETH for the ETH market) is borrowed from its pair with
/// WETH. When the repay token is WETH itself, the pair with the seized
/// collateral's underlying is used, or the configured fallback token when the
/// collateral is also ETH.
#[derive(Debug, Clone)]
pub struct UniswapV2Funding {
    rpc: ProviderManager,
    /// Liquidator account (holder of direct-repay funds); without one every
    /// liquidation must be flash funded
    liquidator: Option<Address>,
    /// Uniswap V2 factory
    factory: Address,
    /// Wrapped ether token
    weth: Address,
    /// Counter token for WETH flash swaps when the collateral is ETH
    fallback_pair_token: Address,
}

impl UniswapV2Funding {
    pub fn new(
        rpc: ProviderManager,
        liquidator: Option<Address>,
        factory: Address,
        weth: Address,
        fallback_pair_token: Address,
    ) -> Self {
        Self {
            rpc,
            liquidator,
            factory,
            weth,
            fallback_pair_token,
        }
    }

    /// Token actually borrowed in the flash swap for a repay asset.
    fn flash_token(&self, asset: &Asset) -> Address {
        if asset.is_ether() {
            self.weth
        } else {
            asset.underlying
        }
    }

    /// Token paired with the borrowed token in the flash-swap pool.
    pub fn counter_token(&self, repay: &Asset, seize: &Asset) -> Address {
        let borrowed = self.flash_token(repay);
        if borrowed != self.weth {
            return self.weth;
        }
        let collateral = self.flash_token(seize);
        if collateral != self.weth {
            collateral
        } else {
            self.fallback_pair_token
        }
    }
}

#[async_trait]
impl LiquidationFunding for UniswapV2Funding {
    async fn held_balance(&self, underlying: Address) -> Result<U256> {
        let Some(liquidator) = self.liquidator else {
            return Ok(U256::ZERO);
        };
        let provider = self.rpc.http()?;
        if underlying == Address::ZERO {
            return self
                .rpc
                .timed("eth_getBalance", provider.get_balance(liquidator))
                .await;
        }

        Ok(self
            .rpc
            .timed(
                "balanceOf",
                IERC20::new(underlying, &provider)
                    .balanceOf(liquidator)
                    .call(),
            )
            .await?
            ._0)
    }

    async fn flash_capacity(&self, repay: &Asset, seize: &Asset) -> Result<U256> {
        let borrowed = self.flash_token(repay);
        let counter = self.counter_token(repay, seize);
        if borrowed == counter {
            return Ok(U256::ZERO);
        }

        let provider = self.rpc.http()?;
        let pair = self
            .rpc
            .timed(
                "getPair",
                IUniswapV2Factory::new(self.factory, &provider)
                    .getPair(borrowed, counter)
                    .call(),
            )
            .await?
            .pair;

        if pair == Address::ZERO {
            debug!(token = %borrowed, counter = %counter, "No flash-swap pair");
            return Ok(U256::ZERO);
        }

        let pair_contract = IUniswapV2Pair::new(pair, &provider);
        let token0_call = pair_contract.token0();
        let reserves_call = pair_contract.getReserves();
        let (token0, reserves) = tokio::try_join!(
            self.rpc.timed("token0", token0_call.call()),
            self.rpc.timed("getReserves", reserves_call.call()),
        )?;

        let reserve = if token0._0 == borrowed {
            U256::from(reserves.reserve0)
        } else {
            U256::from(reserves.reserve1)
        };

        // A pair can never be drained to zero
        Ok(reserve.saturating_sub(U256::from(1u8)))
    }
}
