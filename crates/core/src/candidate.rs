//! Liquidation candidate construction.
//!
//! For a liquidatable account: pick the repay and seize markets, size the
//! repay amount under the close factor and the seizable collateral, and pick
//! the funding method. Nothing here touches the chain except the funding
//! reads.

use alloy::primitives::{Address, U256};
use fuse_chain::{Asset, LiquidationFunding, PoolId};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::ScanError;
use crate::health::HealthRecord;
use crate::pool::Pool;
use crate::scanner::bounded;
use crate::u256_math::{mul_div, wad_mul, UsdWad, WAD};
use crate::valuation::{ValuatedAccount, ValuatedPosition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LiquidationMethod {
    /// Repay from funds the liquidator holds.
    Direct,
    /// Repay with a flash swap settled from the seized collateral.
    FlashAssisted,
}

/// A fully specified liquidation intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiquidationCandidate {
    pub pool: PoolId,
    pub comptroller: Address,
    pub account: Address,
    pub repay_asset: Asset,
    pub seize_asset: Asset,
    /// Repay amount in repay-underlying units
    pub repay_amount: U256,
    pub repay_value: UsdWad,
    /// Seize-underlying units expected for the repay amount
    pub expected_seize_amount: U256,
    pub method: LiquidationMethod,
    /// Total debt of the account, the ordering key
    pub total_borrow_value: UsdWad,
    /// 1-based priority, assigned after the cycle joins
    pub rank: usize,
}

/// Repay sizing for one (repay, seize) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepaySize {
    pub amount: U256,
    pub value: UsdWad,
    pub expected_seize_amount: U256,
}

/// Builds candidates, consulting the funding strategy for the method.
#[derive(Debug, Clone)]
pub struct CandidateBuilder {
    funding: Arc<dyn LiquidationFunding>,
    read_timeout: Duration,
}

impl CandidateBuilder {
    pub fn new(funding: Arc<dyn LiquidationFunding>, read_timeout: Duration) -> Self {
        Self {
            funding,
            read_timeout,
        }
    }

    /// Build the candidate for a liquidatable account.
    ///
    /// Unexecutable accounts come back as errors for which
    /// [`ScanError::is_unexecutable`] holds.
    pub async fn build(
        &self,
        pool: &Pool,
        valuated: &ValuatedAccount,
        health: &HealthRecord,
    ) -> Result<LiquidationCandidate, ScanError> {
        let repay = select_repay(&valuated.positions).ok_or(ScanError::ZeroRepayAmount)?;
        let seize = select_seize(&valuated.positions).ok_or(ScanError::NoSeizableCollateral)?;
        let size = size_repay(pool, repay, seize)?;

        let (Some(repay_asset), Some(seize_asset)) = (pool.asset(&repay.ctoken), pool.asset(&seize.ctoken))
        else {
            return Err(ScanError::invalid_pool(pool.id(), "valuated market missing from pool"));
        };

        let method = self.select_method(repay_asset, seize_asset, size.amount).await?;

        debug!(
            pool = %pool.id(),
            account = %valuated.account,
            repay = %repay_asset.symbol,
            seize = %seize_asset.symbol,
            repay_value = %size.value,
            method = ?method,
            "Candidate built"
        );

        Ok(LiquidationCandidate {
            pool: pool.id(),
            comptroller: pool.reference.comptroller,
            account: valuated.account,
            repay_asset: repay_asset.clone(),
            seize_asset: seize_asset.clone(),
            repay_amount: size.amount,
            repay_value: size.value,
            expected_seize_amount: size.expected_seize_amount,
            method,
            total_borrow_value: health.total_borrow_value,
            rank: 0,
        })
    }

    /// Direct when the liquidator already holds the amount, otherwise flash
    /// assisted when the flash source can cover it. No smaller retry.
    async fn select_method(
        &self,
        repay: &Asset,
        seize: &Asset,
        amount: U256,
    ) -> Result<LiquidationMethod, ScanError> {
        let held = bounded(
            self.read_timeout,
            || format!("held balance of {}", repay.symbol),
            self.funding.held_balance(repay.underlying),
        )
        .await?;
        if held >= amount {
            return Ok(LiquidationMethod::Direct);
        }

        let capacity = bounded(
            self.read_timeout,
            || format!("flash capacity {} -> {}", repay.symbol, seize.symbol),
            self.funding.flash_capacity(repay, seize),
        )
        .await?;
        if capacity >= amount {
            Ok(LiquidationMethod::FlashAssisted)
        } else {
            Err(ScanError::InsufficientLiquidity {
                asset: repay.ctoken,
                required: amount,
                available: capacity,
            })
        }
    }
}

/// Borrowed market with the largest debt value; ties go to the lowest cToken.
pub fn select_repay(positions: &[ValuatedPosition]) -> Option<&ValuatedPosition> {
    positions
        .iter()
        .filter(|p| !p.borrowed.is_zero())
        .max_by(|a, b| {
            a.borrowed_value
                .cmp(&b.borrowed_value)
                .then_with(|| b.ctoken.cmp(&a.ctoken))
        })
}

/// Collateral-enabled market with the largest supplied value; ties go to the
/// lowest cToken.
pub fn select_seize(positions: &[ValuatedPosition]) -> Option<&ValuatedPosition> {
    positions
        .iter()
        .filter(|p| p.collateral_enabled && !p.supplied_underlying.is_zero())
        .max_by(|a, b| {
            a.supplied_value
                .cmp(&b.supplied_value)
                .then_with(|| b.ctoken.cmp(&a.ctoken))
        })
}

/// `min(debt, debt × closeFactor)`, further capped so that
/// `repayValue × incentive` does not exceed the seize market's supplied value.
pub fn size_repay(
    pool: &Pool,
    repay: &ValuatedPosition,
    seize: &ValuatedPosition,
) -> Result<RepaySize, ScanError> {
    let overflow = |what| ScanError::ArithmeticOverflow(what);

    let close_cap = wad_mul(repay.borrowed, pool.close_factor).ok_or(overflow("close factor cap"))?;
    let debt_cap = repay.borrowed.min(close_cap);

    let max_repay_value = mul_div(seize.supplied_value.0, WAD, pool.liquidation_incentive)
        .ok_or(overflow("seizable repay value"))?;
    let seize_cap = UsdWad(max_repay_value)
        .to_underlying(repay.price)
        .ok_or(overflow("seizable repay amount"))?;

    let amount = debt_cap.min(seize_cap);
    if amount.is_zero() {
        return Err(ScanError::ZeroRepayAmount);
    }

    let value = UsdWad::of_underlying(amount, repay.price).ok_or(overflow("repay value"))?;
    let seize_value = value
        .scale(pool.liquidation_incentive)
        .ok_or(overflow("seize value"))?;
    let expected_seize_amount = seize_value
        .to_underlying(seize.price)
        .ok_or(overflow("seize amount"))?
        .min(seize.supplied_underlying);

    Ok(RepaySize {
        amount,
        value,
        expected_seize_amount,
    })
}
