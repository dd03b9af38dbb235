//! Health evaluation of a valuated account.

use alloy::primitives::{Address, U256};
use serde::Serialize;
use smallvec::SmallVec;

use crate::error::ScanError;
use crate::u256_math::{wad_div, UsdWad};
use crate::valuation::ValuatedAccount;

/// Classification of one account in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Liquidatable,
    /// A held market has no price; the totals cannot be trusted.
    Incomplete,
}

/// Aggregate risk position of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthRecord {
    pub account: Address,
    /// Collateral-factor weighted value of collateral-enabled supply
    pub total_collateral_value: UsdWad,
    pub total_borrow_value: UsdWad,
    /// Collateral / borrow as a WAD, `None` without debt
    pub ratio: Option<U256>,
    pub status: HealthStatus,
    /// Held markets without a price
    pub missing_prices: SmallVec<[Address; 2]>,
}

impl HealthRecord {
    pub fn is_liquidatable(&self) -> bool {
        self.status == HealthStatus::Liquidatable
    }
}

/// Compute totals, ratio and classification.
///
/// The classification compares the integer totals; the ratio is reported
/// for display only.
pub fn evaluate(valuated: &ValuatedAccount) -> Result<HealthRecord, ScanError> {
    let mut collateral = UsdWad::ZERO;
    let mut borrow = UsdWad::ZERO;

    for position in &valuated.positions {
        if position.collateral_enabled {
            let weighted = position
                .supplied_value
                .scale(position.collateral_factor)
                .ok_or(ScanError::ArithmeticOverflow("weighted collateral"))?;
            collateral = collateral
                .checked_add(weighted)
                .ok_or(ScanError::ArithmeticOverflow("total collateral"))?;
        }
        borrow = borrow
            .checked_add(position.borrowed_value)
            .ok_or(ScanError::ArithmeticOverflow("total borrow"))?;
    }

    let ratio = if borrow.is_zero() {
        None
    } else {
        Some(wad_div(collateral.0, borrow.0).ok_or(ScanError::ArithmeticOverflow("health ratio"))?)
    };

    let status = if !valuated.missing_prices.is_empty() {
        HealthStatus::Incomplete
    } else if borrow.is_zero() || collateral >= borrow {
        HealthStatus::Healthy
    } else {
        HealthStatus::Liquidatable
    };

    Ok(HealthRecord {
        account: valuated.account,
        total_collateral_value: collateral,
        total_borrow_value: borrow,
        ratio,
        status,
        missing_prices: valuated.missing_prices.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use crate::u256_math::WAD;
    use crate::valuation::{value_account, PriceBook};
    use fuse_chain::AccountBalances;

    /// ETH collateral (cf 0.75) against USDC debt.
    fn eth_usdc_record(eth_price: u64, usdc_debt: u64, eth_price_available: bool) -> HealthRecord {
        let pool = test_pool(vec![asset(1, 18, 75), asset(2, 6, 80)]);
        let prices = PriceBook::from_prices([
            (ctoken(1), eth_price_available.then(|| usd_price(eth_price, 18))),
            (ctoken(2), Some(usd_price(1, 6))),
        ]);
        let balances = AccountBalances::new(account(9))
            .with(ctoken(1), supply(tokens(1, 18)))
            .with(ctoken(2), borrow(tokens(usdc_debt, 6)));
        evaluate(&value_account(&pool, &prices, &balances).unwrap()).unwrap()
    }

    #[test]
    fn test_healthy_account() {
        let record = eth_usdc_record(150, 100, true);
        assert_eq!(
            record.total_collateral_value.0,
            U256::from(112_500_000_000_000_000_000u128)
        );
        assert_eq!(record.total_borrow_value, UsdWad::from_usd(100));
        assert_eq!(record.ratio, Some(U256::from(1_125_000_000_000_000_000u128)));
        assert_eq!(record.status, HealthStatus::Healthy);
    }

    #[test]
    fn test_liquidatable_after_price_drop() {
        let record = eth_usdc_record(120, 100, true);
        assert_eq!(record.total_collateral_value, UsdWad::from_usd(90));
        assert_eq!(record.ratio, Some(U256::from(900_000_000_000_000_000u128)));
        assert!(record.is_liquidatable());
    }

    #[test]
    fn test_missing_price_is_incomplete() {
        let record = eth_usdc_record(120, 100, false);
        assert_eq!(record.status, HealthStatus::Incomplete);
        assert_eq!(record.missing_prices.as_slice(), &[ctoken(1)]);
        // Totals only cover priced markets
        assert_eq!(record.total_collateral_value, UsdWad::ZERO);
    }

    #[test]
    fn test_zero_debt_always_healthy() {
        let pool = test_pool(vec![asset(1, 18, 75)]);
        let prices = PriceBook::from_prices([(ctoken(1), Some(usd_price(150, 18)))]);

        let with_collateral = AccountBalances::new(account(9)).with(ctoken(1), supply(tokens(1, 18)));
        let record = evaluate(&value_account(&pool, &prices, &with_collateral).unwrap()).unwrap();
        assert_eq!(record.status, HealthStatus::Healthy);
        assert_eq!(record.ratio, None);

        let empty = AccountBalances::new(account(9));
        let record = evaluate(&value_account(&pool, &prices, &empty).unwrap()).unwrap();
        assert_eq!(record.status, HealthStatus::Healthy);
        assert_eq!(record.ratio, None);
    }

    #[test]
    fn test_ratio_exactly_one_is_healthy() {
        // $100 of ETH at cf 0.75 = $75 weighted against $75 debt
        let record = eth_usdc_record(100, 75, true);
        assert_eq!(record.ratio, Some(WAD));
        assert_eq!(record.status, HealthStatus::Healthy);
    }

    #[test]
    fn test_supply_not_entered_as_collateral_ignored() {
        let pool = test_pool(vec![asset(1, 18, 75), asset(2, 6, 80)]);
        let prices = PriceBook::from_prices([
            (ctoken(1), Some(usd_price(150, 18))),
            (ctoken(2), Some(usd_price(1, 6))),
        ]);
        let mut not_entered = supply(tokens(1, 18));
        not_entered.collateral_enabled = false;
        let balances = AccountBalances::new(account(9))
            .with(ctoken(1), not_entered)
            .with(ctoken(2), borrow(tokens(10, 6)));

        let record = evaluate(&value_account(&pool, &prices, &balances).unwrap()).unwrap();
        assert_eq!(record.total_collateral_value, UsdWad::ZERO);
        assert!(record.is_liquidatable());
    }

    #[test]
    fn test_unpriced_supply_without_debt_is_incomplete() {
        let pool = test_pool(vec![asset(1, 18, 75), asset(2, 6, 80)]);
        let prices = PriceBook::from_prices([
            (ctoken(1), None),
            (ctoken(2), Some(usd_price(1, 6))),
        ]);
        let balances = AccountBalances::new(account(9)).with(ctoken(1), supply(tokens(1, 18)));

        let record = evaluate(&value_account(&pool, &prices, &balances).unwrap()).unwrap();
        assert_eq!(record.total_borrow_value, UsdWad::ZERO);
        assert_eq!(record.ratio, None);
        assert_eq!(record.status, HealthStatus::Incomplete);
        assert_eq!(record.missing_prices.as_slice(), &[ctoken(1)]);
    }
}
