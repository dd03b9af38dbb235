//! U256 fixed-point arithmetic for valuation and liquidation sizing.
//!
//! All amounts flowing through the scanner are integers. Risk parameters
//! (collateral factor, close factor, liquidation incentive, exchange rate)
//! are WAD mantissas, and USD values are 18-decimal [`UsdWad`]s. Every
//! multiplication is checked; overflow surfaces as `None` and the caller
//! reports it instead of wrapping.

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

/// WAD constant: 1e18 for 18-decimal fixed-point arithmetic
pub const WAD: U256 = U256::from_limbs([1_000_000_000_000_000_000u64, 0, 0, 0]);

/// Basis points denominator (10000 = 100%)
pub const BPS_DENOMINATOR: U256 = U256::from_limbs([10000u64, 0, 0, 0]);

/// Power of ten as U256.
#[inline]
pub fn pow10(exp: u8) -> U256 {
    U256::from(10u64).pow(U256::from(exp))
}

/// `a * b / denominator` with overflow and division-by-zero checks.
#[inline]
pub fn mul_div(a: U256, b: U256, denominator: U256) -> Option<U256> {
    if denominator.is_zero() {
        return None;
    }
    a.checked_mul(b).map(|product| product / denominator)
}

/// Multiply two WAD values: (a * b) / WAD
#[inline]
pub fn wad_mul(a: U256, b: U256) -> Option<U256> {
    mul_div(a, b, WAD)
}

/// Divide two WAD values: (a * WAD) / b
#[inline]
pub fn wad_div(a: U256, b: U256) -> Option<U256> {
    mul_div(a, WAD, b)
}

/// Apply basis points reduction (e.g., for slippage).
/// Returns: value * (10000 - basis_points) / 10000
#[inline]
pub fn apply_basis_points(value: U256, basis_points: u16) -> Option<U256> {
    let factor = U256::from(10000u16.saturating_sub(basis_points));
    mul_div(value, factor, BPS_DENOMINATOR)
}

/// Convert WAD (18 decimals) to f64.
/// Use only for display/logging, not for computation.
pub fn wad_to_f64(wad: U256) -> f64 {
    if wad <= U256::from(u128::MAX) {
        let value: u128 = wad.to();
        value as f64 / 1e18
    } else {
        let limbs = wad.as_limbs();
        let high = limbs[1] as f64 * (u64::MAX as f64 + 1.0);
        let low = limbs[0] as f64;
        (high + low) / 1e18
    }
}

/// Convert a non-negative f64 to WAD. Used for thresholds read from config.
pub fn f64_to_wad(value: f64) -> U256 {
    if !value.is_finite() || value <= 0.0 {
        return U256::ZERO;
    }
    U256::from((value * 1e18) as u128)
}

/// USD value with 18 decimals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsdWad(pub U256);

impl UsdWad {
    pub const ZERO: Self = Self(U256::ZERO);

    /// Whole dollars, for fixtures and thresholds.
    pub fn from_usd(dollars: u64) -> Self {
        Self(U256::from(dollars) * WAD)
    }

    /// Value of `amount` underlying units at a Compound-convention price
    /// (mantissa scaled by `1e(36 - decimals)`).
    pub fn of_underlying(amount: U256, price: U256) -> Option<Self> {
        mul_div(amount, price, WAD).map(Self)
    }

    /// Underlying units worth this value at a Compound-convention price.
    pub fn to_underlying(self, price: U256) -> Option<U256> {
        mul_div(self.0, WAD, price)
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Scale by a WAD mantissa (collateral factor, incentive, ...).
    pub fn scale(self, mantissa: U256) -> Option<Self> {
        wad_mul(self.0, mantissa).map(Self)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn as_f64(&self) -> f64 {
        wad_to_f64(self.0)
    }
}

impl Add for UsdWad {
    type Output = Self;

    /// Saturating; use [`UsdWad::checked_add`] where overflow must be reported.
    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl fmt::Display for UsdWad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.as_f64())
    }
}
