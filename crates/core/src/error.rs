//! Scan error taxonomy.
//!
//! Every variant except [`ScanError::ProviderUnreachable`] is local to one
//! unit (asset price, account, pool) and degrades only that unit's result.

use alloy::primitives::{Address, U256};
use fuse_chain::{ChainError, PoolId};

use crate::u256_math::UsdWad;

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The pool oracle has no price for a held asset.
    #[error("price unavailable for {asset} in pool {pool}")]
    PriceUnavailable { pool: PoolId, asset: Address },

    /// Neither held funds nor flash-swap liquidity cover the repay amount.
    #[error("insufficient liquidity for {asset}: need {required}, flash capacity {available}")]
    InsufficientLiquidity {
        asset: Address,
        required: U256,
        available: U256,
    },

    /// A chain read failed or timed out.
    #[error("chain read failed ({context}): {source}")]
    ChainReadFailure {
        context: String,
        #[source]
        source: ChainError,
    },

    /// Pool data is inconsistent; the pool is skipped.
    #[error("invalid configuration in pool {pool}: {reason}")]
    InvalidPoolConfiguration { pool: PoolId, reason: String },

    #[error("account has no seizable collateral")]
    NoSeizableCollateral,

    #[error("computed repay amount is zero")]
    ZeroRepayAmount,

    /// Liquidatable, but the debt is below the configured minimum.
    #[error("total borrow value {value} below configured minimum {minimum}")]
    BelowMinimumBorrow { value: UsdWad, minimum: UsdWad },

    #[error("arithmetic overflow in {0}")]
    ArithmeticOverflow(&'static str),

    /// The pool directory cannot be read; nothing can be scanned.
    #[error("chain data provider unreachable: {0}")]
    ProviderUnreachable(#[source] ChainError),
}

impl ScanError {
    pub fn read_failure(context: impl Into<String>, source: ChainError) -> Self {
        Self::ChainReadFailure {
            context: context.into(),
            source,
        }
    }

    pub fn invalid_pool(pool: PoolId, reason: impl Into<String>) -> Self {
        Self::InvalidPoolConfiguration {
            pool,
            reason: reason.into(),
        }
    }

    /// Stable machine-readable tag, used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PriceUnavailable { .. } => "price_unavailable",
            Self::InsufficientLiquidity { .. } => "insufficient_liquidity",
            Self::ChainReadFailure { .. } => "chain_read_failure",
            Self::InvalidPoolConfiguration { .. } => "invalid_pool_configuration",
            Self::NoSeizableCollateral => "no_seizable_collateral",
            Self::ZeroRepayAmount => "zero_repay_amount",
            Self::BelowMinimumBorrow { .. } => "below_minimum_borrow",
            Self::ArithmeticOverflow(_) => "arithmetic_overflow",
            Self::ProviderUnreachable(_) => "provider_unreachable",
        }
    }

    /// Whether a liquidatable account failing with this error is reported as
    /// unexecutable (as opposed to a read failure).
    pub fn is_unexecutable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientLiquidity { .. }
                | Self::NoSeizableCollateral
                | Self::ZeroRepayAmount
                | Self::BelowMinimumBorrow { .. }
        )
    }
}
