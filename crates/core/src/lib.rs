//! Liquidation-opportunity scanner for Fuse lending pools.
//!
//! This crate provides:
//! - Position valuation with a per-cycle price book
//! - Health evaluation (healthy / liquidatable / incomplete)
//! - Liquidation candidate construction (repay/seize selection, sizing, method)
//! - Concurrent scan orchestration with per-unit failure isolation
//! - The transaction executor boundary
//! - Chain and scanner configuration

pub mod candidate;
pub mod config;
mod error;
pub mod executor;
pub mod health;
pub mod pool;
pub mod report;
mod scanner;
pub mod u256_math;
pub mod valuation;

#[cfg(test)]
mod test_utils;

pub use candidate::{CandidateBuilder, LiquidationCandidate, LiquidationMethod};
pub use config::{ChainConfig, ConfigError, ScannerSettings};
pub use error::ScanError;
pub use executor::{ExecutionOutcome, ExecutionResult, SafeLiquidatorExecutor, TransactionExecutor};
pub use health::{HealthRecord, HealthStatus};
pub use pool::Pool;
pub use report::{AccountOutcome, ScanReport, ScanSummary};
pub use scanner::{prioritize, Scanner};
pub use u256_math::UsdWad;
pub use valuation::{PriceBook, ValuatedAccount, ValuatedPosition};
