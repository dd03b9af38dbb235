//! Transaction execution boundary.
//!
//! The scanner stops at ordered [`LiquidationCandidate`]s. An executor turns
//! each into a transaction, submits it and reports the outcome; one failed
//! submission never stops the rest of the batch.

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use fuse_chain::{FundingMode, LiquidationCall, PoolId, SafeLiquidatorContract, TransactionSender};
use serde::Serialize;
use std::time::Instant;
use tracing::{info, instrument, warn};

use crate::candidate::{LiquidationCandidate, LiquidationMethod};
use crate::error::ScanError;
use crate::u256_math::apply_basis_points;

/// Outcome of one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// Mined with a successful receipt.
    Confirmed { tx_hash: B256 },
    Failed { error: String },
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }
}

/// Per-candidate batch result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    pub rank: usize,
    pub pool: PoolId,
    pub account: Address,
    pub outcome: ExecutionOutcome,
}

#[async_trait]
pub trait TransactionExecutor: Send + Sync {
    /// Sign and submit one candidate.
    async fn submit(&self, candidate: &LiquidationCandidate) -> ExecutionOutcome;

    /// Submit candidates one after another in the given (priority) order,
    /// collecting every outcome.
    async fn execute_batch(&self, candidates: &[LiquidationCandidate]) -> Vec<ExecutionResult> {
        let mut results = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let outcome = self.submit(candidate).await;
            match &outcome {
                ExecutionOutcome::Confirmed { tx_hash } => info!(
                    rank = candidate.rank,
                    account = %candidate.account,
                    tx_hash = %tx_hash,
                    "Liquidation confirmed"
                ),
                ExecutionOutcome::Failed { error } => warn!(
                    rank = candidate.rank,
                    account = %candidate.account,
                    error = %error,
                    "Liquidation failed"
                ),
            }
            results.push(ExecutionResult {
                rank: candidate.rank,
                pool: candidate.pool,
                account: candidate.account,
                outcome,
            });
        }
        results
    }
}

/// Executes candidates through the Fuse safe-liquidator contract.
///
/// Direct ERC-20 repays pull funds from the sender, so the sender must have
/// approved the liquidator contract for the repay token.
#[derive(Debug)]
pub struct SafeLiquidatorExecutor {
    sender: TransactionSender,
    contract: SafeLiquidatorContract,
    /// Slippage tolerance on the seized amount (basis points)
    slippage_bps: u16,
}

impl SafeLiquidatorExecutor {
    pub fn new(sender: TransactionSender, contract: SafeLiquidatorContract) -> Self {
        Self {
            sender,
            contract,
            slippage_bps: 100,
        }
    }

    /// Set slippage tolerance.
    pub fn with_slippage(mut self, slippage_bps: u16) -> Self {
        self.slippage_bps = slippage_bps;
        self
    }

    /// Contract call for a candidate.
    ///
    /// Seized collateral (or flash profit) is paid out in the collateral's
    /// underlying, ETH for the cEther market, so no swap follows the seize.
    /// Direct liquidations require the expected seized amount minus slippage;
    /// flash liquidations only require the flash swap to be repaid.
    pub fn liquidation_call(&self, candidate: &LiquidationCandidate) -> Result<LiquidationCall, ScanError> {
        let (funding, min_output) = match candidate.method {
            LiquidationMethod::Direct => (
                FundingMode::Direct,
                apply_basis_points(candidate.expected_seize_amount, self.slippage_bps)
                    .ok_or(ScanError::ArithmeticOverflow("minimum output"))?,
            ),
            LiquidationMethod::FlashAssisted => (FundingMode::FlashSwap, U256::ZERO),
        };

        Ok(LiquidationCall {
            borrower: candidate.account,
            repay_amount: candidate.repay_amount,
            repay_ctoken: candidate.repay_asset.ctoken,
            repay_is_ether: candidate.repay_asset.is_ether(),
            seize_ctoken: candidate.seize_asset.ctoken,
            funding,
            min_output,
            exchange_to: candidate.seize_asset.underlying,
        })
    }
}

#[async_trait]
impl TransactionExecutor for SafeLiquidatorExecutor {
    #[instrument(skip(self, candidate), fields(account = %candidate.account, pool = %candidate.pool))]
    async fn submit(&self, candidate: &LiquidationCandidate) -> ExecutionOutcome {
        let start = Instant::now();
        let call = match self.liquidation_call(candidate) {
            Ok(call) => call,
            Err(e) => return ExecutionOutcome::Failed { error: e.to_string() },
        };
        let encoded = self.contract.encode(&call);

        info!(
            rank = candidate.rank,
            repay = %candidate.repay_asset.symbol,
            seize = %candidate.seize_asset.symbol,
            repay_amount = %call.repay_amount,
            method = ?candidate.method,
            "Submitting liquidation"
        );

        match self
            .sender
            .send_transaction(encoded.to, encoded.calldata, encoded.value)
            .await
        {
            Ok(tx_hash) => {
                info!(tx_hash = %tx_hash, total_ms = start.elapsed().as_millis(), "Liquidation mined");
                ExecutionOutcome::Confirmed { tx_hash }
            }
            Err(e) => ExecutionOutcome::Failed { error: e.to_string() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use crate::u256_math::UsdWad;
    use std::sync::Mutex;

    fn candidate(rank: usize, n: u8, method: LiquidationMethod) -> LiquidationCandidate {
        LiquidationCandidate {
            pool: PoolId(0),
            comptroller: Address::repeat_byte(0xc0),
            account: account(n),
            repay_asset: asset(2, 6, 80),
            seize_asset: ether_asset(1, 75),
            repay_amount: tokens(50, 6),
            repay_value: UsdWad::from_usd(50),
            expected_seize_amount: tokens(1, 18),
            method,
            total_borrow_value: UsdWad::from_usd(100),
            rank,
        }
    }

    /// Fails every candidate whose account is listed; records submission order.
    #[derive(Default)]
    struct RecordingExecutor {
        reverting: Vec<Address>,
        submitted: Mutex<Vec<Address>>,
    }

    #[async_trait]
    impl TransactionExecutor for RecordingExecutor {
        async fn submit(&self, candidate: &LiquidationCandidate) -> ExecutionOutcome {
            if let Ok(mut submitted) = self.submitted.lock() {
                submitted.push(candidate.account);
            }
            if self.reverting.contains(&candidate.account) {
                ExecutionOutcome::Failed {
                    error: "transaction reverted".into(),
                }
            } else {
                ExecutionOutcome::Confirmed {
                    tx_hash: B256::repeat_byte(candidate.rank as u8),
                }
            }
        }
    }

    #[tokio::test]
    async fn test_batch_continues_after_failure() {
        let executor = RecordingExecutor {
            reverting: vec![account(2)],
            ..Default::default()
        };
        let candidates = [
            candidate(1, 1, LiquidationMethod::Direct),
            candidate(2, 2, LiquidationMethod::Direct),
            candidate(3, 3, LiquidationMethod::FlashAssisted),
        ];

        let results = executor.execute_batch(&candidates).await;

        assert_eq!(results.len(), 3);
        assert!(results[0].outcome.is_success());
        assert!(!results[1].outcome.is_success());
        assert!(results[2].outcome.is_success());
        assert_eq!(
            *executor.submitted.lock().unwrap(),
            vec![account(1), account(2), account(3)]
        );
    }

    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn safe_executor() -> SafeLiquidatorExecutor {
        let sender = TransactionSender::new(DEV_KEY, "http://127.0.0.1:1").unwrap();
        SafeLiquidatorExecutor::new(sender, SafeLiquidatorContract::new(Address::repeat_byte(0xaa)))
            .with_slippage(200)
    }

    #[test]
    fn test_direct_call_applies_slippage() {
        let call = safe_executor()
            .liquidation_call(&candidate(1, 1, LiquidationMethod::Direct))
            .unwrap();

        assert_eq!(call.funding, FundingMode::Direct);
        assert_eq!(call.borrower, account(1));
        assert_eq!(call.repay_ctoken, ctoken(2));
        assert_eq!(call.seize_ctoken, ctoken(1));
        assert!(!call.repay_is_ether);
        assert_eq!(call.min_output, U256::from(980_000_000_000_000_000u64));
        // ETH collateral stays ETH
        assert_eq!(call.exchange_to, Address::ZERO);
    }

    #[test]
    fn test_token_collateral_paid_out_in_underlying() {
        let mut direct = candidate(1, 1, LiquidationMethod::Direct);
        direct.repay_asset = ether_asset(3, 75);
        direct.seize_asset = asset(2, 6, 80);

        let call = safe_executor().liquidation_call(&direct).unwrap();

        assert_eq!(call.seize_ctoken, ctoken(2));
        assert_eq!(call.exchange_to, underlying(2));
        assert_ne!(call.exchange_to, Address::ZERO);
    }

    #[test]
    fn test_flash_call_has_no_min_output() {
        let mut flash = candidate(1, 1, LiquidationMethod::FlashAssisted);
        flash.repay_asset = ether_asset(3, 75);

        let call = safe_executor().liquidation_call(&flash).unwrap();

        assert_eq!(call.funding, FundingMode::FlashSwap);
        assert!(call.repay_is_ether);
        assert_eq!(call.min_output, U256::ZERO);
        assert_eq!(call.exchange_to, flash.seize_asset.underlying);
    }

    #[tokio::test]
    async fn test_unreachable_node_reports_failure() {
        let outcome = safe_executor()
            .submit(&candidate(1, 1, LiquidationMethod::Direct))
            .await;

        assert!(matches!(outcome, ExecutionOutcome::Failed { .. }));
    }
}
