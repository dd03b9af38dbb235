//! Contract bindings and calldata encoding.
//!
//! The scanner never writes to the chain itself; this module turns a
//! liquidation request into the calldata and call value expected by the
//! safe-liquidator contract so an executor can submit it.

pub mod bindings;

pub use bindings::{
    IComptroller, ICToken, IERC20, IFusePoolDirectory, IFuseSafeLiquidator,
    IFuseSafeLiquidatorEth, IPriceOracle, IUniswapV2Factory, IUniswapV2Pair,
};

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;

/// How the repay side of a liquidation is funded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FundingMode {
    /// Repay from tokens the liquidator already holds.
    Direct,
    /// Borrow the repay token through a flash swap and repay it from the seized collateral.
    FlashSwap,
}

/// Everything needed to encode one safe-liquidator call.
#[derive(Debug, Clone)]
pub struct LiquidationCall {
    pub borrower: Address,
    pub repay_amount: U256,
    /// cToken of the borrowed market being repaid
    pub repay_ctoken: Address,
    /// Whether the repaid market is the native-ETH market
    pub repay_is_ether: bool,
    /// cToken of the collateral market being seized
    pub seize_ctoken: Address,
    pub funding: FundingMode,
    /// Minimum output (direct) or minimum profit (flash), in the exchange-to token
    pub min_output: U256,
    /// Token seized collateral or profit is paid out in (`Address::ZERO` = ETH)
    pub exchange_to: Address,
}

/// Encoded transaction intent: target, calldata and value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedCall {
    pub to: Address,
    pub calldata: Bytes,
    pub value: U256,
}

/// Safe-liquidator contract wrapper.
#[derive(Debug, Clone, Copy)]
pub struct SafeLiquidatorContract {
    /// Contract address
    pub address: Address,
}

impl SafeLiquidatorContract {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    /// Encode a liquidation call, selecting the entry point from the repay
    /// market kind and the funding mode.
    pub fn encode(&self, call: &LiquidationCall) -> EncodedCall {
        let (calldata, value) = match (call.funding, call.repay_is_ether) {
            (FundingMode::Direct, false) => (
                IFuseSafeLiquidator::safeLiquidateCall {
                    borrower: call.borrower,
                    repayAmount: call.repay_amount,
                    cErc20: call.repay_ctoken,
                    cTokenCollateral: call.seize_ctoken,
                    minOutputAmount: call.min_output,
                    exchangeSeizedTo: call.exchange_to,
                }
                .abi_encode(),
                U256::ZERO,
            ),
            (FundingMode::Direct, true) => (
                IFuseSafeLiquidatorEth::safeLiquidateCall {
                    borrower: call.borrower,
                    cEther: call.repay_ctoken,
                    cErc20Collateral: call.seize_ctoken,
                    minOutputAmount: call.min_output,
                    exchangeSeizedTo: call.exchange_to,
                }
                .abi_encode(),
                call.repay_amount,
            ),
            (FundingMode::FlashSwap, false) => (
                IFuseSafeLiquidator::safeLiquidateToTokensWithFlashLoanCall {
                    borrower: call.borrower,
                    repayAmount: call.repay_amount,
                    cErc20: call.repay_ctoken,
                    cTokenCollateral: call.seize_ctoken,
                    minProfitAmount: call.min_output,
                    exchangeProfitTo: call.exchange_to,
                }
                .abi_encode(),
                U256::ZERO,
            ),
            (FundingMode::FlashSwap, true) => (
                IFuseSafeLiquidator::safeLiquidateToEthWithFlashLoanCall {
                    borrower: call.borrower,
                    repayAmount: call.repay_amount,
                    cEther: call.repay_ctoken,
                    cErc20Collateral: call.seize_ctoken,
                    minProfitAmount: call.min_output,
                    exchangeProfitTo: call.exchange_to,
                }
                .abi_encode(),
                U256::ZERO,
            ),
        };

        EncodedCall {
            to: self.address,
            calldata: Bytes::from(calldata),
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(funding: FundingMode, repay_is_ether: bool) -> LiquidationCall {
        LiquidationCall {
            borrower: Address::repeat_byte(0x11),
            repay_amount: U256::from(5_000u64),
            repay_ctoken: Address::repeat_byte(0x22),
            repay_is_ether,
            seize_ctoken: Address::repeat_byte(0x33),
            funding,
            min_output: U256::ZERO,
            exchange_to: Address::ZERO,
        }
    }

    #[test]
    fn test_direct_token_repay_has_no_value() {
        let contract = SafeLiquidatorContract::new(Address::repeat_byte(0xaa));
        let encoded = contract.encode(&sample(FundingMode::Direct, false));

        assert_eq!(encoded.to, Address::repeat_byte(0xaa));
        assert_eq!(encoded.value, U256::ZERO);
        assert_eq!(
            &encoded.calldata[..4],
            IFuseSafeLiquidator::safeLiquidateCall::SELECTOR.as_slice()
        );
    }

    #[test]
    fn test_direct_eth_repay_sends_value() {
        let contract = SafeLiquidatorContract::new(Address::repeat_byte(0xaa));
        let encoded = contract.encode(&sample(FundingMode::Direct, true));

        assert_eq!(encoded.value, U256::from(5_000u64));
        assert_eq!(
            &encoded.calldata[..4],
            IFuseSafeLiquidatorEth::safeLiquidateCall::SELECTOR.as_slice()
        );
    }

    #[test]
    fn test_flash_selectors() {
        let contract = SafeLiquidatorContract::new(Address::repeat_byte(0xaa));

        let tokens = contract.encode(&sample(FundingMode::FlashSwap, false));
        assert_eq!(
            &tokens.calldata[..4],
            IFuseSafeLiquidator::safeLiquidateToTokensWithFlashLoanCall::SELECTOR.as_slice()
        );

        let eth = contract.encode(&sample(FundingMode::FlashSwap, true));
        assert_eq!(
            &eth.calldata[..4],
            IFuseSafeLiquidator::safeLiquidateToEthWithFlashLoanCall::SELECTOR.as_slice()
        );
        assert_eq!(eth.value, U256::ZERO);
    }
}
