//! Contract interfaces for the Fuse lending pools and the contracts the
//! liquidator touches around them.
//!
//! Only the functions actually called by this crate are declared. The
//! `#[sol(rpc)]` attribute generates typed call builders:
//!
//! ```rust,ignore
//! let comptroller = IComptroller::new(address, &provider);
//! let markets = comptroller.getAllMarkets().call().await?._0;
//! ```

use alloy::sol;

// ============================================================================
// Pool registry
// ============================================================================

sol! {
    /// Pool entry as stored by the directory.
    #[derive(Debug)]
    struct FusePool {
        string name;
        address creator;
        address comptroller;
        uint256 blockPosted;
        uint256 timestampPosted;
    }

    #[sol(rpc)]
    interface IFusePoolDirectory {
        function getAllPools() external view returns (FusePool[] memory);
    }
}

// ============================================================================
// Comptroller / markets
// ============================================================================

sol! {
    #[sol(rpc)]
    interface IComptroller {
        function oracle() external view returns (address);
        function closeFactorMantissa() external view returns (uint256);
        function liquidationIncentiveMantissa() external view returns (uint256);
        function getAllMarkets() external view returns (address[] memory);
        function getAllBorrowers() external view returns (address[] memory);
        function getAssetsIn(address account) external view returns (address[] memory);
        function markets(address cToken) external view returns (bool isListed, uint256 collateralFactorMantissa);
    }

    #[sol(rpc)]
    interface ICToken {
        function isCEther() external view returns (bool);
        function underlying() external view returns (address);
        function symbol() external view returns (string memory);
        function reserveFactorMantissa() external view returns (uint256);
        function exchangeRateStored() external view returns (uint256);
        function getAccountSnapshot(address account) external view returns (
            uint256 err,
            uint256 cTokenBalance,
            uint256 borrowBalance,
            uint256 exchangeRateMantissa
        );
    }

    #[sol(rpc)]
    interface IPriceOracle {
        function getUnderlyingPrice(address cToken) external view returns (uint256);
    }

    #[sol(rpc)]
    interface IERC20 {
        function decimals() external view returns (uint8);
        function balanceOf(address owner) external view returns (uint256);
    }
}

// ============================================================================
// Flash-swap liquidity (Uniswap V2)
// ============================================================================

sol! {
    #[sol(rpc)]
    interface IUniswapV2Factory {
        function getPair(address tokenA, address tokenB) external view returns (address pair);
    }

    #[sol(rpc)]
    interface IUniswapV2Pair {
        function token0() external view returns (address);
        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
    }
}

// ============================================================================
// Safe liquidator
// ============================================================================

sol! {
    /// Token-repay entry points of the safe liquidator.
    interface IFuseSafeLiquidator {
        function safeLiquidate(
            address borrower,
            uint256 repayAmount,
            address cErc20,
            address cTokenCollateral,
            uint256 minOutputAmount,
            address exchangeSeizedTo
        ) external returns (uint256);

        function safeLiquidateToTokensWithFlashLoan(
            address borrower,
            uint256 repayAmount,
            address cErc20,
            address cTokenCollateral,
            uint256 minProfitAmount,
            address exchangeProfitTo
        ) external returns (uint256);

        function safeLiquidateToEthWithFlashLoan(
            address borrower,
            uint256 repayAmount,
            address cEther,
            address cErc20Collateral,
            uint256 minProfitAmount,
            address exchangeProfitTo
        ) external returns (uint256);
    }

    /// Native-ETH repay entry point; the repay amount travels as call value.
    interface IFuseSafeLiquidatorEth {
        function safeLiquidate(
            address borrower,
            address cEther,
            address cErc20Collateral,
            uint256 minOutputAmount,
            address exchangeSeizedTo
        ) external payable returns (uint256);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, U256};
    use alloy::sol_types::SolCall;

    #[test]
    fn test_erc20_selectors() {
        assert_eq!(hex::encode(IERC20::balanceOfCall::SELECTOR), "70a08231");
        assert_eq!(hex::encode(IERC20::decimalsCall::SELECTOR), "313ce567");
    }

    #[test]
    fn test_uniswap_pair_selectors() {
        assert_eq!(hex::encode(IUniswapV2Pair::getReservesCall::SELECTOR), "0902f1ac");
        assert_eq!(hex::encode(IUniswapV2Pair::token0Call::SELECTOR), "0dfe1681");
    }

    #[test]
    fn test_safe_liquidate_encoding() {
        let call = IFuseSafeLiquidator::safeLiquidateCall {
            borrower: Address::ZERO,
            repayAmount: U256::from(1000),
            cErc20: Address::ZERO,
            cTokenCollateral: Address::ZERO,
            minOutputAmount: U256::ZERO,
            exchangeSeizedTo: Address::ZERO,
        };

        let encoded = call.abi_encode();
        // selector + 6 static words
        assert_eq!(encoded.len(), 4 + 6 * 32);
        assert_eq!(&encoded[..4], IFuseSafeLiquidator::safeLiquidateCall::SELECTOR.as_slice());
    }

    #[test]
    fn test_eth_overload_has_distinct_selector() {
        assert_ne!(
            IFuseSafeLiquidator::safeLiquidateCall::SELECTOR,
            IFuseSafeLiquidatorEth::safeLiquidateCall::SELECTOR
        );
    }
}
