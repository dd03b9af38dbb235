//! Transaction signer and sender for liquidations.
//!
//! Nonce, gas price and chain id are filled by the provider's recommended
//! fillers; only the gas limit is fixed up front.

use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{ChainError, Result};

/// Default gas limit for a safe-liquidator call including the flash swap and
/// the collateral exchange.
pub const DEFAULT_LIQUIDATION_GAS_LIMIT: u64 = 2_000_000;

/// Signs and submits liquidation transactions from one account.
#[derive(Clone)]
pub struct TransactionSender {
    /// RPC URL for sending transactions
    rpc_url: String,
    /// Signer wallet
    wallet: EthereumWallet,
    /// Signer address
    pub address: Address,
    /// Gas limit applied to every liquidation
    gas_limit: u64,
}

impl TransactionSender {
    /// Create a sender from a hex private key (with or without `0x`).
    pub fn new(private_key: &str, rpc_url: impl Into<String>) -> Result<Self> {
        let signer: PrivateKeySigner = private_key
            .trim()
            .trim_start_matches("0x")
            .parse()
            .map_err(|e| ChainError::Signer(format!("invalid private key: {}", e)))?;
        let address = signer.address();

        info!(address = %address, "Transaction sender initialized");

        Ok(Self {
            rpc_url: rpc_url.into(),
            wallet: EthereumWallet::from(signer),
            address,
            gas_limit: DEFAULT_LIQUIDATION_GAS_LIMIT,
        })
    }

    /// Override the gas limit.
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    pub fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    /// Send a transaction and wait for its receipt.
    ///
    /// Returns [`ChainError::Reverted`] when the transaction is mined with a
    /// failed status.
    pub async fn send_transaction(&self, to: Address, calldata: Bytes, value: U256) -> Result<B256> {
        let start = Instant::now();
        let url = self
            .rpc_url
            .parse()
            .map_err(|e| ChainError::Rpc(format!("invalid rpc url {}: {}", self.rpc_url, e)))?;
        let provider = ProviderBuilder::new()
            .wallet(self.wallet.clone())
            .on_http(url);

        let tx = TransactionRequest::default()
            .with_from(self.address)
            .with_to(to)
            .with_input(calldata)
            .with_value(value)
            .with_gas_limit(self.gas_limit);

        debug!(to = %to, value = %value, gas_limit = self.gas_limit, "Sending transaction");

        let pending = provider
            .send_transaction(tx)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        let tx_hash = *pending.tx_hash();

        info!(tx_hash = %tx_hash, "Transaction submitted, waiting for confirmation");

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;

        if receipt.status() {
            info!(
                tx_hash = %tx_hash,
                block = receipt.block_number.unwrap_or(0),
                gas_used = receipt.gas_used,
                total_ms = start.elapsed().as_millis(),
                "Transaction confirmed"
            );
            Ok(tx_hash)
        } else {
            warn!(tx_hash = %tx_hash, "Transaction reverted");
            Err(ChainError::Reverted(tx_hash))
        }
    }

    /// Native balance of the sender.
    pub async fn get_balance(&self) -> Result<U256> {
        let url = self
            .rpc_url
            .parse()
            .map_err(|e| ChainError::Rpc(format!("invalid rpc url {}: {}", self.rpc_url, e)))?;
        ProviderBuilder::new()
            .on_http(url)
            .get_balance(self.address)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }

    /// Get the RPC URL.
    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }
}

impl std::fmt::Debug for TransactionSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionSender")
            .field("address", &self.address)
            .field("rpc_url", &self.rpc_url)
            .field("gas_limit", &self.gas_limit)
            .finish_non_exhaustive()
    }
}
