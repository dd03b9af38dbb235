//! HTTP provider management.
//! Uses Alloy providers for type-safe RPC interactions.

use alloy::providers::{Provider, ProviderBuilder};
use std::future::IntoFuture;
use std::time::Duration;
use tracing::info;

use crate::error::{ChainError, Result};

/// Default per-call read timeout.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Read-side RPC access with a per-call timeout.
///
/// Providers are cheap to build, so one is created per call instead of
/// being shared behind a lock.
#[derive(Debug, Clone)]
pub struct ProviderManager {
    /// HTTP RPC URL
    http_url: String,
    /// Timeout applied to every read
    read_timeout: Duration,
}

impl ProviderManager {
    /// Create a provider manager without touching the network.
    pub fn new(http_url: impl Into<String>) -> Self {
        Self {
            http_url: http_url.into(),
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Set the per-call read timeout.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Create a provider manager and verify the endpoint answers.
    pub async fn connect(http_url: impl Into<String>, read_timeout: Duration) -> Result<Self> {
        let manager = Self::new(http_url).with_read_timeout(read_timeout);
        let block = manager.block_number().await?;
        info!(http = %manager.http_url, block = block, "Provider connection verified");
        Ok(manager)
    }

    /// Get the HTTP URL.
    pub fn http_url(&self) -> &str {
        &self.http_url
    }

    /// Get the read timeout.
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Build an HTTP provider for a single read.
    pub fn http(&self) -> Result<impl Provider + Clone> {
        let url = self
            .http_url
            .parse()
            .map_err(|e| ChainError::Rpc(format!("invalid rpc url {}: {}", self.http_url, e)))?;
        Ok(ProviderBuilder::new().on_http(url))
    }

    /// Run a read under the configured timeout, tagging failures with the call name.
    pub async fn timed<T, E, F>(&self, call: &'static str, fut: F) -> Result<T>
    where
        F: IntoFuture<Output = std::result::Result<T, E>>,
        E: std::fmt::Display,
    {
        match tokio::time::timeout(self.read_timeout, fut.into_future()).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(ChainError::contract(call, e)),
            Err(_) => Err(ChainError::Timeout {
                call,
                timeout: self.read_timeout,
            }),
        }
    }

    /// Get current block number.
    pub async fn block_number(&self) -> Result<u64> {
        let provider = self.http()?;
        let block = self
            .timed("eth_blockNumber", provider.get_block_number())
            .await
            .map_err(|e| match e {
                ChainError::Contract { message, .. } => ChainError::Rpc(message),
                other => other,
            })?;
        Ok(block)
    }

    /// Get chain ID.
    pub async fn chain_id(&self) -> Result<u64> {
        let provider = self.http()?;
        self.timed("eth_chainId", provider.get_chain_id()).await
    }
}
