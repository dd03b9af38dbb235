//! Errors raised by chain reads and writes.

use std::time::Duration;

/// Failure talking to the chain.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// Transport-level failure (connection refused, HTTP error, bad URL).
    #[error("rpc error: {0}")]
    Rpc(String),

    /// A contract call reverted or returned undecodable data.
    #[error("contract call {call} failed: {message}")]
    Contract { call: &'static str, message: String },

    /// The call did not complete within the read timeout.
    #[error("{call} timed out after {timeout:?}")]
    Timeout { call: &'static str, timeout: Duration },

    /// The call succeeded but the returned value is unusable.
    #[error("invalid response from {call}: {message}")]
    InvalidResponse { call: &'static str, message: String },

    /// The signing key could not be loaded.
    #[error("signer error: {0}")]
    Signer(String),

    /// A transaction was mined but reverted.
    #[error("transaction {0} reverted")]
    Reverted(alloy::primitives::B256),
}

impl ChainError {
    /// Wrap a contract-call error with the call name.
    pub fn contract(call: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Contract {
            call,
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ChainError>;
