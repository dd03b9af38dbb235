//! Scan cycle report.
//!
//! A scan always produces a report, possibly partial. Every pool and every
//! account read is accounted for with a terminal outcome, so degraded results
//! are visible instead of silently missing.

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use fuse_chain::PoolId;
use serde::Serialize;

use crate::candidate::LiquidationCandidate;
use crate::error::ScanError;
use crate::health::HealthRecord;

/// Status of one pool in the cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PoolStatus {
    Scanned { accounts: usize },
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolReport {
    pub pool: PoolId,
    pub name: String,
    #[serde(flatten)]
    pub status: PoolStatus,
}

/// Terminal state of one account in the cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AccountOutcome {
    Healthy { health: HealthRecord },
    Incomplete { health: HealthRecord },
    CandidateBuilt { health: HealthRecord },
    Unexecutable { health: HealthRecord, kind: String, reason: String },
    /// Balances could not be read or valued.
    ReadFailed { kind: String, reason: String },
}

impl AccountOutcome {
    pub fn unexecutable(health: HealthRecord, err: &ScanError) -> Self {
        Self::Unexecutable {
            health,
            kind: err.kind().to_string(),
            reason: err.to_string(),
        }
    }

    pub fn read_failed(err: &ScanError) -> Self {
        Self::ReadFailed {
            kind: err.kind().to_string(),
            reason: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountReport {
    pub pool: PoolId,
    pub account: Address,
    #[serde(flatten)]
    pub outcome: AccountOutcome,
}

/// A degraded unit that did not map onto an account outcome, such as a
/// failed price read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub pool: Option<PoolId>,
    pub account: Option<Address>,
    pub kind: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(pool: Option<PoolId>, account: Option<Address>, err: &ScanError) -> Self {
        Self {
            pool,
            account,
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Counts for the cycle summary log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub pools_scanned: usize,
    pub pools_skipped: usize,
    pub accounts: usize,
    pub healthy: usize,
    pub incomplete: usize,
    pub candidates: usize,
    pub unexecutable: usize,
    pub read_failed: usize,
    pub diagnostics: usize,
}

/// Result of one scan cycle.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Sorted by pool id
    pub pools: Vec<PoolReport>,
    /// Sorted by pool id, then account
    pub accounts: Vec<AccountReport>,
    /// Executable candidates in priority order
    pub candidates: Vec<LiquidationCandidate>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ScanReport {
    pub fn summary(&self) -> ScanSummary {
        let mut summary = ScanSummary {
            accounts: self.accounts.len(),
            candidates: self.candidates.len(),
            diagnostics: self.diagnostics.len(),
            ..Default::default()
        };

        for pool in &self.pools {
            match pool.status {
                PoolStatus::Scanned { .. } => summary.pools_scanned += 1,
                PoolStatus::Skipped { .. } => summary.pools_skipped += 1,
            }
        }
        for account in &self.accounts {
            match account.outcome {
                AccountOutcome::Healthy { .. } => summary.healthy += 1,
                AccountOutcome::Incomplete { .. } => summary.incomplete += 1,
                AccountOutcome::Unexecutable { .. } => summary.unexecutable += 1,
                AccountOutcome::ReadFailed { .. } => summary.read_failed += 1,
                AccountOutcome::CandidateBuilt { .. } => {}
            }
        }

        summary
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
