//! Scan cycle orchestration.
//!
//! Pools are scanned concurrently, and accounts within a pool likewise. Every
//! chain read is bounded by the read timeout and failures stay local to the
//! pool or account they hit. Results are joined before candidates are
//! ordered, so the priority order always covers the whole cycle.

use alloy::primitives::Address;
use chrono::Utc;
use fuse_chain::{ChainDataProvider, ChainError, LiquidationFunding, PoolId, PoolRef};
use futures::{stream, StreamExt};
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::candidate::{CandidateBuilder, LiquidationCandidate};
use crate::config::ScannerSettings;
use crate::error::ScanError;
use crate::health::{evaluate, HealthStatus};
use crate::pool::Pool;
use crate::report::{AccountOutcome, AccountReport, Diagnostic, PoolReport, PoolStatus, ScanReport};
use crate::valuation::{value_account, PriceBook};

/// Run one chain read under `timeout`, mapping failures to
/// [`ScanError::ChainReadFailure`] tagged with `context`.
pub(crate) async fn bounded<T, F>(
    timeout: Duration,
    context: impl FnOnce() -> String,
    read: F,
) -> Result<T, ScanError>
where
    F: Future<Output = fuse_chain::Result<T>>,
{
    match tokio::time::timeout(timeout, read).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(ScanError::read_failure(context(), e)),
        Err(_) => Err(ScanError::read_failure(
            context(),
            ChainError::Timeout {
                call: "scan read",
                timeout,
            },
        )),
    }
}

/// Order candidates by descending total borrow value, then account, then
/// pool, and assign 1-based ranks.
pub fn prioritize(candidates: &mut [LiquidationCandidate]) {
    candidates.sort_by(|a, b| {
        b.total_borrow_value
            .cmp(&a.total_borrow_value)
            .then_with(|| a.account.cmp(&b.account))
            .then_with(|| a.pool.cmp(&b.pool))
    });
    for (index, candidate) in candidates.iter_mut().enumerate() {
        candidate.rank = index + 1;
    }
}

/// Everything one pool task contributes to the report.
struct PoolScan {
    report: PoolReport,
    accounts: Vec<AccountReport>,
    candidates: Vec<LiquidationCandidate>,
    diagnostics: Vec<Diagnostic>,
}

impl PoolScan {
    fn skipped(reference: &PoolRef, reason: String, diagnostic: Option<Diagnostic>) -> Self {
        Self {
            report: PoolReport {
                pool: reference.id,
                name: reference.name.clone(),
                status: PoolStatus::Skipped { reason },
            },
            accounts: Vec::new(),
            candidates: Vec::new(),
            diagnostics: diagnostic.into_iter().collect(),
        }
    }
}

/// Liquidation-opportunity scanner.
#[derive(Debug, Clone)]
pub struct Scanner {
    provider: Arc<dyn ChainDataProvider>,
    builder: CandidateBuilder,
    settings: ScannerSettings,
    excluded_pools: BTreeSet<PoolId>,
}

impl Scanner {
    pub fn new(
        provider: Arc<dyn ChainDataProvider>,
        funding: Arc<dyn LiquidationFunding>,
        settings: ScannerSettings,
    ) -> Self {
        let builder = CandidateBuilder::new(funding, settings.read_timeout());
        Self {
            provider,
            builder,
            settings,
            excluded_pools: BTreeSet::new(),
        }
    }

    /// Pools never scanned, by directory index.
    pub fn with_excluded_pools(mut self, ids: impl IntoIterator<Item = u64>) -> Self {
        self.excluded_pools.extend(ids.into_iter().map(PoolId));
        self
    }

    pub fn settings(&self) -> &ScannerSettings {
        &self.settings
    }

    /// Run one full scan cycle.
    ///
    /// Only an unreadable pool directory fails the cycle; every other
    /// failure is recorded in the report.
    #[instrument(skip(self), fields(profile = %self.settings.profile))]
    pub async fn scan(&self) -> Result<ScanReport, ScanError> {
        let started_at = Utc::now();
        let timeout = self.settings.read_timeout();

        let pools = bounded(timeout, || "pool directory".to_string(), self.provider.list_pools())
            .await
            .map_err(|e| match e {
                ScanError::ChainReadFailure { source, .. } => ScanError::ProviderUnreachable(source),
                other => other,
            })?;

        info!(pools = pools.len(), "Scan cycle started");

        let results: Vec<PoolScan> = stream::iter(pools)
            .map(|pool| self.scan_pool(pool))
            .buffer_unordered(self.settings.max_concurrent_pools.max(1))
            .collect()
            .await;

        let mut report = ScanReport {
            started_at,
            finished_at: started_at,
            pools: Vec::with_capacity(results.len()),
            accounts: Vec::new(),
            candidates: Vec::new(),
            diagnostics: Vec::new(),
        };
        for result in results {
            report.pools.push(result.report);
            report.accounts.extend(result.accounts);
            report.candidates.extend(result.candidates);
            report.diagnostics.extend(result.diagnostics);
        }

        report.pools.sort_by_key(|p| p.pool);
        report.accounts.sort_by_key(|a| (a.pool, a.account));
        report
            .diagnostics
            .sort_by(|a, b| (a.pool, a.account, &a.message).cmp(&(b.pool, b.account, &b.message)));
        prioritize(&mut report.candidates);
        report.finished_at = Utc::now();

        let summary = report.summary();
        info!(
            pools_scanned = summary.pools_scanned,
            pools_skipped = summary.pools_skipped,
            accounts = summary.accounts,
            healthy = summary.healthy,
            incomplete = summary.incomplete,
            candidates = summary.candidates,
            unexecutable = summary.unexecutable,
            read_failed = summary.read_failed,
            duration_ms = report.duration_ms(),
            "Scan cycle complete"
        );

        Ok(report)
    }

    #[instrument(skip(self, reference), fields(pool = %reference.id))]
    async fn scan_pool(&self, reference: PoolRef) -> PoolScan {
        if self.excluded_pools.contains(&reference.id) {
            debug!("Pool excluded by configuration");
            return PoolScan::skipped(&reference, "excluded by configuration".to_string(), None);
        }

        let pool = match self.load_pool(reference.clone()).await {
            Ok(pool) => pool,
            Err(e) => {
                warn!(error = %e, "Pool skipped");
                let diagnostic = Diagnostic::new(Some(reference.id), None, &e);
                return PoolScan::skipped(&reference, e.to_string(), Some(diagnostic));
            }
        };
        let id = pool.id();
        let timeout = self.settings.read_timeout();
        let concurrency = self.settings.max_concurrent_accounts.max(1);

        let (prices, price_errors) =
            PriceBook::fetch(self.provider.as_ref(), &pool, timeout, concurrency).await;
        let mut diagnostics: Vec<Diagnostic> = price_errors
            .iter()
            .map(|e| Diagnostic::new(Some(id), None, e))
            .collect();
        diagnostics.extend(prices.unavailable().map(|ctoken| {
            Diagnostic::new(
                Some(id),
                None,
                &ScanError::PriceUnavailable {
                    pool: id,
                    asset: *ctoken,
                },
            )
        }));
        let prices = Arc::new(prices);

        let accounts = match bounded(
            timeout,
            || format!("pool {id} borrowers"),
            self.provider.list_accounts_with_positions(&pool.reference),
        )
        .await
        {
            Ok(accounts) => accounts,
            Err(e) => {
                warn!(error = %e, "Pool skipped");
                let mut skipped =
                    PoolScan::skipped(&pool.reference, e.to_string(), Some(Diagnostic::new(Some(id), None, &e)));
                skipped.diagnostics.extend(diagnostics);
                return skipped;
            }
        };

        let accounts: BTreeSet<Address> = accounts.into_iter().collect();
        let markets = pool.markets();
        debug!(accounts = accounts.len(), markets = markets.len(), "Scanning accounts");

        let pool_ref = &pool;
        let markets_ref = markets.as_slice();
        let results: Vec<(AccountReport, Option<LiquidationCandidate>)> = stream::iter(accounts)
            .map(|account| {
                let prices = Arc::clone(&prices);
                async move { self.scan_account(pool_ref, markets_ref, &prices, account).await }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut scan = PoolScan {
            report: PoolReport {
                pool: id,
                name: pool.reference.name.clone(),
                status: PoolStatus::Scanned {
                    accounts: results.len(),
                },
            },
            accounts: Vec::with_capacity(results.len()),
            candidates: Vec::new(),
            diagnostics,
        };
        for (report, candidate) in results {
            if let AccountOutcome::ReadFailed { kind, reason } = &report.outcome {
                scan.diagnostics.push(Diagnostic {
                    pool: Some(id),
                    account: Some(report.account),
                    kind: kind.clone(),
                    message: reason.clone(),
                });
            }
            scan.accounts.push(report);
            scan.candidates.extend(candidate);
        }

        scan
    }

    /// Read the pool's markets and risk parameters and validate them.
    async fn load_pool(&self, reference: PoolRef) -> Result<Pool, ScanError> {
        let timeout = self.settings.read_timeout();
        let id = reference.id;

        let (assets, oracle, close_factor, incentive) = tokio::try_join!(
            bounded(
                timeout,
                || format!("pool {id} markets"),
                self.provider.list_pool_assets(&reference)
            ),
            bounded(
                timeout,
                || format!("pool {id} oracle"),
                self.provider.get_price_oracle(&reference)
            ),
            bounded(
                timeout,
                || format!("pool {id} close factor"),
                self.provider.get_close_factor(&reference)
            ),
            bounded(
                timeout,
                || format!("pool {id} liquidation incentive"),
                self.provider.get_liquidation_incentive(&reference)
            ),
        )?;

        Pool::new(reference, oracle, close_factor, incentive, assets)
    }

    async fn scan_account(
        &self,
        pool: &Pool,
        markets: &[Address],
        prices: &PriceBook,
        account: Address,
    ) -> (AccountReport, Option<LiquidationCandidate>) {
        let id = pool.id();
        let report = |outcome| AccountReport {
            pool: id,
            account,
            outcome,
        };

        let balances = match bounded(
            self.settings.read_timeout(),
            || format!("pool {id} balances of {account}"),
            self.provider.get_account_balances(&pool.reference, markets, account),
        )
        .await
        {
            Ok(balances) => balances,
            Err(e) => {
                warn!(pool = %id, account = %account, error = %e, "Account read failed");
                return (report(AccountOutcome::read_failed(&e)), None);
            }
        };

        let valued = value_account(pool, prices, &balances).and_then(|valuated| {
            let health = evaluate(&valuated)?;
            Ok((valuated, health))
        });
        let (valuated, health) = match valued {
            Ok(valued) => valued,
            Err(e) => {
                warn!(pool = %id, account = %account, error = %e, "Account valuation failed");
                return (report(AccountOutcome::read_failed(&e)), None);
            }
        };

        match health.status {
            HealthStatus::Healthy => (report(AccountOutcome::Healthy { health }), None),
            HealthStatus::Incomplete => {
                debug!(
                    pool = %id,
                    account = %account,
                    missing = health.missing_prices.len(),
                    "Account incomplete, price unavailable"
                );
                (report(AccountOutcome::Incomplete { health }), None)
            }
            HealthStatus::Liquidatable => {
                let minimum = self.settings.min_borrow_value();
                if health.total_borrow_value < minimum {
                    let err = ScanError::BelowMinimumBorrow {
                        value: health.total_borrow_value,
                        minimum,
                    };
                    return (report(AccountOutcome::unexecutable(health, &err)), None);
                }

                match self.builder.build(pool, &valuated, &health).await {
                    Ok(candidate) => {
                        info!(
                            pool = %id,
                            account = %account,
                            borrow = %health.total_borrow_value,
                            collateral = %health.total_collateral_value,
                            method = ?candidate.method,
                            "Liquidation candidate"
                        );
                        (report(AccountOutcome::CandidateBuilt { health }), Some(candidate))
                    }
                    Err(e) if e.is_unexecutable() => {
                        info!(pool = %id, account = %account, reason = %e, "Liquidatable but unexecutable");
                        (report(AccountOutcome::unexecutable(health, &e)), None)
                    }
                    Err(e) => {
                        warn!(pool = %id, account = %account, error = %e, "Candidate build failed");
                        (report(AccountOutcome::read_failed(&e)), None)
                    }
                }
            }
        }
    }
}
