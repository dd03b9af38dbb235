//! Fuse Liquidation Scanner
//!
//! Periodically scans every Fuse pool for undercollateralized accounts and
//! builds prioritized liquidation candidates. With a private key and
//! `EXECUTE=true`, candidates are submitted through the safe liquidator.

use std::sync::Arc;

use alloy::primitives::Address;
use anyhow::{bail, Context, Result};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fuse_chain::{
    FuseDataProvider, ProviderManager, SafeLiquidatorContract, TransactionSender, UniswapV2Funding,
};
use fuse_scanner_core::{
    ChainConfig, SafeLiquidatorExecutor, ScanReport, Scanner, ScannerSettings, TransactionExecutor,
};

/// Environment variable names.
mod env {
    pub const CHAIN_CONFIG: &str = "CHAIN_CONFIG";
    pub const PRIVATE_KEY: &str = "PRIVATE_KEY";
    pub const EXECUTE: &str = "EXECUTE";
    pub const SCAN_ONCE: &str = "SCAN_ONCE";
    pub const REPORT_JSON: &str = "REPORT_JSON";
    pub const LOG_FORMAT: &str = "LOG_FORMAT";
}

const DEFAULT_CHAIN_CONFIG: &str = "config/mainnet.toml";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config_path =
        std::env::var(env::CHAIN_CONFIG).unwrap_or_else(|_| DEFAULT_CHAIN_CONFIG.to_string());
    let config = ChainConfig::from_file(&config_path)
        .with_context(|| format!("loading chain config {config_path}"))?;

    let settings = ScannerSettings::from_env().with_overrides(&config.scanner);
    settings.validate().context("invalid scanner settings")?;
    settings.log_settings();

    info!(
        chain = %config.chain.name,
        chain_id = config.chain.chain_id,
        "Starting Fuse liquidation scanner"
    );

    let app = App::initialize(config, settings).await?;

    if flag(env::SCAN_ONCE) {
        return app.run_cycle().await;
    }

    let mut interval = tokio::time::interval(app.scanner.settings().scan_interval());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = app.run_cycle().await {
                    error!(error = %e, "Scan cycle failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                return Ok(());
            }
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,fuse_scanner_core=debug,fuse_chain=debug"));

    let json = std::env::var(env::LOG_FORMAT).is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
}

fn flag(name: &str) -> bool {
    std::env::var(name).is_ok_and(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes"))
}

/// Wired components.
struct App {
    scanner: Scanner,
    executor: Option<SafeLiquidatorExecutor>,
    report_json: bool,
}

impl App {
    async fn initialize(config: ChainConfig, settings: ScannerSettings) -> Result<Self> {
        let rpc = ProviderManager::connect(&config.chain.rpc_url, settings.read_timeout())
            .await
            .context("RPC endpoint unreachable")?;

        let chain_id = rpc.chain_id().await.context("reading chain id")?;
        if chain_id != config.chain.chain_id {
            bail!(
                "RPC endpoint is on chain {chain_id}, config expects {}",
                config.chain.chain_id
            );
        }

        let sender = match std::env::var(env::PRIVATE_KEY) {
            Ok(key) if !key.trim().is_empty() => {
                let sender = TransactionSender::new(key.trim(), &config.chain.rpc_url)
                    .context("invalid PRIVATE_KEY")?;
                match sender.get_balance().await {
                    Ok(balance) => info!(
                        address = %sender.address,
                        balance_wei = %balance,
                        "Transaction sender initialized"
                    ),
                    Err(e) => warn!(address = %sender.address, error = %e, "Sender balance unavailable"),
                }
                Some(sender)
            }
            _ => None,
        };

        let execute = flag(env::EXECUTE);
        let liquidator = resolve_liquidator(
            config.liquidator.account,
            sender.as_ref().map(|s| s.address),
            execute,
        )?;
        if liquidator.is_none() {
            warn!("No liquidator account or PRIVATE_KEY; every candidate will need a flash swap");
        }

        let contracts = &config.contracts;
        let provider = Arc::new(FuseDataProvider::new(rpc.clone(), contracts.pool_directory));
        let funding = Arc::new(UniswapV2Funding::new(
            rpc,
            liquidator,
            contracts.uniswap_v2_factory,
            contracts.weth,
            contracts.flash_fallback_token,
        ));

        let executor = match sender {
            Some(sender) if execute => {
                info!(contract = %contracts.safe_liquidator, "Execution enabled");
                Some(
                    SafeLiquidatorExecutor::new(
                        sender,
                        SafeLiquidatorContract::new(contracts.safe_liquidator),
                    )
                    .with_slippage(settings.slippage_bps),
                )
            }
            Some(_) => {
                info!("Dry run: set EXECUTE=true to submit liquidations");
                None
            }
            None => {
                if execute {
                    warn!("EXECUTE=true ignored without PRIVATE_KEY");
                }
                None
            }
        };

        let scanner = Scanner::new(provider, funding, settings)
            .with_excluded_pools(config.liquidator.excluded_pools.iter().copied());

        info!(liquidator = ?liquidator, "All components initialized");

        Ok(Self {
            scanner,
            executor,
            report_json: flag(env::REPORT_JSON),
        })
    }

    async fn run_cycle(&self) -> Result<()> {
        let report = self.scanner.scan().await.context("scan cycle aborted")?;

        if self.report_json {
            println!("{}", report.to_json().context("serializing scan report")?);
        }

        if let Some(executor) = &self.executor {
            self.execute(executor, &report).await;
        }
        Ok(())
    }

    async fn execute(&self, executor: &SafeLiquidatorExecutor, report: &ScanReport) {
        let limit = match self.scanner.settings().max_executions_per_cycle {
            0 => report.candidates.len(),
            n => n.min(report.candidates.len()),
        };
        if limit == 0 {
            return;
        }

        let results = executor.execute_batch(&report.candidates[..limit]).await;
        let confirmed = results.iter().filter(|r| r.outcome.is_success()).count();
        info!(
            submitted = results.len(),
            confirmed = confirmed,
            failed = results.len() - confirmed,
            "Execution batch finished"
        );
    }
}

/// Account whose balances decide whether a candidate can be repaid directly.
///
/// Direct liquidations pull the repay funds from the transaction sender, so
/// when submitting, a configured account must be the signer itself.
fn resolve_liquidator(
    configured: Option<Address>,
    signer: Option<Address>,
    execute: bool,
) -> Result<Option<Address>> {
    match (configured, signer) {
        (Some(account), Some(signer)) if execute && account != signer => bail!(
            "liquidator account {account} differs from PRIVATE_KEY address {signer}; \
             direct liquidations are funded by the signer"
        ),
        (Some(account), Some(signer)) if account != signer => {
            warn!(
                account = %account,
                signer = %signer,
                "Liquidator account differs from signer, dry run only"
            );
            Ok(Some(account))
        }
        (configured, signer) => Ok(configured.or(signer)),
    }
}
