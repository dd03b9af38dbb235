//! Scanner settings with profile support.
//!
//! A profile (`default`, `conservative`, `aggressive`) is selected with the
//! `SCANNER_PROFILE` environment variable; individual values can then be
//! overridden from the `[scanner]` table of the chain config.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::chain::ConfigError;
use crate::u256_math::{f64_to_wad, UsdWad};

/// Runtime settings of the scan loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannerSettings {
    /// Profile name (for logging/identification)
    pub profile: String,
    /// Timeout applied to every chain read unit (milliseconds)
    pub read_timeout_ms: u64,
    /// Pools scanned concurrently
    pub max_concurrent_pools: usize,
    /// Accounts scanned concurrently within one pool
    pub max_concurrent_accounts: usize,
    /// Delay between scan cycles (seconds)
    pub scan_interval_secs: u64,
    /// Liquidatable accounts with less debt than this (USD) are not worth a transaction
    pub min_borrow_value_usd: f64,
    /// Slippage tolerance applied to the expected seized amount (basis points)
    pub slippage_bps: u16,
    /// Candidates submitted per cycle, 0 = all
    pub max_executions_per_cycle: usize,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            profile: "default".to_string(),
            read_timeout_ms: 10_000,
            max_concurrent_pools: 4,
            max_concurrent_accounts: 16,
            scan_interval_secs: 60,
            min_borrow_value_usd: 10.0,
            slippage_bps: 100,
            max_executions_per_cycle: 0,
        }
    }
}

impl ScannerSettings {
    /// Lower load on the RPC endpoint and a larger dust threshold.
    pub fn conservative() -> Self {
        Self {
            profile: "conservative".to_string(),
            read_timeout_ms: 20_000,
            max_concurrent_pools: 2,
            max_concurrent_accounts: 4,
            scan_interval_secs: 180,
            min_borrow_value_usd: 100.0,
            slippage_bps: 50,
            max_executions_per_cycle: 3,
        }
    }

    /// Fast cycles for a dedicated node.
    pub fn aggressive() -> Self {
        Self {
            profile: "aggressive".to_string(),
            read_timeout_ms: 5_000,
            max_concurrent_pools: 16,
            max_concurrent_accounts: 64,
            scan_interval_secs: 12,
            min_borrow_value_usd: 1.0,
            slippage_bps: 300,
            max_executions_per_cycle: 0,
        }
    }

    /// Get profile from environment variable SCANNER_PROFILE, or default.
    pub fn from_env() -> Self {
        let profile = std::env::var("SCANNER_PROFILE").unwrap_or_else(|_| "default".to_string());
        Self::for_profile(&profile)
    }

    pub fn for_profile(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "conservative" | "safe" => Self::conservative(),
            "aggressive" | "aggro" => Self::aggressive(),
            _ => Self::default(),
        }
    }

    /// Apply values set in the config file.
    pub fn with_overrides(mut self, overrides: &ScannerOverrides) -> Self {
        if let Some(v) = overrides.read_timeout_ms {
            self.read_timeout_ms = v;
        }
        if let Some(v) = overrides.max_concurrent_pools {
            self.max_concurrent_pools = v;
        }
        if let Some(v) = overrides.max_concurrent_accounts {
            self.max_concurrent_accounts = v;
        }
        if let Some(v) = overrides.scan_interval_secs {
            self.scan_interval_secs = v;
        }
        if let Some(v) = overrides.min_borrow_value_usd {
            self.min_borrow_value_usd = v;
        }
        if let Some(v) = overrides.slippage_bps {
            self.slippage_bps = v;
        }
        if let Some(v) = overrides.max_executions_per_cycle {
            self.max_executions_per_cycle = v;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.read_timeout_ms == 0 {
            return Err(ConfigError::InvalidScanner("read_timeout_ms must be positive".into()));
        }
        if self.max_concurrent_pools == 0 || self.max_concurrent_accounts == 0 {
            return Err(ConfigError::InvalidScanner("concurrency bounds must be positive".into()));
        }
        if self.slippage_bps > 10_000 {
            return Err(ConfigError::InvalidScanner(format!(
                "slippage_bps {} exceeds 10000",
                self.slippage_bps
            )));
        }
        if !self.min_borrow_value_usd.is_finite() || self.min_borrow_value_usd < 0.0 {
            return Err(ConfigError::InvalidScanner("min_borrow_value_usd must be >= 0".into()));
        }
        Ok(())
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    pub fn min_borrow_value(&self) -> UsdWad {
        UsdWad(f64_to_wad(self.min_borrow_value_usd))
    }

    /// Log the current settings.
    pub fn log_settings(&self) {
        tracing::info!(
            profile = %self.profile,
            read_timeout_ms = self.read_timeout_ms,
            max_concurrent_pools = self.max_concurrent_pools,
            max_concurrent_accounts = self.max_concurrent_accounts,
            scan_interval_secs = self.scan_interval_secs,
            min_borrow_value_usd = self.min_borrow_value_usd,
            slippage_bps = self.slippage_bps,
            "Scanner settings loaded"
        );
    }
}

/// Optional overrides from the `[scanner]` config table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScannerOverrides {
    #[serde(default)]
    pub read_timeout_ms: Option<u64>,
    #[serde(default)]
    pub max_concurrent_pools: Option<usize>,
    #[serde(default)]
    pub max_concurrent_accounts: Option<usize>,
    #[serde(default)]
    pub scan_interval_secs: Option<u64>,
    #[serde(default)]
    pub min_borrow_value_usd: Option<f64>,
    #[serde(default)]
    pub slippage_bps: Option<u16>,
    #[serde(default)]
    pub max_executions_per_cycle: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles() {
        assert_eq!(ScannerSettings::for_profile("conservative").profile, "conservative");
        assert_eq!(ScannerSettings::for_profile("AGGRESSIVE").profile, "aggressive");
        assert_eq!(ScannerSettings::for_profile("unknown"), ScannerSettings::default());
        for settings in [
            ScannerSettings::default(),
            ScannerSettings::conservative(),
            ScannerSettings::aggressive(),
        ] {
            assert!(settings.validate().is_ok());
        }
    }

    #[test]
    fn test_overrides_only_touch_set_fields() {
        let overrides = ScannerOverrides {
            max_concurrent_pools: Some(1),
            slippage_bps: Some(25),
            ..Default::default()
        };
        let settings = ScannerSettings::default().with_overrides(&overrides);
        assert_eq!(settings.max_concurrent_pools, 1);
        assert_eq!(settings.slippage_bps, 25);
        assert_eq!(settings.max_concurrent_accounts, ScannerSettings::default().max_concurrent_accounts);
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let settings = ScannerSettings {
            max_concurrent_accounts: 0,
            ..Default::default()
        };
        assert!(matches!(settings.validate(), Err(ConfigError::InvalidScanner(_))));
    }

    #[test]
    fn test_min_borrow_value_in_wad() {
        let settings = ScannerSettings {
            min_borrow_value_usd: 10.0,
            ..Default::default()
        };
        assert_eq!(settings.min_borrow_value(), UsdWad::from_usd(10));
    }
}
