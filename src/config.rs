// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! Runtime configuration
//!
//! Polling budgets for the attestation and balance waits, RPC call limits, and
//! the orchestrator-wide settings that group them.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use bon::Builder;
use tracing::debug;

use crate::error::{BridgeError, Result};
use crate::protocol::DomainId;

/// Circle Iris API environment URLs
///
/// See <https://developers.circle.com/stablecoins/cctp-apis>
pub const IRIS_API: &str = "https://iris-api.circle.com";
pub const IRIS_API_SANDBOX: &str = "https://iris-api-sandbox.circle.com";

/// Attestation lookup path, relative to the Iris base URL
pub const ATTESTATION_PATH: &str = "v1/attestations/";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of retry attempts
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Configuration for a fixed-interval polling loop.
///
/// Used for both the attestation wait and the post-mint balance check.
///
/// ```rust
/// use cctp_vault_bridge::PollingConfig;
///
/// // 120 attempts, 5 seconds apart
/// let config = PollingConfig::default();
/// assert_eq!(config.total_timeout_secs(), 600);
///
/// let config = PollingConfig::default()
///     .with_max_attempts(20)
///     .with_poll_interval_secs(30);
/// assert_eq!(config.total_timeout_secs(), 600);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    /// Maximum number of polling attempts before giving up.
    pub max_attempts: u32,
    /// Seconds to wait between polling attempts.
    pub poll_interval_secs: u64,
}

impl Default for PollingConfig {
    /// Attestation default: 120 attempts at 5 second intervals (10 minutes).
    ///
    /// Fast-finality chains attest within a minute; a timeout here is resumable.
    fn default() -> Self {
        Self {
            max_attempts: 120,
            poll_interval_secs: 5,
        }
    }
}

impl PollingConfig {
    /// 30 attempts a minute apart, enough for the 13-19 minute attestation
    /// time of chains that wait for hard finality.
    pub fn standard_transfer() -> Self {
        Self {
            max_attempts: 30,
            poll_interval_secs: 60,
        }
    }

    /// Short budget for the balance check that follows a mint.
    pub fn balance_default() -> Self {
        Self {
            max_attempts: 10,
            poll_interval_secs: 3,
        }
    }

    /// Receipt wait for submitted transactions: 60 attempts 5 seconds apart,
    /// long enough for a congested Ethereum L1.
    pub fn receipt_default() -> Self {
        Self {
            max_attempts: 60,
            poll_interval_secs: 5,
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_poll_interval_secs(mut self, secs: u64) -> Self {
        self.poll_interval_secs = secs;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Returns the total maximum wait time in seconds.
    pub fn total_timeout_secs(&self) -> u64 {
        self.max_attempts as u64 * self.poll_interval_secs
    }
}

/// Limits applied to every chain RPC call.
///
/// ```rust
/// use cctp_vault_bridge::ProviderConfig;
/// use std::time::Duration;
///
/// let config = ProviderConfig::builder()
///     .retry_attempts(5)
///     .timeout(Duration::from_secs(10))
///     .build();
/// assert_eq!(config.retry_attempts, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Retries per endpoint for idempotent reads
    pub retry_attempts: u32,
    /// Upper bound on a single call
    pub timeout: Duration,
    /// Requests per second allowed against one endpoint; spaces out retries
    pub rate_limit_rps: Option<u32>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            rate_limit_rps: None,
        }
    }
}

impl ProviderConfig {
    pub fn builder() -> ProviderConfigBuilder {
        ProviderConfigBuilder::default()
    }

    /// Longer timeouts and more retries, for flaky public endpoints.
    pub fn high_reliability() -> Self {
        Self {
            retry_attempts: 10,
            timeout: Duration::from_secs(60),
            rate_limit_rps: None,
        }
    }

    pub fn rate_limited(rps: u32) -> Self {
        Self {
            rate_limit_rps: Some(rps),
            ..Self::default()
        }
    }

    /// Smallest gap between two retries against one endpoint.
    pub fn min_retry_delay(&self) -> Duration {
        let floor = Duration::from_millis(200);
        match self.rate_limit_rps {
            Some(rps) if rps > 0 => floor.max(Duration::from_secs(1) / rps),
            _ => floor,
        }
    }
}

/// Builder for [`ProviderConfig`]
#[derive(Debug, Clone, Default)]
pub struct ProviderConfigBuilder {
    retry_attempts: Option<u32>,
    timeout: Option<Duration>,
    rate_limit_rps: Option<u32>,
}

impl ProviderConfigBuilder {
    pub fn retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = Some(attempts);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn rate_limit_rps(mut self, rps: u32) -> Self {
        self.rate_limit_rps = Some(rps);
        self
    }

    pub fn build(self) -> ProviderConfig {
        ProviderConfig {
            retry_attempts: self.retry_attempts.unwrap_or(DEFAULT_RETRY_ATTEMPTS),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            rate_limit_rps: self.rate_limit_rps,
        }
    }
}

/// Settings shared by every transfer an orchestrator runs.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct OrchestratorConfig {
    #[builder(default)]
    pub attestation_polling: PollingConfig,
    #[builder(default = PollingConfig::balance_default())]
    pub balance_polling: PollingConfig,
    #[builder(default)]
    pub provider: ProviderConfig,
    /// Base URL of the attestation service
    #[builder(default = IRIS_API.to_string(), into)]
    pub iris_url: String,
    /// Domain of the ledger hosting the vault
    #[builder(default = DomainId::Sui)]
    pub vault_domain: DomainId,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl OrchestratorConfig {
    /// Loads `.env` if present, then reads `CCTP_*` overrides from the environment.
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            debug!(error = %e, event = "dotenv_not_loaded");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`OrchestratorConfig::from_env`] with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup("CCTP_IRIS_URL") {
            url::Url::parse(&url).map_err(|e| {
                BridgeError::InvalidConfig(format!("CCTP_IRIS_URL={url}: {e}"))
            })?;
            config.iris_url = url;
        }
        if let Some(attempts) = parse_var(&lookup, "CCTP_ATTESTATION_MAX_ATTEMPTS")? {
            config.attestation_polling.max_attempts = attempts;
        }
        if let Some(secs) = parse_var(&lookup, "CCTP_ATTESTATION_INTERVAL_SECS")? {
            config.attestation_polling.poll_interval_secs = secs;
        }
        if let Some(attempts) = parse_var(&lookup, "CCTP_BALANCE_MAX_ATTEMPTS")? {
            config.balance_polling.max_attempts = attempts;
        }
        if let Some(secs) = parse_var(&lookup, "CCTP_BALANCE_INTERVAL_SECS")? {
            config.balance_polling.poll_interval_secs = secs;
        }
        if let Some(secs) = parse_var(&lookup, "CCTP_RPC_TIMEOUT_SECS")? {
            config.provider.timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = parse_var(&lookup, "CCTP_RPC_RETRIES")? {
            config.provider.retry_attempts = retries;
        }
        if let Some(domain) = parse_var::<u32>(&lookup, "CCTP_VAULT_DOMAIN")? {
            config.vault_domain = DomainId::try_from(domain)
                .map_err(|e| BridgeError::InvalidConfig(format!("CCTP_VAULT_DOMAIN: {e}")))?;
        }

        Ok(config)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| BridgeError::InvalidConfig(format!("{key}={raw}: {e}")))
        })
        .transpose()
}
