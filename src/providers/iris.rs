// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! Circle Iris API attestation provider implementation.

use std::time::Duration;

use alloy_primitives::B256;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument, trace, warn};
use url::Url;

use crate::config::{ATTESTATION_PATH, IRIS_API, IRIS_API_SANDBOX};
use crate::error::{BridgeError, Result};
use crate::protocol::AttestationResponse;
use crate::traits::AttestationProvider;

/// Fallback wait when a 429 carries no usable `Retry-After` header
const DEFAULT_RETRY_AFTER_SECS: u64 = 300;

/// Attestation lookups against Circle's Iris API
/// (`GET {base}/v1/attestations/{messageHash}`).
///
/// ```rust,no_run
/// use cctp_vault_bridge::providers::IrisAttestationProvider;
/// use cctp_vault_bridge::traits::AttestationProvider;
/// use alloy_primitives::B256;
///
/// # async fn example() -> Result<(), cctp_vault_bridge::BridgeError> {
/// let iris = IrisAttestationProvider::production();
/// let response = iris.get_attestation(B256::ZERO).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct IrisAttestationProvider {
    base_url: Url,
    client: Client,
}

impl IrisAttestationProvider {
    /// Creates a provider for the given base URL, e.g. `https://iris-api.circle.com`.
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base_url = Url::parse(base_url).map_err(|e| BridgeError::InvalidUrl {
            reason: format!("{base_url}: {e}"),
        })?;
        // join() replaces the last segment unless the base ends with a slash
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { base_url, client })
    }

    pub fn production() -> Self {
        Self::from_known(IRIS_API)
    }

    pub fn sandbox() -> Self {
        Self::from_known(IRIS_API_SANDBOX)
    }

    fn from_known(base: &str) -> Self {
        Self {
            base_url: Url::parse(base).unwrap_or_else(|_| unreachable!("static Iris URL")),
            client: Client::new(),
        }
    }

    /// Full lookup URL; the hash is rendered with its `0x` prefix.
    pub fn attestation_url(&self, message_hash: B256) -> Result<Url> {
        self.base_url
            .join(&format!("{ATTESTATION_PATH}{message_hash}"))
            .map_err(|e| BridgeError::InvalidUrl {
                reason: format!("Failed to construct attestation URL: {e}"),
            })
    }
}

#[async_trait]
impl AttestationProvider for IrisAttestationProvider {
    #[instrument(skip(self), fields(message_hash = %message_hash))]
    async fn get_attestation(&self, message_hash: B256) -> Result<AttestationResponse> {
        let url = self.attestation_url(message_hash)?;
        trace!(url = %url, "Requesting attestation from Iris API");

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);

            warn!(retry_after_seconds = retry_after, event = "rate_limit_exceeded");
            return Err(BridgeError::RateLimitExceeded {
                retry_after_seconds: retry_after,
            });
        }

        // Iris answers 404 until it has indexed the burn
        if status == StatusCode::NOT_FOUND {
            debug!(event = "attestation_not_found");
            return Err(BridgeError::AttestationNotFound);
        }

        response.error_for_status_ref()?;

        let attestation: AttestationResponse = response.json().await?;
        debug!(status = ?attestation.status, event = "attestation_response_parsed");

        Ok(attestation)
    }
}
