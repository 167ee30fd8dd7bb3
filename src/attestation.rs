// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! Attestation polling
//!
//! Repeatedly asks an [`AttestationProvider`] for the attestation of one
//! message hash until it is complete, fails, or the attempt budget runs out.
//! Running out of attempts is resumable: nothing on-chain depends on the
//! poller, so a later [`AttestationPoller::wait_for`] with the same hash
//! picks up where this one stopped.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::B256;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};

use crate::config::PollingConfig;
use crate::error::{BridgeError, Result};
use crate::protocol::{Attestation, AttestationStatus};
use crate::spans;
use crate::traits::{AttestationProvider, Clock};

/// Polls for one message's attestation with a fixed attempt budget.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use cctp_vault_bridge::attestation::AttestationPoller;
/// use cctp_vault_bridge::providers::{IrisAttestationProvider, TokioClock};
/// use cctp_vault_bridge::PollingConfig;
/// use alloy_primitives::B256;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example(message_hash: B256) -> Result<(), cctp_vault_bridge::BridgeError> {
/// let poller = AttestationPoller::new(
///     Arc::new(IrisAttestationProvider::production()),
///     Arc::new(TokioClock),
///     PollingConfig::standard_transfer(),
/// );
/// let attestation = poller.wait_for(message_hash, &CancellationToken::new()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AttestationPoller {
    provider: Arc<dyn AttestationProvider>,
    clock: Arc<dyn Clock>,
    config: PollingConfig,
}

impl AttestationPoller {
    pub fn new(
        provider: Arc<dyn AttestationProvider>,
        clock: Arc<dyn Clock>,
        config: PollingConfig,
    ) -> Self {
        Self {
            provider,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &PollingConfig {
        &self.config
    }

    /// Waits for the attestation of `message_hash`.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::AttestationFailed`] if the service rejects the message
    /// - [`BridgeError::AttestationTimeout`] after `max_attempts` unanswered polls
    /// - [`BridgeError::AttestationInterrupted`] if `cancel` fires first
    pub async fn wait_for(&self, message_hash: B256, cancel: &CancellationToken) -> Result<Attestation> {
        self.poll(message_hash, cancel, |_| {}).await
    }

    /// Like [`AttestationPoller::wait_for`], calling `on_attempt` with the
    /// 1-based attempt number before every request.
    pub async fn poll(
        &self,
        message_hash: B256,
        cancel: &CancellationToken,
        mut on_attempt: impl FnMut(u32) + Send,
    ) -> Result<Attestation> {
        let span = spans::poll_attestation(
            &message_hash,
            self.config.max_attempts,
            self.config.poll_interval_secs,
        );

        async move {
            for attempt in 1..=self.config.max_attempts {
                if cancel.is_cancelled() {
                    return Err(self.interrupted(attempt));
                }
                on_attempt(attempt);

                let response = self
                    .provider
                    .get_attestation(message_hash)
                    .instrument(spans::attestation_request(attempt))
                    .await;

                match response {
                    Ok(response) => match response.status {
                        AttestationStatus::Complete => {
                            let signature = response.attestation.ok_or_else(|| {
                                spans::record_error_with_context(
                                    "AttestationFailed",
                                    "Attestation status is complete but attestation field is null",
                                    None,
                                );
                                error!(event = "attestation_data_missing");
                                BridgeError::AttestationFailed {
                                    reason: "complete response carried no attestation".to_string(),
                                }
                            })?;

                            info!(
                                attempt,
                                attestation_length_bytes = signature.len(),
                                event = "attestation_complete"
                            );
                            return Ok(Attestation::new(message_hash, signature));
                        }
                        AttestationStatus::Failed => {
                            spans::record_error_with_context(
                                "AttestationFailed",
                                "Attestation service returned failed status",
                                Some("The source burn may be invalid or reorged out"),
                            );
                            error!(attempt, event = "attestation_failed");
                            return Err(BridgeError::AttestationFailed {
                                reason: "attestation service reported failure".to_string(),
                            });
                        }
                        AttestationStatus::Pending | AttestationStatus::PendingConfirmations => {
                            debug!(attempt, status = ?response.status, event = "attestation_pending");
                        }
                    },
                    Err(BridgeError::RateLimitExceeded {
                        retry_after_seconds,
                    }) => {
                        warn!(attempt, retry_after_seconds, event = "attestation_rate_limited");
                        if attempt < self.config.max_attempts {
                            self.pause(Duration::from_secs(retry_after_seconds), cancel, attempt)
                                .await?;
                        }
                        continue;
                    }
                    Err(e) => {
                        // 404s and network blips count as an unanswered attempt
                        debug!(attempt, error = %e, event = "attestation_request_failed");
                    }
                }

                if attempt < self.config.max_attempts {
                    self.pause(self.config.poll_interval(), cancel, attempt).await?;
                }
            }

            spans::record_error_with_context(
                "AttestationTimeout",
                &format!(
                    "Attestation polling timed out after {} attempts",
                    self.config.max_attempts
                ),
                Some(&format!(
                    "Total duration: {} seconds",
                    self.config.total_timeout_secs()
                )),
            );
            error!(
                total_duration_secs = self.config.total_timeout_secs(),
                event = "attestation_timeout"
            );
            Err(BridgeError::AttestationTimeout {
                attempts: self.config.max_attempts,
            })
        }
        .instrument(span)
        .await
    }

    async fn pause(&self, duration: Duration, cancel: &CancellationToken, attempt: u32) -> Result<()> {
        tokio::select! {
            _ = self.clock.sleep(duration) => Ok(()),
            _ = cancel.cancelled() => Err(self.interrupted(attempt)),
        }
    }

    fn interrupted(&self, attempt: u32) -> BridgeError {
        warn!(attempt, event = "attestation_wait_interrupted");
        BridgeError::AttestationInterrupted
    }
}
