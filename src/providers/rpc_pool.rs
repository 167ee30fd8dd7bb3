// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! Per-chain pool of RPC endpoints
//!
//! Public endpoints stall and drop requests. Every call through the pool is
//! bounded by [`ProviderConfig::timeout`]; reads are retried with exponential
//! backoff and fall through to the next endpoint, submissions run once.

use std::future::Future;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use alloy_network::Ethereum;
use alloy_primitives::TxHash;
use alloy_rpc_types::TransactionReceipt;
use backon::{ExponentialBuilder, Retryable};
use futures::future::join_all;
use tokio::time::Instant;
use tracing::{debug, info, warn, Instrument};
use url::Url;

use crate::config::{PollingConfig, ProviderConfig};
use crate::error::{BridgeError, Result};
use crate::spans;
use crate::traits::BlockchainProvider;

#[derive(Debug, Clone)]
struct Endpoint<C> {
    url: Url,
    client: C,
}

/// Latency probe result for one endpoint; `None` when it did not answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointRank {
    pub url: Url,
    pub latency: Option<Duration>,
}

/// Endpoints of one chain, ordered best first.
///
/// Owned by whoever wires the orchestrator together and shared through an
/// `Arc`; there is no process-wide client cache.
#[derive(Debug)]
pub struct RpcPool<C> {
    endpoints: RwLock<Vec<Endpoint<C>>>,
    config: ProviderConfig,
}

impl<C> RpcPool<C>
where
    C: Clone + Send + Sync,
{
    pub fn new(endpoints: impl IntoIterator<Item = (Url, C)>, config: ProviderConfig) -> Result<Self> {
        let endpoints: Vec<_> = endpoints
            .into_iter()
            .map(|(url, client)| Endpoint { url, client })
            .collect();

        if endpoints.is_empty() {
            return Err(BridgeError::InvalidConfig(
                "RPC pool needs at least one endpoint".to_string(),
            ));
        }

        Ok(Self {
            endpoints: RwLock::new(endpoints),
            config,
        })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Endpoint URLs in current preference order.
    pub fn urls(&self) -> Vec<Url> {
        self.snapshot().into_iter().map(|e| e.url).collect()
    }

    /// Client of the currently preferred endpoint, for building requests.
    pub fn primary(&self) -> Result<C> {
        self.snapshot()
            .into_iter()
            .next()
            .map(|endpoint| endpoint.client)
            .ok_or_else(|| BridgeError::InvalidConfig("RPC pool is empty".to_string()))
    }

    fn snapshot(&self) -> Vec<Endpoint<C>> {
        self.endpoints
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.config.min_retry_delay())
            .with_max_delay(self.config.timeout)
            .with_max_times(self.config.retry_attempts as usize)
    }

    async fn bounded<T>(&self, operation: &'static str, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.config.timeout, call)
            .await
            .map_err(|_| BridgeError::RpcTimeout {
                operation,
                timeout_secs: self.config.timeout.as_secs(),
            })?
    }

    /// Runs an idempotent query, retrying transient failures on each endpoint
    /// before moving to the next one.
    pub async fn read<T, F, Fut>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Fn(C) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for endpoint in self.snapshot() {
            let attempt = || self.bounded(operation, call(endpoint.client.clone()));

            let result = attempt
                .retry(self.backoff())
                .when(BridgeError::is_transient)
                .notify(|err, delay| {
                    debug!(
                        operation,
                        endpoint = %endpoint.url,
                        error = %err,
                        retry_in_ms = delay.as_millis() as u64,
                        event = "rpc_read_retry"
                    );
                })
                .instrument(spans::rpc_call(operation, endpoint.url.as_str()))
                .await;

            match result {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() => {
                    warn!(
                        operation,
                        endpoint = %endpoint.url,
                        error = %e,
                        event = "rpc_endpoint_failed"
                    );
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(BridgeError::EndpointsExhausted {
            operation,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no endpoints".to_string()),
        })
    }

    /// Runs a state-changing call exactly once on the best endpoint.
    ///
    /// A timeout here leaves the outcome unknown; callers must not resubmit
    /// blindly.
    pub async fn submit<T, F, Fut>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: FnOnce(C) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let endpoint = self
            .snapshot()
            .into_iter()
            .next()
            .ok_or_else(|| BridgeError::InvalidConfig("RPC pool is empty".to_string()))?;

        self.bounded(operation, call(endpoint.client))
            .instrument(spans::rpc_call(operation, endpoint.url.as_str()))
            .await
    }
}

impl<C> RpcPool<C>
where
    C: BlockchainProvider<Ethereum> + Clone + Send + Sync,
{
    /// Probes every endpoint concurrently and reorders the pool by response
    /// time. Endpoints that fail or time out go last, in their previous order.
    pub async fn rank_by_latency(&self) -> Vec<EndpointRank> {
        let probes = self.snapshot().into_iter().map(|endpoint| async move {
            let started = Instant::now();
            let outcome =
                tokio::time::timeout(self.config.timeout, endpoint.client.get_block_number()).await;
            let latency = match outcome {
                Ok(Ok(_)) => Some(started.elapsed()),
                Ok(Err(e)) => {
                    warn!(endpoint = %endpoint.url, error = %e, event = "rpc_probe_failed");
                    None
                }
                Err(_) => {
                    warn!(endpoint = %endpoint.url, event = "rpc_probe_timed_out");
                    None
                }
            };
            (endpoint, latency)
        });

        let mut ranked = join_all(probes).await;
        ranked.sort_by_key(|(_, latency)| latency.unwrap_or(Duration::MAX));

        let ranks = ranked
            .iter()
            .map(|(endpoint, latency)| EndpointRank {
                url: endpoint.url.clone(),
                latency: *latency,
            })
            .collect::<Vec<_>>();

        *self
            .endpoints
            .write()
            .unwrap_or_else(PoisonError::into_inner) =
            ranked.into_iter().map(|(endpoint, _)| endpoint).collect();

        info!(
            best = ranks.first().map(|rank| rank.url.as_str()).unwrap_or_default(),
            reachable = ranks.iter().filter(|r| r.latency.is_some()).count(),
            total = ranks.len(),
            event = "rpc_endpoints_ranked"
        );

        ranks
    }

    /// Polls for a receipt until it appears or the polling budget runs out.
    pub async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        polling: PollingConfig,
    ) -> Result<TransactionReceipt> {
        async {
            for attempt in 1..=polling.max_attempts {
                let receipt = self
                    .read("eth_getTransactionReceipt", |client| async move {
                        client.get_transaction_receipt(tx_hash).await
                    })
                    .await?;

                if let Some(receipt) = receipt {
                    debug!(tx_hash = %tx_hash, attempt, event = "receipt_found");
                    return Ok(receipt);
                }

                if attempt < polling.max_attempts {
                    tokio::time::sleep(polling.poll_interval()).await;
                }
            }

            Err(BridgeError::TransactionFailed {
                reason: format!(
                    "no receipt for {tx_hash} after {} attempts",
                    polling.max_attempts
                ),
            })
        }
        .instrument(spans::wait_for_receipt(tx_hash, polling.max_attempts))
        .await
    }
}
