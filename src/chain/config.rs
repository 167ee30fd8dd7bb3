// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
use alloy_chains::NamedChain;
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::protocol::DomainId;

/// Immutable description of one CCTP-enabled chain.
///
/// Adding a chain is a data change: build one of these (or add an entry to the
/// JSON fed to [`ChainRegistry::from_json`](super::ChainRegistry::from_json)).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    /// EIP-155 chain id
    pub chain_id: u64,
    pub name: String,
    pub cctp_domain: DomainId,
    pub token_messenger: Address,
    pub message_transmitter: Address,
    pub usdc: Address,
    /// Endpoints in preference order; the pool re-ranks them by latency.
    pub rpc_urls: Vec<Url>,
    /// Average time until Circle attests a burn from this chain,
    /// see <https://developers.circle.com/stablecoins/required-block-confirmations>
    #[serde(default)]
    pub confirmation_secs: u64,
}

impl ChainConfig {
    /// The alloy named chain, when the chain id is one alloy knows about.
    pub fn named(&self) -> Option<NamedChain> {
        NamedChain::try_from(self.chain_id).ok()
    }

    pub fn is_testnet(&self) -> bool {
        self.named().is_some_and(|chain| chain.is_testnet())
    }

    /// The first configured RPC endpoint.
    pub fn rpc_url(&self) -> Option<&Url> {
        self.rpc_urls.first()
    }
}
