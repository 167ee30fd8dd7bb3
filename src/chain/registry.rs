// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
use std::collections::BTreeMap;

use alloy_chains::NamedChain;
use alloy_primitives::Address;
use tracing::debug;
use url::Url;

use super::addresses::*;
use super::ChainConfig;
use crate::error::{BridgeError, Result};
use crate::protocol::DomainId;

/// Lookup table of supported source chains keyed by chain id.
///
/// Loaded once at startup and shared read-only by every transfer.
///
/// ```rust
/// use cctp_vault_bridge::{ChainRegistry, DomainId};
///
/// let registry = ChainRegistry::mainnet();
/// let base = registry.lookup(8453).unwrap();
/// assert_eq!(base.cctp_domain, DomainId::Base);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    chains: BTreeMap<u64, ChainConfig>,
}

impl ChainRegistry {
    /// Builds a registry, rejecting duplicate chain ids.
    pub fn new(chains: impl IntoIterator<Item = ChainConfig>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for chain in chains {
            let chain_id = chain.chain_id;
            if map.insert(chain_id, chain).is_some() {
                return Err(BridgeError::InvalidConfig(format!(
                    "chain id {chain_id} listed twice"
                )));
            }
        }

        debug!(chains = map.len(), event = "chain_registry_loaded");
        Ok(Self { chains: map })
    }

    /// Parses a JSON array of [`ChainConfig`] entries.
    pub fn from_json(json: &str) -> Result<Self> {
        let chains: Vec<ChainConfig> = serde_json::from_str(json)?;
        Self::new(chains)
    }

    pub fn lookup(&self, chain_id: u64) -> Result<&ChainConfig> {
        self.chains
            .get(&chain_id)
            .ok_or_else(|| BridgeError::ChainNotSupported {
                chain: chain_id.to_string(),
            })
    }

    pub fn all(&self) -> impl Iterator<Item = &ChainConfig> {
        self.chains.values()
    }

    /// First registered chain on the given CCTP domain.
    pub fn by_domain(&self, domain: DomainId) -> Option<&ChainConfig> {
        self.chains.values().find(|chain| chain.cctp_domain == domain)
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// CCTP v1 mainnet deployments with public RPC endpoints.
    pub fn mainnet() -> Self {
        Self::from_static(&[
            entry(
                NamedChain::Mainnet,
                DomainId::Ethereum,
                ETHEREUM_TOKEN_MESSENGER,
                ETHEREUM_MESSAGE_TRANSMITTER,
                ETHEREUM_USDC,
                &[
                    "https://ethereum-rpc.publicnode.com",
                    "https://eth.llamarpc.com",
                ],
                19 * 60,
            ),
            entry(
                NamedChain::Avalanche,
                DomainId::Avalanche,
                AVALANCHE_TOKEN_MESSENGER,
                AVALANCHE_MESSAGE_TRANSMITTER,
                AVALANCHE_USDC,
                &["https://api.avax.network/ext/bc/C/rpc"],
                20,
            ),
            entry(
                NamedChain::Optimism,
                DomainId::Optimism,
                OPTIMISM_TOKEN_MESSENGER,
                OPTIMISM_MESSAGE_TRANSMITTER,
                OPTIMISM_USDC,
                &["https://mainnet.optimism.io"],
                19 * 60,
            ),
            entry(
                NamedChain::Arbitrum,
                DomainId::Arbitrum,
                ARBITRUM_TOKEN_MESSENGER,
                ARBITRUM_MESSAGE_TRANSMITTER,
                ARBITRUM_USDC,
                &[
                    "https://arb1.arbitrum.io/rpc",
                    "https://arbitrum-one-rpc.publicnode.com",
                ],
                19 * 60,
            ),
            entry(
                NamedChain::Base,
                DomainId::Base,
                BASE_TOKEN_MESSENGER,
                BASE_MESSAGE_TRANSMITTER,
                BASE_USDC,
                &["https://mainnet.base.org", "https://base-rpc.publicnode.com"],
                19 * 60,
            ),
            entry(
                NamedChain::Polygon,
                DomainId::Polygon,
                POLYGON_TOKEN_MESSENGER,
                POLYGON_MESSAGE_TRANSMITTER,
                POLYGON_USDC,
                &["https://polygon-rpc.com"],
                8 * 60,
            ),
            entry(
                NamedChain::Unichain,
                DomainId::Unichain,
                UNICHAIN_TOKEN_MESSENGER,
                UNICHAIN_MESSAGE_TRANSMITTER,
                UNICHAIN_USDC,
                &["https://mainnet.unichain.org"],
                19 * 60,
            ),
        ])
    }

    /// CCTP v1 testnet deployments.
    pub fn testnet() -> Self {
        Self::from_static(&[
            entry(
                NamedChain::Sepolia,
                DomainId::Ethereum,
                TESTNET_TOKEN_MESSENGER,
                ETHEREUM_SEPOLIA_MESSAGE_TRANSMITTER,
                ETHEREUM_SEPOLIA_USDC,
                &["https://ethereum-sepolia-rpc.publicnode.com"],
                60,
            ),
            entry(
                NamedChain::BaseSepolia,
                DomainId::Base,
                TESTNET_TOKEN_MESSENGER,
                BASE_SEPOLIA_MESSAGE_TRANSMITTER,
                BASE_SEPOLIA_USDC,
                &["https://sepolia.base.org"],
                20,
            ),
            entry(
                NamedChain::ArbitrumSepolia,
                DomainId::Arbitrum,
                TESTNET_TOKEN_MESSENGER,
                ARBITRUM_SEPOLIA_MESSAGE_TRANSMITTER,
                ARBITRUM_SEPOLIA_USDC,
                &["https://sepolia-rollup.arbitrum.io/rpc"],
                20,
            ),
        ])
    }

    fn from_static(chains: &[ChainConfig]) -> Self {
        Self {
            chains: chains
                .iter()
                .map(|chain| (chain.chain_id, chain.clone()))
                .collect(),
        }
    }
}

fn entry(
    chain: NamedChain,
    cctp_domain: DomainId,
    token_messenger: Address,
    message_transmitter: Address,
    usdc: Address,
    rpc_urls: &[&str],
    confirmation_secs: u64,
) -> ChainConfig {
    ChainConfig {
        chain_id: chain as u64,
        name: chain.to_string(),
        cctp_domain,
        token_messenger,
        message_transmitter,
        usdc,
        rpc_urls: rpc_urls
            .iter()
            .filter_map(|url| Url::parse(url).ok())
            .collect(),
        confirmation_secs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, DomainId::Ethereum)]
    #[case(43114, DomainId::Avalanche)]
    #[case(10, DomainId::Optimism)]
    #[case(42161, DomainId::Arbitrum)]
    #[case(8453, DomainId::Base)]
    #[case(137, DomainId::Polygon)]
    #[case(130, DomainId::Unichain)]
    fn test_mainnet_domains(#[case] chain_id: u64, #[case] domain: DomainId) {
        let registry = ChainRegistry::mainnet();
        let chain = registry.lookup(chain_id).unwrap();

        assert_eq!(chain.cctp_domain, domain);
        assert!(!chain.rpc_urls.is_empty());
        assert!(!chain.is_testnet());
    }

    #[test]
    fn test_testnet_chains_are_testnets() {
        let registry = ChainRegistry::testnet();
        assert_eq!(registry.len(), 3);
        assert!(registry.all().all(ChainConfig::is_testnet));
    }

    #[test]
    fn test_unknown_chain_is_not_supported() {
        let err = ChainRegistry::mainnet().lookup(999_999).unwrap_err();
        assert!(matches!(err, BridgeError::ChainNotSupported { .. }));
    }

    #[test]
    fn test_by_domain() {
        let registry = ChainRegistry::mainnet();
        assert_eq!(registry.by_domain(DomainId::Base).unwrap().chain_id, 8453);
        assert!(registry.by_domain(DomainId::Sui).is_none());
    }

    #[test]
    fn test_from_json_round_trips_registry_data() {
        let chains: Vec<_> = ChainRegistry::testnet().all().cloned().collect();
        let json = serde_json::to_string(&chains).unwrap();

        let loaded = ChainRegistry::from_json(&json).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(
            loaded.lookup(84532).unwrap().usdc,
            BASE_SEPOLIA_USDC
        );
    }

    #[test]
    fn test_duplicate_chain_ids_rejected() {
        let base = ChainRegistry::mainnet().lookup(8453).unwrap().clone();
        let err = ChainRegistry::new([base.clone(), base]).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidConfig(_)));
    }
}
