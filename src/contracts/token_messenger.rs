// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! TokenMessenger bindings
//!
//! The source-side entry point of a CCTP transfer: `depositForBurn` burns
//! local USDC and has the message transmitter emit the cross-chain message.

use alloy_network::Ethereum;
use alloy_primitives::{Address, U256};
use alloy_provider::Provider;
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::sol;
use tracing::{debug, info};

use crate::protocol::{DomainId, Recipient};
use TokenMessenger::TokenMessengerInstance;

/// The CCTP v1 Token Messenger contract wrapper
pub struct TokenMessengerContract<P: Provider<Ethereum>> {
    instance: TokenMessengerInstance<P>,
}

impl<P: Provider<Ethereum>> TokenMessengerContract<P> {
    pub fn new(address: Address, provider: P) -> Self {
        debug!(
            contract_address = %address,
            event = "token_messenger_contract_initialized"
        );
        Self {
            instance: TokenMessengerInstance::new(address, provider),
        }
    }

    /// Builds the `depositForBurn(amount, destinationDomain, mintRecipient, burnToken)`
    /// transaction. The recipient is passed as the 32-byte word CCTP carries.
    pub fn deposit_for_burn_transaction(
        &self,
        from_address: Address,
        recipient: Recipient,
        destination_domain: DomainId,
        token_address: Address,
        amount: U256,
    ) -> TransactionRequest {
        info!(
            from_address = %from_address,
            recipient = %recipient,
            destination_domain = %destination_domain,
            token_address = %token_address,
            amount = %amount,
            contract_address = %self.instance.address(),
            event = "deposit_for_burn_transaction_created"
        );

        self.instance
            .depositForBurn(
                amount,
                destination_domain.as_u32(),
                recipient.as_word(),
                token_address,
            )
            .from(from_address)
            .into_transaction_request()
    }

    pub fn address(&self) -> Address {
        *self.instance.address()
    }
}

sol!(
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract TokenMessenger {
        event DepositForBurn(
            uint64 indexed nonce,
            address indexed burnToken,
            uint256 amount,
            address indexed depositor,
            bytes32 mintRecipient,
            uint32 destinationDomain,
            bytes32 destinationTokenMessenger,
            bytes32 destinationCaller
        );

        function depositForBurn(
            uint256 amount,
            uint32 destinationDomain,
            bytes32 mintRecipient,
            address burnToken
        ) external returns (uint64 nonce);
    }
);

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use alloy_provider::ProviderBuilder;
    use alloy_sol_types::SolCall;

    #[test]
    fn test_deposit_for_burn_encodes_padded_recipient() {
        let provider =
            ProviderBuilder::new().connect_http("http://localhost:8545".parse().unwrap());
        let messenger = TokenMessengerContract::new(
            address!("bd3fa81b58ba92a82136038b25adec7066af3155"),
            provider,
        );
        let recipient = Recipient::from_address(address!("742d35Cc6634C0532925a3b844Bc9e7595f8fA0d"));
        let usdc = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");

        let tx = messenger.deposit_for_burn_transaction(
            Address::ZERO,
            recipient,
            DomainId::Sui,
            usdc,
            U256::from(25_500_000u64),
        );

        let input = tx.input.input().unwrap();
        let call = TokenMessenger::depositForBurnCall::abi_decode(input).unwrap();
        assert_eq!(call.destinationDomain, 8);
        assert_eq!(call.mintRecipient, recipient.as_word());
        assert_eq!(call.burnToken, usdc);
        assert_eq!(call.amount, U256::from(25_500_000u64));
    }
}
