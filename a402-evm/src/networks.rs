//! Base network constants.

use a402::networks::Network;
use alloy_primitives::{Address, address};

/// Base mainnet chain id.
pub const BASE_CHAIN_ID: u64 = 8453;

/// USDC contract address on Base mainnet.
pub const USDC_BASE: Address = address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");

/// Ticker carried in the `currency` field of a proof.
pub const USDC_CURRENCY: &str = "USDC";

/// The numeric chain id for an EVM network, or `None` for other families.
#[must_use]
pub const fn evm_chain_id(network: Network) -> Option<u64> {
    match network {
        Network::Base => Some(BASE_CHAIN_ID),
        Network::SolanaMainnet => None,
    }
}

/// The USDC contract on an EVM network, or `None` for other families.
#[must_use]
pub const fn usdc_address(network: Network) -> Option<Address> {
    match network {
        Network::Base => Some(USDC_BASE),
        Network::SolanaMainnet => None,
    }
}
