//! Solana mainnet constants.

use a402::networks::Network;
use solana_pubkey::{Pubkey, pubkey};

/// USDC mint on Solana mainnet.
pub const USDC_SOLANA: Pubkey = pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");

/// Ticker carried in the `currency` field of a proof.
pub const USDC_CURRENCY: &str = "USDC";

/// The USDC mint on a Solana network, or `None` for other families.
#[must_use]
pub const fn usdc_mint(network: Network) -> Option<Pubkey> {
    match network {
        Network::SolanaMainnet => Some(USDC_SOLANA),
        Network::Base => None,
    }
}
