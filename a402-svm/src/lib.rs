#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Solana chain support for the x402 payment protocol.
//!
//! Payments on Solana mainnet use the `x402+solana` scheme: the payer sends
//! USDC and proves it with the transaction signature; the merchant looks the
//! transaction up and accepts it if it landed without an error.
//!
//! # Feature Flags
//!
//! - `verifier` - [`SolanaVerifier`], transaction lookup through `solana-client`
//! - `client` - [`SolanaPayer`], proof construction around a caller-supplied transfer
//! - `telemetry` - `tracing` spans on verification
//!
mod networks;
pub use networks::*;

#[cfg(feature = "verifier")]
pub mod verify;
#[cfg(feature = "verifier")]
pub use verify::SolanaVerifier;

#[cfg(feature = "client")]
pub mod client;
#[cfg(feature = "client")]
pub use client::{SolanaPayer, SolanaTransfer};
