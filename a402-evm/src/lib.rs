#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! EVM chain support for the x402 payment protocol.
//!
//! Payments on Base use the `x402+eip712` scheme: the payer transfers USDC and
//! proves it with the transaction hash; the merchant checks the transaction
//! receipt.
//!
//! # Feature Flags
//!
//! - `verifier` - [`Eip712Verifier`], receipt lookup through an `alloy` provider
//! - `client` - [`Eip712Payer`], proof construction around a caller-supplied transfer
//! - `telemetry` - `tracing` spans on verification
//!
mod networks;
pub use networks::*;

#[cfg(feature = "verifier")]
pub mod verify;
#[cfg(feature = "verifier")]
pub use verify::Eip712Verifier;

#[cfg(feature = "client")]
pub mod client;
#[cfg(feature = "client")]
pub use client::{Eip712Payer, EvmTransfer};
