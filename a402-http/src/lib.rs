#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! HTTP transport layer for the x402 payment protocol.
//!
//! Provides the `X-PAYMENT` header codec and constants, plus feature-gated
//! pieces for each side of the exchange.
//!
//! # Modules
//!
//! - [`constants`] - header names, status codes, default URLs
//! - [`headers`] - base64 JSON codec for the `X-PAYMENT` header
//! - [`error`] - codec error types
//! - [`facilitator`] - HTTP facilitator client (feature: `facilitator`)
//! - [`server`] - tower layer gating routes behind payment (feature: `server`)
//! - [`client`] - reqwest middleware that pays and retries (feature: `client`)

pub mod constants;
pub mod error;
pub mod headers;

#[cfg(feature = "facilitator")]
pub mod facilitator;

#[cfg(feature = "server")]
pub mod server;

#[cfg(feature = "client")]
pub mod client;
