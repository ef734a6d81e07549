#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for the x402 payment protocol.
//!
//! This crate holds the pieces of an HTTP 402 payment flow that do not depend
//! on a transport or a particular chain client: the wire format, the table of
//! supported networks and schemes, price conversion, requirement building and
//! the verification dispatcher.
//!
//! # Overview
//!
//! A server answers an unpaid request with `402 Payment Required` and a
//! [`proto::PaymentRequired`] body. The client pays, then retries with a
//! base64 [`proto::PaymentPayload`] in the `X-PAYMENT` header. The server hands
//! the payload to a [`verify::PaymentVerifier`], which either delegates to a
//! remote [`facilitator::Facilitator`] or asks a per-scheme
//! [`scheme::SchemeVerifier`] to look the transaction up on chain.
//!
//! # Modules
//!
//! - [`amount`] - Human price to minor unit conversion
//! - [`chain`] - CAIP-2 chain identifiers
//! - [`error`] - Backend and dispatcher error types
//! - [`facilitator`] - Remote verification trait
//! - [`networks`] - The supported network table
//! - [`proto`] - Wire format types and encoding utilities
//! - [`requirements`] - Payment requirement builder
//! - [`scheme`] - Payment schemes, verifiers and provers
//! - [`verify`] - The verification dispatcher
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation for debugging and monitoring

pub mod amount;
pub mod chain;
pub mod error;
pub mod facilitator;
pub mod networks;
pub mod proto;
pub mod requirements;
pub mod scheme;
pub mod verify;

pub use amount::{AmountError, to_minor_units};
pub use error::{BackendError, VerifyError};
pub use networks::Network;
pub use proto::v1::{PaymentPayload, PaymentRequired, PaymentRequirements};
pub use proto::{MinorUnits, VerifyResponse};
pub use requirements::PriceTag;
pub use scheme::Scheme;
pub use verify::PaymentVerifier;
