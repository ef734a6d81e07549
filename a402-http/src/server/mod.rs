//! Tower middleware for enforcing [x402](https://www.x402.org) payments on protected routes.
//!
//! A request without an `X-PAYMENT` header gets `402 Payment Required` with a
//! JSON body listing the accepted ways to pay. A request with a header is
//! decoded, matched against those terms and verified; only then does it reach
//! the wrapped service, carrying a [`VerificationContext`] in its extensions.
//!
//! | outcome                                   | response                         |
//! |-------------------------------------------|----------------------------------|
//! | no header                                 | `402`, challenge                 |
//! | header does not decode                    | `400`, `{"error": ...}`          |
//! | payload matches no accepted scheme/network| `402`, challenge with `error`    |
//! | verification rejects                      | `402`, challenge with the reason |
//! | fault outside the protocol                | `500`, `{"error": ...}`          |
//!
//! See [`X402Middleware`] for configuration.
//!
//! ## Configuration Notes
//!
//! - **[`X402Middleware::with_price_tag`]** sets the network and amount accepted for payment.
//!   Add more tags to accept several networks.
//! - **[`X402Middleware::with_base_url`]** sets the base URL for computing full resource URLs.
//!   If not set, the request's `Host` header is used (avoid in production).
//! - **[`X402LayerBuilder::with_description`]** is optional but helps the payer understand what is being paid for.
//! - **[`X402LayerBuilder::with_mime_type`]** sets the MIME type of the protected resource (default: `application/json`).
//! - **[`X402LayerBuilder::with_resource`]** explicitly sets the full URI of the protected resource.

pub mod context;
pub mod error;
pub mod layer;
pub mod paygate;

pub use context::VerificationContext;
pub use error::{PaygateError, VerificationError};
pub use layer::{X402LayerBuilder, X402Middleware};
pub use paygate::{Paygate, resource_url};
