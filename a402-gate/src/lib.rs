//! x402 payment gateway.
//!
//! Serves the routes listed in a TOML file behind the x402 payment layer.
//! Each route has a price, a network and a recipient, and answers with fixed
//! JSON content once a payment is verified.
//!
//! # Modules
//!
//! - [`config`] - TOML configuration with environment variable expansion
//! - [`discovery`] - Announces routes to a facilitator's discovery index
//! - [`error`] - Startup error types
//! - [`routes`] - Verifier selection and the axum router
//! - [`util`] - Signal handling

pub mod config;
pub mod discovery;
pub mod error;
pub mod routes;
pub mod util;

pub use config::GateConfig;
pub use error::GateError;
pub use routes::router;
