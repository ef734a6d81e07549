//! Error types raised while starting the gateway.

use std::path::PathBuf;

use a402::AmountError;
use a402::networks::Network;
use a402_http::facilitator::FacilitatorClientError;

/// Errors that stop the gateway from starting.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// The configuration file exists but could not be read.
    #[error("failed to read config {}: {source}", path.display())]
    ReadConfig {
        /// The file that failed.
        path: PathBuf,
        /// The I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid TOML for [`GateConfig`](crate::GateConfig).
    #[error("invalid config: {0}")]
    ParseConfig(#[from] toml::de::Error),

    /// A route's price is not a valid decimal.
    #[error("route {path}: {source}")]
    InvalidPrice {
        /// The route path.
        path: String,
        /// The price error.
        #[source]
        source: AmountError,
    },

    /// The facilitator URL could not be used.
    #[error("facilitator: {0}")]
    Facilitator(#[from] FacilitatorClientError),

    /// An RPC URL override is not a valid URL.
    #[error("invalid RPC URL for {network}: {source}")]
    RpcUrl {
        /// The network the URL is for.
        network: Network,
        /// The parse error.
        #[source]
        source: url::ParseError,
    },
}
