//! The supported network table.
//!
//! [`Network`] is the single source of truth for everything that varies per
//! network: the scheme used to pay on it, the USDC asset identifier, the
//! `extra` metadata embedded in requirements, the default RPC endpoint and the
//! CAIP-2 chain id. Requirement building and verification both read from here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::chain::ChainId;
use crate::scheme::Scheme;

/// Static metadata for one network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkInfo {
    /// Wire name (e.g., `"base"`).
    pub name: &'static str,
    /// The scheme payments on this network use.
    pub scheme: Scheme,
    /// CAIP-2 namespace (e.g., `"eip155"`).
    pub namespace: &'static str,
    /// CAIP-2 reference (e.g., `"8453"`).
    pub reference: &'static str,
    /// USDC contract address or mint.
    pub asset: &'static str,
    /// EIP-712 domain `(name, version)` of the asset, if the scheme needs it.
    pub asset_domain: Option<(&'static str, &'static str)>,
    /// Public RPC endpoint used when no override is configured.
    pub default_rpc_url: &'static str,
}

static BASE: NetworkInfo = NetworkInfo {
    name: "base",
    scheme: Scheme::Eip712,
    namespace: "eip155",
    reference: "8453",
    asset: "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
    asset_domain: Some(("USDC", "2")),
    default_rpc_url: "https://mainnet.base.org",
};

static SOLANA_MAINNET: NetworkInfo = NetworkInfo {
    name: "solana-mainnet",
    scheme: Scheme::Solana,
    namespace: "solana",
    reference: "5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp",
    asset: "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
    asset_domain: None,
    default_rpc_url: "https://api.mainnet-beta.solana.com",
};

/// A supported network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Network {
    /// Base mainnet (EVM, chain id 8453).
    #[serde(rename = "base")]
    Base,
    /// Solana mainnet-beta.
    #[serde(rename = "solana-mainnet")]
    SolanaMainnet,
}

impl Network {
    /// Every supported network.
    pub const ALL: [Self; 2] = [Self::Base, Self::SolanaMainnet];

    /// Static metadata for this network.
    #[must_use]
    pub const fn info(self) -> &'static NetworkInfo {
        match self {
            Self::Base => &BASE,
            Self::SolanaMainnet => &SOLANA_MAINNET,
        }
    }

    /// The wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        self.info().name
    }

    /// The scheme used to pay on this network.
    #[must_use]
    pub const fn scheme(self) -> Scheme {
        self.info().scheme
    }

    /// The USDC asset identifier.
    #[must_use]
    pub const fn asset(self) -> &'static str {
        self.info().asset
    }

    /// The default RPC endpoint.
    #[must_use]
    pub const fn default_rpc_url(self) -> &'static str {
        self.info().default_rpc_url
    }

    /// The CAIP-2 chain id.
    #[must_use]
    pub fn chain_id(self) -> ChainId {
        let info = self.info();
        ChainId::new(info.namespace, info.reference)
    }

    /// Scheme metadata placed in `extra`, or `None` when the scheme needs none.
    #[must_use]
    pub fn extra(self) -> Option<serde_json::Value> {
        self.info()
            .asset_domain
            .map(|(name, version)| json!({ "name": name, "version": version }))
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A network name that is not in [`Network::ALL`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported network: {0}")]
pub struct UnknownNetwork(pub String);

impl FromStr for Network {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|network| network.as_str() == s)
            .ok_or_else(|| UnknownNetwork(s.to_owned()))
    }
}
