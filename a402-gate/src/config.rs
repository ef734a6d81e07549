//! Gateway configuration.
//!
//! Loaded from a TOML file. `$VAR` and `${VAR}` references anywhere in the
//! file are replaced from the environment before parsing; unresolved ones are
//! left as written.
//!
//! # Example Configuration
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 4402
//! public_url = "https://api.example.com"
//! facilitator_url = "$FACILITATOR_URL"
//! verify_timeout_secs = 10
//!
//! [rpc]
//! base = "https://mainnet.base.org"
//! solana-mainnet = "${SOLANA_RPC_URL}"
//!
//! [[routes]]
//! path = "/weather"
//! price = "0.05"
//! network = "base"
//! pay_to = "0x1111111111111111111111111111111111111111"
//! description = "Current weather"
//! content = { forecast = "sunny", temperature = 21 }
//!
//! [discovery]
//! register = true
//! category = "data"
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to the configuration file (default: `config.toml`)
//! - `HOST` - Overrides the bind address
//! - `PORT` - Overrides the port

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use a402::networks::Network;
use a402_http::server::resource_url;
use clap::Parser;
use regex::{Captures, Regex};
use serde::Deserialize;
use url::Url;

use crate::error::GateError;

static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))")
        .expect("valid env var pattern")
});

/// CLI arguments for the gateway.
#[derive(Parser, Debug)]
#[command(name = "a402-gate")]
#[command(about = "x402 payment-gated HTTP gateway")]
struct CliArgs {
    /// Path to the TOML configuration file
    #[arg(long, short, env = "CONFIG", default_value = "config.toml")]
    config: PathBuf,
}

/// Top-level gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GateConfig {
    /// Bind address (default: `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port (default: `4402`).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Public origin used to build resource URLs. Falls back to the `Host` header.
    #[serde(default)]
    pub public_url: Option<Url>,

    /// Facilitator to delegate verification to. Direct chain verification when unset.
    #[serde(default)]
    pub facilitator_url: Option<String>,

    /// Bound on every verification call, in seconds.
    #[serde(default = "default_verify_timeout")]
    pub verify_timeout_secs: u64,

    /// RPC endpoint overrides for direct verification.
    #[serde(default)]
    pub rpc: RpcConfig,

    /// Paid routes.
    #[serde(default)]
    pub routes: Vec<RouteConfig>,

    /// Facilitator discovery registration.
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

/// Per-network RPC endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RpcConfig {
    /// Base JSON-RPC endpoint.
    #[serde(default)]
    pub base: Option<String>,

    /// Solana JSON-RPC endpoint.
    #[serde(default, rename = "solana-mainnet")]
    pub solana_mainnet: Option<String>,
}

impl RpcConfig {
    /// The endpoint for `network`: the override if set, else the network default.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::RpcUrl`] if the URL does not parse.
    pub fn url_for(&self, network: Network) -> Result<Url, GateError> {
        let configured = match network {
            Network::Base => self.base.as_deref(),
            Network::SolanaMainnet => self.solana_mainnet.as_deref(),
        };
        let raw = configured.unwrap_or_else(|| network.default_rpc_url());
        Url::parse(raw).map_err(|source| GateError::RpcUrl { network, source })
    }
}

/// A paid route.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteConfig {
    /// The axum route path, e.g. `/weather`.
    pub path: String,
    /// Human price, e.g. `"0.05"` or `"$1"`.
    pub price: String,
    /// Network the payment settles on.
    pub network: Network,
    /// Recipient address or account.
    pub pay_to: String,
    /// Description shown in the challenge.
    #[serde(default)]
    pub description: Option<String>,
    /// MIME type advertised in the challenge.
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Payment window in seconds.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    /// JSON returned to paying callers.
    #[serde(default)]
    pub content: serde_json::Value,
}

/// Facilitator discovery settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    /// Registers every route at startup when a facilitator is configured.
    #[serde(default)]
    pub register: bool,
    /// Prepended to each route path to form the registered name.
    #[serde(default)]
    pub name_prefix: Option<String>,
    /// Category sent with every registration.
    #[serde(default = "default_category")]
    pub category: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            register: false,
            name_prefix: None,
            category: default_category(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

const fn default_port() -> u16 {
    4402
}

const fn default_verify_timeout() -> u64 {
    10
}

fn default_category() -> String {
    "api".to_owned()
}

impl GateConfig {
    /// Loads the file named by `--config` / `CONFIG`, defaulting to `config.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load() -> Result<Self, GateError> {
        let args = CliArgs::parse();
        Self::load_from(&args.config, |name| std::env::var(name).ok())
    }

    /// Loads `path`, resolving variables and `HOST`/`PORT` through `lookup`.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from<F>(path: &Path, lookup: F) -> Result<Self, GateError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let content = if path.exists() {
            std::fs::read_to_string(path).map_err(|source| GateError::ReadConfig {
                path: path.to_owned(),
                source,
            })?
        } else {
            String::new()
        };
        Self::parse(&content, lookup)
    }

    /// Parses TOML `content`, resolving variables and `HOST`/`PORT` through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::ParseConfig`] if the expanded text is not a valid config.
    pub fn parse<F>(content: &str, lookup: F) -> Result<Self, GateError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let expanded = expand_env_vars(content, &lookup);
        let mut config: Self = toml::from_str(&expanded)?;

        if let Some(host) = lookup("HOST").and_then(|h| h.parse().ok()) {
            config.host = host;
        }
        if let Some(port) = lookup("PORT").and_then(|p| p.parse().ok()) {
            config.port = port;
        }
        Ok(config)
    }

    /// The facilitator URL, unless unset, blank or an unresolved variable.
    #[must_use]
    pub fn facilitator_url(&self) -> Option<&str> {
        self.facilitator_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty() && !url.starts_with('$'))
    }

    /// The verification bound.
    #[must_use]
    pub const fn verify_timeout(&self) -> Duration {
        Duration::from_secs(self.verify_timeout_secs)
    }

    /// The public URL of `path`.
    ///
    /// Uses `public_url` when configured, else the bind address.
    #[must_use]
    pub fn endpoint_for(&self, path: &str) -> String {
        match &self.public_url {
            Some(base) => resource_url(base, path, None),
            None => format!("http://{}:{}{path}", self.host, self.port),
        }
    }
}

/// Replaces `$VAR` and `${VAR}` with `lookup(VAR)`, leaving unknown names as written.
fn expand_env_vars<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    ENV_VAR
        .replace_all(input, |caps: &Captures<'_>| {
            let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            lookup(name).unwrap_or_else(|| caps[0].to_owned())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn expands_both_forms_and_keeps_unknown() {
        let lookup = env(&[("A", "1"), ("B_2", "two")]);
        assert_eq!(
            expand_env_vars("x=$A y=${B_2} z=$MISSING w=${ALSO_MISSING} $", lookup),
            "x=1 y=two z=$MISSING w=${ALSO_MISSING} $"
        );
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = GateConfig::parse("", env(&[])).unwrap();
        assert_eq!(config.host, default_host());
        assert_eq!(config.port, 4402);
        assert_eq!(config.verify_timeout(), Duration::from_secs(10));
        assert!(config.routes.is_empty());
        assert!(!config.discovery.register);
        assert_eq!(config.discovery.category, "api");
        assert_eq!(config.facilitator_url(), None);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let config =
            GateConfig::load_from(Path::new("/nonexistent/a402-gate.toml"), env(&[])).unwrap();
        assert_eq!(config.port, 4402);
    }

    #[test]
    fn parses_routes_and_overrides() {
        let toml = r#"
            port = 8080
            public_url = "https://api.example.com/v1/"
            facilitator_url = "${FACILITATOR}"

            [rpc]
            solana-mainnet = "$SOLANA_RPC"

            [[routes]]
            path = "/weather"
            price = "0.05"
            network = "base"
            pay_to = "0x1111111111111111111111111111111111111111"
            content = { forecast = "sunny", temperature = 21 }

            [discovery]
            register = true
            category = "data"
        "#;
        let lookup = env(&[
            ("FACILITATOR", "https://facilitator.example/x402/"),
            ("SOLANA_RPC", "http://127.0.0.1:8899"),
            ("PORT", "9090"),
        ]);
        let config = GateConfig::parse(toml, lookup).unwrap();

        assert_eq!(config.port, 9090);
        assert_eq!(
            config.facilitator_url(),
            Some("https://facilitator.example/x402/")
        );
        assert_eq!(
            config.rpc.url_for(Network::SolanaMainnet).unwrap().as_str(),
            "http://127.0.0.1:8899/"
        );
        assert_eq!(
            config.rpc.url_for(Network::Base).unwrap().as_str(),
            "https://mainnet.base.org/"
        );

        let route = &config.routes[0];
        assert_eq!(route.network, Network::Base);
        assert_eq!(
            route.content,
            serde_json::json!({"forecast": "sunny", "temperature": 21})
        );
        assert_eq!(
            config.endpoint_for(&route.path),
            "https://api.example.com/v1/weather"
        );
        assert!(config.discovery.register);
        assert_eq!(config.discovery.category, "data");
    }

    #[test]
    fn unresolved_facilitator_is_ignored() {
        let config = GateConfig::parse(r#"facilitator_url = "$NOPE""#, env(&[])).unwrap();
        assert_eq!(config.facilitator_url(), None);
    }

    #[test]
    fn endpoint_keeps_public_url_prefix_without_trailing_slash() {
        let config =
            GateConfig::parse(r#"public_url = "https://api.example.com/v1""#, env(&[])).unwrap();
        assert_eq!(config.endpoint_for("/weather"), "https://api.example.com/v1/weather");
    }

    #[test]
    fn endpoint_without_public_url_uses_bind_address() {
        let config = GateConfig::parse("host = \"127.0.0.1\"\nport = 3000", env(&[])).unwrap();
        assert_eq!(config.endpoint_for("/feed"), "http://127.0.0.1:3000/feed");
    }

    #[test]
    fn unknown_network_is_rejected() {
        let toml = r#"
            [[routes]]
            path = "/x"
            price = "1"
            network = "polygon"
            pay_to = "0xabc"
        "#;
        assert!(matches!(
            GateConfig::parse(toml, env(&[])),
            Err(GateError::ParseConfig(_))
        ));
    }

    #[test]
    fn bad_rpc_override_is_reported() {
        let config = GateConfig::parse("[rpc]\nbase = \"not a url\"", env(&[])).unwrap();
        assert!(matches!(
            config.rpc.url_for(Network::Base),
            Err(GateError::RpcUrl {
                network: Network::Base,
                ..
            })
        ));
    }
}
