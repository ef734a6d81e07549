//! Chain identification.
//!
//! [`ChainId`] is a CAIP-2 identifier, e.g. `eip155:8453` for Base.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// A CAIP-2 blockchain identifier, `namespace:reference`.
///
/// Serializes to and from the colon-separated string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChainId {
    namespace: String,
    reference: String,
}

impl ChainId {
    /// Creates a chain ID from its two components.
    pub fn new<N: Into<String>, R: Into<String>>(namespace: N, reference: R) -> Self {
        Self {
            namespace: namespace.into(),
            reference: reference.into(),
        }
    }

    /// Namespace component, such as `eip155` or `solana`.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Reference component, such as `8453`.
    #[must_use]
    pub fn reference(&self) -> &str {
        &self.reference
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.reference)
    }
}

/// Error returned for a string that is not `namespace:reference`.
#[derive(Debug, thiserror::Error)]
#[error("invalid CAIP-2 chain id {0:?}")]
pub struct ChainIdFormatError(String);

impl FromStr for ChainId {
    type Err = ChainIdFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((namespace, reference)) if !namespace.is_empty() && !reference.is_empty() => {
                Ok(Self::new(namespace, reference))
            }
            _ => Err(ChainIdFormatError(s.to_owned())),
        }
    }
}

impl Serialize for ChainId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ChainId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_colon_string() {
        let chain_id = ChainId::new("eip155", "8453");
        assert_eq!(serde_json::to_string(&chain_id).unwrap(), "\"eip155:8453\"");
    }

    #[test]
    fn parses_solana_reference() {
        let chain_id: ChainId =
            serde_json::from_str("\"solana:5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp\"").unwrap();
        assert_eq!(chain_id.namespace(), "solana");
        assert_eq!(chain_id.reference(), "5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp");
    }

    #[test]
    fn rejects_missing_parts() {
        assert!("eip155".parse::<ChainId>().is_err());
        assert!(":8453".parse::<ChainId>().is_err());
        assert!("eip155:".parse::<ChainId>().is_err());
    }
}
