//! Protocol version marker.
//!
//! [`Version<N>`] carries the `x402Version` field as a zero-sized type. It
//! writes the bare integer `N` and refuses any other number when reading, so a
//! payload from a different protocol revision fails to parse instead of being
//! half-understood.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Zero-sized `x402Version` marker for protocol revision `N`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Version<const N: u8>;

impl<const N: u8> Version<N> {
    /// Numeric protocol revision.
    pub const VALUE: u8 = N;
}

impl<const N: u8> From<Version<N>> for u8 {
    fn from(_: Version<N>) -> Self {
        N
    }
}

impl<const N: u8> fmt::Display for Version<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{N}")
    }
}

impl<const N: u8> Serialize for Version<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(N)
    }
}

impl<'de, const N: u8> Deserialize<'de> for Version<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let got = u8::deserialize(deserializer)?;
        if got != N {
            return Err(serde::de::Error::custom(format!(
                "unsupported x402Version {got}, expected {N}"
            )));
        }
        Ok(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_bare_integer() {
        assert_eq!(serde_json::to_string(&Version::<1>).unwrap(), "1");
    }

    #[test]
    fn rejects_other_revisions() {
        assert!(serde_json::from_str::<Version<1>>("1").is_ok());
        let err = serde_json::from_str::<Version<1>>("2").unwrap_err();
        assert!(err.to_string().contains("unsupported x402Version 2"));
    }
}
