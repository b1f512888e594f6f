use std::{fmt, hash::Hasher, str::FromStr};

use rustc_hash::FxHasher;
use serde::Serialize;
use thiserror::Error;

const PREFIX: &str = "0x";
const HEX_LEN: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("Invalid address format `{raw}`: expected 0x followed by 40 hex characters")]
    InvalidFormat { raw: String },
}

/// Account address in canonical (lower case) form.
///
/// The only way to get one is through [`Address::parse`], so every value
/// of this type is a valid storage key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn parse(raw: &str) -> Result<Self, AddressError> {
        let valid = raw
            .strip_prefix(PREFIX)
            .is_some_and(|hex| hex.len() == HEX_LEN && hex.bytes().all(|b| b.is_ascii_hexdigit()));
        if !valid {
            return Err(AddressError::InvalidFormat {
                raw: raw.to_owned(),
            });
        }
        Ok(Self(raw.to_ascii_lowercase()))
    }

    /// The all-zero address, `0x000…0`.
    pub fn zero() -> Self {
        Self(format!("{PREFIX}{}", "0".repeat(HEX_LEN)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Stable 64-bit key used by the lock coordinator.
    pub fn lock_key(&self) -> u64 {
        let mut hasher = FxHasher::default();
        hasher.write(self.0.as_bytes());
        hasher.finish()
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
