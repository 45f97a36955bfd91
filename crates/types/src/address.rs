use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Errors that can occur when parsing a Luna address string.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AddressError {
    #[error("address string is empty")]
    Empty,
    #[error("address must start with '{expected}'")]
    InvalidPrefix { expected: &'static str },
    #[error("address payload must be {short} or {long} bytes, got {actual}")]
    InvalidLength {
        short: usize,
        long: usize,
        actual: usize,
    },
    #[error("address payload is not valid hexadecimal")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Human readable prefix of account addresses.
pub const ACCOUNT_PREFIX: &str = "terra";
/// Human readable prefix of validator operator addresses.
pub const VALIDATOR_PREFIX: &str = "terravaloper";

/// Length of a key-derived address.
pub const SHORT_ADDRESS_BYTES: usize = 20;
/// Length of a contract or multisig address.
pub const LONG_ADDRESS_BYTES: usize = 32;

/// Encode raw address bytes into the human readable `<prefix><hex>` form.
pub fn encode_address(prefix: &str, bytes: &[u8]) -> String {
    let mut encoded = String::with_capacity(prefix.len() + bytes.len() * 2);
    encoded.push_str(prefix);
    encoded.push_str(&hex::encode(bytes));
    encoded
}

/// Decode a human readable address carrying `prefix` into raw bytes.
pub fn decode_address(prefix: &'static str, address: &str) -> Result<Vec<u8>, AddressError> {
    if address.is_empty() {
        return Err(AddressError::Empty);
    }

    let payload = address
        .strip_prefix(prefix)
        .ok_or(AddressError::InvalidPrefix { expected: prefix })?;

    let bytes = hex::decode(payload)?;
    if bytes.len() != SHORT_ADDRESS_BYTES && bytes.len() != LONG_ADDRESS_BYTES {
        return Err(AddressError::InvalidLength {
            short: SHORT_ADDRESS_BYTES,
            long: LONG_ADDRESS_BYTES,
            actual: bytes.len(),
        });
    }

    Ok(bytes)
}

macro_rules! address_type {
    ($(#[$meta:meta])* $name:ident, $prefix:expr) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(Vec<u8>);

        impl $name {
            /// Build an address from raw bytes, checking the payload length.
            pub fn from_bytes(bytes: &[u8]) -> Result<Self, AddressError> {
                if bytes.len() != SHORT_ADDRESS_BYTES && bytes.len() != LONG_ADDRESS_BYTES {
                    return Err(AddressError::InvalidLength {
                        short: SHORT_ADDRESS_BYTES,
                        long: LONG_ADDRESS_BYTES,
                        actual: bytes.len(),
                    });
                }
                Ok(Self(bytes.to_vec()))
            }

            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = AddressError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                decode_address($prefix, s).map(Self)
            }
        }

        impl TryFrom<String> for $name {
            type Error = AddressError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                encode_address($prefix, &value.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&encode_address($prefix, &self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }
    };
}

address_type!(
    /// Account address (`terra…`).
    AccAddress,
    ACCOUNT_PREFIX
);

address_type!(
    /// Validator operator address (`terravaloper…`).
    ValAddress,
    VALIDATOR_PREFIX
);

impl AccAddress {
    /// Deterministic address of a module account: the first 20 bytes of
    /// `SHA-256(name)`.
    pub fn for_module(name: &str) -> Self {
        let digest = Sha256::digest(name.as_bytes());
        Self(digest[..SHORT_ADDRESS_BYTES].to_vec())
    }
}

impl From<&ValAddress> for AccAddress {
    fn from(value: &ValAddress) -> Self {
        AccAddress(value.0.clone())
    }
}

impl From<&AccAddress> for ValAddress {
    fn from(value: &AccAddress) -> Self {
        ValAddress(value.0.clone())
    }
}
