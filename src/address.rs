use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ADDRESS_LEN: usize = 20;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address must start with 0x")]
    MissingPrefix,
    #[error("address must be {expected} hex digits, got {0}", expected = ADDRESS_LEN * 2)]
    BadLength(usize),
    #[error("address is not valid hex")]
    BadHex,
}

/// Wallet address. Ordering is the numeric (big-endian) value of the bytes,
/// which is what conversation keys are canonicalized on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    pub const fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or(AddressError::MissingPrefix)?;
        if digits.len() != ADDRESS_LEN * 2 {
            return Err(AddressError::BadLength(digits.len()));
        }

        let mut bytes = [0u8; ADDRESS_LEN];
        hex::decode_to_slice(digits, &mut bytes).map_err(|_| AddressError::BadHex)?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_case_and_prints_lowercase() {
        let address: Address = "0xAbCdEf0123456789aBcDeF0123456789AbCdEf01".parse().unwrap();
        assert_eq!(address.to_string(), "0xabcdef0123456789abcdef0123456789abcdef01");
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!("abcd".parse::<Address>(), Err(AddressError::MissingPrefix));
        assert_eq!("0x1234".parse::<Address>(), Err(AddressError::BadLength(4)));
        assert_eq!(
            "0xzz00000000000000000000000000000000000000".parse::<Address>(),
            Err(AddressError::BadHex)
        );
    }

    #[test]
    fn orders_numerically() {
        let mut low = [0u8; ADDRESS_LEN];
        low[ADDRESS_LEN - 1] = 0xff;
        let mut high = [0u8; ADDRESS_LEN];
        high[0] = 0x01;
        assert!(Address::from_bytes(low) < Address::from_bytes(high));
    }

    #[test]
    fn serializes_as_string() {
        let address = Address::from_bytes([0x11; ADDRESS_LEN]);
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, format!("\"{address}\""));
        assert_eq!(serde_json::from_str::<Address>(&json).unwrap(), address);
    }
}
