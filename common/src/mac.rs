use core::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; 6]);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MacParseError {
    #[error("expected 6 octets, found {0}")]
    OctetCount(usize),
    #[error("invalid hex octet `{0}`")]
    InvalidOctet(String),
    #[error("mixed separators in `{0}`")]
    MixedSeparators(String),
}

impl MacAddress {
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(octets: [u8; 6]) -> Self {
        Self(octets)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl FromStr for MacAddress {
    type Err = MacParseError;

    /// Accepts `aa:bb:cc:dd:ee:ff`, `aa-bb-cc-dd-ee-ff` or `aabbccddeeff`,
    /// in any letter case.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        let has_colon = value.contains(':');
        let has_dash = value.contains('-');

        let parts: Vec<&str> = match (has_colon, has_dash) {
            (true, true) => return Err(MacParseError::MixedSeparators(value.to_string())),
            (true, false) => value.split(':').collect(),
            (false, true) => value.split('-').collect(),
            (false, false) => {
                if value.len() != 12 || !value.is_ascii() {
                    return Err(MacParseError::OctetCount(value.len() / 2));
                }
                (0..6).map(|i| &value[i * 2..i * 2 + 2]).collect()
            }
        };

        if parts.len() != 6 {
            return Err(MacParseError::OctetCount(parts.len()));
        }

        let mut octets = [0_u8; 6];
        for (slot, part) in octets.iter_mut().zip(&parts) {
            if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(MacParseError::InvalidOctet((*part).to_string()));
            }
            *slot = u8::from_str_radix(part, 16)
                .map_err(|_| MacParseError::InvalidOctet((*part).to_string()))?;
        }

        Ok(Self(octets))
    }
}

impl Serialize for MacAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_lowercase_colon_separated() {
        let mac = MacAddress::new([0xFC, 0x01, 0x2C, 0xC6, 0xD9, 0x98]);
        assert_eq!(mac.to_string(), "fc:01:2c:c6:d9:98");
    }

    #[test]
    fn parses_common_formats() {
        let expected = MacAddress::new([0xfc, 0x01, 0x2c, 0xc6, 0xd9, 0x98]);

        for raw in [
            "fc:01:2c:c6:d9:98",
            "FC:01:2C:C6:D9:98",
            "fc-01-2c-c6-d9-98",
            "FC012CC6D998",
            "  fc:01:2c:c6:d9:98\n",
        ] {
            assert_eq!(raw.parse::<MacAddress>(), Ok(expected), "input {raw:?}");
        }
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert_eq!(
            "fc:01:2c:c6:d9".parse::<MacAddress>(),
            Err(MacParseError::OctetCount(5))
        );
        assert_eq!(
            "fc:01:2c:c6:d9:zz".parse::<MacAddress>(),
            Err(MacParseError::InvalidOctet("zz".to_string()))
        );
        assert_eq!(
            "fc:01:2c:c6:d9:998".parse::<MacAddress>(),
            Err(MacParseError::InvalidOctet("998".to_string()))
        );
        assert!(matches!(
            "fc:01-2c:c6:d9:98".parse::<MacAddress>(),
            Err(MacParseError::MixedSeparators(_))
        ));
        assert!("".parse::<MacAddress>().is_err());
    }
}
