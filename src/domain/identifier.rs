//! Beacon identifiers
//!
//! An identifier is an opaque byte string. Three textual forms are accepted:
//! - UUID (`2f234454-cf6d-4a0f-adf2-f4911ba9ffa6`, 16 bytes, dashes optional)
//! - hex with `0x` prefix (`0x0102ab`, any whole number of bytes)
//! - decimal `0..=65535` (2 bytes, big-endian)

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Largest value accepted by the decimal form
const MAX_DECIMAL: u32 = u16::MAX as u32;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseIdentifierError {
    #[error("empty identifier")]
    Empty,
    #[error("invalid hex identifier {0:?}")]
    InvalidHex(String),
    #[error("decimal identifier {0} out of range 0..=65535")]
    OutOfRange(u64),
    #[error("unrecognized identifier format {0:?}")]
    Unrecognized(String),
}

/// Beacon identifier stored as raw bytes
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Identifier(Vec<u8>);

impl Identifier {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn from_u16(value: u16) -> Self {
        Self(value.to_be_bytes().to_vec())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid.as_bytes().to_vec())
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for Identifier {
    type Err = ParseIdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseIdentifierError::Empty);
        }

        // A bare "0x" is the zero-length identifier
        if let Some(digits) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            return hex::decode(digits)
                .map(Self)
                .map_err(|_| ParseIdentifierError::InvalidHex(s.to_string()));
        }

        if s.bytes().all(|b| b.is_ascii_digit()) {
            let value: u64 = s.parse().map_err(|_| ParseIdentifierError::OutOfRange(u64::MAX))?;
            if value > MAX_DECIMAL as u64 {
                return Err(ParseIdentifierError::OutOfRange(value));
            }
            return Ok(Self::from_u16(value as u16));
        }

        Uuid::parse_str(s)
            .map(Self::from_uuid)
            .map_err(|_| ParseIdentifierError::Unrecognized(s.to_string()))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.len() {
            16 => {
                let mut bytes = [0u8; 16];
                bytes.copy_from_slice(&self.0);
                write!(f, "{}", Uuid::from_bytes(bytes).hyphenated())
            }
            2 => write!(f, "{}", u16::from_be_bytes([self.0[0], self.0[1]])),
            _ => write!(f, "0x{}", hex::encode(&self.0)),
        }
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({})", self)
    }
}

impl Serialize for Identifier {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct IdentifierVisitor;

        impl<'de> Visitor<'de> for IdentifierVisitor {
            type Value = Identifier;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a UUID, 0x-prefixed hex or decimal identifier")
            }

            fn visit_str<E>(self, value: &str) -> Result<Identifier, E>
            where
                E: de::Error,
            {
                value.parse().map_err(E::custom)
            }

            fn visit_u64<E>(self, value: u64) -> Result<Identifier, E>
            where
                E: de::Error,
            {
                u16::try_from(value)
                    .map(Identifier::from_u16)
                    .map_err(|_| E::custom(ParseIdentifierError::OutOfRange(value)))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Identifier, E>
            where
                E: de::Error,
            {
                u16::try_from(value)
                    .map(Identifier::from_u16)
                    .map_err(|_| E::custom(ParseIdentifierError::OutOfRange(value.unsigned_abs())))
            }
        }

        deserializer.deserialize_any(IdentifierVisitor)
    }
}
