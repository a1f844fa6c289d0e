//! Trace and span identifiers
//!
//! A trace id is 128 bits held as two `u64` halves, a span id is 64 bits.
//! Binary forms are always fixed width and big-endian: OTLP consumers compare
//! ids as raw bytes, so leading zero bytes must survive encoding.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum number of hex digits in a trace id
const TRACE_ID_HEX_LEN: usize = 32;
/// Maximum number of hex digits in a span id
const SPAN_ID_HEX_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("malformed id: empty string")]
    Empty,

    #[error("malformed id '{0}': not a hex string")]
    NotHex(String),

    #[error("malformed id '{id}': longer than {max} hex digits")]
    TooLong { id: String, max: usize },

    #[error("malformed id: expected {expected} bytes, got {actual}")]
    BadLength { expected: usize, actual: usize },

    #[error("malformed id: not valid UTF-8")]
    NotUtf8,
}

fn parse_hex_u64(s: &str) -> u64 {
    // Callers validate digits and length beforehand, so this cannot overflow.
    s.bytes().fold(0u64, |acc, b| {
        let digit = match b {
            b'0'..=b'9' => b - b'0',
            b'a'..=b'f' => b - b'a' + 10,
            _ => b - b'A' + 10,
        };
        (acc << 4) | digit as u64
    })
}

fn validate_hex(s: &str, max: usize) -> Result<(), IdError> {
    if s.is_empty() {
        return Err(IdError::Empty);
    }
    if !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(IdError::NotHex(s.to_string()));
    }
    if s.len() > max {
        return Err(IdError::TooLong {
            id: s.to_string(),
            max,
        });
    }
    Ok(())
}

/// 128-bit trace identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TraceId {
    pub high: u64,
    pub low: u64,
}

impl TraceId {
    pub const fn new(high: u64, low: u64) -> Self {
        Self { high, low }
    }

    /// Parse from 1 to 32 hex digits. Shorter strings are treated as
    /// left-padded with zeros.
    pub fn from_hex(s: &str) -> Result<Self, IdError> {
        validate_hex(s, TRACE_ID_HEX_LEN)?;

        if s.len() > SPAN_ID_HEX_LEN {
            let split = s.len() - SPAN_ID_HEX_LEN;
            Ok(Self {
                high: parse_hex_u64(&s[..split]),
                low: parse_hex_u64(&s[split..]),
            })
        } else {
            Ok(Self {
                high: 0,
                low: parse_hex_u64(s),
            })
        }
    }

    /// Hex form. When `high` is zero only `low` is printed, without padding.
    /// Use [`TraceId::to_bytes`] for anything that goes on the wire.
    pub fn to_hex(&self) -> String {
        self.to_string()
    }

    /// Fixed 16-byte big-endian form: `high` then `low`
    pub fn to_bytes(&self) -> [u8; 16] {
        let mut buf = [0u8; 16];
        buf[..8].copy_from_slice(&self.high.to_be_bytes());
        buf[8..].copy_from_slice(&self.low.to_be_bytes());
        buf
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        let mut high = [0u8; 8];
        let mut low = [0u8; 8];
        high.copy_from_slice(&bytes[..8]);
        low.copy_from_slice(&bytes[8..]);
        Self {
            high: u64::from_be_bytes(high),
            low: u64::from_be_bytes(low),
        }
    }
}

impl TryFrom<&[u8]> for TraceId {
    type Error = IdError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let fixed: [u8; 16] = bytes.try_into().map_err(|_| IdError::BadLength {
            expected: 16,
            actual: bytes.len(),
        })?;
        Ok(Self::from_bytes(fixed))
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.high == 0 {
            write!(f, "{:x}", self.low)
        } else {
            write!(f, "{:016x}{:016x}", self.high, self.low)
        }
    }
}

impl FromStr for TraceId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for TraceId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TraceId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// 64-bit span identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SpanId(pub u64);

impl SpanId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn from_hex(s: &str) -> Result<Self, IdError> {
        validate_hex(s, SPAN_ID_HEX_LEN)?;
        Ok(Self(parse_hex_u64(s)))
    }

    pub fn to_bytes(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_be_bytes(bytes))
    }
}

impl TryFrom<&[u8]> for SpanId {
    type Error = IdError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let fixed: [u8; 8] = bytes.try_into().map_err(|_| IdError::BadLength {
            expected: 8,
            actual: bytes.len(),
        })?;
        Ok(Self::from_bytes(fixed))
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for SpanId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for SpanId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SpanId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
