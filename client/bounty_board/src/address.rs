//! # Address
//!
//! Ledger addresses are 32-byte public keys. Their display form is the
//! upper-case, unpadded RFC 4648 base32 encoding of the key followed by a
//! 4-byte checksum (the last four bytes of SHA-512/256 over the key):
//!
//! ```text
//! base32( key[32] || sha512_256(key)[28..32] )   → 58 characters
//! ```
//!
//! Every 32-byte value has a display form, including the all-zero key, which
//! the contract uses as the "nobody assigned" sentinel.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha512_256};

use crate::errors::{BoardError, Result};

pub const ADDRESS_LEN: usize = 32;
const CHECKSUM_LEN: usize = 4;
const ENCODED_LEN: usize = 58;

const ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// A 32-byte ledger address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// The all-zero sentinel.
    pub const ZERO: Address = Address([0u8; ADDRESS_LEN]);

    pub const fn from_bytes(raw: [u8; ADDRESS_LEN]) -> Self {
        Address(raw)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LEN]
    }

    /// Render raw key bytes in display form. Total over all inputs.
    pub fn encode(raw: &[u8; ADDRESS_LEN]) -> String {
        let mut buf = [0u8; ADDRESS_LEN + CHECKSUM_LEN];
        buf[..ADDRESS_LEN].copy_from_slice(raw);
        buf[ADDRESS_LEN..].copy_from_slice(&checksum(raw));
        base32_encode(&buf)
    }

    /// Parse a display-form address, verifying length, alphabet and checksum.
    pub fn decode(s: &str) -> Result<Address> {
        if s.len() != ENCODED_LEN {
            return Err(BoardError::MalformedAddress(format!(
                "expected {ENCODED_LEN} characters, got {}",
                s.len()
            )));
        }
        let bytes = base32_decode(s).ok_or_else(|| {
            BoardError::MalformedAddress(format!("`{s}` is not canonical base32"))
        })?;
        if bytes.len() != ADDRESS_LEN + CHECKSUM_LEN {
            return Err(BoardError::MalformedAddress(format!(
                "decoded to {} bytes",
                bytes.len()
            )));
        }

        let mut raw = [0u8; ADDRESS_LEN];
        raw.copy_from_slice(&bytes[..ADDRESS_LEN]);
        if bytes[ADDRESS_LEN..] != checksum(&raw) {
            return Err(BoardError::MalformedAddress(format!(
                "checksum mismatch in `{s}`"
            )));
        }
        Ok(Address(raw))
    }
}

fn checksum(raw: &[u8; ADDRESS_LEN]) -> [u8; CHECKSUM_LEN] {
    let digest = Sha512_256::digest(raw);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[digest.len() - CHECKSUM_LEN..]);
    out
}

fn base32_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity((data.len() * 8).div_ceil(5));
    let mut buffer: u32 = 0;
    let mut bits = 0u32;
    for &byte in data {
        buffer = (buffer << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(ALPHABET[((buffer >> bits) & 0x1f) as usize] as char);
        }
        buffer &= (1 << bits) - 1;
    }
    if bits > 0 {
        out.push(ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize] as char);
    }
    out
}

/// Returns `None` on characters outside the alphabet or non-zero trailing bits.
fn base32_decode(s: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(s.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits = 0u32;
    for c in s.bytes() {
        let value = match c {
            b'A'..=b'Z' => c - b'A',
            b'2'..=b'7' => c - b'2' + 26,
            _ => return None,
        };
        buffer = (buffer << 5) | u32::from(value);
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((buffer >> bits) as u8);
            buffer &= (1 << bits) - 1;
        }
    }
    if buffer != 0 {
        return None;
    }
    Some(out)
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Address::encode(&self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self> {
        Address::decode(s)
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(raw: [u8; ADDRESS_LEN]) -> Self {
        Address(raw)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::decode(&s).map_err(serde::de::Error::custom)
    }
}
