//! Canonical account addresses.
//!
//! TON accounts are written either in raw form (`0:<64 hex>`) or in the
//! 48-character "user-friendly" base64 form, which additionally carries a
//! bounce flag, a testnet flag and a CRC16 checksum. The same account can
//! therefore be spelled several ways. Every address that crosses into the
//! settlement logic is folded into one spelling first: bounceable, mainnet,
//! URL-safe base64.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const FRIENDLY_LEN: usize = 48;
const PAYLOAD_LEN: usize = 36;

const TAG_BOUNCEABLE: u8 = 0x11;
const TAG_NON_BOUNCEABLE: u8 = 0x51;
const TAG_TESTNET: u8 = 0x80;

/// Account address in canonical form.
///
/// Construct via [`normalize`] or [`str::parse`]; the inner string is
/// always the bounceable URL-safe spelling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NormalizedAddress(String);

impl NormalizedAddress {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Workchain the account lives on (0 for basechain, -1 for masterchain).
    #[must_use]
    pub fn workchain(&self) -> i8 {
        // Canonical strings always decode; the invariant is upheld by construction.
        decode_friendly(&self.0).map_or(0, |parsed| parsed.workchain)
    }
}

impl fmt::Display for NormalizedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NormalizedAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        normalize(s)
    }
}

impl TryFrom<String> for NormalizedAddress {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        normalize(&value)
    }
}

impl From<NormalizedAddress> for String {
    fn from(value: NormalizedAddress) -> Self {
        value.0
    }
}

struct ParsedAddress {
    workchain: i8,
    hash: [u8; 32],
}

/// Fold any accepted address spelling into its canonical form.
///
/// # Errors
///
/// Returns [`Error::InvalidAddress`] when `raw` is neither a raw
/// `workchain:hex` address nor a checksummed user-friendly address.
pub fn normalize(raw: &str) -> Result<NormalizedAddress> {
    let trimmed = raw.trim();
    let parsed = if trimmed.contains(':') {
        decode_raw(trimmed)
    } else {
        decode_friendly(trimmed)
    }
    .map_err(|reason| Error::InvalidAddress {
        address: raw.to_string(),
        reason,
    })?;

    Ok(NormalizedAddress(encode_friendly(&parsed, TAG_BOUNCEABLE)))
}

fn decode_raw(raw: &str) -> std::result::Result<ParsedAddress, String> {
    let (workchain, hash_hex) = raw
        .split_once(':')
        .ok_or_else(|| "expected <workchain>:<hash>".to_string())?;
    let workchain: i8 = workchain
        .parse()
        .map_err(|_| format!("workchain '{workchain}' is not a small integer"))?;
    if hash_hex.len() != 64 {
        return Err(format!("hash must be 64 hex characters, got {}", hash_hex.len()));
    }
    let bytes = hex::decode(hash_hex).map_err(|e| format!("hash is not hex: {e}"))?;
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&bytes);
    Ok(ParsedAddress { workchain, hash })
}

fn decode_friendly(raw: &str) -> std::result::Result<ParsedAddress, String> {
    if raw.len() != FRIENDLY_LEN {
        return Err(format!(
            "expected {FRIENDLY_LEN} characters, got {}",
            raw.len()
        ));
    }
    let url_safe = raw.replace('+', "-").replace('/', "_");
    let bytes = URL_SAFE
        .decode(url_safe)
        .map_err(|e| format!("not base64: {e}"))?;
    if bytes.len() != PAYLOAD_LEN {
        return Err(format!("decoded to {} bytes", bytes.len()));
    }

    let expected = crc16(&bytes[..34]).to_be_bytes();
    if bytes[34..] != expected {
        return Err("checksum mismatch".into());
    }

    let tag = bytes[0] & !TAG_TESTNET;
    if tag != TAG_BOUNCEABLE && tag != TAG_NON_BOUNCEABLE {
        return Err(format!("unknown address tag 0x{:02x}", bytes[0]));
    }

    let mut hash = [0u8; 32];
    hash.copy_from_slice(&bytes[2..34]);
    Ok(ParsedAddress {
        workchain: i8::from_be_bytes([bytes[1]]),
        hash,
    })
}

fn encode_friendly(parsed: &ParsedAddress, tag: u8) -> String {
    let mut bytes = [0u8; PAYLOAD_LEN];
    bytes[0] = tag;
    bytes[1] = parsed.workchain.to_be_bytes()[0];
    bytes[2..34].copy_from_slice(&parsed.hash);
    let crc = crc16(&bytes[..34]).to_be_bytes();
    bytes[34..].copy_from_slice(&crc);
    URL_SAFE.encode(bytes)
}

/// CRC16/XMODEM as used by the user-friendly address checksum.
fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for byte in data {
        crc ^= u16::from(*byte) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

#[cfg(test)]
pub(crate) fn friendly_with_tag(raw: &str, tag: u8) -> String {
    let parsed = decode_raw(raw).expect("valid raw address");
    encode_friendly(&parsed, tag)
}
