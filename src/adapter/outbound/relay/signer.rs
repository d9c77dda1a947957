//! Operator key material and request signing.
//!
//! The relay authenticates requests with an ed25519 signature over the raw
//! JSON body. The key comes either from a 32-byte hex seed or from a
//! 24-word TON wallet mnemonic.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ed25519_dalek::{Signer, SigningKey};
use hmac::{Hmac, Mac};
use sha2::Sha512;

use crate::error::{Error, Result};

const MNEMONIC_WORDS: usize = 24;
const SEED_SALT: &[u8] = b"TON default seed";
const SEED_ITERATIONS: u32 = 100_000;

/// Where the operator key comes from. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub enum SigningCredential {
    Mnemonic(String),
    PrivateKey(String),
}

impl std::fmt::Debug for SigningCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mnemonic(_) => f.write_str("Mnemonic(<redacted>)"),
            Self::PrivateKey(_) => f.write_str("PrivateKey(<redacted>)"),
        }
    }
}

/// Ed25519 key used to sign relay requests.
#[derive(Clone)]
pub struct OperatorKey {
    signing: SigningKey,
}

impl OperatorKey {
    /// Derive the key from a credential.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Signing`] if the mnemonic or hex key is malformed.
    pub fn from_credential(credential: &SigningCredential) -> Result<Self> {
        match credential {
            SigningCredential::Mnemonic(phrase) => Self::from_mnemonic(phrase),
            SigningCredential::PrivateKey(hex_key) => Self::from_hex(hex_key),
        }
    }

    /// Accepts a 32-byte seed, or a 64-byte secret key (seed followed by
    /// public key) as exported by TON wallets.
    pub fn from_hex(hex_key: &str) -> Result<Self> {
        let bytes = hex::decode(hex_key.trim().trim_start_matches("0x"))
            .map_err(|e| Error::Signing(format!("private key is not hex: {e}")))?;
        let seed: [u8; 32] = match bytes.len() {
            32 | 64 => bytes[..32]
                .try_into()
                .map_err(|_| Error::Signing("private key length".into()))?,
            other => {
                return Err(Error::Signing(format!(
                    "private key must be 32 or 64 bytes, got {other}"
                )))
            }
        };
        Ok(Self {
            signing: SigningKey::from_bytes(&seed),
        })
    }

    /// TON wallet derivation: HMAC-SHA512 over the joined words, then
    /// PBKDF2-HMAC-SHA512 with the default seed salt.
    pub fn from_mnemonic(phrase: &str) -> Result<Self> {
        let words: Vec<String> = phrase
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();
        if words.len() != MNEMONIC_WORDS {
            return Err(Error::Signing(format!(
                "mnemonic must have {MNEMONIC_WORDS} words, got {}",
                words.len()
            )));
        }

        let mut mac = Hmac::<Sha512>::new_from_slice(words.join(" ").as_bytes())
            .map_err(|e| Error::Signing(e.to_string()))?;
        mac.update(b"");
        let entropy = mac.finalize().into_bytes();

        let mut seed = [0u8; 64];
        pbkdf2::pbkdf2_hmac::<Sha512>(&entropy, SEED_SALT, SEED_ITERATIONS, &mut seed);
        let mut secret = [0u8; 32];
        secret.copy_from_slice(&seed[..32]);

        Ok(Self {
            signing: SigningKey::from_bytes(&secret),
        })
    }

    /// Hex-encoded public key.
    #[must_use]
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.signing.verifying_key().to_bytes())
    }

    /// Base64 signature over `message`.
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> String {
        BASE64.encode(self.signing.sign(message).to_bytes())
    }
}

impl std::fmt::Debug for OperatorKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorKey")
            .field("public_key", &self.public_key_hex())
            .finish()
    }
}
