//! Admin (transaction-signing) key of the house.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use blackjack_house_types::Address;
use blake2::{digest::consts::U32, Blake2b, Digest};
use ed25519_dalek::{Signer as _, SigningKey};
use std::fmt;
use thiserror::Error;

/// Scheme flag prepended to Ed25519 keys and signatures.
const ED25519_FLAG: u8 = 0x00;

/// Intent prefix for transaction data (scope, version, app id).
const TRANSACTION_INTENT: [u8; 3] = [0, 0, 0];

const SECRET_KEY_LENGTH: usize = 32;

type Blake2b256 = Blake2b<U32>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("invalid key length (expected {expected}, got {got})")]
    InvalidLength { expected: usize, got: usize },
    #[error("unsupported key scheme flag: {0:#04x}")]
    UnsupportedScheme(u8),
    #[error("key is not a valid scalar")]
    InvalidScalar,
}

/// Ed25519 keypair the house uses to authorize transactions.
#[derive(Clone)]
pub struct AdminKeypair {
    signing: SigningKey,
    address: Address,
}

impl AdminKeypair {
    /// Accepts a raw 32-byte secret or a 33-byte secret prefixed with the Ed25519 flag.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let secret = match bytes.len() {
            SECRET_KEY_LENGTH => bytes,
            len if len == SECRET_KEY_LENGTH + 1 => {
                if bytes[0] != ED25519_FLAG {
                    return Err(KeyError::UnsupportedScheme(bytes[0]));
                }
                &bytes[1..]
            }
            got => {
                return Err(KeyError::InvalidLength {
                    expected: SECRET_KEY_LENGTH,
                    got,
                })
            }
        };
        let secret: [u8; SECRET_KEY_LENGTH] =
            secret.try_into().map_err(|_| KeyError::InvalidLength {
                expected: SECRET_KEY_LENGTH,
                got: secret.len(),
            })?;
        Ok(Self::from_signing_key(SigningKey::from_bytes(&secret)))
    }

    pub fn from_signing_key(signing: SigningKey) -> Self {
        let mut hasher = Blake2b256::new();
        hasher.update([ED25519_FLAG]);
        hasher.update(signing.verifying_key().as_bytes());
        let address = Address::new(hasher.finalize().into());
        Self { signing, address }
    }

    /// On-ledger address derived from the public key.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign base64-encoded transaction data, returning the serialized signature
    /// (`base64(flag || signature || public key)`) the ledger expects.
    pub fn sign_transaction(&self, tx_bytes: &str) -> Result<String, base64::DecodeError> {
        let tx_bytes = STANDARD.decode(tx_bytes)?;

        let mut hasher = Blake2b256::new();
        hasher.update(TRANSACTION_INTENT);
        hasher.update(&tx_bytes);
        let digest = hasher.finalize();

        let signature = self.signing.sign(&digest);
        let mut serialized = Vec::with_capacity(1 + 64 + 32);
        serialized.push(ED25519_FLAG);
        serialized.extend_from_slice(&signature.to_bytes());
        serialized.extend_from_slice(self.signing.verifying_key().as_bytes());
        Ok(STANDARD.encode(serialized))
    }
}

impl fmt::Debug for AdminKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminKeypair")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
