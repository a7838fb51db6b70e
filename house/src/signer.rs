//! House commitments: BLS12-381 signatures over the per-move signing message.
//!
//! The contract verifies commitments with `bls12381_min_pk_verify` (48-byte G1
//! public keys, 96-byte G2 signatures) under the basic-scheme domain separation
//! tag, so signatures are produced with [ops::sign] and [HOUSE_DST] rather than
//! the namespaced helpers used for consensus messages.

use crate::keys::KeyError;
use blackjack_house_types::{GameRecord, SigningMessage};
use commonware_codec::{DecodeExt, Encode};
use commonware_cryptography::bls12381::primitives::{
    group::Private,
    ops,
    variant::{MinPk, Variant},
};
use commonware_utils::hex;
use std::{fmt, sync::Arc};

/// Domain separation tag of the basic (non-augmented) min-pk BLS scheme.
pub const HOUSE_DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_NUL_";

pub type HousePublicKey = <MinPk as Variant>::Public;
pub type HouseSignature = <MinPk as Variant>::Signature;

/// The house's long-term BLS key. Cheap to clone; the secret is shared read-only.
#[derive(Clone)]
pub struct HouseKey {
    private: Arc<Private>,
    public: HousePublicKey,
}

impl HouseKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let private = Private::decode(bytes).map_err(|_| KeyError::InvalidScalar)?;
        Ok(Self::from_private(private))
    }

    pub fn from_private(private: Private) -> Self {
        let public = ops::compute_public::<MinPk>(&private);
        Self {
            private: Arc::new(private),
            public,
        }
    }

    pub fn public_key(&self) -> &HousePublicKey {
        &self.public
    }

    pub fn public_key_hex(&self) -> String {
        hex(&self.public.encode())
    }

    /// Sign the message derived from `record`. Deterministic for a given key and record.
    pub fn sign(&self, record: &GameRecord) -> HouseCommitment {
        self.sign_message(record.signing_message())
    }

    pub fn sign_message(&self, message: SigningMessage) -> HouseCommitment {
        let signature = ops::sign::<MinPk>(&self.private, HOUSE_DST, message.as_bytes());
        HouseCommitment { message, signature }
    }
}

impl fmt::Debug for HouseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HouseKey")
            .field("public", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

/// A signed signing message, ready to be passed to the contract.
#[derive(Clone)]
pub struct HouseCommitment {
    message: SigningMessage,
    signature: HouseSignature,
}

impl HouseCommitment {
    pub fn message(&self) -> &SigningMessage {
        &self.message
    }

    pub fn signature(&self) -> &HouseSignature {
        &self.signature
    }

    /// Signature bytes as passed to the contract's `vector<u8>` parameter.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.signature.encode().to_vec()
    }

    /// Check the commitment the way the contract does.
    pub fn verify(&self, public: &HousePublicKey) -> bool {
        ops::verify::<MinPk>(public, HOUSE_DST, self.message.as_bytes(), &self.signature).is_ok()
    }
}

impl fmt::Debug for HouseCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HouseCommitment")
            .field("message", &self.message.as_hex())
            .field("signature", &hex(&self.to_bytes()))
            .finish()
    }
}
