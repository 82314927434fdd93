//! Ed25519-signed chain heads

use crate::digest::Hash32;
use crate::{ChainState, LedgerError, Result};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

const CHAIN_HEAD_DOMAIN: &[u8] = b"qproof.chainhead.v1\0";

/// A chain state attested by the ledger's signing key
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedChainHead {
    pub length: u64,
    pub head: Hash32,
    /// Hex-encoded 64-byte Ed25519 signature
    pub signature: String,
    /// Hex-encoded 32-byte verifying key
    pub public_key: String,
}

fn head_payload(length: u64, head: &Hash32) -> Vec<u8> {
    let mut payload = Vec::with_capacity(CHAIN_HEAD_DOMAIN.len() + 40);
    payload.extend_from_slice(CHAIN_HEAD_DOMAIN);
    payload.extend_from_slice(&length.to_be_bytes());
    payload.extend_from_slice(head.as_bytes());
    payload
}

fn sign_payload(signing_key: &SigningKey, payload: &[u8]) -> [u8; 64] {
    let sig: Signature = signing_key.sign(payload);
    sig.to_bytes()
}

/// Sign the given chain state
pub fn sign_chain_head(signing_key: &SigningKey, state: &ChainState) -> SignedChainHead {
    let signature = sign_payload(signing_key, &head_payload(state.length, &state.head));
    SignedChainHead {
        length: state.length,
        head: state.head,
        signature: hex::encode(signature),
        public_key: hex::encode(signing_key.verifying_key().to_bytes()),
    }
}

impl SignedChainHead {
    /// Check the signature against the embedded public key
    ///
    /// # Errors
    /// Returns `LedgerError::Signature` if the key or signature is malformed or
    /// the signature does not cover `(length, head)`.
    pub fn verify(&self) -> Result<()> {
        let key_bytes: [u8; 32] = decode_fixed(&self.public_key, "public key")?;
        let sig_bytes: [u8; 64] = decode_fixed(&self.signature, "signature")?;
        let key = VerifyingKey::from_bytes(&key_bytes)
            .map_err(|e| LedgerError::Signature(e.to_string()))?;
        let sig = Signature::from_bytes(&sig_bytes);
        key.verify(&head_payload(self.length, &self.head), &sig)
            .map_err(|e| LedgerError::Signature(e.to_string()))
    }

    /// Verify and additionally require a specific signer
    pub fn verify_with(&self, expected: &VerifyingKey) -> Result<()> {
        if self.public_key != hex::encode(expected.to_bytes()) {
            return Err(LedgerError::Signature("unexpected signer".to_string()));
        }
        self.verify()
    }
}

fn decode_fixed<const N: usize>(s: &str, what: &str) -> Result<[u8; N]> {
    hex::decode(s)
        .map_err(|e| LedgerError::Signature(format!("{}: {}", what, e)))?
        .try_into()
        .map_err(|_| LedgerError::Signature(format!("{}: expected {} bytes", what, N)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::sha256;

    fn key(seed: u8) -> SigningKey {
        SigningKey::from_bytes(&[seed; 32])
    }

    #[test]
    fn test_sign_and_verify() {
        let state = ChainState {
            length: 3,
            head: sha256(b"head"),
        };
        let signed = sign_chain_head(&key(7), &state);
        assert!(signed.verify().is_ok());
        assert!(signed.verify_with(&key(7).verifying_key()).is_ok());
        assert!(signed.verify_with(&key(8).verifying_key()).is_err());
    }

    #[test]
    fn test_tampered_head_fails() {
        let state = ChainState {
            length: 3,
            head: sha256(b"head"),
        };
        let mut signed = sign_chain_head(&key(1), &state);
        signed.length = 4;
        assert!(matches!(signed.verify(), Err(LedgerError::Signature(_))));

        let mut signed = sign_chain_head(&key(1), &state);
        signed.signature = "00".to_string();
        assert!(signed.verify().is_err());
    }
}
