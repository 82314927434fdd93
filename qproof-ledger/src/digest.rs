//! SHA-256 digests with domain separation
//!
//! Every digest the ledger records is computed here. Request, hardware-result
//! and synthetic-result digests use distinct domain prefixes so equal bytes in
//! different roles never produce equal digests.

use crate::{EvidenceClass, LedgerError, PolicyTrace, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as _, Sha256};
use std::fmt;

pub const REQUEST_DOMAIN: &[u8] = b"qproof.request.v1\0";
pub const HARDWARE_RESULT_DOMAIN: &[u8] = b"qproof.result.hardware.v1\0";
pub const SYNTHETIC_RESULT_DOMAIN: &[u8] = b"qproof.result.synthetic.v1\0";
pub const POLICY_DOMAIN: &[u8] = b"qproof.policy.v1\0";

const LEAF_PREFIX: u8 = 0x00;
const CHAIN_PREFIX: u8 = 0x01;

/// A 32-byte SHA-256 digest, hex encoded in JSON
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash32([u8; 32]);

impl Hash32 {
    /// All-zero digest, used as the predecessor of chain index 0
    pub const ZERO: Self = Self([0u8; 32]);

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a 64-character hex string
    ///
    /// # Errors
    /// Returns `LedgerError::InvalidDigest` for bad hex or wrong length
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| LedgerError::InvalidDigest(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| LedgerError::InvalidDigest(format!("expected 32 bytes in '{}'", s)))?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash32({})", self.to_hex())
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Hash32 {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash32 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Plain SHA-256
pub fn sha256(bytes: &[u8]) -> Hash32 {
    let mut h = Sha256::new();
    h.update(bytes);
    Hash32(h.finalize().into())
}

fn domain_hash(domain: &[u8], bytes: &[u8]) -> Hash32 {
    let mut h = Sha256::new();
    h.update(domain);
    h.update(bytes);
    Hash32(h.finalize().into())
}

/// Digest of a canonicalized request
pub fn request_digest(canonical: &[u8]) -> Hash32 {
    domain_hash(REQUEST_DOMAIN, canonical)
}

/// Digest of a canonicalized hardware result
pub fn hardware_result_digest(canonical: &[u8]) -> Hash32 {
    domain_hash(HARDWARE_RESULT_DOMAIN, canonical)
}

/// Digest of a canonicalized, watermarked synthetic result
pub fn synthetic_result_digest(canonical: &[u8]) -> Hash32 {
    domain_hash(SYNTHETIC_RESULT_DOMAIN, canonical)
}

/// Digest of the policy trace that authorized an entry
///
/// Fields are length-prefixed, so no two distinct traces share an encoding.
pub fn policy_digest(trace: &PolicyTrace) -> Hash32 {
    fn field(h: &mut Sha256, bytes: &[u8]) {
        h.update((bytes.len() as u64).to_be_bytes());
        h.update(bytes);
    }
    let mut h = Sha256::new();
    h.update(POLICY_DOMAIN);
    match &trace.selected_backend {
        Some(name) => {
            h.update([1u8]);
            field(&mut h, name.as_bytes());
        }
        None => h.update([0u8]),
    }
    h.update((trace.reason_codes.len() as u64).to_be_bytes());
    for code in &trace.reason_codes {
        field(&mut h, code.as_bytes());
    }
    field(&mut h, trace.policy_version.as_bytes());
    Hash32(h.finalize().into())
}

/// Leaf digest binding a request and its policy trace to its result, if any
///
/// `H(0x00 || request || policy || flag || result?)` where `flag` is 1 when a
/// result is present.
pub fn leaf_digest(request: &Hash32, policy: &Hash32, result: Option<&Hash32>) -> Hash32 {
    let mut h = Sha256::new();
    h.update([LEAF_PREFIX]);
    h.update(request.as_bytes());
    h.update(policy.as_bytes());
    match result {
        Some(r) => {
            h.update([1u8]);
            h.update(r.as_bytes());
        }
        None => h.update([0u8]),
    }
    Hash32(h.finalize().into())
}

/// Running chain digest for the entry at `index`
///
/// `H(0x01 || prev || index_be64 || class_tag || leaf)`
pub fn chain_digest(prev: &Hash32, index: u64, class: EvidenceClass, leaf: &Hash32) -> Hash32 {
    let mut h = Sha256::new();
    h.update([CHAIN_PREFIX]);
    h.update(prev.as_bytes());
    h.update(index.to_be_bytes());
    h.update([class.tag()]);
    h.update(leaf.as_bytes());
    Hash32(h.finalize().into())
}
