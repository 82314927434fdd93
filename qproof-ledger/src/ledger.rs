//! The evidence ledger
//!
//! Entries live in an append-only vector behind one `RwLock`. The write lock is
//! the single serialization point: index assignment, digest chaining, sealing
//! and persistence all happen while holding it, so every writer observes one
//! total order. Readers take the shared lock and clone what they need.

use crate::canonical::canonicalize;
use crate::digest::{
    chain_digest, hardware_result_digest, leaf_digest, policy_digest, request_digest,
    synthetic_result_digest, Hash32,
};
use crate::entry::{relink, verify_chain, EvidenceEntry};
use crate::signing::{sign_chain_head, SignedChainHead};
use crate::store::{LedgerStore, LogRecord};
use crate::watermark::apply_watermark;
use crate::{EvidenceClass, ExecutionMode, LedgerError, PolicyTrace, Result};
use dashmap::DashMap;
use ed25519_dalek::SigningKey;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{error, info, warn};

/// Length and head digest of the chain
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainState {
    pub length: u64,
    /// Chain digest of the last entry, or all zeros for an empty chain
    pub head: Hash32,
}

struct Chain {
    entries: Vec<EvidenceEntry>,
    store: Option<LedgerStore>,
}

impl Chain {
    fn persist(&mut self, record: &LogRecord) -> Result<()> {
        match self.store.as_mut() {
            Some(store) => store.append(record),
            None => Ok(()),
        }
    }
}

/// Append-only, hash-chained evidence ledger
///
/// # Example
/// ```
/// use qproof_ledger::{EvidenceClass, ExecutionMode, Ledger, PolicyTrace};
/// use serde_json::json;
///
/// let ledger = Ledger::new();
/// let pending = ledger
///     .create_entry(&json!({"family": "bell"}), ExecutionMode::Qpu, PolicyTrace::default(), None)
///     .unwrap();
/// assert_eq!(pending.class, EvidenceClass::ClassB);
///
/// let sealed = ledger.seal_entry(&pending.id, &json!({"00": 498, "11": 502})).unwrap();
/// assert_eq!(sealed.class, EvidenceClass::ClassA);
/// assert!(ledger.seal_entry(&pending.id, &json!({})).is_err());
/// ```
pub struct Ledger {
    chain: RwLock<Chain>,
    /// entry id -> chain index
    positions: DashMap<String, u64>,
    /// experiment or job id -> entry id
    links: DashMap<String, String>,
    signing_key: Option<SigningKey>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    /// Create an empty in-memory ledger
    pub fn new() -> Self {
        Self {
            chain: RwLock::new(Chain {
                entries: Vec::new(),
                store: None,
            }),
            positions: DashMap::new(),
            links: DashMap::new(),
            signing_key: None,
        }
    }

    /// Open a persistent ledger, replaying and re-verifying its log
    ///
    /// # Errors
    /// Returns `LedgerError::Storage`/`CorruptLog` if the log cannot be read or
    /// replayed, and `LedgerError::ChainMismatch` if the replayed chain does not
    /// verify.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let (store, records) = LedgerStore::open_or_create(path)?;
        let ledger = Self::new();
        {
            let mut chain = ledger.chain.write();
            for (line, record) in records.into_iter().enumerate() {
                ledger.replay(&mut chain.entries, line + 1, record)?;
            }
            if let Err(err) = verify_chain(&chain.entries) {
                error!(path = %store.path().display(), error = %err, "ledger log failed verification");
                return Err(err);
            }
            info!(
                path = %store.path().display(),
                length = chain.entries.len(),
                "ledger replayed"
            );
            chain.store = Some(store);
        }
        Ok(ledger)
    }

    fn replay(&self, entries: &mut Vec<EvidenceEntry>, line: usize, record: LogRecord) -> Result<()> {
        match record {
            LogRecord::Created { entry } => {
                if entry.index != entries.len() as u64 {
                    return Err(LedgerError::CorruptLog {
                        line,
                        reason: format!("entry index {} out of order", entry.index),
                    });
                }
                self.positions.insert(entry.id.clone(), entry.index);
                entries.push(entry);
            }
            LogRecord::Sealed {
                entry_id,
                result_digest,
                sealed_at,
            } => {
                let index = self.sealable_index(entries, &entry_id).map_err(|e| {
                    LedgerError::CorruptLog {
                        line,
                        reason: e.to_string(),
                    }
                })?;
                apply_seal(entries, index, result_digest, sealed_at);
            }
            LogRecord::Linked { key, entry_id } => {
                if let Some(existing) = self.links.get(&key) {
                    if existing.value() != &entry_id {
                        return Err(LedgerError::CorruptLog {
                            line,
                            reason: format!("key '{}' linked twice", key),
                        });
                    }
                }
                self.links.insert(key, entry_id);
            }
        }
        Ok(())
    }

    /// Sign chain heads with `key`
    pub fn with_signing_key(mut self, key: SigningKey) -> Self {
        self.signing_key = Some(key);
        self
    }

    /// Record a new entry
    ///
    /// In `DEV` mode the entry is always `CLASS_C`; a result, if given, is
    /// watermarked before digesting. In `QPU` mode the entry is `CLASS_B` and no
    /// result may be attached: hardware results only enter through
    /// [`Ledger::seal_entry`].
    ///
    /// # Errors
    /// Returns `LedgerError::PrematureResult` for a `QPU` entry with a result,
    /// `LedgerError::Canonicalization` if the request cannot be canonicalized
    /// and `LedgerError::Storage` if persisting fails.
    pub fn create_entry<R: Serialize + ?Sized>(
        &self,
        request: &R,
        mode: ExecutionMode,
        policy_trace: PolicyTrace,
        result: Option<Value>,
    ) -> Result<EvidenceEntry> {
        let request_digest = request_digest(&canonicalize(request)?);
        let (class, result_digest) = match mode {
            ExecutionMode::Dev => {
                let digest = match result {
                    Some(r) => Some(synthetic_result_digest(&canonicalize(&apply_watermark(
                        r,
                        ExecutionMode::Dev,
                    ))?)),
                    None => None,
                };
                (EvidenceClass::ClassC, digest)
            }
            ExecutionMode::Qpu => {
                if result.is_some() {
                    warn!("rejected hardware entry carrying a result before sealing");
                    return Err(LedgerError::PrematureResult);
                }
                (EvidenceClass::ClassB, None)
            }
        };
        let leaf = leaf_digest(
            &request_digest,
            &policy_digest(&policy_trace),
            result_digest.as_ref(),
        );
        let id = format!("ev-{}", uuid::Uuid::new_v4());

        let mut chain = self.chain.write();
        let index = chain.entries.len() as u64;
        let prev = chain
            .entries
            .last()
            .map(|e| e.chain_digest)
            .unwrap_or(Hash32::ZERO);
        let entry = EvidenceEntry {
            id: id.clone(),
            index,
            class,
            mode,
            request_digest,
            result_digest,
            leaf_digest: leaf,
            chain_digest: chain_digest(&prev, index, class, &leaf),
            policy_trace,
            created_at: now_unix(),
            sealed_at: None,
        };
        chain.persist(&LogRecord::Created {
            entry: entry.clone(),
        })?;
        chain.entries.push(entry.clone());
        self.positions.insert(id, index);
        drop(chain);

        info!(
            entry_id = %entry.id,
            index,
            class = class.as_str(),
            mode = mode.as_str(),
            "evidence entry created"
        );
        Ok(entry)
    }

    /// Promote a `CLASS_B` entry to `CLASS_A` with its hardware result
    ///
    /// Recomputes the entry's leaf and re-links every chain digest from its
    /// index to the end, so the chain still verifies from index 0.
    ///
    /// # Errors
    /// Returns `LedgerError::InvalidSealTarget` for an unknown id or an entry
    /// that is not `CLASS_B` (already sealed, or synthetic).
    pub fn seal_entry<T: Serialize + ?Sized>(&self, id: &str, result: &T) -> Result<EvidenceEntry> {
        let result_digest = hardware_result_digest(&canonicalize(result)?);

        let mut chain = self.chain.write();
        let index = match self.sealable_index(&chain.entries, id) {
            Ok(index) => index,
            Err(err) => {
                error!(entry_id = %id, error = %err, "refused to seal entry");
                return Err(err);
            }
        };
        let sealed_at = now_unix();
        chain.persist(&LogRecord::Sealed {
            entry_id: id.to_string(),
            result_digest,
            sealed_at,
        })?;
        apply_seal(&mut chain.entries, index, result_digest, sealed_at);
        let sealed = chain.entries[index].clone();
        let length = chain.entries.len();
        drop(chain);

        info!(
            entry_id = %id,
            index = sealed.index,
            relinked = length - index,
            "evidence entry sealed"
        );
        Ok(sealed)
    }

    fn sealable_index(&self, entries: &[EvidenceEntry], id: &str) -> Result<usize> {
        let index = self
            .positions
            .get(id)
            .map(|p| *p as usize)
            .filter(|&i| i < entries.len())
            .ok_or_else(|| LedgerError::InvalidSealTarget {
                entry_id: id.to_string(),
                reason: "unknown entry".to_string(),
            })?;
        let class = entries[index].class;
        if class != EvidenceClass::ClassB {
            return Err(LedgerError::InvalidSealTarget {
                entry_id: id.to_string(),
                reason: format!("entry is {}", class),
            });
        }
        Ok(index)
    }

    /// Current chain length and head digest
    pub fn chain_state(&self) -> ChainState {
        let chain = self.chain.read();
        ChainState {
            length: chain.entries.len() as u64,
            head: chain
                .entries
                .last()
                .map(|e| e.chain_digest)
                .unwrap_or(Hash32::ZERO),
        }
    }

    /// Signed chain state, if the ledger holds a signing key
    pub fn signed_chain_head(&self) -> Option<SignedChainHead> {
        let key = self.signing_key.as_ref()?;
        Some(sign_chain_head(key, &self.chain_state()))
    }

    pub fn entry(&self, id: &str) -> Option<EvidenceEntry> {
        let index = *self.positions.get(id)?;
        self.entry_at(index)
    }

    pub fn entry_at(&self, index: u64) -> Option<EvidenceEntry> {
        self.chain.read().entries.get(index as usize).cloned()
    }

    /// Snapshot of every entry in chain order
    pub fn all_entries(&self) -> Vec<EvidenceEntry> {
        self.chain.read().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.chain.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Map an experiment or job id to an entry
    ///
    /// A key binds once. Linking it again to the same entry is a no-op.
    ///
    /// # Errors
    /// Returns `LedgerError::UnknownEntry` if `entry_id` is not in the chain and
    /// `LedgerError::LinkConflict` if `key` is already bound elsewhere.
    pub fn link(&self, key: impl Into<String>, entry_id: &str) -> Result<()> {
        if !self.positions.contains_key(entry_id) {
            return Err(LedgerError::UnknownEntry(entry_id.to_string()));
        }
        let key = key.into();
        let mut chain = self.chain.write();
        if let Some(existing) = self.links.get(&key) {
            if existing.value() == entry_id {
                return Ok(());
            }
            let err = LedgerError::LinkConflict {
                key: key.clone(),
                existing: existing.value().clone(),
                requested: entry_id.to_string(),
            };
            error!(error = %err, "side index conflict");
            return Err(err);
        }
        chain.persist(&LogRecord::Linked {
            key: key.clone(),
            entry_id: entry_id.to_string(),
        })?;
        self.links.insert(key, entry_id.to_string());
        Ok(())
    }

    /// Entry linked to an experiment or job id
    pub fn entry_for(&self, key: &str) -> Option<EvidenceEntry> {
        let entry_id = self.links.get(key)?.value().clone();
        self.entry(&entry_id)
    }

    /// Recompute the chain and compare it with every stored digest
    ///
    /// # Errors
    /// Returns `LedgerError::ChainMismatch` at the first diverging index.
    pub fn verify(&self) -> Result<()> {
        let chain = self.chain.read();
        verify_chain(&chain.entries).map_err(|err| {
            error!(error = %err, "ledger verification failed");
            err
        })
    }
}

fn apply_seal(entries: &mut [EvidenceEntry], index: usize, result_digest: Hash32, sealed_at: u64) {
    let entry = &mut entries[index];
    entry.result_digest = Some(result_digest);
    entry.class = EvidenceClass::ClassA;
    entry.sealed_at = Some(sealed_at);
    relink(entries, index);
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
