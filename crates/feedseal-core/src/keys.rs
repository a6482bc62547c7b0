//! Key management: per-owner active keys with rotation history.
//!
//! Each owner has at most one [`ActiveKey`] and an append-only list of
//! [`RetiredKey`] records. Rotation swaps the active key and appends the old
//! one under a single write lock, so readers never observe a half-rotated
//! record. Signing clones the active keypair under a read lock: a signature
//! already in progress finishes with the key it started with, and no new
//! signature starts against a retired key.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::canonical::to_canonical_string;
use crate::crypto::{EncodedKeyPair, Keypair, PublicKey, Signature};
use crate::error::{CoreError, Result};

/// The key currently used for signing.
#[derive(Clone)]
pub struct ActiveKey {
    keypair: Arc<Keypair>,
    created_at: DateTime<Utc>,
}

impl ActiveKey {
    fn new(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
            created_at: Utc::now(),
        }
    }

    /// Public half of the active key.
    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    /// When this key became active.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl std::fmt::Debug for ActiveKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveKey")
            .field("public_key", &self.public_key())
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Why a key left the active slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetirementReason {
    Rotated,
    Deleted,
}

/// A key that used to be active. Kept for verifying older signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetiredKey {
    pub public_key: PublicKey,
    pub created_at: DateTime<Utc>,
    pub retired_at: DateTime<Utc>,
    pub reason: RetirementReason,
}

/// Everything known about one owner's keys.
#[derive(Debug, Clone)]
pub struct KeyRecord {
    pub owner: String,
    active: Option<ActiveKey>,
    retired: Vec<RetiredKey>,
    /// Set by [`KeyManager::delete_key`]; cleared when a new key is generated.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl KeyRecord {
    fn new(owner: &str) -> Self {
        Self {
            owner: owner.to_string(),
            active: None,
            retired: Vec::new(),
            deleted_at: None,
        }
    }

    /// The active key, if the record has not been deleted.
    pub fn active(&self) -> Option<&ActiveKey> {
        self.active.as_ref()
    }

    /// Retired keys, oldest first.
    pub fn retired(&self) -> &[RetiredKey] {
        &self.retired
    }

    /// Whether the record currently has a signing key.
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Move the active key into history and install `next`, in one step.
    fn retire_active(&mut self, reason: RetirementReason, next: Option<ActiveKey>) {
        if let Some(old) = self.active.take() {
            self.retired.push(RetiredKey {
                public_key: old.public_key(),
                created_at: old.created_at,
                retired_at: Utc::now(),
                reason,
            });
        }
        self.active = next;
    }
}

/// Which key matched during [`KeyManager::verify_with_history`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMatch {
    /// The current active key.
    Active,
    /// A retired key, at this index in the history.
    Retired { index: usize },
}

/// Thread-safe store of signing keys, indexed by owner.
#[derive(Debug, Default)]
pub struct KeyManager {
    records: RwLock<HashMap<String, KeyRecord>>,
}

impl KeyManager {
    /// Create an empty key manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate and activate a key for `owner`.
    ///
    /// Returns both halves so the caller can persist them. Fails with
    /// [`CoreError::KeyExists`] if the owner already has an active key; a
    /// deleted owner may be given a fresh key, keeping its history.
    pub fn generate_key_pair(&self, owner: &str) -> Result<EncodedKeyPair> {
        let keypair = Keypair::generate();
        let encoded = keypair.to_encoded();
        self.install(owner, keypair)?;
        Ok(encoded)
    }

    /// Activate an existing private key (e.g. loaded from storage) for `owner`.
    pub fn import_key(&self, owner: &str, private_key: &str) -> Result<PublicKey> {
        let keypair = Keypair::from_private_envelope(private_key)?;
        let public_key = keypair.public_key();
        self.install(owner, keypair)?;
        Ok(public_key)
    }

    fn install(&self, owner: &str, keypair: Keypair) -> Result<()> {
        let mut records = self.records.write();
        let record = records
            .entry(owner.to_string())
            .or_insert_with(|| KeyRecord::new(owner));
        if record.is_active() {
            return Err(CoreError::KeyExists(owner.to_string()));
        }
        debug!(owner, key_id = %keypair.public_key().key_id(), "activating key");
        record.active = Some(ActiveKey::new(keypair));
        record.deleted_at = None;
        Ok(())
    }

    /// Replace the owner's active key with a fresh one.
    ///
    /// The previous public key is appended to the history.
    pub fn rotate_key(&self, owner: &str) -> Result<EncodedKeyPair> {
        let keypair = Keypair::generate();
        let encoded = keypair.to_encoded();

        let mut records = self.records.write();
        let record = records
            .get_mut(owner)
            .ok_or_else(|| CoreError::KeyNotFound(owner.to_string()))?;
        if !record.is_active() {
            return Err(CoreError::KeyInactive(owner.to_string()));
        }
        info!(owner, new_key_id = %keypair.public_key().key_id(), "rotating key");
        record.retire_active(RetirementReason::Rotated, Some(ActiveKey::new(keypair)));
        Ok(encoded)
    }

    /// Soft-delete the owner's key: it stops signing but stays in the history.
    pub fn delete_key(&self, owner: &str) -> Result<()> {
        let mut records = self.records.write();
        let record = records
            .get_mut(owner)
            .ok_or_else(|| CoreError::KeyNotFound(owner.to_string()))?;
        if !record.is_active() {
            return Err(CoreError::KeyInactive(owner.to_string()));
        }
        info!(owner, "deleting key");
        record.retire_active(RetirementReason::Deleted, None);
        record.deleted_at = Some(Utc::now());
        Ok(())
    }

    /// The owner's active public key.
    pub fn active_public_key(&self, owner: &str) -> Option<PublicKey> {
        self.records
            .read()
            .get(owner)
            .and_then(|r| r.active.as_ref().map(ActiveKey::public_key))
    }

    /// The owner's retired keys, oldest first.
    pub fn key_history(&self, owner: &str) -> Vec<RetiredKey> {
        self.records
            .read()
            .get(owner)
            .map(|r| r.retired.clone())
            .unwrap_or_default()
    }

    /// A snapshot of the owner's record.
    pub fn record(&self, owner: &str) -> Option<KeyRecord> {
        self.records.read().get(owner).cloned()
    }

    /// All owners with a record, sorted.
    pub fn owners(&self) -> Vec<String> {
        let mut owners: Vec<String> = self.records.read().keys().cloned().collect();
        owners.sort();
        owners
    }

    /// The owner's active signing key.
    pub fn signing_key(&self, owner: &str) -> Result<Arc<Keypair>> {
        let records = self.records.read();
        let record = records
            .get(owner)
            .ok_or_else(|| CoreError::KeyNotFound(owner.to_string()))?;
        record
            .active
            .as_ref()
            .map(|a| Arc::clone(&a.keypair))
            .ok_or_else(|| CoreError::KeyInactive(owner.to_string()))
    }

    /// Canonicalize `content` and sign it with the owner's active key.
    pub fn sign<T: Serialize + ?Sized>(&self, owner: &str, content: &T) -> Result<String> {
        // Lock released before signing.
        let keypair = self.signing_key(owner)?;
        let canonical = to_canonical_string(content)?;
        Ok(keypair.sign(canonical.as_bytes()).to_envelope())
    }

    /// Verify against the owner's active key, then the retired keys.
    ///
    /// Returns which key matched, or `None` when no key verifies (including
    /// malformed signatures and unknown owners).
    pub fn verify_with_history<T: Serialize + ?Sized>(
        &self,
        owner: &str,
        content: &T,
        signature: &str,
    ) -> Option<KeyMatch> {
        let canonical = to_canonical_string(content).ok()?;
        let sig = Signature::from_envelope(signature).ok()?;

        let records = self.records.read();
        let record = records.get(owner)?;

        if let Some(active) = &record.active {
            if active.public_key().verify(canonical.as_bytes(), &sig).is_ok() {
                return Some(KeyMatch::Active);
            }
        }
        record
            .retired
            .iter()
            .rposition(|k| k.public_key.verify(canonical.as_bytes(), &sig).is_ok())
            .map(|index| KeyMatch::Retired { index })
    }
}
