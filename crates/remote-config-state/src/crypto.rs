//! Signature threshold checks and payload digest validation.

use std::collections::{BTreeMap, BTreeSet};

use ed25519_dalek::{Signature, VerifyingKey};
use sha2::{Digest, Sha256};

use crate::error::{RepositoryError, Result};
use crate::metadata::{KeyDeclaration, RoleKeys, SignedDocument};
use crate::targets::TargetDescription;

const KEYTYPE_ED25519: &str = "ed25519";

/// Public keys declared by a root, indexed by key id.
pub(crate) type KeyRing = BTreeMap<String, PublicKey>;

/// A decoded ed25519 verification key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PublicKey {
    key: VerifyingKey,
}

impl PublicKey {
    /// Decodes a root key declaration. Unsupported or malformed keys yield `None`.
    pub(crate) fn from_declaration(declaration: &KeyDeclaration) -> Option<Self> {
        if !declaration.keytype.eq_ignore_ascii_case(KEYTYPE_ED25519) {
            return None;
        }
        let bytes = hex::decode(declaration.keyval.public.trim()).ok()?;
        let bytes: [u8; 32] = bytes.try_into().ok()?;
        let key = VerifyingKey::from_bytes(&bytes).ok()?;
        Some(Self { key })
    }

    pub(crate) fn as_bytes(&self) -> &[u8; 32] {
        self.key.as_bytes()
    }

    /// Verifies a hex-encoded signature over `message`.
    pub(crate) fn verify(&self, message: &[u8], signature_hex: &str) -> bool {
        let Ok(raw) = hex::decode(signature_hex.trim()) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(&raw) else {
            return false;
        };
        self.key.verify_strict(message, &signature).is_ok()
    }
}

/// Builds the key ring for a root, skipping keys that cannot be decoded.
pub(crate) fn key_ring(keys: &BTreeMap<String, KeyDeclaration>) -> KeyRing {
    keys.iter()
        .filter_map(|(keyid, declaration)| {
            PublicKey::from_declaration(declaration).map(|key| (keyid.clone(), key))
        })
        .collect()
}

/// Counts distinct valid signatures from `role_keys` and enforces the threshold.
///
/// A key id is counted once, and so is a key whose bytes were already counted
/// under another id. Signatures from keys outside the role are ignored.
pub(crate) fn verify_threshold(
    document: &SignedDocument,
    ring: &KeyRing,
    role_keys: &RoleKeys,
) -> Result<usize> {
    let role = document.role();
    if document.signatures().is_empty() {
        return Err(RepositoryError::Unsigned { role });
    }
    let authorized: BTreeSet<&str> = role_keys.keyids.iter().map(String::as_str).collect();
    let mut counted_ids = BTreeSet::new();
    let mut counted_keys = BTreeSet::new();
    for entry in document.signatures() {
        let keyid = entry.keyid.as_str();
        if !authorized.contains(keyid) || counted_ids.contains(keyid) {
            continue;
        }
        let Some(key) = ring.get(keyid) else {
            continue;
        };
        if counted_keys.contains(key.as_bytes()) {
            continue;
        }
        if key.verify(document.canonical(), &entry.sig) {
            counted_ids.insert(keyid);
            counted_keys.insert(*key.as_bytes());
        }
    }
    let valid = counted_ids.len();
    if valid < role_keys.threshold as usize {
        return Err(RepositoryError::ThresholdNotMet {
            role,
            valid,
            threshold: role_keys.threshold,
        });
    }
    Ok(valid)
}

/// Validates payload bytes against the length and hashes advertised for `path`.
pub(crate) fn validate_payload(path: &str, meta: &TargetDescription, bytes: &[u8]) -> Result<()> {
    let actual = bytes.len() as u64;
    if actual != meta.length {
        return Err(RepositoryError::LengthMismatch {
            path: path.to_string(),
            expected: meta.length,
            actual,
        });
    }
    if meta.hashes.is_empty() {
        return Err(RepositoryError::MissingHash {
            path: path.to_string(),
        });
    }
    for (algorithm, expected) in &meta.hashes {
        let computed = payload_hash(path, algorithm, bytes)?;
        if !expected.trim().eq_ignore_ascii_case(&computed) {
            return Err(RepositoryError::HashMismatch {
                path: path.to_string(),
                algorithm: algorithm.clone(),
            });
        }
    }
    Ok(())
}

/// Computes a lowercase hex digest for the requested algorithm.
fn payload_hash(path: &str, algorithm: &str, bytes: &[u8]) -> Result<String> {
    match algorithm.to_ascii_lowercase().as_str() {
        "sha256" => Ok(sha256_hex(bytes)),
        _ => Err(RepositoryError::UnsupportedHashAlgorithm {
            path: path.to_string(),
            algorithm: algorithm.to_string(),
        }),
    }
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
