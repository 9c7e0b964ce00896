//! Shapes shared by every signed TUF document.
//!
//! A document is read once into a [`SignedDocument`]: the `signed` member is
//! kept as a JSON value together with its canonical bytes, so signatures are
//! checked over exactly the bytes the typed view is later decoded from.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::canonical::to_canonical_vec;
use crate::error::{RepositoryError, Result};

/// TUF roles verified by the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Root,
    Targets,
}

impl Role {
    /// Returns the role name used in `_type` fields and the root `roles` map.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Root => "root",
            Role::Targets => "targets",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a document's `signatures` array.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SignatureEntry {
    /// Identifier of the key that produced the signature.
    pub keyid: String,
    /// Hex-encoded signature bytes.
    pub sig: String,
}

/// Public key declaration from a root's `keys` map.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct KeyDeclaration {
    pub keytype: String,
    #[serde(default)]
    pub scheme: String,
    pub keyval: KeyValue,
}

/// Key material nested under `keyval`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct KeyValue {
    /// Hex-encoded public key.
    pub public: String,
}

/// Key ids and signature threshold authorised for a role.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RoleKeys {
    pub keyids: Vec<String>,
    pub threshold: u32,
}

/// Wire envelope: `{"signed": {...}, "signatures": [...]}`.
#[derive(Debug, Deserialize)]
struct Envelope {
    signed: Value,
    #[serde(default)]
    signatures: Vec<SignatureEntry>,
}

/// A parsed, not yet verified, signed document.
#[derive(Debug, Clone)]
pub(crate) struct SignedDocument {
    role: Role,
    signed: Value,
    canonical: Vec<u8>,
    signatures: Vec<SignatureEntry>,
}

impl SignedDocument {
    /// Parses `raw` as a document of `role`, rejecting empty input and `_type` mismatches.
    pub(crate) fn parse(role: Role, raw: &[u8]) -> Result<Self> {
        if raw.is_empty() {
            return Err(RepositoryError::malformed(role, "document is empty"));
        }
        let envelope: Envelope = serde_json::from_slice(raw)
            .map_err(|err| RepositoryError::malformed(role, err.to_string()))?;
        if !envelope.signed.is_object() {
            return Err(RepositoryError::malformed(role, "`signed` is not an object"));
        }
        match envelope.signed.get("_type").and_then(Value::as_str) {
            Some(kind) if kind.eq_ignore_ascii_case(role.as_str()) => {}
            Some(kind) => {
                return Err(RepositoryError::malformed(
                    role,
                    format!("unexpected _type '{kind}'"),
                ))
            }
            None => return Err(RepositoryError::malformed(role, "missing _type")),
        }
        let canonical = to_canonical_vec(&envelope.signed)?;
        Ok(Self {
            role,
            signed: envelope.signed,
            canonical,
            signatures: envelope.signatures,
        })
    }

    pub(crate) fn role(&self) -> Role {
        self.role
    }

    /// Canonical bytes of the `signed` member, i.e. the signed message.
    pub(crate) fn canonical(&self) -> &[u8] {
        &self.canonical
    }

    pub(crate) fn signatures(&self) -> &[SignatureEntry] {
        &self.signatures
    }

    /// Decodes the typed view from the same value the canonical bytes were built from.
    ///
    /// Canonical bytes carry control characters unescaped, so they are not re-parsed.
    pub(crate) fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        T::deserialize(&self.signed)
            .map_err(|err| RepositoryError::malformed(self.role, err.to_string()))
    }
}

/// Rejects `expires` timestamps in the past when `enforce` is set.
pub(crate) fn check_expiry(role: Role, expires: &str, enforce: bool) -> Result<()> {
    if !enforce {
        return Ok(());
    }
    let parsed = OffsetDateTime::parse(expires, &Rfc3339).map_err(|err| {
        RepositoryError::malformed(role, format!("invalid expires '{expires}': {err}"))
    })?;
    if parsed <= OffsetDateTime::now_utc() {
        return Err(RepositoryError::Expired {
            role,
            expires: expires.to_string(),
        });
    }
    Ok(())
}
