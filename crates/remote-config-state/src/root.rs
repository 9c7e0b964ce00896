//! Root metadata and the root trust chain verifier.
//!
//! Root candidates are applied one at a time to a scratch [`RootChain`]. Each
//! candidate produces a [`RootTransition`]; the repository only swaps in the
//! resulting anchor once every candidate was accepted or skipped.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::config::RepositoryConfig;
use crate::crypto::{key_ring, verify_threshold, KeyRing};
use crate::error::{RepositoryError, Result};
use crate::metadata::{check_expiry, KeyDeclaration, Role, RoleKeys, SignedDocument};

/// Signed section of a root document.
#[derive(Debug, Clone, Deserialize)]
pub struct RootSigned {
    pub version: u64,
    #[serde(default)]
    pub expires: String,
    #[serde(default)]
    pub spec_version: String,
    #[serde(default)]
    pub consistent_snapshot: bool,
    #[serde(default)]
    pub keys: BTreeMap<String, KeyDeclaration>,
    /// Role name to authorised key ids. Roles other than root and targets are carried but unused.
    #[serde(default)]
    pub roles: BTreeMap<String, RoleKeys>,
}

impl RootSigned {
    fn validate(&self) -> Result<()> {
        if self.version == 0 {
            return Err(RepositoryError::malformed(Role::Root, "version must be at least 1"));
        }
        for role in [Role::Root, Role::Targets] {
            match self.roles.get(role.as_str()) {
                None => {
                    return Err(RepositoryError::malformed(
                        Role::Root,
                        format!("role '{role}' is not declared"),
                    ))
                }
                Some(keys) if keys.threshold == 0 => {
                    return Err(RepositoryError::malformed(
                        Role::Root,
                        format!("role '{role}' has a zero threshold"),
                    ))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    fn role_keys(&self, role: Role) -> Result<&RoleKeys> {
        self.roles.get(role.as_str()).ok_or_else(|| {
            RepositoryError::malformed(Role::Root, format!("role '{role}' is not declared"))
        })
    }
}

/// Parses and structurally validates a root candidate.
fn parse_root(raw: &[u8]) -> Result<(SignedDocument, RootSigned)> {
    let document = SignedDocument::parse(Role::Root, raw)?;
    let signed: RootSigned = document.decode()?;
    signed.validate()?;
    Ok((document, signed))
}

/// A root whose signatures have been verified.
#[derive(Debug)]
pub struct TrustedRoot {
    signed: RootSigned,
    ring: KeyRing,
    raw: Vec<u8>,
}

impl TrustedRoot {
    fn from_parts(signed: RootSigned, raw: &[u8]) -> Self {
        let ring = key_ring(&signed.keys);
        Self {
            signed,
            ring,
            raw: raw.to_vec(),
        }
    }

    /// Accepts the first root of trust. It must be signed by its own root keys.
    pub(crate) fn bootstrap(raw: &[u8], config: &RepositoryConfig) -> Result<Self> {
        let (document, signed) = parse_root(raw)?;
        let root = Self::from_parts(signed, raw);
        root.verify(&document)?;
        check_expiry(Role::Root, &root.signed.expires, config.enforce_expiry)?;
        Ok(root)
    }

    pub fn version(&self) -> u64 {
        self.signed.version
    }

    pub fn signed(&self) -> &RootSigned {
        &self.signed
    }

    /// Raw bytes this root was accepted from.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Checks `document` against the threshold this root declares for its role.
    pub(crate) fn verify(&self, document: &SignedDocument) -> Result<usize> {
        let role_keys = self.signed.role_keys(document.role())?;
        verify_threshold(document, &self.ring, role_keys)
    }
}

/// What the repository currently trusts.
#[derive(Debug, Clone)]
pub(crate) enum TrustAnchor {
    Verified(Arc<TrustedRoot>),
    /// No root of trust: signatures are not checked, versions still are.
    Unverified { version: u64 },
}

impl TrustAnchor {
    pub(crate) fn version(&self) -> u64 {
        match self {
            TrustAnchor::Verified(root) => root.version(),
            TrustAnchor::Unverified { version } => *version,
        }
    }

    pub(crate) fn verify_targets(&self, document: &SignedDocument) -> Result<()> {
        match self {
            TrustAnchor::Verified(root) => root.verify(document).map(|_| ()),
            TrustAnchor::Unverified { .. } => Ok(()),
        }
    }
}

/// Outcome of offering one root candidate to a chain.
#[derive(Debug)]
pub(crate) enum RootTransition {
    /// The candidate is the next link and becomes the trusted root.
    Accepted(TrustAnchor),
    /// The candidate is already part of the trusted chain.
    Skipped { version: u64 },
    Rejected(RepositoryError),
}

/// Scratch copy of the trust chain used while applying root candidates.
#[derive(Debug, Clone)]
pub(crate) struct RootChain {
    anchor: TrustAnchor,
    rotated: Vec<u64>,
}

impl RootChain {
    pub(crate) fn new(anchor: TrustAnchor) -> Self {
        Self {
            anchor,
            rotated: Vec::new(),
        }
    }

    /// Versions of the roots accepted so far, in order.
    pub(crate) fn rotated(&self) -> &[u64] {
        &self.rotated
    }

    pub(crate) fn into_anchor(self) -> TrustAnchor {
        self.anchor
    }

    /// Evaluates `raw` as the next link without mutating the chain.
    pub(crate) fn transition(&self, raw: &[u8], config: &RepositoryConfig) -> RootTransition {
        match self.evaluate(raw, config) {
            Ok(transition) => transition,
            Err(err) => RootTransition::Rejected(err),
        }
    }

    fn evaluate(&self, raw: &[u8], config: &RepositoryConfig) -> Result<RootTransition> {
        let (document, signed) = parse_root(raw)?;
        let current = self.anchor.version();
        if signed.version <= current {
            return Ok(RootTransition::Skipped {
                version: signed.version,
            });
        }
        if signed.version != current + 1 {
            return Err(RepositoryError::VersionRegression {
                role: Role::Root,
                current,
                received: signed.version,
            });
        }
        match &self.anchor {
            TrustAnchor::Unverified { .. } => Ok(RootTransition::Accepted(
                TrustAnchor::Unverified {
                    version: signed.version,
                },
            )),
            TrustAnchor::Verified(previous) => {
                previous.verify(&document)?;
                let candidate = TrustedRoot::from_parts(signed, raw);
                candidate.verify(&document)?;
                check_expiry(Role::Root, &candidate.signed.expires, config.enforce_expiry)?;
                Ok(RootTransition::Accepted(TrustAnchor::Verified(Arc::new(
                    candidate,
                ))))
            }
        }
    }

    /// Applies every candidate in order, stopping at the first rejection.
    pub(crate) fn apply_all(mut self, roots: &[Vec<u8>], config: &RepositoryConfig) -> Result<Self> {
        for (index, raw) in roots.iter().enumerate() {
            match self.transition(raw, config) {
                RootTransition::Accepted(anchor) => {
                    debug!(
                        from_version = self.anchor.version(),
                        to_version = anchor.version(),
                        "repository: root rotated"
                    );
                    self.rotated.push(anchor.version());
                    self.anchor = anchor;
                }
                RootTransition::Skipped { version } => {
                    debug!(version, "repository: skipping already trusted root");
                }
                RootTransition::Rejected(err) => {
                    return Err(RepositoryError::RootRotation {
                        index,
                        source: Box::new(err),
                    });
                }
            }
        }
        Ok(self)
    }
}
