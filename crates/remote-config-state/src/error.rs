//! Error taxonomy shared by every verification stage of the repository.
//!
//! Each variant carries enough context (path, role, versions) to be surfaced
//! verbatim as a remote-config apply error. [`RepositoryError::kind`] folds the
//! variants back onto the coarse categories callers usually branch on.

use thiserror::Error;

use crate::canonical::CanonicalError;
use crate::metadata::Role;

/// Coarse classification of a [`RepositoryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bootstrap or rotated root is missing, unparsable, or breaks the chain.
    InvalidRoot,
    /// Signature threshold not met for a role.
    InvalidSignature,
    /// A document version moved backwards (or skipped ahead, for roots).
    VersionRegression,
    /// A client config has no verified entry or payload.
    MissingTargetFile,
    /// Payload digest does not match the targets metadata.
    HashMismatch,
    /// Payload size does not match the targets metadata.
    LengthMismatch,
    /// Structural or parse failure of a signed document.
    MalformedDocument,
    /// A client config path does not follow a known layout.
    MalformedPath,
    /// A client config belongs to another organisation.
    OrgIdMismatch,
    /// A document is past its `expires` date while expiry is enforced.
    Expired,
}

/// Errors emitted while constructing or updating a [`crate::Repository`].
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("a trusted root is required to build a verified repository")]
    MissingRoot,
    #[error("bootstrap root rejected: {0}")]
    BootstrapRoot(#[source] Box<RepositoryError>),
    #[error("root candidate #{index} rejected: {source}")]
    RootRotation {
        index: usize,
        #[source]
        source: Box<RepositoryError>,
    },
    #[error("{role} metadata carries no signatures")]
    Unsigned { role: Role },
    #[error("{role} metadata signature threshold not met ({valid}/{threshold})")]
    ThresholdNotMet {
        role: Role,
        valid: usize,
        threshold: u32,
    },
    #[error("{role} metadata version regression (current {current}, received {received})")]
    VersionRegression {
        role: Role,
        current: u64,
        received: u64,
    },
    #[error("malformed {role} metadata: {reason}")]
    Malformed { role: Role, reason: String },
    #[error("canonical encoding failed: {0}")]
    Canonical(#[from] CanonicalError),
    #[error("{role} metadata expired at {expires}")]
    Expired { role: Role, expires: String },
    #[error("no targets metadata available to validate client configs")]
    NoTargetsMetadata,
    #[error("client config '{path}' is missing from targets metadata")]
    TargetMissing { path: String },
    #[error("target payload '{path}' missing from update and cache")]
    MissingTargetPayload { path: String },
    #[error("target payload '{path}' is not referenced by targets metadata")]
    UnexpectedTargetPayload { path: String },
    #[error("target '{path}' payload length mismatch (expected {expected}, got {actual})")]
    LengthMismatch {
        path: String,
        expected: u64,
        actual: u64,
    },
    #[error("target '{path}' payload hash mismatch for '{algorithm}'")]
    HashMismatch { path: String, algorithm: String },
    #[error("target '{path}' declares no hashes")]
    MissingHash { path: String },
    #[error("unsupported hash algorithm '{algorithm}' for target '{path}'")]
    UnsupportedHashAlgorithm { path: String, algorithm: String },
    #[error("config path '{path}' is malformed: {reason}")]
    MalformedPath { path: String, reason: String },
    #[error("target path '{path}' org_id mismatch (expected {expected}, actual {actual})")]
    OrgIdMismatch {
        path: String,
        expected: u64,
        actual: u64,
    },
}

impl RepositoryError {
    /// Returns the taxonomy bucket for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RepositoryError::MissingRoot | RepositoryError::BootstrapRoot(_) => {
                ErrorKind::InvalidRoot
            }
            RepositoryError::RootRotation { source, .. } => match source.kind() {
                // A candidate that cannot even be read is a broken chain, not a bad document.
                ErrorKind::MalformedDocument => ErrorKind::InvalidRoot,
                other => other,
            },
            RepositoryError::Unsigned { .. } | RepositoryError::ThresholdNotMet { .. } => {
                ErrorKind::InvalidSignature
            }
            RepositoryError::VersionRegression { .. } => ErrorKind::VersionRegression,
            RepositoryError::Malformed { .. } | RepositoryError::Canonical(_) => {
                ErrorKind::MalformedDocument
            }
            RepositoryError::Expired { .. } => ErrorKind::Expired,
            RepositoryError::NoTargetsMetadata
            | RepositoryError::TargetMissing { .. }
            | RepositoryError::MissingTargetPayload { .. }
            | RepositoryError::UnexpectedTargetPayload { .. } => ErrorKind::MissingTargetFile,
            RepositoryError::LengthMismatch { .. } => ErrorKind::LengthMismatch,
            RepositoryError::HashMismatch { .. }
            | RepositoryError::MissingHash { .. }
            | RepositoryError::UnsupportedHashAlgorithm { .. } => ErrorKind::HashMismatch,
            RepositoryError::MalformedPath { .. } => ErrorKind::MalformedPath,
            RepositoryError::OrgIdMismatch { .. } => ErrorKind::OrgIdMismatch,
        }
    }

    /// Builds a [`RepositoryError::Malformed`] for the given role.
    pub(crate) fn malformed(role: Role, reason: impl Into<String>) -> Self {
        RepositoryError::Malformed {
            role,
            reason: reason.into(),
        }
    }
}

/// Convenience alias for results emitted by the repository.
pub type Result<T> = std::result::Result<T, RepositoryError>;
