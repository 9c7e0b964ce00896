//! Point-in-time views of the repository contents.

use std::collections::{BTreeMap, BTreeSet};

use crate::crypto::sha256_hex;

/// Consumer-reported outcome of applying a config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApplyState {
    #[default]
    Unknown,
    /// Delivered to the consumer, which has not reported back yet.
    Unacknowledged,
    Acknowledged,
    Error,
}

/// Apply state plus the error message reported with it, if any.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApplyStatus {
    pub state: ApplyState,
    pub error: String,
}

impl ApplyStatus {
    pub fn unacknowledged() -> Self {
        Self {
            state: ApplyState::Unacknowledged,
            error: String::new(),
        }
    }

    pub fn acknowledged() -> Self {
        Self {
            state: ApplyState::Acknowledged,
            error: String::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            state: ApplyState::Error,
            error: message.into(),
        }
    }
}

/// Metadata attached to every exposed config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigMetadata {
    pub product: String,
    /// The `<config_id>` segment of the path.
    pub id: String,
    pub name: String,
    /// Version from the target's `custom.v`.
    pub version: u64,
    pub raw_length: u64,
    pub hashes: BTreeMap<String, String>,
    /// Target `custom` object as JSON bytes, uninterpreted.
    pub custom: Option<Vec<u8>>,
    pub apply_status: ApplyStatus,
}

/// A verified config payload together with its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRecord {
    pub config: Vec<u8>,
    pub metadata: ConfigMetadata,
}

/// Describes a cached target file to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedFile {
    pub path: String,
    pub length: u64,
    /// Algorithm to lowercase hex digest.
    pub hashes: BTreeMap<String, String>,
}

/// Immutable snapshot returned by [`crate::Repository::current_state`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RepositoryState {
    /// Active configs keyed by target path.
    pub configs: BTreeMap<String, ConfigRecord>,
    /// Verified payloads keyed by target path.
    pub cached_files: BTreeMap<String, Vec<u8>>,
    pub targets_version: u64,
    pub roots_version: u64,
    pub opaque_backend_state: Option<Vec<u8>>,
}

impl RepositoryState {
    /// Describes every cached payload by path, length and sha256.
    pub fn cached_file_descriptors(&self) -> Vec<CachedFile> {
        self.cached_files
            .iter()
            .map(|(path, bytes)| CachedFile {
                path: path.clone(),
                length: bytes.len() as u64,
                hashes: BTreeMap::from([("sha256".to_string(), sha256_hex(bytes))]),
            })
            .collect()
    }

    /// Products with at least one active config, sorted.
    pub fn products(&self) -> Vec<String> {
        self.configs
            .values()
            .map(|record| record.metadata.product.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn config(&self, path: &str) -> Option<&ConfigRecord> {
        self.configs.get(path)
    }

    /// Active configs of `product`, keyed by path.
    pub fn configs_for_product(&self, product: &str) -> BTreeMap<String, ConfigRecord> {
        self.configs
            .iter()
            .filter(|(_, record)| record.metadata.product == product)
            .map(|(path, record)| (path.clone(), record.clone()))
            .collect()
    }
}
