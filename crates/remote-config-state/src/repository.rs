//! The trust repository: verifies updates and publishes consistent snapshots.
//!
//! Every `update` stages a complete [`Published`] value from the current one
//! and swaps it in only after all checks pass. Readers clone the published
//! `Arc` and never observe a partially applied update. A writer mutex keeps
//! concurrent `update` calls from staging against the same base.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, warn};

use crate::config::RepositoryConfig;
use crate::config_path::{check_org_id, parse_config_path};
use crate::crypto::validate_payload;
use crate::error::{RepositoryError, Result};
use crate::metadata::Role;
use crate::root::{RootChain, TrustAnchor, TrustedRoot};
use crate::state::{ApplyStatus, ConfigMetadata, ConfigRecord, RepositoryState};
use crate::targets::{verify_targets, TargetDescription, TargetsMetadata};
use crate::telemetry::{NoopTelemetry, RepositoryTelemetry};

/// Raw material of one update, as fetched by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Update {
    /// Root documents to rotate through, oldest first.
    pub tuf_roots: Vec<Vec<u8>>,
    /// Signed targets metadata. Empty reuses the last accepted targets.
    pub tuf_targets: Vec<u8>,
    /// Target payloads keyed by path.
    pub target_files: BTreeMap<String, Vec<u8>>,
    /// Paths that should be active after this update.
    pub client_configs: Vec<String>,
}

impl Update {
    /// True when every field is empty.
    pub fn is_empty(&self) -> bool {
        self.tuf_roots.is_empty()
            && self.tuf_targets.is_empty()
            && self.target_files.is_empty()
            && self.client_configs.is_empty()
    }

    /// Whether the update describes a new active config set.
    fn recomputes_configs(&self) -> bool {
        !self.tuf_targets.is_empty()
            || !self.target_files.is_empty()
            || !self.client_configs.is_empty()
    }
}

/// Everything a reader can observe, published as one unit.
#[derive(Debug, Clone)]
struct Published {
    anchor: TrustAnchor,
    targets: Option<Arc<TargetsMetadata>>,
    state: RepositoryState,
}

impl Published {
    fn initial(anchor: TrustAnchor) -> Self {
        let state = RepositoryState {
            roots_version: anchor.version(),
            ..RepositoryState::default()
        };
        Self {
            anchor,
            targets: None,
            state,
        }
    }
}

/// Outcome of a successfully staged update.
struct Staged {
    published: Published,
    changed: Vec<String>,
    rotated: Vec<u64>,
}

/// TUF trust repository for Remote Configuration.
pub struct Repository {
    published: RwLock<Arc<Published>>,
    writer: Mutex<()>,
    config: RepositoryConfig,
    telemetry: Arc<dyn RepositoryTelemetry>,
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let published = self.snapshot();
        f.debug_struct("Repository")
            .field("verified", &matches!(published.anchor, TrustAnchor::Verified(_)))
            .field("roots_version", &published.state.roots_version)
            .field("targets_version", &published.state.targets_version)
            .field("configs", &published.state.configs.len())
            .finish()
    }
}

impl Repository {
    /// Builds a verified repository trusting `raw_root`.
    pub fn new(raw_root: &[u8]) -> Result<Self> {
        Self::with_config(raw_root, RepositoryConfig::default())
    }

    /// Builds a verified repository with explicit verification settings.
    ///
    /// The root must parse, declare root and targets roles, and be signed
    /// by a threshold of its own root keys.
    pub fn with_config(raw_root: &[u8], config: RepositoryConfig) -> Result<Self> {
        if raw_root.is_empty() {
            return Err(RepositoryError::MissingRoot);
        }
        let root = TrustedRoot::bootstrap(raw_root, &config)
            .map_err(|err| RepositoryError::BootstrapRoot(Box::new(err)))?;
        debug!(version = root.version(), "repository: trusting bootstrap root");
        Ok(Self::from_anchor(
            TrustAnchor::Verified(Arc::new(root)),
            config,
        ))
    }

    /// Builds a verified repository from `director_root_override`.
    pub fn from_config(config: RepositoryConfig) -> Result<Self> {
        let raw_root = config
            .director_root_override
            .clone()
            .ok_or(RepositoryError::MissingRoot)?;
        Self::with_config(raw_root.as_bytes(), config)
    }

    /// Builds a repository that checks no signatures.
    ///
    /// Hashes, lengths, paths and versions are still enforced. Meant for
    /// channels that are authenticated by other means.
    pub fn new_unverified() -> Self {
        Self::unverified_with_config(RepositoryConfig::default())
    }

    pub fn unverified_with_config(config: RepositoryConfig) -> Self {
        Self::from_anchor(TrustAnchor::Unverified { version: 1 }, config)
    }

    fn from_anchor(anchor: TrustAnchor, config: RepositoryConfig) -> Self {
        Self {
            published: RwLock::new(Arc::new(Published::initial(anchor))),
            writer: Mutex::new(()),
            config,
            telemetry: Arc::new(NoopTelemetry),
        }
    }

    /// Replaces the telemetry observer.
    pub fn with_telemetry(mut self, telemetry: Arc<dyn RepositoryTelemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Verifies `update` and, if every check passes, publishes the new state.
    ///
    /// Returns the sorted paths of configs that were added, changed or removed.
    /// On error the previously published state is left untouched.
    pub fn update(&self, update: Update) -> Result<Vec<String>> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if update.is_empty() {
            return Ok(Vec::new());
        }
        let current = self.snapshot();
        match self.stage(&current, &update) {
            Ok(staged) => {
                debug!(
                    roots_version = staged.published.state.roots_version,
                    targets_version = staged.published.state.targets_version,
                    configs = staged.published.state.configs.len(),
                    changed = staged.changed.len(),
                    "repository: update applied"
                );
                self.publish(staged.published);
                for version in &staged.rotated {
                    self.telemetry.on_root_rotated(*version);
                }
                self.telemetry.on_update_applied(staged.changed.len());
                Ok(staged.changed)
            }
            Err(err) => {
                warn!(
                    error = %err,
                    kind = ?err.kind(),
                    "repository: update rejected"
                );
                self.telemetry.on_update_rejected(&err);
                Err(err)
            }
        }
    }

    /// Returns a copy of the currently published state.
    pub fn current_state(&self) -> RepositoryState {
        self.snapshot().state.clone()
    }

    /// Active configs of `product`, keyed by path.
    pub fn configs_for_product(&self, product: &str) -> BTreeMap<String, ConfigRecord> {
        self.snapshot().state.configs_for_product(product)
    }

    /// Records the consumer's apply outcome for `path`. Unknown paths are ignored.
    pub fn update_apply_status(&self, path: &str, status: ApplyStatus) {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.snapshot();
        if !current.state.configs.contains_key(path) {
            debug!(path, "repository: ignoring apply status for unknown config");
            return;
        }
        let mut next = Published::clone(&current);
        if let Some(record) = next.state.configs.get_mut(path) {
            record.metadata.apply_status = status;
        }
        self.publish(next);
    }

    fn snapshot(&self) -> Arc<Published> {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish(&self, next: Published) {
        *self
            .published
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
    }

    fn stage(&self, current: &Published, update: &Update) -> Result<Staged> {
        let chain =
            RootChain::new(current.anchor.clone()).apply_all(&update.tuf_roots, &self.config)?;
        let rotated = chain.rotated().to_vec();
        let anchor = chain.into_anchor();

        if !update.recomputes_configs() {
            let mut state = current.state.clone();
            state.roots_version = anchor.version();
            return Ok(Staged {
                published: Published {
                    anchor,
                    targets: current.targets.clone(),
                    state,
                },
                changed: Vec::new(),
                rotated,
            });
        }

        let fresh_targets = !update.tuf_targets.is_empty();
        let targets = if fresh_targets {
            verify_targets(
                &update.tuf_targets,
                &anchor,
                current.state.targets_version,
                &self.config,
            )?
        } else {
            // Stored targets are re-checked against the current anchor before reuse.
            let stored = current
                .targets
                .as_ref()
                .ok_or(RepositoryError::NoTargetsMetadata)?;
            verify_targets(
                stored.raw(),
                &anchor,
                current.state.targets_version,
                &self.config,
            )?
        };

        for (path, bytes) in &update.target_files {
            let meta = targets
                .get(path)
                .ok_or_else(|| RepositoryError::UnexpectedTargetPayload { path: path.clone() })?;
            validate_payload(path, meta, bytes)?;
        }

        let active: BTreeSet<&str> = update.client_configs.iter().map(String::as_str).collect();
        let mut configs = BTreeMap::new();
        let mut cached_files = BTreeMap::new();
        let mut changed = BTreeSet::new();
        for path in active {
            let parsed = parse_config_path(path)?;
            if let Some(expected_org_id) = self.config.expected_org_id {
                check_org_id(path, &parsed, expected_org_id)?;
            }
            let meta = targets
                .get(path)
                .ok_or_else(|| RepositoryError::TargetMissing {
                    path: path.to_string(),
                })?;
            let payload = match update.target_files.get(path) {
                Some(bytes) => bytes.clone(),
                None => {
                    let cached = current.state.cached_files.get(path).ok_or_else(|| {
                        RepositoryError::MissingTargetPayload {
                            path: path.to_string(),
                        }
                    })?;
                    validate_payload(path, meta, cached)?;
                    cached.clone()
                }
            };
            let apply_status = match current.state.configs.get(path) {
                Some(previous) if previous.config == payload => {
                    previous.metadata.apply_status.clone()
                }
                _ => {
                    changed.insert(path.to_string());
                    ApplyStatus::unacknowledged()
                }
            };
            let metadata = ConfigMetadata {
                product: parsed.product,
                id: parsed.config_id,
                name: parsed.name,
                version: meta.version(),
                raw_length: meta.length,
                hashes: normalised_hashes(meta),
                custom: encode_custom(meta)?,
                apply_status,
            };
            cached_files.insert(path.to_string(), payload.clone());
            configs.insert(
                path.to_string(),
                ConfigRecord {
                    config: payload,
                    metadata,
                },
            );
        }
        for path in current.state.configs.keys() {
            if !configs.contains_key(path) {
                changed.insert(path.clone());
            }
        }

        let opaque_backend_state = targets
            .opaque_backend_state
            .clone()
            .or_else(|| current.state.opaque_backend_state.clone());
        let state = RepositoryState {
            configs,
            cached_files,
            targets_version: targets.version,
            roots_version: anchor.version(),
            opaque_backend_state,
        };
        Ok(Staged {
            published: Published {
                anchor,
                targets: Some(Arc::new(targets)),
                state,
            },
            changed: changed.into_iter().collect(),
            rotated,
        })
    }
}

/// Lowercases hash algorithm names.
fn normalised_hashes(meta: &TargetDescription) -> BTreeMap<String, String> {
    meta.hashes
        .iter()
        .map(|(algo, value)| (algo.to_ascii_lowercase(), value.to_ascii_lowercase()))
        .collect()
}

fn encode_custom(meta: &TargetDescription) -> Result<Option<Vec<u8>>> {
    meta.custom
        .as_ref()
        .map(serde_json::to_vec)
        .transpose()
        .map_err(|err| RepositoryError::malformed(Role::Targets, err.to_string()))
}
