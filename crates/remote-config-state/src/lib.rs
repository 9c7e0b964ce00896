//! TUF trust repository for Remote Configuration.
//!
//! [`Repository`] verifies signed root and targets metadata, validates target
//! payloads against it, and publishes the active client configs as immutable
//! [`RepositoryState`] snapshots. Fetching updates is left to the caller.

pub mod canonical;
pub mod config;
pub mod config_path;
mod crypto;
pub mod error;
pub mod metadata;
pub mod repository;
pub mod response;
pub mod root;
pub mod state;
pub mod targets;
pub mod telemetry;

pub use config::RepositoryConfig;
pub use config_path::{parse_config_path, ConfigPath, ConfigSource};
pub use error::{ErrorKind, RepositoryError, Result};
pub use metadata::Role;
pub use repository::{Repository, Update};
pub use response::{ClientConfigsResponse, TargetFile};
pub use state::{
    ApplyState, ApplyStatus, CachedFile, ConfigMetadata, ConfigRecord, RepositoryState,
};
pub use targets::{TargetDescription, TargetsMetadata};
pub use telemetry::{
    CountingTelemetry, RepositoryTelemetry, TelemetryCounters, TelemetrySnapshot,
};


#[cfg(test)]
mod tests {
    use super::*;

    /// Ensures the entry points are usable through the crate root.
    #[test]
    fn repository_types_are_reexported() {
        let repository = Repository::new_unverified();
        let changed = repository.update(Update::default()).unwrap();
        assert!(changed.is_empty());
        let state: RepositoryState = repository.current_state();
        assert_eq!(state.roots_version, 1);
        let err = Repository::from_config(RepositoryConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRoot);
    }
}
