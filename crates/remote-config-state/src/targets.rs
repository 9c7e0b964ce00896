//! Targets metadata shapes and the targets verifier.
//!
//! Targets documents are verified against the targets role of the current
//! trust anchor, then decoded from the same canonical bytes that were signed.

use std::collections::BTreeMap;

use data_encoding::BASE64;
use serde::Deserialize;
use serde_json::Value;

use crate::config::RepositoryConfig;
use crate::error::{RepositoryError, Result};
use crate::metadata::{check_expiry, Role, SignedDocument};
use crate::root::TrustAnchor;

/// Signed payload containing the per-target metadata plus custom data.
#[derive(Debug, Deserialize, Clone)]
pub struct TargetsSigned {
    pub version: u64,
    #[serde(default)]
    pub expires: String,
    /// Mapping from target path to its metadata.
    #[serde(default)]
    pub targets: BTreeMap<String, TargetDescription>,
    /// Optional top-level custom section.
    #[serde(default)]
    pub custom: Option<TargetsSignedCustom>,
}

/// Top-level custom metadata embedded in a targets document.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct TargetsSignedCustom {
    /// Backend-provided opaque state, base64 encoded.
    #[serde(default)]
    pub opaque_backend_state: Option<String>,
}

/// Metadata describing an individual target entry.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TargetDescription {
    /// Advertised file length.
    pub length: u64,
    /// Content hashes keyed by algorithm (e.g., `sha256`).
    #[serde(default)]
    pub hashes: BTreeMap<String, String>,
    /// Optional custom metadata associated with the target.
    #[serde(default)]
    pub custom: Option<Value>,
}

impl TargetDescription {
    /// Config version carried in `custom.v`, or 0 when absent.
    pub fn version(&self) -> u64 {
        self.custom
            .as_ref()
            .and_then(|custom| custom.get("v"))
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }
}

/// A verified targets document.
#[derive(Debug, Clone)]
pub struct TargetsMetadata {
    pub version: u64,
    pub expires: String,
    pub targets: BTreeMap<String, TargetDescription>,
    /// Decoded `custom.opaque_backend_state`, if the document carried one.
    pub opaque_backend_state: Option<Vec<u8>>,
    raw: Vec<u8>,
}

impl TargetsMetadata {
    /// Raw bytes the document was verified from.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn get(&self, path: &str) -> Option<&TargetDescription> {
        self.targets.get(path)
    }
}

/// Verifies a raw targets document against `anchor`.
///
/// Checks run in order: structure, signatures (skipped for unverified
/// anchors), version monotonicity against `current_version`, then expiry.
pub(crate) fn verify_targets(
    raw: &[u8],
    anchor: &TrustAnchor,
    current_version: u64,
    config: &RepositoryConfig,
) -> Result<TargetsMetadata> {
    let document = SignedDocument::parse(Role::Targets, raw)?;
    let signed: TargetsSigned = document.decode()?;
    anchor.verify_targets(&document)?;
    if signed.version < current_version {
        return Err(RepositoryError::VersionRegression {
            role: Role::Targets,
            current: current_version,
            received: signed.version,
        });
    }
    check_expiry(Role::Targets, &signed.expires, config.enforce_expiry)?;
    let opaque_backend_state = signed
        .custom
        .and_then(|custom| custom.opaque_backend_state)
        .map(|encoded| {
            BASE64.decode(encoded.as_bytes()).map_err(|err| {
                RepositoryError::malformed(
                    Role::Targets,
                    format!("invalid opaque_backend_state: {err}"),
                )
            })
        })
        .transpose()?;
    Ok(TargetsMetadata {
        version: signed.version,
        expires: signed.expires,
        targets: signed.targets,
        opaque_backend_state,
        raw: raw.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::root::{TrustAnchor, TrustedRoot};
    use crate::test_support::tuf::{sign, targets_signed, RootSpec, TargetData, TestKey};
    use serde_json::json;
    use std::sync::Arc;

    fn anchor(targets_key: &TestKey) -> TrustAnchor {
        let root_key = TestKey::from_seed(1);
        let spec = RootSpec::new(1, &[&root_key], &[targets_key]);
        let raw = sign(&spec.root_signed(), &[&root_key]);
        let root = TrustedRoot::bootstrap(&raw, &RepositoryConfig::default()).unwrap();
        TrustAnchor::Verified(Arc::new(root))
    }

    #[test]
    fn decodes_versions_and_opaque_state() {
        let key = TestKey::from_seed(2);
        let payload = br#"{"a":1}"#;
        let signed = targets_signed(
            4,
            &[TargetData {
                path: "datadog/2/AGENT_CONFIG/one/config",
                payload,
                version: 7,
            }],
            Some("c3RhdGU="),
        );
        let raw = sign(&signed, &[&key]);
        let targets =
            verify_targets(&raw, &anchor(&key), 3, &RepositoryConfig::default()).unwrap();
        assert_eq!(targets.version, 4);
        assert_eq!(targets.opaque_backend_state.as_deref(), Some(&b"state"[..]));
        let entry = targets.get("datadog/2/AGENT_CONFIG/one/config").unwrap();
        assert_eq!(entry.version(), 7);
        assert_eq!(entry.length, payload.len() as u64);
        assert_eq!(targets.raw(), raw.as_slice());
    }

    /// Equal versions are replays and are accepted; lower versions are not.
    #[test]
    fn version_must_not_regress() {
        let key = TestKey::from_seed(2);
        let raw = sign(&targets_signed(5, &[], None), &[&key]);
        let anchor = anchor(&key);
        let config = RepositoryConfig::default();
        assert!(verify_targets(&raw, &anchor, 5, &config).is_ok());
        let err = verify_targets(&raw, &anchor, 6, &config).unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::VersionRegression {
                role: Role::Targets,
                current: 6,
                received: 5
            }
        ));
    }

    #[test]
    fn wrong_signer_is_rejected() {
        let key = TestKey::from_seed(2);
        let raw = sign(&targets_signed(1, &[], None), &[&TestKey::from_seed(9)]);
        let err =
            verify_targets(&raw, &anchor(&key), 0, &RepositoryConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSignature);
    }

    /// The unverified anchor skips signatures but keeps structural checks.
    #[test]
    fn unverified_anchor_still_parses() {
        let anchor = TrustAnchor::Unverified { version: 1 };
        let config = RepositoryConfig::default();
        let raw = sign(&targets_signed(2, &[], None), &[]);
        assert!(verify_targets(&raw, &anchor, 0, &config).is_ok());
        let raw = sign(&json!({ "_type": "targets", "targets": {} }), &[]);
        let err = verify_targets(&raw, &anchor, 0, &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedDocument);
    }

    #[test]
    fn invalid_opaque_state_is_malformed() {
        let raw = sign(&targets_signed(2, &[], Some("***")), &[]);
        let err = verify_targets(
            &raw,
            &TrustAnchor::Unverified { version: 1 },
            0,
            &RepositoryConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedDocument);
    }

    #[test]
    fn missing_custom_version_defaults_to_zero() {
        let entry: TargetDescription = serde_json::from_value(json!({
            "length": 3,
            "hashes": { "sha256": "00" }
        }))
        .unwrap();
        assert_eq!(entry.version(), 0);
    }
}
