// Deterministic TUF signing helpers shared by unit and integration tests.
//
// Keys are derived from a one-byte seed so fixtures are reproducible. The
// including module must bring `to_canonical_vec` into scope.
use ed25519_dalek::{Signer, SigningKey};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

/// Expiry stamped on generated metadata.
pub(crate) const FIXTURE_EXPIRES: &str = "2032-05-29T12:49:41Z";

/// An ed25519 signing key with its TUF key id.
pub(crate) struct TestKey {
    signing: SigningKey,
}

impl TestKey {
    pub(crate) fn from_seed(seed: u8) -> Self {
        Self {
            signing: SigningKey::from_bytes(&[seed; 32]),
        }
    }

    pub(crate) fn public_hex(&self) -> String {
        hex::encode(self.signing.verifying_key().as_bytes())
    }

    /// Key declaration as it appears in a root's `keys` map.
    pub(crate) fn declaration(&self) -> Value {
        json!({
            "keytype": "ed25519",
            "scheme": "ed25519",
            "keyid_hash_algorithms": ["sha256", "sha512"],
            "keyval": { "public": self.public_hex() },
        })
    }

    /// Key id: hex sha256 of the canonical declaration.
    pub(crate) fn id(&self) -> String {
        let canonical = to_canonical_vec(&self.declaration()).expect("canonical key declaration");
        hex::encode(Sha256::digest(&canonical))
    }

    /// Hex signature over the canonical form of `signed`.
    pub(crate) fn signature_over(&self, signed: &Value) -> String {
        let canonical = to_canonical_vec(signed).expect("canonical signed section");
        hex::encode(self.signing.sign(&canonical).to_bytes())
    }
}

/// Describes the keys and thresholds of a generated root.
pub(crate) struct RootSpec<'a> {
    pub version: u64,
    pub root_keys: Vec<&'a TestKey>,
    pub root_threshold: u32,
    pub targets_keys: Vec<&'a TestKey>,
    pub targets_threshold: u32,
    pub expires: String,
}

impl<'a> RootSpec<'a> {
    /// Root with threshold 1 for both roles.
    pub(crate) fn new(
        version: u64,
        root_keys: &[&'a TestKey],
        targets_keys: &[&'a TestKey],
    ) -> Self {
        Self {
            version,
            root_keys: root_keys.to_vec(),
            root_threshold: 1,
            targets_keys: targets_keys.to_vec(),
            targets_threshold: 1,
            expires: FIXTURE_EXPIRES.to_string(),
        }
    }

    /// Builds the `signed` section of the root document.
    pub(crate) fn root_signed(&self) -> Value {
        let mut keys = Map::new();
        for key in self.root_keys.iter().chain(self.targets_keys.iter()) {
            keys.insert(key.id(), key.declaration());
        }
        let root_role = json!({
            "keyids": key_ids(&self.root_keys),
            "threshold": self.root_threshold,
        });
        json!({
            "_type": "root",
            "spec_version": "1.0",
            "version": self.version,
            "expires": self.expires,
            "consistent_snapshot": true,
            "keys": keys,
            "roles": {
                "root": root_role,
                "snapshot": root_role,
                "timestamp": root_role,
                "targets": {
                    "keyids": key_ids(&self.targets_keys),
                    "threshold": self.targets_threshold,
                },
            },
        })
    }
}

fn key_ids(keys: &[&TestKey]) -> Vec<String> {
    keys.iter().map(|key| key.id()).collect()
}

/// Wraps `signed` in an envelope carrying one signature per signer.
pub(crate) fn sign(signed: &Value, signers: &[&TestKey]) -> Vec<u8> {
    let signatures: Vec<Value> = signers
        .iter()
        .map(|key| json!({ "keyid": key.id(), "sig": key.signature_over(signed) }))
        .collect();
    serde_json::to_vec(&json!({ "signed": signed, "signatures": signatures }))
        .expect("serialise envelope")
}

/// Simplified target descriptor used by the signing helpers.
pub(crate) struct TargetData<'a> {
    pub path: &'a str,
    pub payload: &'a [u8],
    pub version: u64,
}

/// Builds the `signed` section of a targets document.
pub(crate) fn targets_signed(
    version: u64,
    targets: &[TargetData<'_>],
    opaque_backend_state: Option<&str>,
) -> Value {
    let mut entries = Map::new();
    for target in targets {
        entries.insert(
            target.path.to_string(),
            json!({
                "length": target.payload.len(),
                "hashes": { "sha256": hex::encode(Sha256::digest(target.payload)) },
                "custom": { "v": target.version },
            }),
        );
    }
    let mut signed = json!({
        "_type": "targets",
        "spec_version": "1.0",
        "version": version,
        "expires": FIXTURE_EXPIRES,
        "targets": entries,
    });
    if let Some(state) = opaque_backend_state {
        signed["custom"] = json!({ "opaque_backend_state": state });
    }
    signed
}
