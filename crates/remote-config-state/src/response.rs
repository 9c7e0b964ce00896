//! JSON form of a client config response and its conversion into an [`Update`].
//!
//! Byte fields travel as standard base64 strings. `null` and absent fields
//! are accepted wherever the backend may omit them.

use std::collections::{BTreeMap, BTreeSet};

use serde::de::Error as _;
use serde::{Deserialize, Serialize};

use crate::repository::Update;

// Base64 serialization for a single byte field, `null` decoding to empty.
mod serde_base64 {
    use data_encoding::BASE64;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&BASE64.encode(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(encoded) => BASE64
                .decode(encoded.as_bytes())
                .map_err(serde::de::Error::custom),
            None => Ok(Vec::new()),
        }
    }
}

// Base64 serialization for a list of byte fields.
mod serde_base64_vec {
    use data_encoding::BASE64;
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(value.len()))?;
        for item in value {
            seq.serialize_element(&BASE64.encode(item))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<Vec<String>>::deserialize(deserializer)?
            .unwrap_or_default()
            .into_iter()
            .map(|encoded| {
                BASE64
                    .decode(encoded.as_bytes())
                    .map_err(serde::de::Error::custom)
            })
            .collect()
    }
}

// Treats `null` as the type's default value.
mod null_as_default {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Default + Deserialize<'de>,
    {
        Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
    }
}

/// One raw target file shipped with a response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetFile {
    pub path: String,
    #[serde(default, with = "serde_base64")]
    pub raw: Vec<u8>,
}

/// Response returned to a client polling for configs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfigsResponse {
    /// Root metadata documents, oldest first.
    #[serde(default, with = "serde_base64_vec")]
    pub roots: Vec<Vec<u8>>,
    /// Signed targets metadata.
    #[serde(default, with = "serde_base64")]
    pub targets: Vec<u8>,
    #[serde(default, deserialize_with = "null_as_default::deserialize")]
    pub target_files: Vec<TargetFile>,
    #[serde(default, deserialize_with = "null_as_default::deserialize")]
    pub client_configs: Vec<String>,
}

impl ClientConfigsResponse {
    /// Parses a JSON-encoded response. Two target files with the same path are an error.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let response: Self = serde_json::from_slice(bytes)?;
        let mut seen = BTreeSet::new();
        for file in &response.target_files {
            if !seen.insert(file.path.as_str()) {
                return Err(serde_json::Error::custom(format!(
                    "duplicate target file '{}'",
                    file.path
                )));
            }
        }
        Ok(response)
    }
}

/// Target files are keyed by path. A response built by hand with repeated
/// paths keeps the last one; [`ClientConfigsResponse::from_json`] rejects them.
impl From<ClientConfigsResponse> for Update {
    fn from(response: ClientConfigsResponse) -> Self {
        let target_files: BTreeMap<String, Vec<u8>> = response
            .target_files
            .into_iter()
            .map(|file| (file.path, file.raw))
            .collect();
        Update {
            tuf_roots: response.roots,
            tuf_targets: response.targets,
            target_files,
            client_configs: response.client_configs,
        }
    }
}
