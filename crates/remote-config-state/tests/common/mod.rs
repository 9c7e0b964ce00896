//! Helpers shared by the integration tests.
#![allow(dead_code)]

pub mod tuf {
    use remote_config_state::canonical::to_canonical_vec;
    include!("tuf.rs");
}

pub mod fixtures;
