// src/hash.rs

//! Hashing for update marker contents
//!
//! The marker file shipped with a tag handler must differ between builds so
//! that Conary sees a changed file, and therefore re-runs the handler, on
//! every update. Its contents are the SHA-256 of a random payload.

use sha2::{Digest, Sha256};

/// Length of the random payload fed to the marker hash
pub const MARKER_PAYLOAD_LEN: usize = 32;

/// Compute SHA-256 hash as lowercase hex
pub fn sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Where marker payloads come from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MarkerSource {
    /// Fresh random bytes per marker
    #[default]
    Random,
    /// Fixed payload; makes output reproducible
    Fixed(Vec<u8>),
}

impl MarkerSource {
    fn payload(&self) -> Vec<u8> {
        match self {
            Self::Random => rand::random::<[u8; MARKER_PAYLOAD_LEN]>().to_vec(),
            Self::Fixed(bytes) => bytes.clone(),
        }
    }

    /// Marker file contents: hex digest of the payload
    pub fn marker_contents(&self) -> String {
        sha256(&self.payload())
    }
}
