//! Content comparison by full-content fingerprints.

mod fingerprint;

pub use fingerprint::{CHUNK_SIZE, FingerprintError, same_content};
