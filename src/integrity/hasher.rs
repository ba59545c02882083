//! Whole-file SHA-256 digests.
//!
//! Files are read completely into memory before hashing. There is no
//! streaming path; signing huge files is out of scope.

use crate::error::{Result, SignerError};
use sha2::{Digest as _, Sha256};
use std::fmt;
use std::path::Path;

/// Length of a [`Digest`] in bytes.
pub const DIGEST_LEN: usize = 32;

/// Fixed-size SHA-256 fingerprint of some content.
///
/// Never persisted; recomputed for every sign and verify.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Lowercase hexadecimal form (64 characters).
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Compute the SHA-256 digest of `bytes`.
pub fn digest(bytes: &[u8]) -> Digest {
    Digest(Sha256::digest(bytes).into())
}

/// Read a file fully and compute its digest.
///
/// # Errors
///
/// Returns [`SignerError::FileRead`] if the file is missing or unreadable.
pub fn digest_file(path: &Path) -> Result<Digest> {
    let content = std::fs::read(path).map_err(|source| SignerError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(digest(&content))
}
