//! Content fingerprinting.

use md5::Md5;
use sha2::{Digest, Sha256};

/// Hex-encoded digests of a file's content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digests {
    /// 128-bit MD5. Fast, short, and good enough to flag likely duplicates;
    /// not collision resistant.
    pub short: String,
    /// 256-bit SHA-256, the identity/integrity signal.
    pub strong: String,
}

/// Compute both digests of `content`.
///
/// Total over any input (including empty) and deterministic: re-hashing
/// stored content reproduces the stored values.
pub fn hash(content: impl AsRef<[u8]>) -> Digests {
    let content = content.as_ref();
    Digests {
        short: hex::encode(Md5::digest(content)),
        strong: hex::encode(Sha256::digest(content)),
    }
}

impl Digests {
    /// Whether these digests describe `content`.
    pub fn matches(&self, content: impl AsRef<[u8]>) -> bool {
        hash(content) == *self
    }
}
