//! Checksum sidecar parsing and streaming digests.

use digest::Digest;
use mvn_model::{ChecksumKind, MavenError, Result};

/// Incremental hasher for one [`ChecksumKind`].
pub enum ChecksumHasher {
    Md5(md5::Md5),
    Sha1(sha1::Sha1),
    Sha256(sha2::Sha256),
    Sha512(sha2::Sha512),
}

impl ChecksumHasher {
    pub fn new(kind: ChecksumKind) -> Self {
        match kind {
            ChecksumKind::Md5 => Self::Md5(md5::Md5::new()),
            ChecksumKind::Sha1 => Self::Sha1(sha1::Sha1::new()),
            ChecksumKind::Sha256 => Self::Sha256(sha2::Sha256::new()),
            ChecksumKind::Sha512 => Self::Sha512(sha2::Sha512::new()),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::Md5(h) => h.update(data),
            Self::Sha1(h) => h.update(data),
            Self::Sha256(h) => h.update(data),
            Self::Sha512(h) => h.update(data),
        }
    }

    /// Lowercase hex digest.
    pub fn finalize_hex(self) -> String {
        match self {
            Self::Md5(h) => hex::encode(h.finalize()),
            Self::Sha1(h) => hex::encode(h.finalize()),
            Self::Sha256(h) => hex::encode(h.finalize()),
            Self::Sha512(h) => hex::encode(h.finalize()),
        }
    }
}

pub fn digest_hex(kind: ChecksumKind, data: &[u8]) -> String {
    let mut hasher = ChecksumHasher::new(kind);
    hasher.update(data);
    hasher.finalize_hex()
}

/// Extracts the digest from a sidecar body.
///
/// Sidecars hold the hex digest optionally followed by a file name
/// (`<hash>  file.jar`); only the first token is used.
pub fn parse_checksum(kind: ChecksumKind, body: &str, url: &str) -> Result<String> {
    let token = body.split_whitespace().next().unwrap_or_default().to_lowercase();
    if token.len() != kind.hex_len() || !token.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(MavenError::MalformedChecksum {
            url: url.to_string(),
            checksum: body.trim().chars().take(160).collect(),
        });
    }
    Ok(token)
}
